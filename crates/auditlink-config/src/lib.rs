//! Auditlink Config - Layered configuration for the auditlink tools.
//!
//! Configuration is resolved from, in increasing precedence:
//! - the embedded defaults
//! - `/etc/auditlink/config.toml`
//! - `~/.auditlink/config.toml`
//!
//! `AUDITLINK_*` environment variables fill fields that no file set.
//!
//! # Example
//!
//! ```rust,no_run
//! use auditlink_config::{ShowFormat, load};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let resolved = load(None)?;
//! println!("{}", resolved.show(ShowFormat::Toml)?);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod env;
mod error;
mod loader;
mod merge;
mod show;
mod types;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load, load_file};
pub use merge::{ConfigLayer, FieldSources};
pub use show::{ResolvedConfig, ShowFormat};
pub use types::{ClientSection, Config, LoggingSection, ReplyModeSetting};
pub use validate::validate;
