//! `auditlink config` - inspect the resolved configuration.

use anyhow::Context as _;
use auditlink_config::{ResolvedConfig, ShowFormat};

/// Render the resolved configuration with its sources.
pub(crate) fn show_config(resolved: &ResolvedConfig, format: &str) -> anyhow::Result<String> {
    let show_format = match format {
        "json" => ShowFormat::Json,
        "toml" => ShowFormat::Toml,
        other => anyhow::bail!("unknown config format '{other}', expected toml or json"),
    };
    resolved
        .show(show_format)
        .context("could not render configuration")
}
