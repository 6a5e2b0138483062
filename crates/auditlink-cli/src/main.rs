//! Auditlink CLI - talk to the Linux kernel audit subsystem.
//!
//! Queries the audit status, registers the audit daemon pid and reads
//! messages from a `NETLINK_AUDIT` socket.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use auditlink_config::ResolvedConfig;
use clap::{Parser, Subcommand};

mod commands;
mod config_bridge;
mod formatter;
mod theme;

use formatter::OutputFormat;

/// Auditlink - Linux audit netlink client
#[derive(Parser)]
#[command(name = "auditlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format: pretty (default) or json
    #[arg(long, global = true, default_value = "pretty")]
    format: String,

    /// Read configuration from this file only
    #[arg(short, long, global = true, env = "AUDITLINK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the kernel audit status
    Status {
        /// Fail instead of waiting when no reply is queued
        #[arg(long)]
        nonblocking: bool,
    },

    /// Register a process as the audit event receiver
    SetPid {
        /// Process id to register (0 unregisters)
        pid: u32,

        /// Do not wait for the kernel acknowledgment
        #[arg(long)]
        no_wait: bool,
    },

    /// Receive messages from the audit socket
    Recv {
        /// Fail instead of waiting when nothing is queued
        #[arg(long)]
        nonblocking: bool,

        /// Leave messages queued on the socket
        #[arg(long)]
        peek: bool,

        /// Number of messages to receive
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved configuration with the source of each value
    Show {
        /// Rendering: toml (default) or json
        #[arg(short, long, default_value = "toml")]
        output: String,
    },
}

fn load_config(path: Option<&Path>) -> Result<ResolvedConfig> {
    match path {
        Some(path) => {
            let config = auditlink_config::load_file(path)
                .with_context(|| format!("could not load {}", path.display()))?;
            Ok(ResolvedConfig::from_file(config, path.display().to_string()))
        },
        None => auditlink_config::load(None).context("could not load configuration"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolved = load_config(cli.config.as_deref());

    // Set up logging from config, with --verbose override.
    let log_config = if let Ok(resolved) = &resolved {
        let mut lc = config_bridge::to_log_config(&resolved.config);
        if cli.verbose {
            "debug".clone_into(&mut lc.level);
        }
        lc
    } else {
        let level = if cli.verbose { "debug" } else { "info" };
        auditlink_telemetry::LogConfig::new(level)
            .with_format(auditlink_telemetry::LogFormat::Compact)
    };
    if let Err(e) = auditlink_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let format = OutputFormat::parse(&cli.format);

    let output = match cli.command {
        Commands::Config {
            command: ConfigCommands::Show { output },
        } => commands::config::show_config(&resolved?, &output)?,
        command => {
            let resolved = resolved.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "using built-in configuration");
                ResolvedConfig::from_file(auditlink_config::Config::default(), "<built-in>")
            });
            run_client_command(command, &resolved, format)?
        },
    };

    println!("{output}");
    Ok(())
}

#[cfg(target_os = "linux")]
fn run_client_command(
    command: Commands,
    resolved: &ResolvedConfig,
    format: OutputFormat,
) -> Result<String> {
    use auditlink_netlink::AuditClient;

    let cfg = &resolved.config;
    let mut client =
        AuditClient::open().context("could not open the audit netlink socket")?;

    let output = match command {
        Commands::Status { nonblocking } => commands::status::run(
            &mut client,
            config_bridge::reply_mode(cfg, nonblocking),
            format,
        ),
        Commands::SetPid { pid, no_wait } => commands::set_pid::run(
            &mut client,
            pid,
            config_bridge::wait_mode(cfg, no_wait),
            format,
        ),
        Commands::Recv {
            nonblocking,
            peek,
            count,
        } => commands::recv::run(
            &mut client,
            config_bridge::reply_mode(cfg, nonblocking),
            peek || cfg.client.peek,
            count,
            format,
        ),
        Commands::Config { .. } => Err(anyhow::anyhow!("config commands do not use the socket")),
    };

    client.close();
    output
}

#[cfg(not(target_os = "linux"))]
fn run_client_command(
    _command: Commands,
    _resolved: &ResolvedConfig,
    _format: OutputFormat,
) -> Result<String> {
    anyhow::bail!("the audit netlink socket is only available on Linux")
}
