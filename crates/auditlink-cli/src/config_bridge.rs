//! Bridge from `auditlink_config::Config` to client and logging types.

use auditlink_config::{Config, ReplyModeSetting};
use auditlink_netlink::{ReplyMode, WaitMode};
use auditlink_telemetry::{LogConfig, LogFormat};

/// Convert the logging section to a [`LogConfig`].
pub(crate) fn to_log_config(cfg: &Config) -> LogConfig {
    let format = cfg.logging.format.parse().unwrap_or(LogFormat::Compact);

    let mut log_config = LogConfig::new(&cfg.logging.level).with_format(format);
    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }
    log_config
}

/// Reply mode from config, forced non-blocking by `--nonblocking`.
pub(crate) fn reply_mode(cfg: &Config, nonblocking: bool) -> ReplyMode {
    if nonblocking {
        return ReplyMode::NonBlocking;
    }
    match cfg.client.reply_mode {
        ReplyModeSetting::Blocking => ReplyMode::Blocking,
        ReplyModeSetting::NonBlocking => ReplyMode::NonBlocking,
    }
}

/// Wait mode from config, disabled by `--no-wait`.
pub(crate) fn wait_mode(cfg: &Config, no_wait: bool) -> WaitMode {
    if no_wait || !cfg.client.wait_for_ack {
        WaitMode::No
    } else {
        WaitMode::Yes
    }
}
