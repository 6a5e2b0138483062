//! Configuration types.
//!
//! Every section carries serde defaults, so a partial file deserializes
//! into a complete [`Config`].

use serde::{Deserialize, Serialize};

/// Top-level auditlink configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Netlink client behavior.
    pub client: ClientSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// How replies are read from the socket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyModeSetting {
    /// Wait until a datagram arrives.
    #[default]
    Blocking,
    /// Return immediately when nothing is queued.
    NonBlocking,
}

impl ReplyModeSetting {
    /// Accepted spellings, in the form used in config files.
    pub const NAMES: &'static [&'static str] = &["blocking", "nonblocking"];

    /// Parse a config-file spelling.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "blocking" => Some(Self::Blocking),
            "nonblocking" => Some(Self::NonBlocking),
            _ => None,
        }
    }
}

/// Client section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// Default reply mode for `recv` and `status`.
    pub reply_mode: ReplyModeSetting,
    /// Leave received replies queued.
    pub peek: bool,
    /// Wait for the kernel acknowledgement after `set-pid`.
    pub wait_for_ack: bool,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            reply_mode: ReplyModeSetting::Blocking,
            peek: false,
            wait_for_ack: true,
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level filter.
    pub level: String,
    /// Output format: `pretty`, `compact`, `json` or `full`.
    pub format: String,
    /// Per-target directives such as `auditlink_netlink=debug`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [client]
            peek = true
        "#,
        )
        .unwrap();

        assert!(config.client.peek);
        assert!(config.client.wait_for_ack);
        assert_eq!(config.client.reply_mode, ReplyModeSetting::Blocking);
        assert_eq!(config.logging, LoggingSection::default());
    }

    #[test]
    fn test_reply_mode_names() {
        for name in ReplyModeSetting::NAMES {
            let mode = ReplyModeSetting::from_name(name).unwrap();
            let value = toml::Value::try_from(mode).unwrap();
            assert_eq!(value.as_str(), Some(*name));
        }
        assert!(ReplyModeSetting::from_name("async").is_none());
    }

    #[test]
    fn test_unknown_reply_mode_rejected() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [client]
            reply_mode = "sometimes"
        "#,
        );
        assert!(result.is_err());
    }
}
