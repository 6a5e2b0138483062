//! `auditlink recv` - receive messages from the kernel.

use anyhow::Context as _;
use auditlink_netlink::{AuditClient, AuditError, ReplyMode, Transport};
use serde_json::json;

use crate::formatter::{self, OutputFormat};
use crate::theme::Theme;

/// Receive up to `count` messages and render each on its own line.
///
/// A non-blocking receive that finds the queue empty ends the run early
/// rather than failing it.
pub(crate) fn run<T: Transport>(
    client: &mut AuditClient<T>,
    mode: ReplyMode,
    peek: bool,
    count: usize,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let mut lines = Vec::new();

    for _ in 0..count.max(1) {
        match client.get_reply(mode, peek) {
            Ok(reply) => lines.push(formatter::reply(&reply, format)),
            Err(AuditError::WouldBlock) => {
                if lines.is_empty() {
                    lines.push(match format {
                        OutputFormat::Json => json!({ "would_block": true }).to_string(),
                        OutputFormat::Pretty => Theme::warning("no message queued"),
                    });
                }
                break;
            },
            Err(e) => return Err(e).context("could not receive audit reply"),
        }
    }

    Ok(lines.join("\n"))
}
