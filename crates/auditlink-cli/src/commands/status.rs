//! `auditlink status` - query the kernel audit status.

use anyhow::Context as _;
use auditlink_netlink::{AuditClient, ReplyMode, Transport};

use crate::formatter::{self, OutputFormat};

/// Send `AUDIT_GET` and render the status reply.
pub(crate) fn run<T: Transport>(
    client: &mut AuditClient<T>,
    mode: ReplyMode,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let status = client
        .get_status(mode)
        .context("could not query audit status")?;
    Ok(formatter::status(&status, format))
}
