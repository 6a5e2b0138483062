//! `auditlink set-pid` - register the audit event receiver.

use anyhow::Context as _;
use auditlink_netlink::{AuditClient, Transport, WaitMode};
use serde_json::json;

use crate::formatter::OutputFormat;
use crate::theme::Theme;

/// Register `pid`, waiting for the acknowledgment when `wait` asks for it.
pub(crate) fn run<T: Transport>(
    client: &mut AuditClient<T>,
    pid: u32,
    wait: WaitMode,
    format: OutputFormat,
) -> anyhow::Result<String> {
    client
        .set_pid(pid, wait)
        .with_context(|| format!("could not set audit pid to {pid}"))?;

    let acknowledged = wait == WaitMode::Yes;
    Ok(match format {
        OutputFormat::Json => json!({
            "pid": pid,
            "seq": client.last_sequence(),
            "acknowledged": acknowledged,
        })
        .to_string(),
        OutputFormat::Pretty if acknowledged => {
            Theme::success(&format!("audit pid set to {pid}"))
        },
        OutputFormat::Pretty => Theme::warning(&format!(
            "audit pid {pid} requested, acknowledgment not awaited"
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditlink_netlink::{AuditStatus, MessageType};
    use auditlink_test::MockKernel;

    #[test]
    fn test_set_pid_sends_status_request() {
        let kernel = MockKernel::new().with_auto_ack();
        let mut client = AuditClient::with_transport(kernel.clone());

        let out = run(&mut client, 1234, WaitMode::Yes, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["pid"], 1234);
        assert_eq!(value["acknowledged"], true);

        let sent = kernel.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message_type(), MessageType::SET);
        let status = AuditStatus::decode(sent[0].payload()).unwrap();
        assert_eq!(status.pid, 1234);
    }

    #[test]
    fn test_set_pid_no_wait_leaves_queue_alone() {
        let kernel = MockKernel::new().with_auto_ack();
        let mut client = AuditClient::with_transport(kernel.clone());

        let out = run(&mut client, 99, WaitMode::No, OutputFormat::Pretty).unwrap();
        assert!(out.contains("not awaited"));
        // No NLM_F_ACK requested, so nothing was queued.
        assert_eq!(kernel.pending(), 0);
    }
}
