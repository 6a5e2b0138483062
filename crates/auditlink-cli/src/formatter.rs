//! Rendering of kernel replies for the terminal or as JSON.

use std::fmt::Write as _;

use auditlink_netlink::{AuditReply, AuditStatus, ReplyPayload};
use serde_json::{Value, json};

use crate::theme::Theme;

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    /// Human-readable, colored.
    Pretty,
    /// One JSON document per result.
    Json,
}

impl OutputFormat {
    pub(crate) fn parse(s: &str) -> Self {
        match s {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Render an audit status report.
pub(crate) fn status(status: &AuditStatus, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json!(status).to_string(),
        OutputFormat::Pretty => {
            let enabled = match status.enabled {
                0 => "disabled",
                1 => "enabled",
                2 => "locked",
                _ => "unknown",
            };
            let optional = |v: Option<u32>| v.map_or_else(|| "-".to_owned(), |v| v.to_string());

            let mut out = String::new();
            let _ = writeln!(out, "{}", Theme::header("Audit Status"));
            let _ = writeln!(out, "{}", Theme::separator());
            let rows = [
                ("enabled", format!("{} ({enabled})", status.enabled)),
                ("failure", status.failure.to_string()),
                ("pid", status.pid.to_string()),
                ("rate_limit", status.rate_limit.to_string()),
                ("backlog_limit", status.backlog_limit.to_string()),
                ("lost", status.lost.to_string()),
                ("backlog", status.backlog.to_string()),
                ("feature_bitmap", optional(status.feature_bitmap)),
                ("backlog_wait_time", optional(status.backlog_wait_time)),
                (
                    "backlog_wait_time_actual",
                    optional(status.backlog_wait_time_actual),
                ),
            ];
            for (key, value) in rows {
                let _ = writeln!(out, "{}", Theme::kv(key, &value));
            }
            out
        },
    }
}

/// Render one received reply.
pub(crate) fn reply(reply: &AuditReply, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => reply_json(reply).to_string(),
        OutputFormat::Pretty => {
            let mut out = format!(
                "{} seq={} len={}",
                Theme::message_type(&reply.message_type().to_string()),
                reply.sequence(),
                reply.len()
            );
            let detail = match reply.payload() {
                ReplyPayload::Status(s) => format!(
                    "enabled={} pid={} backlog={} lost={}",
                    s.enabled, s.pid, s.backlog, s.lost
                ),
                ReplyPayload::Error(err) => match err.errno() {
                    None => "ack".to_owned(),
                    Some(errno) => format!("error errno={errno}"),
                },
                ReplyPayload::SignalInfo(info) => format!(
                    "uid={} pid={} context={}",
                    info.uid,
                    info.pid,
                    info.context().as_deref().unwrap_or("-")
                ),
                ReplyPayload::Text(text) => text.to_str_lossy().into_owned(),
                ReplyPayload::RuleData(rule) => format!(
                    "flags={:#x} action={} fields={}",
                    rule.flags(),
                    rule.action(),
                    rule.field_count()
                ),
                ReplyPayload::Unknown => format!("{} payload bytes", reply.message().payload().len()),
            };
            out.push_str("\n  ");
            out.push_str(&detail);
            out
        },
    }
}

fn reply_json(reply: &AuditReply) -> Value {
    let payload = match reply.payload() {
        ReplyPayload::Status(s) => json!({ "status": s }),
        ReplyPayload::Error(err) => json!({ "error": err }),
        ReplyPayload::SignalInfo(info) => json!({
            "signal_info": {
                "uid": info.uid,
                "pid": info.pid,
                "context": info.context(),
            }
        }),
        ReplyPayload::Text(text) => json!({ "text": text.to_str_lossy() }),
        ReplyPayload::RuleData(rule) => json!({
            "rule": {
                "flags": rule.flags(),
                "action": rule.action(),
                "field_count": rule.field_count(),
            }
        }),
        ReplyPayload::Unknown => json!({ "unknown": { "len": reply.message().payload().len() } }),
    };

    json!({
        "type": reply.message_type().raw(),
        "type_name": reply.message_type().name(),
        "seq": reply.sequence(),
        "len": reply.len(),
        "header": reply.header(),
        "payload": payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditlink_netlink::{AuditMessage, MessageType};
    use auditlink_test::{error_frame, signal_info_frame, test_status, text_frame};

    fn parse(frame: &[u8]) -> AuditReply {
        AuditReply::from_message(AuditMessage::decode(frame).unwrap()).unwrap()
    }

    #[test]
    fn test_status_json() {
        let out = status(&test_status(1234), OutputFormat::Json);
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["pid"], 1234);
        assert_eq!(value["backlog_limit"], 8192);
        assert_eq!(value["backlog_wait_time_actual"], Value::Null);
    }

    #[test]
    fn test_status_pretty_lists_fields() {
        let out = status(&test_status(77), OutputFormat::Pretty);
        assert!(out.contains("77"));
        assert!(out.contains("(enabled)"));
        assert!(out.contains("60000"));
    }

    #[test]
    fn test_text_reply_json() {
        let reply = parse(&text_frame(MessageType::USER, 5, "op=login res=success"));
        let value: Value = serde_json::from_str(&reply_json(&reply).to_string()).unwrap();
        assert_eq!(value["type"], 1005);
        assert_eq!(value["type_name"], "AUDIT_USER");
        assert_eq!(value["seq"], 5);
        assert_eq!(value["payload"]["text"], "op=login res=success");
    }

    #[test]
    fn test_error_reply_pretty() {
        let out = reply(&parse(&error_frame(2, 1)), OutputFormat::Pretty);
        assert!(out.contains("seq=2"));
        assert!(out.contains("errno=1"));
    }

    #[test]
    fn test_signal_info_json() {
        let reply = parse(&signal_info_frame(3, 0, 455, "unconfined"));
        let value = reply_json(&reply);
        assert_eq!(value["payload"]["signal_info"]["pid"], 455);
        assert_eq!(value["payload"]["signal_info"]["context"], "unconfined");
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("pretty"), OutputFormat::Pretty);
        assert_eq!(OutputFormat::parse("anything"), OutputFormat::Pretty);
    }
}
