//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only fill fields that no
//! config file set. Embedded defaults do not count as a file.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources};
use crate::types::ReplyModeSetting;

/// Kind of value a mapped field holds.
#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Text,
    Bool,
    ReplyMode,
}

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: FieldKind,
}

/// All supported `AUDITLINK_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "AUDITLINK_LOG_LEVEL",
        field_path: "logging.level",
        kind: FieldKind::Text,
    },
    EnvMapping {
        var_name: "AUDITLINK_LOG_FORMAT",
        field_path: "logging.format",
        kind: FieldKind::Text,
    },
    EnvMapping {
        var_name: "AUDITLINK_REPLY_MODE",
        field_path: "client.reply_mode",
        kind: FieldKind::ReplyMode,
    },
    EnvMapping {
        var_name: "AUDITLINK_PEEK",
        field_path: "client.peek",
        kind: FieldKind::Bool,
    },
    EnvMapping {
        var_name: "AUDITLINK_WAIT_FOR_ACK",
        field_path: "client.wait_for_ack",
        kind: FieldKind::Bool,
    },
];

/// Apply environment variable fallbacks to fields that were **not** set by
/// a config file.
///
/// Returns the number of env vars applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a variable holds a value its field
/// cannot take.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if matches!(
            sources.get(mapping.field_path),
            Some(ConfigLayer::System | ConfigLayer::User)
        ) {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );

            let value = coerce(mapping, val)?;
            set_field(merged, mapping.field_path, value);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    Ok(count)
}

fn coerce(mapping: &EnvMapping, val: &str) -> ConfigResult<toml::Value> {
    let invalid = |message: String| ConfigError::EnvError {
        var_name: mapping.var_name.to_owned(),
        message,
    };

    match mapping.kind {
        FieldKind::Text => Ok(toml::Value::String(val.to_owned())),
        FieldKind::Bool => val
            .parse::<bool>()
            .map(toml::Value::Boolean)
            .map_err(|_| invalid(format!("expected true or false, got '{val}'"))),
        FieldKind::ReplyMode => match ReplyModeSetting::from_name(val) {
            Some(_) => Ok(toml::Value::String(val.to_owned())),
            None => Err(invalid(format!(
                "expected one of {}, got '{val}'",
                ReplyModeSetting::NAMES.join(", ")
            ))),
        },
    }
}

/// Set a dotted field in the TOML tree, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };

    let mut current = root;
    for segment in parents.into_iter().flat_map(|p| p.split('.')) {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment)
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn empty_tree() -> toml::Value {
        toml::Value::Table(toml::map::Map::new())
    }

    #[test]
    fn test_env_fills_unset_field() {
        let mut merged = empty_tree();
        let mut sources = FieldSources::new();
        let env = make_env(&[("AUDITLINK_LOG_LEVEL", "debug")]);

        let count = apply_env_fallbacks(&mut merged, &mut sources, &env).unwrap();

        assert_eq!(count, 1);
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(
            sources.get("logging.level"),
            Some(&ConfigLayer::Environment)
        );
    }

    #[test]
    fn test_env_replaces_defaults() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"info\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::Defaults);
        let env = make_env(&[("AUDITLINK_LOG_LEVEL", "trace")]);

        apply_env_fallbacks(&mut merged, &mut sources, &env).unwrap();
        assert_eq!(merged["logging"]["level"].as_str(), Some("trace"));
    }

    #[test]
    fn test_env_does_not_override_file() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"warn\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::User);
        let env = make_env(&[("AUDITLINK_LOG_LEVEL", "trace")]);

        let count = apply_env_fallbacks(&mut merged, &mut sources, &env).unwrap();

        assert_eq!(count, 0);
        assert_eq!(merged["logging"]["level"].as_str(), Some("warn"));
    }

    #[test]
    fn test_env_bool_coercion() {
        let mut merged = empty_tree();
        let mut sources = FieldSources::new();
        let env = make_env(&[("AUDITLINK_PEEK", "true"), ("AUDITLINK_WAIT_FOR_ACK", "false")]);

        apply_env_fallbacks(&mut merged, &mut sources, &env).unwrap();

        assert_eq!(merged["client"]["peek"].as_bool(), Some(true));
        assert_eq!(merged["client"]["wait_for_ack"].as_bool(), Some(false));
    }

    #[test]
    fn test_env_invalid_bool() {
        let mut merged = empty_tree();
        let env = make_env(&[("AUDITLINK_PEEK", "yes please")]);

        let err = apply_env_fallbacks(&mut merged, &mut FieldSources::new(), &env).unwrap_err();
        assert!(
            matches!(err, ConfigError::EnvError { ref var_name, .. } if var_name == "AUDITLINK_PEEK")
        );
    }

    #[test]
    fn test_env_reply_mode() {
        let mut merged = empty_tree();
        let env = make_env(&[("AUDITLINK_REPLY_MODE", "nonblocking")]);
        apply_env_fallbacks(&mut merged, &mut FieldSources::new(), &env).unwrap();
        assert_eq!(merged["client"]["reply_mode"].as_str(), Some("nonblocking"));

        let env = make_env(&[("AUDITLINK_REPLY_MODE", "eventually")]);
        let result = apply_env_fallbacks(&mut empty_tree(), &mut FieldSources::new(), &env);
        assert!(matches!(result, Err(ConfigError::EnvError { .. })));
    }

    #[test]
    fn test_unrelated_env_ignored() {
        let mut merged = empty_tree();
        let env = make_env(&[("HOME", "/root"), ("AUDITLINK_UNKNOWN", "1")]);
        let count = apply_env_fallbacks(&mut merged, &mut FieldSources::new(), &env).unwrap();
        assert_eq!(count, 0);
        assert_eq!(merged, empty_tree());
    }
}
