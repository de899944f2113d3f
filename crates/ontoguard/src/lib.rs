//! OntoGuard root library.
//!
//! Thin orchestration layer over the ontology and policy crates: loads
//! configuration, opens the validator, and provides the plumbing the CLI
//! binary builds on. All decision logic lives in `ontoguard-policy`.

pub mod config;
pub mod error;

pub use config::{OntoGuardConfig, CONFIG_ENV_VAR};
pub use error::{RootError, RootResult};

use ontoguard_policy::{ContextValue, OntologyValidator, RequestContext};
use std::path::PathBuf;
use tracing::info;

/// Open a validator over the configured ontology, loading it eagerly.
pub fn open_validator(config: &OntoGuardConfig) -> RootResult<OntologyValidator> {
    config.validate()?;
    info!(
        ontology = %config.ontology_path.display(),
        "opening policy validator"
    );
    let validator = OntologyValidator::open(&config.ontology_path)?;
    Ok(validator)
}

/// Parse CLI `key=value` context pairs into a request context.
///
/// The `role` key populates the context role; every other pair lands in
/// the attribute map. Values are typed by shape: `true`/`false` become
/// booleans, numeric strings become numbers, anything else stays a string.
pub fn parse_context(role: Option<&str>, pairs: &[String]) -> RootResult<RequestContext> {
    let mut context = match role {
        Some(role) => RequestContext::with_role(role),
        None => RequestContext::new(),
    };
    for pair in pairs {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            RootError::Config(format!("context argument must be key=value, got '{}'", pair))
        })?;
        if key.is_empty() {
            return Err(RootError::Config(format!(
                "context argument has empty key: '{}'",
                pair
            )));
        }
        if key == "role" {
            context.role = Some(value.to_string());
            continue;
        }
        let typed = if value == "true" {
            ContextValue::Bool(true)
        } else if value == "false" {
            ContextValue::Bool(false)
        } else if let Ok(n) = value.parse::<f64>() {
            ContextValue::Number(n)
        } else {
            ContextValue::String(value.to_string())
        };
        context.attributes.insert(key.to_string(), typed);
    }
    Ok(context)
}

/// Resolve the config file path from an explicit flag, the environment,
/// or the default location, in that order.
pub fn resolve_config_path(explicit: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path.clone();
    }
    std::env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| OntoGuardConfig::default_config_path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_context_typed_values() {
        let pairs = vec![
            "refund_amount=500".to_string(),
            "priority=high".to_string(),
            "expedited=true".to_string(),
        ];
        let ctx = parse_context(Some("Customer"), &pairs).unwrap();
        assert_eq!(ctx.role.as_deref(), Some("Customer"));
        assert_eq!(ctx.get("refund_amount").unwrap().as_number(), Some(500.0));
        assert_eq!(
            ctx.get("priority"),
            Some(&ContextValue::String("high".into()))
        );
        assert_eq!(ctx.get("expedited"), Some(&ContextValue::Bool(true)));
    }

    #[test]
    fn test_parse_context_role_pair_overrides_flag() {
        let pairs = vec!["role=Manager".to_string()];
        let ctx = parse_context(Some("Customer"), &pairs).unwrap();
        assert_eq!(ctx.role.as_deref(), Some("Manager"));
    }

    #[test]
    fn test_parse_context_rejects_malformed_pair() {
        assert!(parse_context(None, &["no-equals-sign".to_string()]).is_err());
        assert!(parse_context(None, &["=value".to_string()]).is_err());
    }

    #[test]
    fn test_parse_context_empty_value_is_empty_string() {
        let ctx = parse_context(None, &["note=".to_string()]).unwrap();
        assert_eq!(ctx.get("note"), Some(&ContextValue::String(String::new())));
    }

    #[test]
    fn test_open_validator_rejects_invalid_config() {
        let mut config = OntoGuardConfig::default();
        config.log_level = "loud".into();
        assert!(open_validator(&config).is_err());
    }

    #[test]
    fn test_resolve_config_path_explicit_wins() {
        let explicit = PathBuf::from("/tmp/explicit.toml");
        assert_eq!(resolve_config_path(Some(&explicit)), explicit);
    }
}
