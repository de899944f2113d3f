use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ConstraintOperator — the five comparison operators the vocabulary admits
// ---------------------------------------------------------------------------

/// Comparison operator in a numeric constraint. Exhaustive; a new operator
/// in the vocabulary forces compile-time review of every match site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintOperator {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

impl ConstraintOperator {
    /// Parse the surface form used by the ontology vocabulary.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            ">" => Some(ConstraintOperator::Gt),
            ">=" => Some(ConstraintOperator::Ge),
            "<" => Some(ConstraintOperator::Lt),
            "<=" => Some(ConstraintOperator::Le),
            "==" => Some(ConstraintOperator::Eq),
            _ => None,
        }
    }

    /// Evaluate `value <op> threshold`.
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            ConstraintOperator::Gt => value > threshold,
            ConstraintOperator::Ge => value >= threshold,
            ConstraintOperator::Lt => value < threshold,
            ConstraintOperator::Le => value <= threshold,
            ConstraintOperator::Eq => value == threshold,
        }
    }
}

impl fmt::Display for ConstraintOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConstraintOperator::Gt => ">",
            ConstraintOperator::Ge => ">=",
            ConstraintOperator::Lt => "<",
            ConstraintOperator::Le => "<=",
            ConstraintOperator::Eq => "==",
        };
        write!(f, "{}", s)
    }
}

// ---------------------------------------------------------------------------
// Constraint / ActionDefinition / EntityClass — compiled rule records
// ---------------------------------------------------------------------------

/// A numeric threshold rule gating an action. Enforced only when the
/// request context carries a value for `property`; absence means the
/// constraint is skipped, not violated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub property: String,
    pub operator: ConstraintOperator,
    pub threshold: f64,
    /// Roles exempt from this specific constraint, as declared.
    pub override_roles: Vec<String>,
}

/// The compiled rule record for one action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// Name as declared in the ontology, e.g. `DeleteUser`.
    pub name: String,
    /// Case/whitespace-normalized identity, e.g. `deleteuser`.
    pub normalized: String,
    /// Human-readable surface form, e.g. `delete user`.
    pub display_name: String,
    /// Entity class this action targets.
    pub target_entity: String,
    /// Roles allowed to perform the action, as declared. Empty = any role.
    pub required_roles: Vec<String>,
    /// Constraints in fact-base declaration order.
    pub constraints: Vec<Constraint>,
}

/// An entity class with at most one level of parent hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityClass {
    pub name: String,
    pub parent: Option<String>,
}

// ---------------------------------------------------------------------------
// ContextValue / RequestContext — the caller-supplied attribute map
// ---------------------------------------------------------------------------

/// A typed context value. Deserialization is untagged over the JSON-native
/// variants; timestamps arriving over the wire land as strings and the
/// `Timestamp` variant is for programmatic construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Bool(bool),
    Number(f64),
    String(String),
    Timestamp(DateTime<Utc>),
}

impl ContextValue {
    /// Numeric view of the value, parsing numeric strings. Anything that
    /// does not yield a number is not evaluable against a constraint.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ContextValue::Number(n) => Some(*n),
            ContextValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<bool> for ContextValue {
    fn from(v: bool) -> Self {
        ContextValue::Bool(v)
    }
}

impl From<f64> for ContextValue {
    fn from(v: f64) -> Self {
        ContextValue::Number(v)
    }
}

impl From<i64> for ContextValue {
    fn from(v: i64) -> Self {
        ContextValue::Number(v as f64)
    }
}

impl From<&str> for ContextValue {
    fn from(v: &str) -> Self {
        ContextValue::String(v.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(v: String) -> Self {
        ContextValue::String(v)
    }
}

impl From<DateTime<Utc>> for ContextValue {
    fn from(v: DateTime<Utc>) -> Self {
        ContextValue::Timestamp(v)
    }
}

/// The caller-supplied attribute map for one request: a well-known `role`
/// key plus an open extension map keyed by constraint-property names.
/// Role and attribute values arrive fully resolved; the engine performs no
/// identity or session management.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub attributes: HashMap<String, ContextValue>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            attributes: HashMap::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.attributes.get(key)
    }
}

// ---------------------------------------------------------------------------
// DenyCode — machine-readable denial codes carried in metadata.error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyCode {
    UnknownAction,
    EntityMismatch,
    InsufficientPermissions,
    ConstraintViolation,
    ConfigurationError,
}

impl DenyCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyCode::UnknownAction => "unknown_action",
            DenyCode::EntityMismatch => "entity_mismatch",
            DenyCode::InsufficientPermissions => "insufficient_permissions",
            DenyCode::ConstraintViolation => "constraint_violation",
            DenyCode::ConfigurationError => "configuration_error",
        }
    }
}

impl fmt::Display for DenyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ValidationResult — the structured allow/deny decision
// ---------------------------------------------------------------------------

/// The decision for one `validate` call. Denials are ordinary values, never
/// errors; `metadata.error` carries the machine-readable code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub allowed: bool,
    pub reason: String,
    pub suggested_actions: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ValidationResult {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: "action permitted".to_string(),
            suggested_actions: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn denied(code: DenyCode, reason: impl Into<String>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(
            "error".to_string(),
            serde_json::Value::String(code.as_str().to_string()),
        );
        Self {
            allowed: false,
            reason: reason.into(),
            suggested_actions: Vec::new(),
            metadata,
        }
    }

    /// Record the requested entity id for traceability. The id identifies
    /// the resource and is never a policy input.
    pub fn with_entity_id(mut self, entity_id: &str) -> Self {
        self.metadata.insert(
            "entity_id".to_string(),
            serde_json::Value::String(entity_id.to_string()),
        );
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggested_actions = suggestions;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// The denial code, if this is a denial produced by the engine.
    pub fn error_code(&self) -> Option<&str> {
        self.metadata.get("error").and_then(|v| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// Facade result records
// ---------------------------------------------------------------------------

/// Result of `allowed_actions`: every action the context is permitted to
/// perform on the entity, in fact-base declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowedActions {
    pub entity: String,
    pub allowed_actions: Vec<String>,
    pub count: usize,
}

/// Result of `check_permissions`: a coarse, constraint-blind role probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionCheck {
    pub has_permission: bool,
    pub required_roles: Vec<String>,
    pub reason: String,
}

/// One constraint, summarized for `explain_rule`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintSummary {
    pub property: String,
    pub operator: String,
    pub threshold: f64,
    pub override_roles: Vec<String>,
}

impl From<&Constraint> for ConstraintSummary {
    fn from(c: &Constraint) -> Self {
        Self {
            property: c.property.clone(),
            operator: c.operator.to_string(),
            threshold: c.threshold,
            override_roles: c.override_roles.clone(),
        }
    }
}

/// Result of `explain_rule`. An absent rule yields `found = false` with a
/// generic explanation, never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleExplanation {
    pub rule_name: String,
    pub explanation: String,
    pub constraints: Vec<ConstraintSummary>,
    pub applies_to: Vec<String>,
    pub found: bool,
}
