//! OntoGuard Policy Engine
//!
//! Answers authorization requests of the shape "may role R perform action A
//! on entity E given context C?" against a compiled ontology snapshot,
//! producing explainable allow/deny decisions.
//!
//! Key properties:
//! - Fail-closed: unknown actions, malformed input and unloaded state all
//!   resolve to structured denials, never to implicit allows or panics.
//! - Immutable snapshots: the compiled index never mutates after build;
//!   `reload()` swaps in a complete replacement atomically.
//! - Explainability: every denial names the failed check and carries a
//!   machine-readable error code plus alternative-action suggestions.

pub mod error;
pub mod evaluator;
pub mod index;
pub mod suggest;
pub mod types;
pub mod validator;

pub use error::{PolicyError, PolicyResult};
pub use index::{display_name, normalize, CompiledIndex};
pub use types::{
    ActionDefinition, AllowedActions, Constraint, ConstraintOperator, ConstraintSummary,
    ContextValue, DenyCode, EntityClass, PermissionCheck, RequestContext, RuleExplanation,
    ValidationResult,
};
pub use validator::OntologyValidator;
