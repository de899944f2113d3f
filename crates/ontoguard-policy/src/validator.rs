//! The validation facade: owns the ontology source path and the current
//! compiled snapshot, and exposes the four query operations plus `reload`.
//!
//! Queries never return errors. A missing or failed snapshot degrades each
//! operation to its fail-closed shape: denial-valued `ValidationResult`s
//! with a `configuration_error` code, empty action lists, `found = false`
//! explanations.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use ontoguard_ontology::FactBase;

use crate::error::PolicyResult;
use crate::evaluator::{self, role_allowed};
use crate::index::CompiledIndex;
use crate::suggest;
use crate::types::{
    AllowedActions, ConstraintSummary, DenyCode, PermissionCheck, RequestContext, RuleExplanation,
    ValidationResult,
};

/// Thread-safe policy validator over an ontology file.
///
/// The compiled snapshot is immutable and shared via `Arc`; concurrent
/// queries read whichever snapshot was current when they started.
/// `reload` builds a replacement aside and swaps it in atomically, keeping
/// the old snapshot when the new source fails to compile.
pub struct OntologyValidator {
    source: PathBuf,
    state: RwLock<Option<Arc<CompiledIndex>>>,
}

impl OntologyValidator {
    /// Open a validator and load the ontology eagerly. Fails if the file
    /// is missing or does not compile.
    pub fn open(source: impl Into<PathBuf>) -> PolicyResult<Self> {
        let validator = Self::deferred(source);
        let index = load_snapshot(&validator.source)?;
        *validator.state.write().unwrap_or_else(|e| e.into_inner()) = Some(index);
        Ok(validator)
    }

    /// Open a validator without touching the filesystem. The ontology
    /// loads on first query; until a load succeeds, queries return their
    /// fail-closed shapes.
    pub fn deferred(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            state: RwLock::new(None),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Rebuild the snapshot from the source file and swap it in. On
    /// failure the previous snapshot stays in place and keeps serving.
    pub fn reload(&self) -> PolicyResult<()> {
        let index = load_snapshot(&self.source)?;
        tracing::info!(
            source = %self.source.display(),
            actions = index.action_count(),
            "ontology reloaded"
        );
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = Some(index);
        Ok(())
    }

    /// Current snapshot, loading lazily on the first query. A failed lazy
    /// load leaves the validator unloaded so a later query can retry.
    fn snapshot(&self) -> Option<Arc<CompiledIndex>> {
        if let Some(index) = self
            .state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            return Some(Arc::clone(index));
        }
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        // Another thread may have loaded while we waited for the lock.
        if let Some(index) = guard.as_ref() {
            return Some(Arc::clone(index));
        }
        match load_snapshot(&self.source) {
            Ok(index) => {
                *guard = Some(Arc::clone(&index));
                Some(index)
            }
            Err(err) => {
                tracing::warn!(
                    source = %self.source.display(),
                    error = %err,
                    "ontology load failed"
                );
                None
            }
        }
    }

    /// May the context perform `action` on an instance of `entity`?
    /// `entity_id` is carried through to the result metadata for
    /// traceability only.
    pub fn validate(
        &self,
        action: &str,
        entity: &str,
        entity_id: &str,
        context: &RequestContext,
    ) -> ValidationResult {
        match self.snapshot() {
            Some(index) => evaluator::evaluate(&index, action, entity, entity_id, context),
            None => ValidationResult::denied(
                DenyCode::ConfigurationError,
                "policy ontology is not loaded",
            )
            .with_entity_id(entity_id),
        }
    }

    /// Every action the context is permitted to perform on `entity`, in
    /// declaration order. Optimistic about context fields the constraints
    /// need but the caller did not send.
    pub fn allowed_actions(&self, entity: &str, context: &RequestContext) -> AllowedActions {
        let allowed = match self.snapshot() {
            Some(index) => suggest::suggest(&index, entity, context, ""),
            None => Vec::new(),
        };
        AllowedActions {
            entity: entity.trim().to_string(),
            count: allowed.len(),
            allowed_actions: allowed,
        }
    }

    /// Coarse role probe: does `role` clear the role gate for `action` on
    /// `entity`? Constraint-blind; a `true` here can still be denied by
    /// `validate` once context values are known.
    pub fn check_permissions(
        &self,
        action: &str,
        entity: &str,
        role: Option<&str>,
    ) -> PermissionCheck {
        let index = match self.snapshot() {
            Some(index) => index,
            None => {
                return PermissionCheck {
                    has_permission: false,
                    required_roles: Vec::new(),
                    reason: "policy ontology is not loaded".to_string(),
                }
            }
        };
        let def = match index.action(action) {
            Some(def) => def,
            None => {
                return PermissionCheck {
                    has_permission: false,
                    required_roles: Vec::new(),
                    reason: format!("action not defined: '{}'", action),
                }
            }
        };
        if index.entity(&def.target_entity).is_none() {
            return PermissionCheck {
                has_permission: false,
                required_roles: def.required_roles.clone(),
                reason: format!(
                    "action '{}' targets unknown entity class '{}'",
                    def.display_name, def.target_entity
                ),
            };
        }
        if !index.entity_matches(entity, &def.target_entity) {
            return PermissionCheck {
                has_permission: false,
                required_roles: def.required_roles.clone(),
                reason: format!(
                    "action '{}' applies to entity class '{}', not '{}'",
                    def.display_name, def.target_entity, entity
                ),
            };
        }
        if role_allowed(def, role) {
            PermissionCheck {
                has_permission: true,
                required_roles: def.required_roles.clone(),
                reason: if def.required_roles.is_empty() {
                    format!("action '{}' has no role restriction", def.display_name)
                } else {
                    format!(
                        "role '{}' is permitted to perform '{}'",
                        role.unwrap_or("<none>"),
                        def.display_name
                    )
                },
            }
        } else {
            PermissionCheck {
                has_permission: false,
                required_roles: def.required_roles.clone(),
                reason: format!(
                    "action '{}' requires one of roles [{}], got '{}'",
                    def.display_name,
                    def.required_roles.join(", "),
                    role.unwrap_or("<none>")
                ),
            }
        }
    }

    /// Human-readable explanation of the rule behind an action. A miss
    /// yields `found = false`, never an error.
    pub fn explain_rule(&self, action: &str) -> RuleExplanation {
        let not_found = |explanation: String| RuleExplanation {
            rule_name: action.to_string(),
            explanation,
            constraints: Vec::new(),
            applies_to: Vec::new(),
            found: false,
        };
        let index = match self.snapshot() {
            Some(index) => index,
            None => return not_found("policy ontology is not loaded".to_string()),
        };
        let def = match index.action(action) {
            Some(def) => def,
            None => return not_found(format!("no rule found for action '{}'", action)),
        };

        let mut explanation = format!(
            "action '{}' targets entity class '{}'",
            def.display_name, def.target_entity
        );
        if def.required_roles.is_empty() {
            explanation.push_str("; any role may perform it");
        } else {
            explanation.push_str(&format!(
                "; requires one of roles [{}]",
                def.required_roles.join(", ")
            ));
        }
        for c in &def.constraints {
            explanation.push_str(&format!(
                "; constrained by {} {} {}",
                c.property, c.operator, c.threshold
            ));
            if !c.override_roles.is_empty() {
                explanation.push_str(&format!(
                    " (override: [{}])",
                    c.override_roles.join(", ")
                ));
            }
        }

        RuleExplanation {
            rule_name: def.display_name.clone(),
            explanation,
            constraints: def.constraints.iter().map(ConstraintSummary::from).collect(),
            applies_to: index.applicable_entities(def),
            found: true,
        }
    }
}

fn load_snapshot(source: &Path) -> PolicyResult<Arc<CompiledIndex>> {
    let fact_base = FactBase::load(source)?;
    let index = CompiledIndex::build(&fact_base)?;
    tracing::info!(
        source = %source.display(),
        statements = index.statement_count(),
        actions = index.action_count(),
        "ontology loaded"
    );
    Ok(Arc::new(index))
}
