//! The decision algorithm: normalizes inputs, walks the required checks in
//! a fixed order, and produces a structured result. Deterministic and
//! side-effect-free given a compiled snapshot.

use crate::index::{normalize, CompiledIndex};
use crate::suggest;
use crate::types::{ActionDefinition, Constraint, DenyCode, RequestContext, ValidationResult};

/// Outcome of checking one constraint against the request context.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintOutcome {
    /// Constraint holds, or the role overrides it.
    Pass,
    /// The context carries no value for the constraint property; the
    /// constraint is not evaluated. Deliberate, documented behavior.
    Skipped,
    /// Constraint violated, with the observed numeric value if the field
    /// was numeric at all.
    Violated { observed: Option<f64> },
}

/// Whether the context role satisfies an action's role gate.
/// Empty `required_roles` means any role (including none) passes.
pub fn role_allowed(def: &ActionDefinition, role: Option<&str>) -> bool {
    if def.required_roles.is_empty() {
        return true;
    }
    match role {
        Some(role) => {
            let role = normalize(role);
            def.required_roles.iter().any(|r| normalize(r) == role)
        }
        None => false,
    }
}

/// Check one constraint. Enforced only when the context carries a value
/// for the property; a present but non-numeric value counts as a
/// violation (ambiguous input never resolves toward allow).
pub fn check_constraint(
    constraint: &Constraint,
    context: &RequestContext,
    role: Option<&str>,
) -> ConstraintOutcome {
    let value = match context.get(&constraint.property) {
        Some(value) => value,
        None => return ConstraintOutcome::Skipped,
    };

    let overridden = role.map_or(false, |role| {
        let role = normalize(role);
        constraint.override_roles.iter().any(|r| normalize(r) == role)
    });

    match value.as_number() {
        Some(observed) if constraint.operator.holds(observed, constraint.threshold) => {
            ConstraintOutcome::Pass
        }
        Some(observed) => {
            if overridden {
                ConstraintOutcome::Pass
            } else {
                ConstraintOutcome::Violated {
                    observed: Some(observed),
                }
            }
        }
        None => {
            if overridden {
                ConstraintOutcome::Pass
            } else {
                ConstraintOutcome::Violated { observed: None }
            }
        }
    }
}

/// Evaluate one authorization request against the compiled snapshot.
///
/// Checks run in a fixed order, each short-circuiting on failure:
/// action lookup, entity class match, role gate, constraints in
/// declaration order. `entity_id` identifies the resource for
/// traceability and is never a policy input.
pub fn evaluate(
    index: &CompiledIndex,
    action: &str,
    entity: &str,
    entity_id: &str,
    context: &RequestContext,
) -> ValidationResult {
    let role = context.role.as_deref();

    let def = match index.action(action) {
        Some(def) => def,
        None => {
            return deny(
                index,
                entity,
                entity_id,
                context,
                "",
                DenyCode::UnknownAction,
                format!("action not defined: '{}' is not in the policy ontology", action),
            );
        }
    };

    if index.entity(&def.target_entity).is_none() {
        return deny(
            index,
            entity,
            entity_id,
            context,
            &def.normalized,
            DenyCode::EntityMismatch,
            format!(
                "action '{}' targets unknown entity class '{}'",
                def.display_name, def.target_entity
            ),
        );
    }

    if !index.entity_matches(entity, &def.target_entity) {
        return deny(
            index,
            entity,
            entity_id,
            context,
            &def.normalized,
            DenyCode::EntityMismatch,
            format!(
                "action '{}' applies to entity class '{}', not '{}'",
                def.display_name, def.target_entity, entity
            ),
        );
    }

    if !role_allowed(def, role) {
        let required = def.required_roles.join(", ");
        return deny(
            index,
            entity,
            entity_id,
            context,
            &def.normalized,
            DenyCode::InsufficientPermissions,
            format!(
                "action '{}' requires one of roles [{}], got '{}'",
                def.display_name,
                required,
                role.unwrap_or("<none>")
            ),
        );
    }

    for constraint in &def.constraints {
        match check_constraint(constraint, context, role) {
            ConstraintOutcome::Pass | ConstraintOutcome::Skipped => {}
            ConstraintOutcome::Violated { observed } => {
                let observed_text = match observed {
                    Some(n) => n.to_string(),
                    None => "non-numeric value".to_string(),
                };
                let override_text = if constraint.override_roles.is_empty() {
                    String::new()
                } else {
                    format!(
                        " (roles [{}] may override)",
                        constraint.override_roles.join(", ")
                    )
                };
                let mut result = deny(
                    index,
                    entity,
                    entity_id,
                    context,
                    &def.normalized,
                    DenyCode::ConstraintViolation,
                    format!(
                        "constraint violated: {} = {} fails {} {} {}{}",
                        constraint.property,
                        observed_text,
                        constraint.property,
                        constraint.operator,
                        constraint.threshold,
                        override_text
                    ),
                );
                result = result
                    .with_metadata(
                        "field",
                        serde_json::Value::String(constraint.property.clone()),
                    )
                    .with_metadata(
                        "operator",
                        serde_json::Value::String(constraint.operator.to_string()),
                    )
                    .with_metadata("threshold", serde_json::json!(constraint.threshold));
                if let Some(n) = observed {
                    result = result.with_metadata("observed", serde_json::json!(n));
                }
                return result;
            }
        }
    }

    tracing::debug!(action = %def.display_name, entity, "action permitted");
    ValidationResult::allowed().with_entity_id(entity_id)
}

fn deny(
    index: &CompiledIndex,
    entity: &str,
    entity_id: &str,
    context: &RequestContext,
    excluding: &str,
    code: DenyCode,
    reason: String,
) -> ValidationResult {
    tracing::debug!(entity, code = %code, %reason, "action denied");
    let suggestions = suggest::suggest(index, entity, context, excluding);
    ValidationResult::denied(code, reason)
        .with_entity_id(entity_id)
        .with_suggestions(suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConstraintOperator;
    use ontoguard_ontology::FactBase;

    const ECOMMERCE: &str = r#"
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix og: <http://ontoguard.dev/policy#> .

og:User a rdfs:Class .
og:Order a rdfs:Class .
og:Refund a rdfs:Class .

og:DeleteUser a og:Action ;
    og:targetEntity og:User ;
    og:requiresRole "Admin" .

og:ProcessRefund a og:Action ;
    og:targetEntity og:Refund ;
    og:hasConstraint og:RefundLimit .

og:RefundLimit og:constraintProperty "refund_amount" ;
    og:constraintOperator "<=" ;
    og:constraintThreshold 1000 ;
    og:overrideRole "Manager" .

og:CreateOrder a og:Action ;
    og:targetEntity og:Order .
"#;

    fn make_index() -> CompiledIndex {
        CompiledIndex::build(&FactBase::parse(ECOMMERCE).unwrap()).unwrap()
    }

    #[test]
    fn test_unknown_action_denied() {
        let index = make_index();
        let ctx = RequestContext::with_role("Admin");
        let result = evaluate(&index, "teleport user", "User", "u1", &ctx);
        assert!(!result.allowed);
        assert_eq!(result.error_code(), Some("unknown_action"));
        assert!(result.reason.contains("action not defined"));
    }

    #[test]
    fn test_scenario_a_customer_cannot_delete_user() {
        let index = make_index();
        let ctx = RequestContext::with_role("Customer");
        let result = evaluate(&index, "delete user", "User", "u1", &ctx);
        assert!(!result.allowed);
        assert_eq!(result.error_code(), Some("insufficient_permissions"));
        assert!(result.reason.contains("Admin"));
    }

    #[test]
    fn test_scenario_b_admin_can_delete_user() {
        let index = make_index();
        let ctx = RequestContext::with_role("Admin");
        let result = evaluate(&index, "delete user", "User", "u1", &ctx);
        assert!(result.allowed, "unexpected denial: {}", result.reason);
        assert!(result.suggested_actions.is_empty());
    }

    #[test]
    fn test_scenario_c_refund_under_threshold_allowed() {
        let index = make_index();
        let ctx = RequestContext::with_role("Customer").attr("refund_amount", 500.0);
        let result = evaluate(&index, "process refund", "Refund", "r1", &ctx);
        assert!(result.allowed, "unexpected denial: {}", result.reason);
    }

    #[test]
    fn test_scenario_d_refund_over_threshold_denied() {
        let index = make_index();
        let ctx = RequestContext::with_role("Customer").attr("refund_amount", 2000.0);
        let result = evaluate(&index, "process refund", "Refund", "r1", &ctx);
        assert!(!result.allowed);
        assert_eq!(result.error_code(), Some("constraint_violation"));
        assert!(result.reason.contains("1000"));
        assert!(result.reason.contains("Manager"));
        assert_eq!(result.metadata["threshold"], serde_json::json!(1000.0));
    }

    #[test]
    fn test_scenario_e_manager_overrides_threshold() {
        let index = make_index();
        let ctx = RequestContext::with_role("Manager").attr("refund_amount", 2000.0);
        let result = evaluate(&index, "process refund", "Refund", "r1", &ctx);
        assert!(result.allowed, "unexpected denial: {}", result.reason);
    }

    #[test]
    fn test_entity_mismatch_denied() {
        let index = make_index();
        let ctx = RequestContext::with_role("Admin");
        let result = evaluate(&index, "delete user", "Order", "o1", &ctx);
        assert!(!result.allowed);
        assert_eq!(result.error_code(), Some("entity_mismatch"));
        assert!(result.reason.contains("'User'"));
    }

    #[test]
    fn test_unknown_target_entity_class_denied_not_crash() {
        let doc = "@prefix og: <http://ontoguard.dev/policy#> .\n\
                   og:Ship a og:Action ;\n    og:targetEntity og:Shipment .";
        let index = CompiledIndex::build(&FactBase::parse(doc).unwrap()).unwrap();
        let result = evaluate(&index, "ship", "Shipment", "s1", &RequestContext::new());
        assert!(!result.allowed);
        assert_eq!(result.error_code(), Some("entity_mismatch"));
        assert!(result.reason.contains("unknown entity class"));
        // The unreachable action must not come back as a suggestion.
        assert!(result.suggested_actions.is_empty());
    }

    #[test]
    fn test_no_role_restriction_allows_any_role() {
        let index = make_index();
        for role in ["Customer", "Admin", "Guest"] {
            let result = evaluate(
                &index,
                "create order",
                "Order",
                "o1",
                &RequestContext::with_role(role),
            );
            assert!(result.allowed, "role {} denied: {}", role, result.reason);
        }
        // Even a roleless context passes an unrestricted action.
        let result = evaluate(&index, "create order", "Order", "o1", &RequestContext::new());
        assert!(result.allowed);
    }

    #[test]
    fn test_missing_role_fails_role_gated_action() {
        let index = make_index();
        let result = evaluate(&index, "delete user", "User", "u1", &RequestContext::new());
        assert!(!result.allowed);
        assert_eq!(result.error_code(), Some("insufficient_permissions"));
    }

    #[test]
    fn test_constraint_skipped_when_field_absent() {
        // Pinned behavior: a constraint whose context field is absent is
        // not enforced. See the decision record before changing this.
        let index = make_index();
        let ctx = RequestContext::with_role("Customer");
        let result = evaluate(&index, "process refund", "Refund", "r1", &ctx);
        assert!(result.allowed, "unexpected denial: {}", result.reason);
    }

    #[test]
    fn test_non_numeric_constraint_field_denied() {
        let index = make_index();
        let ctx = RequestContext::with_role("Customer").attr("refund_amount", "a lot");
        let result = evaluate(&index, "process refund", "Refund", "r1", &ctx);
        assert!(!result.allowed);
        assert_eq!(result.error_code(), Some("constraint_violation"));
        assert!(result.reason.contains("non-numeric"));
    }

    #[test]
    fn test_numeric_string_constraint_field_evaluated() {
        let index = make_index();
        let ctx = RequestContext::with_role("Customer").attr("refund_amount", "500");
        let result = evaluate(&index, "process refund", "Refund", "r1", &ctx);
        assert!(result.allowed);
    }

    #[test]
    fn test_role_comparison_is_normalized() {
        let index = make_index();
        let ctx = RequestContext::with_role("admin");
        let result = evaluate(&index, "delete user", "User", "u1", &ctx);
        assert!(result.allowed);
    }

    #[test]
    fn test_denial_carries_entity_id_and_suggestions() {
        let index = make_index();
        let ctx = RequestContext::with_role("Customer");
        let result = evaluate(&index, "delete user", "User", "user_123", &ctx);
        assert_eq!(result.metadata["entity_id"], "user_123");
        // No other actions target User, so no suggestions here.
        assert!(result.suggested_actions.is_empty());
    }

    #[test]
    fn test_idempotence() {
        let index = make_index();
        let ctx = RequestContext::with_role("Customer").attr("refund_amount", 2000.0);
        let a = evaluate(&index, "process refund", "Refund", "r1", &ctx);
        let b = evaluate(&index, "process refund", "Refund", "r1", &ctx);
        assert_eq!(a.allowed, b.allowed);
        assert_eq!(a.reason, b.reason);
        assert_eq!(a.suggested_actions, b.suggested_actions);
    }

    #[test]
    fn test_check_constraint_outcomes() {
        let constraint = Constraint {
            property: "amount".into(),
            operator: ConstraintOperator::Le,
            threshold: 100.0,
            override_roles: vec!["Manager".into()],
        };
        let empty = RequestContext::new();
        assert_eq!(
            check_constraint(&constraint, &empty, None),
            ConstraintOutcome::Skipped
        );

        let under = RequestContext::new().attr("amount", 50.0);
        assert_eq!(
            check_constraint(&constraint, &under, None),
            ConstraintOutcome::Pass
        );

        let over = RequestContext::new().attr("amount", 150.0);
        assert_eq!(
            check_constraint(&constraint, &over, None),
            ConstraintOutcome::Violated {
                observed: Some(150.0)
            }
        );
        assert_eq!(
            check_constraint(&constraint, &over, Some("Manager")),
            ConstraintOutcome::Pass
        );
        assert_eq!(
            check_constraint(&constraint, &over, Some("manager")),
            ConstraintOutcome::Pass
        );
    }
}
