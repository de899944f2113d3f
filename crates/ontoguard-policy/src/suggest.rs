//! Alternative-action suggestions attached to denials: the actions the
//! caller *could* perform on the same entity with the context they sent.

use crate::evaluator::{check_constraint, role_allowed, ConstraintOutcome};
use crate::index::CompiledIndex;
use crate::types::RequestContext;

/// Display names of every action on `entity` the context would be allowed
/// to perform, in fact-base declaration order. Optimistic about missing
/// context fields: a constraint the context cannot evaluate does not
/// disqualify a suggestion. `excluding` drops the action just denied by
/// its normalized name; pass `""` to exclude nothing.
pub fn suggest(
    index: &CompiledIndex,
    entity: &str,
    context: &RequestContext,
    excluding: &str,
) -> Vec<String> {
    let role = context.role.as_deref();
    let mut out = Vec::new();
    for normalized in index.actions_for_entity(entity) {
        if normalized == excluding {
            continue;
        }
        let def = match index.action(normalized) {
            Some(def) => def,
            None => continue,
        };
        if !role_allowed(def, role) {
            continue;
        }
        let blocked = def.constraints.iter().any(|c| {
            matches!(
                check_constraint(c, context, role),
                ConstraintOutcome::Violated { .. }
            )
        });
        if !blocked {
            out.push(def.display_name.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontoguard_ontology::FactBase;

    const ORDERS: &str = r#"
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix og: <http://ontoguard.dev/policy#> .

og:Order a rdfs:Class .

og:ViewOrder a og:Action ;
    og:targetEntity og:Order .

og:CancelOrder a og:Action ;
    og:targetEntity og:Order ;
    og:requiresRole "Admin" .

og:DiscountOrder a og:Action ;
    og:targetEntity og:Order ;
    og:hasConstraint og:DiscountCap .

og:DiscountCap og:constraintProperty "discount_pct" ;
    og:constraintOperator "<=" ;
    og:constraintThreshold 20 ;
    og:overrideRole "Manager" .
"#;

    fn make_index() -> CompiledIndex {
        CompiledIndex::build(&FactBase::parse(ORDERS).unwrap()).unwrap()
    }

    #[test]
    fn test_suggestions_respect_role_gate() {
        let index = make_index();
        let ctx = RequestContext::with_role("Customer");
        assert_eq!(
            suggest(&index, "Order", &ctx, ""),
            vec!["view order", "discount order"]
        );
        let ctx = RequestContext::with_role("Admin");
        assert_eq!(
            suggest(&index, "Order", &ctx, ""),
            vec!["view order", "cancel order", "discount order"]
        );
    }

    #[test]
    fn test_missing_constraint_field_is_optimistic() {
        let index = make_index();
        let ctx = RequestContext::with_role("Customer");
        assert!(suggest(&index, "Order", &ctx, "").contains(&"discount order".to_string()));
    }

    #[test]
    fn test_violating_constraint_field_disqualifies() {
        let index = make_index();
        let ctx = RequestContext::with_role("Customer").attr("discount_pct", 50.0);
        assert_eq!(suggest(&index, "Order", &ctx, ""), vec!["view order"]);
    }

    #[test]
    fn test_override_role_keeps_suggestion() {
        let index = make_index();
        let ctx = RequestContext::with_role("Manager").attr("discount_pct", 50.0);
        assert!(suggest(&index, "Order", &ctx, "").contains(&"discount order".to_string()));
    }

    #[test]
    fn test_excluding_drops_denied_action() {
        let index = make_index();
        let ctx = RequestContext::with_role("Customer");
        let out = suggest(&index, "Order", &ctx, "vieworder");
        assert!(!out.contains(&"view order".to_string()));
        assert!(out.contains(&"discount order".to_string()));
    }

    #[test]
    fn test_unreachable_action_never_suggested() {
        let doc = "@prefix og: <http://ontoguard.dev/policy#> .\n\
                   og:Ship a og:Action ;\n    og:targetEntity og:Shipment .";
        let index = CompiledIndex::build(&FactBase::parse(doc).unwrap()).unwrap();
        // The evaluator denies "ship" (unknown target class), so suggesting
        // it would disagree with validation.
        assert!(suggest(&index, "Shipment", &RequestContext::new(), "").is_empty());
    }

    #[test]
    fn test_unknown_entity_yields_nothing() {
        let index = make_index();
        let ctx = RequestContext::with_role("Admin");
        assert!(suggest(&index, "Warehouse", &ctx, "").is_empty());
    }

    #[test]
    fn test_roleless_context_sees_ungated_actions() {
        let index = make_index();
        let ctx = RequestContext::new();
        assert_eq!(
            suggest(&index, "Order", &ctx, ""),
            vec!["view order", "discount order"]
        );
    }
}
