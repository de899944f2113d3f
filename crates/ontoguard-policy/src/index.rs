//! Rule index builder: compiles the raw statement set into fast lookup
//! structures. Pure with respect to the fact base; shape violations in the
//! custom vocabulary are build-time errors, never deferred to query time.

use std::collections::HashMap;

use ontoguard_ontology::{local_name, vocab, FactBase, Term};

use crate::error::{PolicyError, PolicyResult};
use crate::types::{ActionDefinition, Constraint, ConstraintOperator, EntityClass};

// ---------------------------------------------------------------------------
// Name normalization
// ---------------------------------------------------------------------------

/// Case/whitespace-normalized identity for action and role names, so
/// lookups are robust to surface-form differences: `"Delete User"`,
/// `"delete user"` and `"DeleteUser"` share one identity.
pub fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Human-readable surface form of a declared name: CamelCase becomes
/// space-separated lowercase (`"DeleteUser"` -> `"delete user"`).
pub fn display_name(declared: &str) -> String {
    let mut out = String::with_capacity(declared.len() + 4);
    let mut prev_lower = false;
    for c in declared.trim().chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !out.ends_with(' ') && !out.is_empty() {
                out.push(' ');
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !out.is_empty() {
            out.push(' ');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        out.extend(c.to_lowercase());
    }
    out
}

// ---------------------------------------------------------------------------
// CompiledIndex
// ---------------------------------------------------------------------------

/// The compiled, immutable snapshot the evaluator and suggestion engine
/// read from. Built once per load; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct CompiledIndex {
    actions: HashMap<String, ActionDefinition>,
    entities: HashMap<String, EntityClass>,
    /// Entity class name -> normalized action names, fact-base declaration
    /// order. This order becomes the suggestion order.
    actions_by_entity: HashMap<String, Vec<String>>,
    statement_count: usize,
}

impl CompiledIndex {
    /// Compile a fact base into lookup structures.
    pub fn build(fact_base: &FactBase) -> PolicyResult<Self> {
        let entities = build_entities(fact_base);
        let actions = build_actions(fact_base)?;

        let mut actions_by_entity: HashMap<String, Vec<String>> = HashMap::new();
        for def in actions.values() {
            // An action targeting an undeclared class is unreachable: the
            // evaluator denies it, so it must not be enumerated or
            // suggested either.
            if !entities.contains_key(&def.target_entity) {
                continue;
            }
            actions_by_entity
                .entry(def.target_entity.clone())
                .or_default()
                .push(def.normalized.clone());
        }
        // values() has no defined order; re-sort each group by declaration
        // order, which build_actions records per definition.
        let order: HashMap<&str, usize> = actions
            .values()
            .map(|d| (d.normalized.as_str(), declaration_rank(fact_base, &d.name)))
            .collect();
        for group in actions_by_entity.values_mut() {
            group.sort_by_key(|n| order.get(n.as_str()).copied().unwrap_or(usize::MAX));
        }

        Ok(Self {
            actions,
            entities,
            actions_by_entity,
            statement_count: fact_base.len(),
        })
    }

    /// Look up an action by any surface form of its name.
    pub fn action(&self, name: &str) -> Option<&ActionDefinition> {
        self.actions.get(&normalize(name))
    }

    pub fn entity(&self, name: &str) -> Option<&EntityClass> {
        self.entities.get(name.trim())
    }

    /// Whether `entity` satisfies an action targeting `target`: exact match
    /// or one level of subclass hierarchy. Nothing deeper, by contract.
    pub fn entity_matches(&self, entity: &str, target: &str) -> bool {
        let entity = entity.trim();
        if entity == target {
            return true;
        }
        self.entity(entity)
            .and_then(|e| e.parent.as_deref())
            .map(|parent| parent == target)
            .unwrap_or(false)
    }

    /// Normalized names of every action applicable to `entity`, own class
    /// first then inherited via the one-level parent walk, declaration
    /// order preserved within each group.
    pub fn actions_for_entity(&self, entity: &str) -> Vec<&str> {
        let entity = entity.trim();
        let mut out: Vec<&str> = Vec::new();
        if let Some(own) = self.actions_by_entity.get(entity) {
            out.extend(own.iter().map(String::as_str));
        }
        if let Some(parent) = self.entity(entity).and_then(|e| e.parent.as_deref()) {
            if let Some(inherited) = self.actions_by_entity.get(parent) {
                out.extend(inherited.iter().map(String::as_str));
            }
        }
        out
    }

    /// Entity classes an action applies to: its target plus direct
    /// subclasses of the target.
    pub fn applicable_entities(&self, def: &ActionDefinition) -> Vec<String> {
        let mut out = vec![def.target_entity.clone()];
        for entity in self.entities.values() {
            if entity.parent.as_deref() == Some(def.target_entity.as_str()) {
                out.push(entity.name.clone());
            }
        }
        out.sort();
        out.dedup();
        out
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn statement_count(&self) -> usize {
        self.statement_count
    }
}

fn declaration_rank(fact_base: &FactBase, declared_name: &str) -> usize {
    fact_base
        .statements()
        .iter()
        .position(|s| {
            s.predicate == vocab::RDF_TYPE
                && s.object.as_iri() == Some(vocab::OG_ACTION)
                && local_name(&s.subject) == declared_name
        })
        .unwrap_or(usize::MAX)
}

fn build_entities(fact_base: &FactBase) -> HashMap<String, EntityClass> {
    let mut entities = HashMap::new();
    for subject in fact_base.subjects_of_type(vocab::RDFS_CLASS) {
        let name = local_name(subject).to_string();
        let parent = fact_base
            .object(subject, vocab::RDFS_SUBCLASS_OF)
            .and_then(Term::as_iri)
            .map(|iri| local_name(iri).to_string());
        entities.insert(name.clone(), EntityClass { name, parent });
    }
    entities
}

fn build_actions(fact_base: &FactBase) -> PolicyResult<HashMap<String, ActionDefinition>> {
    let mut actions = HashMap::new();
    for subject in fact_base.subjects_of_type(vocab::OG_ACTION) {
        let declared = local_name(subject).to_string();
        let normalized = normalize(&declared);

        let target_entity = fact_base
            .object(subject, vocab::OG_TARGET_ENTITY)
            .and_then(Term::as_iri)
            .map(|iri| local_name(iri).to_string())
            .ok_or_else(|| {
                PolicyError::Malformed(format!("action '{}' has no targetEntity", declared))
            })?;

        let mut required_roles = Vec::new();
        for term in fact_base.objects(subject, vocab::OG_REQUIRES_ROLE) {
            let role = term.as_str_literal().ok_or_else(|| {
                PolicyError::Malformed(format!(
                    "action '{}': requiresRole must be a string literal",
                    declared
                ))
            })?;
            required_roles.push(role.to_string());
        }

        let mut constraints = Vec::new();
        for term in fact_base.objects(subject, vocab::OG_HAS_CONSTRAINT) {
            let node = term.as_iri().ok_or_else(|| {
                PolicyError::Malformed(format!(
                    "action '{}': hasConstraint must reference a constraint node",
                    declared
                ))
            })?;
            constraints.push(build_constraint(fact_base, &declared, node)?);
        }

        let definition = ActionDefinition {
            display_name: display_name(&declared),
            name: declared.clone(),
            normalized: normalized.clone(),
            target_entity,
            required_roles,
            constraints,
        };

        if actions.insert(normalized, definition).is_some() {
            // Duplicate normalized names would make "last wins" silent
            // policy; fail the load instead.
            return Err(PolicyError::Malformed(format!(
                "duplicate action definition for '{}'",
                declared
            )));
        }
    }
    Ok(actions)
}

fn build_constraint(
    fact_base: &FactBase,
    action: &str,
    node: &str,
) -> PolicyResult<Constraint> {
    let node_name = local_name(node);

    let property = fact_base
        .object(node, vocab::OG_CONSTRAINT_PROPERTY)
        .and_then(Term::as_str_literal)
        .ok_or_else(|| {
            PolicyError::Malformed(format!(
                "constraint '{}' on action '{}' has no constraintProperty",
                node_name, action
            ))
        })?
        .to_string();

    let operator_str = fact_base
        .object(node, vocab::OG_CONSTRAINT_OPERATOR)
        .and_then(Term::as_str_literal)
        .ok_or_else(|| {
            PolicyError::Malformed(format!(
                "constraint '{}' on action '{}' has no constraintOperator",
                node_name, action
            ))
        })?;
    let operator = ConstraintOperator::parse(operator_str).ok_or_else(|| {
        PolicyError::Malformed(format!(
            "constraint '{}' on action '{}': unknown operator '{}'",
            node_name, action, operator_str
        ))
    })?;

    let threshold = fact_base
        .object(node, vocab::OG_CONSTRAINT_THRESHOLD)
        .and_then(Term::as_number)
        .ok_or_else(|| {
            PolicyError::Malformed(format!(
                "constraint '{}' on action '{}' has no numeric constraintThreshold",
                node_name, action
            ))
        })?;

    let override_roles = fact_base
        .objects(node, vocab::OG_OVERRIDE_ROLE)
        .filter_map(Term::as_str_literal)
        .map(str::to_string)
        .collect();

    Ok(Constraint {
        property,
        operator,
        threshold,
        override_roles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ECOMMERCE: &str = r#"
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix og: <http://ontoguard.dev/policy#> .

og:User a rdfs:Class .
og:PremiumUser a rdfs:Class ;
    rdfs:subClassOf og:User .
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

    fn build() -> CompiledIndex {
        let fb = FactBase::parse(ECOMMERCE).unwrap();
        CompiledIndex::build(&fb).unwrap()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Delete User"), "deleteuser");
        assert_eq!(normalize("delete user"), "deleteuser");
        assert_eq!(normalize("DeleteUser"), "deleteuser");
        assert_eq!(normalize("  delete_user  "), "deleteuser");
        assert_eq!(normalize("delete-user"), "deleteuser");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("DeleteUser"), "delete user");
        assert_eq!(display_name("ProcessRefund"), "process refund");
        assert_eq!(display_name("delete user"), "delete user");
        assert_eq!(display_name("delete_user"), "delete user");
        assert_eq!(display_name("X"), "x");
    }

    #[test]
    fn test_action_lookup_any_surface_form() {
        let index = build();
        for name in ["DeleteUser", "delete user", "Delete User", "DELETE USER"] {
            let def = index.action(name).unwrap_or_else(|| panic!("miss: {}", name));
            assert_eq!(def.name, "DeleteUser");
            assert_eq!(def.target_entity, "User");
            assert_eq!(def.required_roles, vec!["Admin"]);
        }
        assert!(index.action("teleport user").is_none());
    }

    #[test]
    fn test_empty_required_roles_means_any() {
        let index = build();
        let def = index.action("create order").unwrap();
        assert!(def.required_roles.is_empty());
    }

    #[test]
    fn test_constraint_compiled() {
        let index = build();
        let def = index.action("process refund").unwrap();
        assert_eq!(def.constraints.len(), 1);
        let c = &def.constraints[0];
        assert_eq!(c.property, "refund_amount");
        assert_eq!(c.operator, ConstraintOperator::Le);
        assert_eq!(c.threshold, 1000.0);
        assert_eq!(c.override_roles, vec!["Manager"]);
    }

    #[test]
    fn test_entity_hierarchy_one_level() {
        let index = build();
        assert!(index.entity_matches("User", "User"));
        assert!(index.entity_matches("PremiumUser", "User"));
        assert!(!index.entity_matches("User", "PremiumUser"));
        assert!(!index.entity_matches("Order", "User"));
        assert!(!index.entity_matches("Unknown", "User"));
    }

    #[test]
    fn test_actions_for_entity_includes_inherited() {
        let index = build();
        assert_eq!(index.actions_for_entity("User"), vec!["deleteuser"]);
        // PremiumUser inherits User's actions through the one-level walk.
        assert_eq!(index.actions_for_entity("PremiumUser"), vec!["deleteuser"]);
        assert_eq!(index.actions_for_entity("Refund"), vec!["processrefund"]);
        assert!(index.actions_for_entity("Unknown").is_empty());
    }

    #[test]
    fn test_undeclared_target_class_not_enumerated() {
        let doc = "@prefix og: <http://ontoguard.dev/policy#> .\n\
                   og:Ship a og:Action ;\n    og:targetEntity og:Shipment .";
        let fb = FactBase::parse(doc).unwrap();
        let index = CompiledIndex::build(&fb).unwrap();
        // The action still resolves by name (the evaluator owns the denial),
        // but it is reachable from no entity class.
        assert!(index.action("ship").is_some());
        assert!(index.actions_for_entity("Shipment").is_empty());
    }

    #[test]
    fn test_applicable_entities() {
        let index = build();
        let def = index.action("delete user").unwrap();
        let mut applies = index.applicable_entities(def);
        applies.sort();
        assert_eq!(applies, vec!["PremiumUser", "User"]);
    }

    #[test]
    fn test_missing_target_entity_fails_build() {
        let doc = "@prefix og: <http://ontoguard.dev/policy#> .\n\
                   og:Orphan a og:Action ;\n    og:requiresRole \"Admin\" .";
        let fb = FactBase::parse(doc).unwrap();
        let err = CompiledIndex::build(&fb).unwrap_err();
        assert!(err.to_string().contains("no targetEntity"));
    }

    #[test]
    fn test_constraint_missing_operator_fails_build() {
        let doc = "@prefix og: <http://ontoguard.dev/policy#> .\n\
                   og:Pay a og:Action ;\n    og:targetEntity og:Order ;\n    og:hasConstraint og:Cap .\n\
                   og:Cap og:constraintProperty \"amount\" ;\n    og:constraintThreshold 10 .";
        let fb = FactBase::parse(doc).unwrap();
        let err = CompiledIndex::build(&fb).unwrap_err();
        assert!(err.to_string().contains("no constraintOperator"));
    }

    #[test]
    fn test_constraint_unknown_operator_fails_build() {
        let doc = "@prefix og: <http://ontoguard.dev/policy#> .\n\
                   og:Pay a og:Action ;\n    og:targetEntity og:Order ;\n    og:hasConstraint og:Cap .\n\
                   og:Cap og:constraintProperty \"amount\" ;\n    og:constraintOperator \"!=\" ;\n    og:constraintThreshold 10 .";
        let fb = FactBase::parse(doc).unwrap();
        let err = CompiledIndex::build(&fb).unwrap_err();
        assert!(err.to_string().contains("unknown operator"));
    }

    #[test]
    fn test_duplicate_action_names_fail_build() {
        let doc = "@prefix og: <http://ontoguard.dev/policy#> .\n\
                   og:DeleteUser a og:Action ;\n    og:targetEntity og:User .\n\
                   og:Delete_User a og:Action ;\n    og:targetEntity og:User .";
        let fb = FactBase::parse(doc).unwrap();
        let err = CompiledIndex::build(&fb).unwrap_err();
        assert!(err.to_string().contains("duplicate action definition"));
    }

    #[test]
    fn test_declaration_order_preserved_per_entity() {
        let doc = "@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n\
                   @prefix og: <http://ontoguard.dev/policy#> .\n\
                   og:Order a rdfs:Class .\n\
                   og:ViewOrder a og:Action ;\n    og:targetEntity og:Order .\n\
                   og:CancelOrder a og:Action ;\n    og:targetEntity og:Order .\n\
                   og:CreateOrder a og:Action ;\n    og:targetEntity og:Order .";
        let fb = FactBase::parse(doc).unwrap();
        let index = CompiledIndex::build(&fb).unwrap();
        assert_eq!(
            index.actions_for_entity("Order"),
            vec!["vieworder", "cancelorder", "createorder"]
        );
    }
}
