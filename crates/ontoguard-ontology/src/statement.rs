use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{OntologyError, OntologyResult};
use crate::parser;

// ---------------------------------------------------------------------------
// Vocabulary — the closed set of predicates and classes the engine recognizes
// ---------------------------------------------------------------------------

/// The recognized vocabulary. Anything layered on top of these terms is
/// opaque data to the loader; the policy crate decides what shape is valid.
pub mod vocab {
    pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const RDFS_CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
    pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";

    /// Custom predicate namespace for policy terms.
    pub const OG_NS: &str = "http://ontoguard.dev/policy#";

    pub const OG_ACTION: &str = "http://ontoguard.dev/policy#Action";
    pub const OG_TARGET_ENTITY: &str = "http://ontoguard.dev/policy#targetEntity";
    pub const OG_REQUIRES_ROLE: &str = "http://ontoguard.dev/policy#requiresRole";
    pub const OG_HAS_CONSTRAINT: &str = "http://ontoguard.dev/policy#hasConstraint";
    pub const OG_CONSTRAINT_PROPERTY: &str = "http://ontoguard.dev/policy#constraintProperty";
    pub const OG_CONSTRAINT_OPERATOR: &str = "http://ontoguard.dev/policy#constraintOperator";
    pub const OG_CONSTRAINT_THRESHOLD: &str = "http://ontoguard.dev/policy#constraintThreshold";
    pub const OG_OVERRIDE_ROLE: &str = "http://ontoguard.dev/policy#overrideRole";
    pub const OG_SCHEMA_VERSION: &str = "http://ontoguard.dev/policy#schemaVersion";

    /// The only document schema version this loader understands.
    pub const SUPPORTED_SCHEMA_VERSION: f64 = 1.0;
}

// ---------------------------------------------------------------------------
// Term / Literal — the object position of a statement
// ---------------------------------------------------------------------------

/// A literal value in the object position of a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// The object of a statement: either a named node or a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    Iri(String),
    Literal(Literal),
}

impl Term {
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            Term::Literal(_) => None,
        }
    }

    pub fn as_str_literal(&self) -> Option<&str> {
        match self {
            Term::Literal(Literal::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Term::Literal(Literal::Number(n)) => Some(*n),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Statement — one (subject, predicate, object) triple
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub subject: String,
    pub predicate: String,
    pub object: Term,
}

/// Strip the namespace from an IRI, leaving the local name.
/// `http://ontoguard.dev/policy#DeleteUser` becomes `DeleteUser`.
pub fn local_name(iri: &str) -> &str {
    match iri.rfind(['#', '/']) {
        Some(idx) => &iri[idx + 1..],
        None => iri,
    }
}

// ---------------------------------------------------------------------------
// FactBase — insertion-ordered statement multiset with lookup helpers
// ---------------------------------------------------------------------------

/// The parsed fact base. Statement order is the document's declaration
/// order; the rule index relies on it for deterministic suggestion ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactBase {
    statements: Vec<Statement>,
}

impl FactBase {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    /// Load a fact base from a file on disk.
    ///
    /// `NotFound` if the path does not exist, `Malformed` if the document
    /// does not parse. Never returns a partial fact base.
    pub fn load(path: &Path) -> OntologyResult<Self> {
        if !path.exists() {
            return Err(OntologyError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a fact base from an in-memory document.
    pub fn parse(document: &str) -> OntologyResult<Self> {
        let statements = parser::parse_document(document)?;
        let fact_base = Self::new(statements);
        fact_base.check_schema_version()?;
        Ok(fact_base)
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// All objects for a given (subject, predicate) pair, in declaration
    /// order. The returned terms borrow only from `self`; the lookup keys
    /// need not outlive the iterator.
    pub fn objects<'a>(&'a self, subject: &str, predicate: &str) -> impl Iterator<Item = &'a Term> + 'a {
        let subject = subject.to_owned();
        let predicate = predicate.to_owned();
        self.statements
            .iter()
            .filter(move |s| s.subject == subject && s.predicate == predicate)
            .map(|s| &s.object)
    }

    /// The first object for a (subject, predicate) pair, if any.
    pub fn object(&self, subject: &str, predicate: &str) -> Option<&Term> {
        self.objects(subject, predicate).next()
    }

    /// Subjects declared with `rdf:type <class_iri>`, in declaration order,
    /// deduplicated on first occurrence.
    pub fn subjects_of_type(&self, class_iri: &str) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for s in &self.statements {
            if s.predicate == vocab::RDF_TYPE && s.object.as_iri() == Some(class_iri) {
                if seen.insert(s.subject.as_str()) {
                    out.push(s.subject.as_str());
                }
            }
        }
        out
    }

    /// Reject documents that declare a schema version other than the one
    /// this loader understands. A document with no version statement is
    /// treated as version 1.
    fn check_schema_version(&self) -> OntologyResult<()> {
        for s in &self.statements {
            if s.predicate == vocab::OG_SCHEMA_VERSION {
                match s.object.as_number() {
                    Some(v) if v == vocab::SUPPORTED_SCHEMA_VERSION => {}
                    Some(v) => {
                        return Err(OntologyError::malformed(
                            0,
                            format!("unsupported schema version {} (expected 1)", v),
                        ));
                    }
                    None => {
                        return Err(OntologyError::malformed(
                            0,
                            "schemaVersion must be numeric",
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
