use thiserror::Error;

/// Errors from building or reloading a compiled policy snapshot.
///
/// Only construction-time operations return these. Query operations
/// (`validate`, `allowed_actions`, `check_permissions`, `explain_rule`)
/// never fail: degraded states surface as denial-shaped result values
/// with diagnostic metadata.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("ontology error: {0}")]
    Ontology(#[from] ontoguard_ontology::OntologyError),

    #[error("malformed policy ontology: {0}")]
    Malformed(String),
}

pub type PolicyResult<T> = Result<T, PolicyError>;
