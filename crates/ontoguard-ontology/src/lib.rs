//! OntoGuard Fact-Base Loader
//!
//! Parses a versioned ontology document into an in-memory, insertion-ordered
//! set of (subject, predicate, object) statements. The document format is a
//! deliberate Turtle subset over a small closed predicate vocabulary; there
//! is no general RDF machinery here and none is wanted. Loading is
//! all-or-nothing: a fact base either parses completely or the loader
//! reports exactly what was wrong.

pub mod error;
pub mod parser;
pub mod statement;

pub use error::{OntologyError, OntologyResult};
pub use statement::{local_name, vocab, FactBase, Literal, Statement, Term};
