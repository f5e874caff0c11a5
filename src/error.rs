// src/error.rs

//! Crate-wide error taxonomy.
//!
//! `TransformError` is special: it is caught at the transformer host boundary
//! (see `transform::Host::invoke`) and turned into a logged warning plus a
//! `null` result rather than propagated. Every other variant propagates to
//! the caller.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate name: {0}")]
    DuplicateName(String),

    #[error("invalid name '{0}': identifiers must start with a letter and contain only letters, digits, and underscores")]
    InvalidName(String),

    #[error("invalid datatype '{0}': exactly one of generator or parent must be given")]
    InvalidDatatype(String),

    #[error("cardinality exceeded: {0}")]
    CardinalityExceeded(String),

    #[error("syntax error near '{fragment}': {reason}")]
    SyntaxError { fragment: String, reason: String },

    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("transformer error: {0}")]
    TransformError(String),

    #[error("storage error: {0}")]
    StorageError(#[from] rusqlite::Error),
}
