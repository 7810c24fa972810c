//! Composition error types.

use budget_core::HttpMethod;
use thiserror::Error;

/// Errors that abort stack assembly.
#[derive(Debug, Error)]
pub enum StackError {
    #[error("construct already declared: {0}")]
    DuplicateConstruct(String),

    #[error("construct {construct} depends on undeclared {dependency}")]
    MissingDependency { construct: String, dependency: String },

    #[error("table {0} has an empty partition key")]
    EmptyPartitionKey(String),

    #[error("index {index} declared twice on table {table}")]
    DuplicateIndex { table: String, index: String },

    #[error("{verb} already registered on {path}")]
    DuplicateMethod { path: String, verb: HttpMethod },

    #[error("invalid route path: {0}")]
    InvalidPath(String),

    #[error("{verb} {path} is protected but no authorizer was declared")]
    NoAuthorizer { path: String, verb: HttpMethod },

    #[error("tables {first} and {second} both map to environment variable {var}")]
    DuplicateEnvVar { var: String, first: String, second: String },

    #[error("serialization error: {0}")]
    Serialize(String),
}

pub type StackResult<T> = Result<T, StackError>;
