use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum StackError {
    #[error("duplicate logical id: {0}")]
    DuplicateLogicalId(String),

    #[error("duplicate {kind} name '{name}' (used by {first} and {second})")]
    DuplicateName {
        kind: String,
        name: String,
        first: String,
        second: String,
    },

    #[error("invalid policy statement: {0}")]
    InvalidStatement(String),

    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),

    #[error("invalid ARN: {0}")]
    InvalidArn(String),

    #[error("invalid automation document: {0}")]
    InvalidDocument(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unresolved reference '{target}' in {source_id}")]
    UnresolvedReference { target: String, source_id: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl From<serde_json::Error> for StackError {
    fn from(err: serde_json::Error) -> Self {
        StackError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for StackError {
    fn from(err: toml::de::Error) -> Self {
        StackError::Config(err.to_string())
    }
}

impl From<std::io::Error> for StackError {
    fn from(err: std::io::Error) -> Self {
        StackError::Config(err.to_string())
    }
}
