//! Errors raised while serving a single tool call.

use thiserror::Error;

use crate::client::ClientError;

/// Everything that can stop a tool call. Each variant ends up as the
/// `error` text of a failure envelope.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A JSON-encoded argument could not be parsed or has the wrong shape.
    #[error("Invalid {argument} JSON: {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: String,
    },

    /// A value outside a closed set of allowed values.
    #[error("Invalid {field} '{value}'. Must be one of: {allowed}")]
    InvalidEnum {
        field: &'static str,
        value: String,
        allowed: String,
    },

    /// The list method behind this entity pages through results and cannot
    /// honor a caller-supplied ordering.
    #[error("Ordering is not supported for {entity}; remove the order argument")]
    UnsupportedOrder { entity: &'static str },

    /// A single-record fetch came back empty.
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The remote API or the HTTP layer failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ToolError {
    pub fn invalid_json(argument: &'static str, err: serde_json::Error) -> Self {
        ToolError::InvalidArgument {
            argument,
            reason: err.to_string(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ToolError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
