//! Error taxonomy for the server core.
//!
//! Everything in [`DispatchError`] is recoverable: it becomes an error
//! envelope and the read loop moves on. [`ServeError`] ends the loop.

use crate::protocol::ErrorObject;
use thiserror::Error;

/// Invalid JSON was received.
pub const PARSE_ERROR: i32 = -32700;
/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i32 = -32600;
/// The method does not exist.
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Invalid method or tool parameters.
pub const INVALID_PARAMS: i32 = -32602;
/// A tool handler failed.
pub const HANDLER_ERROR: i32 = -32000;
/// No tool is registered under the requested name.
pub const TOOL_NOT_FOUND: i32 = -32001;
/// No resource template matches the requested URI.
pub const RESOURCE_NOT_FOUND: i32 = -32002;

/// Recoverable failure while handling one request.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("parse error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// The handler, or the collaborator it called, failed. `message` holds the
    /// rendered error chain; the full error is only logged.
    #[error("tool '{tool}' failed: {message}")]
    Handler { tool: String, message: String },
}

impl DispatchError {
    /// JSON-RPC error code for this kind.
    pub fn code(&self) -> i32 {
        match self {
            DispatchError::Decode(_) => PARSE_ERROR,
            DispatchError::InvalidRequest(_) => INVALID_REQUEST,
            DispatchError::MethodNotFound(_) => METHOD_NOT_FOUND,
            DispatchError::ToolNotFound(_) => TOOL_NOT_FOUND,
            DispatchError::ResourceNotFound(_) => RESOURCE_NOT_FOUND,
            DispatchError::InvalidParams(_) => INVALID_PARAMS,
            DispatchError::Handler { .. } => HANDLER_ERROR,
        }
    }
}

impl From<DispatchError> for ErrorObject {
    fn from(err: DispatchError) -> Self {
        ErrorObject {
            code: err.code(),
            message: err.to_string(),
            data: None,
        }
    }
}

/// Parameter rejection raised from inside a handler.
///
/// Handlers return `anyhow::Result`; when the error is this type (possibly
/// under added context) the dispatcher reports `InvalidParams` instead of a
/// handler failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidParams(pub String);

impl InvalidParams {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Startup-time registration failure.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("resource template '{0}' is already registered")]
    DuplicateResource(String),

    #[error("invalid uri template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },
}

/// Fatal failure of the serve loop.
#[derive(Error, Debug)]
pub enum ServeError {
    /// Writing a response failed (e.g. broken pipe).
    #[error("failed to write response: {0}")]
    Transport(#[source] std::io::Error),
}
