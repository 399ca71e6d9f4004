//! Structured errors raised by the tool layer itself.
//!
//! Manager and storage failures use `offcache_core::Error`; these cover
//! malformed tool arguments and output encoding.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., no purge action requested).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The message payload is not a known worker message.
    #[error("INVALID_MESSAGE: {0}")]
    InvalidMessage(String),

    /// Tool output could not be encoded.
    #[error("SERIALIZE_FAILED: {0}")]
    Serialize(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidInput(_) | ToolError::InvalidMessage(_) => -32602,
            ToolError::Serialize(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
