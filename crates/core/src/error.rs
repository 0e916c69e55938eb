use thiserror::Error;

/// Every way an inbound RPC invocation can be rejected.
///
/// All variants reach the remote caller the same way: as a single string
/// prefixed with `"Error: "`. See [`RpcError::to_response`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("Invalid RPC data format")]
    InvalidEnvelope,
    /// Carries the JSON decoder's own message verbatim.
    #[error("{0}")]
    Decode(String),
    #[error("Invalid or missing notification type")]
    MissingType,
    #[error("Unknown notification type")]
    UnknownType,
    #[error("{0}")]
    Internal(String),
    #[error("Unsupported RPC method: {0}")]
    UnsupportedMethod(String),
}

impl RpcError {
    /// Renders the error as the textual RPC result.
    pub fn to_response(&self) -> String {
        format!("Error: {}", self)
    }
}

/// Failures talking to the session actor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session runtime has shut down")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_responses_are_prefixed() {
        assert_eq!(
            RpcError::InvalidEnvelope.to_response(),
            "Error: Invalid RPC data format"
        );
        assert_eq!(
            RpcError::MissingType.to_response(),
            "Error: Invalid or missing notification type"
        );
        assert_eq!(
            RpcError::UnknownType.to_response(),
            "Error: Unknown notification type"
        );
        assert_eq!(
            RpcError::Decode("expected value at line 1 column 1".into()).to_response(),
            "Error: expected value at line 1 column 1"
        );
    }
}
