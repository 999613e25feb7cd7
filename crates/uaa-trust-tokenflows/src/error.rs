//! Token flow error types.

use thiserror::Error;

use crate::params::GrantType;

/// A result type using `TokenFlowError`.
pub type Result<T> = std::result::Result<T, TokenFlowError>;

/// Errors reported by a token service while exchanging a grant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenServiceError {
    /// The token endpoint rejected the request (4xx).
    #[error("token request rejected with status {status}: {message}")]
    Client {
        /// HTTP status code.
        status: u16,
        /// Response body returned by the endpoint.
        message: String,
    },

    /// The token endpoint failed to process the request (5xx).
    #[error("token service failed with status {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body returned by the endpoint.
        message: String,
    },

    /// The request did not reach the endpoint or timed out.
    #[error("token request failed: {0}")]
    Transport(String),

    /// The endpoint answered with something that is not a token response.
    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    /// The endpoint cannot be addressed for the requested tenant.
    #[error("invalid token endpoint: {0}")]
    InvalidEndpoint(String),
}

impl TokenServiceError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Transport(_))
    }
}

/// Errors returned by token flows.
#[derive(Debug, Error)]
pub enum TokenFlowError {
    /// The flow or its collaborators are misconfigured.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The flow is missing an input or its input cannot be exchanged.
    ///
    /// Raised before any request is sent.
    #[error("{0}")]
    State(String),

    /// The grant request failed.
    #[error("Error requesting token with grant_type '{grant_type}': {source}")]
    Request {
        /// Grant the flow was executing.
        grant_type: GrantType,
        /// Underlying token service failure.
        #[source]
        source: TokenServiceError,
    },
}

impl TokenFlowError {
    /// Whether the underlying failure is transient.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Request { source, .. } => source.is_transient(),
            Self::Configuration(_) | Self::State(_) => false,
        }
    }

    /// The grant type of a failed request, if the failure came from one.
    #[must_use]
    pub const fn grant_type(&self) -> Option<GrantType> {
        match self {
            Self::Request { grant_type, .. } => Some(*grant_type),
            Self::Configuration(_) | Self::State(_) => None,
        }
    }
}

impl From<uaa_trust_core::CoreError> for TokenFlowError {
    fn from(err: uaa_trust_core::CoreError) -> Self {
        Self::Configuration(err.to_string())
    }
}
