//! Error taxonomy for the dashboard core.
//!
//! Two classes of failure exist:
//!
//! - **User-recoverable**: [`InvalidInput`](DashboardError::InvalidInput),
//!   [`ServiceError`](DashboardError::ServiceError) and
//!   [`TransportError`](DashboardError::TransportError). These are shown to
//!   the user as a blocking notification and abort the current flow.
//! - **Defects**: [`MalformedSnapshot`](DashboardError::MalformedSnapshot)
//!   and [`MissingRenderTarget`](DashboardError::MissingRenderTarget). The
//!   service or the surrounding UI broke its contract; these are logged and
//!   escalated, never swallowed.
//!
//! Nothing is retried automatically.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DashboardError {
    /// Local validation failure. Never reaches the network.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The service answered with an explicit error payload.
    #[error("{0}")]
    ServiceError(String),

    /// The request failed outright (connection, timeout, undecodable body).
    #[error("request failed: {0}")]
    TransportError(String),

    /// The stats payload violates the data contract.
    #[error("malformed stats snapshot: {0}")]
    MalformedSnapshot(String),

    /// No chart slot with this id exists in the surrounding UI.
    #[error("no render target for chart slot '{0}'")]
    MissingRenderTarget(String),
}

impl DashboardError {
    /// `true` for contract violations that indicate a bug rather than a
    /// condition the user can act on.
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            Self::MalformedSnapshot(_) | Self::MissingRenderTarget(_)
        )
    }

    /// Short machine-friendly tag used in the event log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::ServiceError(_) => "service_error",
            Self::TransportError(_) => "transport_error",
            Self::MalformedSnapshot(_) | Self::MissingRenderTarget(_) => "defect",
        }
    }
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, DashboardError>;
