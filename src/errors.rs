//! Error taxonomy for the publishing pipeline.
//!
//! One tagged enum instead of a subtype per backend: callers match on the
//! kind first ([`PipelineError::LostConnection`] vs.
//! [`PipelineError::FailedHealthCheck`]) and the [`Backend`] second.

use thiserror::Error;

/// Backend a connection-level failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Cassandra,
    Solr,
    RabbitMq,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Backend::Cassandra => "cassandra",
            Backend::Solr => "solr",
            Backend::RabbitMq => "rabbitmq",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the metadata publishing pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A pipeline component could not be assembled (bad configuration,
    /// failed collection provisioning).
    #[error("failed to build pipeline: {0}")]
    PipelineBuilding(String),

    /// A pipeline component failed while running.
    #[error("pipeline failure: {0}")]
    PipelineRunning(String),

    /// Processing a single tile failed; fatal for that tile only.
    #[error("tile processing failed: {0}")]
    TileProcessing(String),

    /// The transport-level connection to a backend was lost, as opposed to a
    /// single failed request.
    #[error("lost connection to {backend}: {message}")]
    LostConnection { backend: Backend, message: String },

    /// A liveness probe could not reach the backend at all. A reachable but
    /// unhealthy backend is reported as `Ok(false)` by health checks, not as
    /// this error.
    #[error("{backend} failed health check: {message}")]
    FailedHealthCheck { backend: Backend, message: String },
}

impl PipelineError {
    pub fn lost_connection(backend: Backend, message: impl Into<String>) -> Self {
        Self::LostConnection {
            backend,
            message: message.into(),
        }
    }

    pub fn failed_health_check(backend: Backend, message: impl Into<String>) -> Self {
        Self::FailedHealthCheck {
            backend,
            message: message.into(),
        }
    }
}
