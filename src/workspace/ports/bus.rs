//! Message bus port used by the outbox relay.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Publishes lifecycle intents to the follower pool.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publishes `payload` on `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Unavailable`] when the bus rejects the message.
    async fn publish(&self, subject: &str, payload: &serde_json::Value) -> BusResult<()>;
}

/// Errors returned by bus adapters.
#[derive(Debug, Clone, Error)]
pub enum BusError {
    /// The bus could not accept the message.
    #[error("message bus unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl BusError {
    /// Wraps a bus failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
