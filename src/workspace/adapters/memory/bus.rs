//! Recording message bus.

use crate::workspace::{
    domain::LifecycleIntent,
    ports::{BusError, BusResult, MessageBus},
};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

fn lock_error(err: impl ToString) -> BusError {
    BusError::unavailable(std::io::Error::other(err.to_string()))
}

/// Bus that records every published message.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageBus {
    state: Arc<RwLock<BusState>>,
}

#[derive(Debug, Default)]
struct BusState {
    published: Vec<(String, serde_json::Value)>,
    unavailable: bool,
}

impl InMemoryMessageBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes publishing fail until reset.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Unavailable`] when the state lock is poisoned.
    pub fn set_unavailable(&self, unavailable: bool) -> BusResult<()> {
        self.state.write().map_err(lock_error)?.unavailable = unavailable;
        Ok(())
    }

    /// Returns every published message decoded as a lifecycle intent.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Unavailable`] when the state lock is poisoned or a
    /// message does not decode.
    pub fn published(&self) -> BusResult<Vec<LifecycleIntent>> {
        let state = self.state.read().map_err(lock_error)?;
        state
            .published
            .iter()
            .map(|(subject, payload)| {
                LifecycleIntent::from_payload(subject, payload.clone())
                    .map_err(BusError::unavailable)
            })
            .collect()
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn publish(&self, subject: &str, payload: &serde_json::Value) -> BusResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.unavailable {
            return Err(BusError::unavailable(std::io::Error::other(
                "bus rejected the message",
            )));
        }
        state.published.push((subject.to_owned(), payload.clone()));
        Ok(())
    }
}
