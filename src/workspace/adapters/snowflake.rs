//! Time-ordered 64-bit identifier generator.

use crate::workspace::ports::IdGenerator;
use mockable::Clock;
use std::sync::{Mutex, PoisonError};

/// Milliseconds between the unix epoch and 2021-01-01T00:00:00Z.
const EPOCH_MILLIS: i64 = 1_609_459_200_000;
const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const MAX_NODE: u16 = (1 << NODE_BITS) - 1;
const MAX_SEQUENCE: i64 = (1 << SEQUENCE_BITS) - 1;

/// Snowflake-style generator: `timestamp | node | sequence`.
///
/// Identifiers increase monotonically per node. When the sequence is
/// exhausted within one millisecond, or the clock steps backwards, the
/// generator borrows from the next millisecond instead of waiting.
#[derive(Debug)]
pub struct SnowflakeIdGenerator<C>
where
    C: Clock + Send + Sync,
{
    node: i64,
    clock: C,
    last: Mutex<(i64, i64)>,
}

impl<C> SnowflakeIdGenerator<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a generator for `node`; only the low ten bits are used.
    #[must_use]
    pub fn new(node: u16, clock: C) -> Self {
        Self {
            node: i64::from(node & MAX_NODE),
            clock,
            last: Mutex::new((0, -1)),
        }
    }
}

impl<C> IdGenerator for SnowflakeIdGenerator<C>
where
    C: Clock + Send + Sync,
{
    fn next_id(&self) -> i64 {
        let now = (self.clock.utc().timestamp_millis() - EPOCH_MILLIS).max(0);
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let (last_millis, last_sequence) = *last;

        let (millis, sequence) = if now > last_millis {
            (now, 0)
        } else if last_sequence < MAX_SEQUENCE {
            (last_millis, last_sequence + 1)
        } else {
            (last_millis + 1, 0)
        };
        *last = (millis, sequence);

        (millis << (NODE_BITS + SEQUENCE_BITS)) | (self.node << SEQUENCE_BITS) | sequence
    }
}
