//! Identifier minting port.

/// Mints 64-bit row identifiers.
///
/// Identifiers from one generator are unique and increase monotonically.
pub trait IdGenerator: Send + Sync {
    /// Returns the next identifier.
    fn next_id(&self) -> i64;
}
