//! Per-tier resource ceilings for workspace containers.
//!
//! A pure mapping from `(tier, requested)` to the granted resources, with an
//! [`OverAllocated`] record and explanation whenever anything was clamped.
//! The policy never fails; over-sized requests are always clamped down.

mod policy;
mod tier;

pub use policy::{OverAllocated, PolicyDecision, ResourceSpec, apply_resource_policy};
pub use tier::{ParseUserTierError, ResourceCeilings, UserTier};
