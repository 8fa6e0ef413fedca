//! Clamping of requested workspace resources to tier ceilings.

use super::{ResourceCeilings, UserTier};
use serde::{Deserialize, Serialize};

/// CPU, memory and disk allocation for a workspace container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// CPU cores.
    pub cpu: u32,
    /// Memory in GiB.
    pub mem: u32,
    /// Disk in GiB.
    pub disk: u32,
}

impl ResourceSpec {
    /// Creates a resource specification.
    #[must_use]
    pub const fn new(cpu: u32, mem: u32, disk: u32) -> Self {
        Self { cpu, mem, disk }
    }
}

/// Record attached to a workspace whose request exceeded the tier ceilings.
///
/// Holds the granted values for every dimension after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverAllocated {
    /// Granted CPU cores.
    pub cpu: u32,
    /// Granted memory in GiB.
    pub ram: u32,
    /// Granted disk in GiB.
    pub disk: u32,
}

/// Outcome of applying the resource policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    /// Resources that will be persisted and provisioned.
    pub granted: ResourceSpec,
    /// Present when at least one dimension was clamped.
    pub over_allocated: Option<OverAllocated>,
    /// Human-readable explanation listing the clamped dimensions.
    pub message: Option<String>,
}

/// Clamps `requested` to the ceilings of `tier`.
#[must_use]
pub fn apply_resource_policy(tier: UserTier, requested: ResourceSpec) -> PolicyDecision {
    let ResourceCeilings { cpu, mem, disk } = tier.ceilings();
    let granted = ResourceSpec {
        cpu: requested.cpu.min(cpu),
        mem: requested.mem.min(mem),
        disk: requested.disk.min(disk),
    };

    let mut clamped = Vec::new();
    if granted.cpu < requested.cpu {
        clamped.push(format!("CPUs: {}", granted.cpu));
    }
    if granted.mem < requested.mem {
        clamped.push(format!("RAM: {}", granted.mem));
    }
    if granted.disk < requested.disk {
        clamped.push(format!("DISK: {}", granted.disk));
    }

    if clamped.is_empty() {
        return PolicyDecision {
            granted,
            over_allocated: None,
            message: None,
        };
    }

    PolicyDecision {
        granted,
        over_allocated: Some(OverAllocated {
            cpu: granted.cpu,
            ram: granted.mem,
            disk: granted.disk,
        }),
        message: Some(format!("over-allocated {}", clamped.join(", "))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn request_within_ceilings_is_untouched() {
        let requested = ResourceSpec::new(1, 2, 5);
        let decision = apply_resource_policy(UserTier::Basic, requested);

        assert_eq!(decision.granted, requested);
        assert_eq!(decision.over_allocated, None);
        assert_eq!(decision.message, None);
    }

    #[test]
    fn basic_request_over_every_ceiling_is_clamped() {
        let decision = apply_resource_policy(UserTier::Basic, ResourceSpec::new(8, 16, 200));

        assert_eq!(decision.granted, ResourceSpec::new(2, 3, 15));
        assert_eq!(
            decision.over_allocated,
            Some(OverAllocated {
                cpu: 2,
                ram: 3,
                disk: 15
            })
        );
        assert_eq!(
            decision.message.as_deref(),
            Some("over-allocated CPUs: 2, RAM: 3, DISK: 15")
        );
    }

    #[test]
    fn message_lists_only_clamped_dimensions() {
        let decision = apply_resource_policy(UserTier::Premium, ResourceSpec::new(4, 12, 20));

        assert_eq!(decision.granted, ResourceSpec::new(4, 8, 20));
        assert_eq!(decision.message.as_deref(), Some("over-allocated RAM: 8"));
    }

    #[rstest]
    #[case(UserTier::Basic, ResourceSpec::new(3, 3, 3), ResourceSpec::new(2, 3, 3))]
    #[case(UserTier::Premium, ResourceSpec::new(8, 16, 200), ResourceSpec::new(6, 8, 50))]
    #[case(UserTier::Premium, ResourceSpec::new(6, 8, 50), ResourceSpec::new(6, 8, 50))]
    fn granted_is_elementwise_minimum(
        #[case] tier: UserTier,
        #[case] requested: ResourceSpec,
        #[case] expected: ResourceSpec,
    ) {
        assert_eq!(apply_resource_policy(tier, requested).granted, expected);
    }
}
