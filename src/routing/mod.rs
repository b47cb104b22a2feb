//! Tier Routing
//!
//! Maps every object to one L1 node and one L2 node.
//!
//! ```text
//!   object id ──► murmur3_32 ──► digest
//!                                  │
//!                 ┌────────────────┴────────────────┐
//!                 ▼                                 ▼
//!        L1Policy::select(digest)            digest mod numL2
//!       (hash | random | node 0)               (always hash)
//! ```
//!
//! With [`L1Policy::Hash`] the whole decision is a pure function of the object
//! id and the node counts, which gives cache affinity: repeated accesses to
//! an object always land on the same L1/L2 pair.

pub mod hash;
pub mod policy;

pub use hash::{murmur3_32, object_digest};
pub use policy::L1Policy;

use crate::error::{Error, Result};
use serde::Serialize;

// =============================================================================
// Route Decision
// =============================================================================

/// Node indices chosen for one object access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RouteDecision {
    pub l1: usize,
    pub l2: usize,
}

// =============================================================================
// Tier Router
// =============================================================================

/// Routing state owned by one replay run
#[derive(Debug, Clone)]
pub struct TierRouter {
    num_l1: usize,
    num_l2: usize,
    policy: L1Policy,
}

impl TierRouter {
    /// Build a router; both node counts must be non-zero
    pub fn new(num_l1: usize, num_l2: usize, policy: L1Policy) -> Result<Self> {
        if num_l1 == 0 {
            return Err(Error::Configuration("at least one L1 node is required".into()));
        }
        if num_l2 == 0 {
            return Err(Error::Configuration("at least one L2 node is required".into()));
        }

        Ok(Self {
            num_l1,
            num_l2,
            policy,
        })
    }

    /// Route an object to its L1 and L2 nodes
    #[inline]
    pub fn route(&self, object_id: &str) -> RouteDecision {
        let digest = object_digest(object_id);
        RouteDecision {
            l1: self.policy.select(digest, self.num_l1),
            l2: (digest % self.num_l2 as u32) as usize,
        }
    }

    pub fn num_l1(&self) -> usize {
        self.num_l1
    }

    pub fn num_l2(&self) -> usize {
        self.num_l2
    }

    pub fn policy(&self) -> L1Policy {
        self.policy
    }
}

/// One-shot routing for callers without a long-lived router
pub fn route(
    object_id: &str,
    num_l1: usize,
    num_l2: usize,
    policy: L1Policy,
) -> Result<RouteDecision> {
    Ok(TierRouter::new(num_l1, num_l2, policy)?.route(object_id))
}
