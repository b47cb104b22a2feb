//! L1 selection policy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the L1 node is picked for an object
///
/// L2 placement is always hash based; only L1 is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum L1Policy {
    /// `digest mod numL1` (cache affinity)
    Hash,
    /// Uniformly random node per request
    Random,
    /// Everything goes to L1 node 0
    #[default]
    Unspecified,
}

impl L1Policy {
    /// Pick an L1 index in `[0, num_l1)`
    ///
    /// `num_l1` must be non-zero; the router checks this once at construction.
    #[inline]
    pub fn select(&self, digest: u32, num_l1: usize) -> usize {
        match self {
            L1Policy::Hash => (digest % num_l1 as u32) as usize,
            L1Policy::Random => {
                use rand::Rng;
                rand::thread_rng().gen_range(0..num_l1)
            }
            L1Policy::Unspecified => 0,
        }
    }
}

impl FromStr for L1Policy {
    type Err = std::convert::Infallible;

    /// Unrecognized names fall back to [`L1Policy::Unspecified`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "hash" => L1Policy::Hash,
            "rand" | "random" => L1Policy::Random,
            _ => L1Policy::Unspecified,
        })
    }
}

impl fmt::Display for L1Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            L1Policy::Hash => write!(f, "hash"),
            L1Policy::Random => write!(f, "random"),
            L1Policy::Unspecified => write!(f, "unspecified"),
        }
    }
}
