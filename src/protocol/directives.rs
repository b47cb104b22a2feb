//! Client → tier directives

use super::{decode_flag, encode_flag, HEADER_L1_STORE, HEADER_L2_SERVER, HEADER_L2_STORE};
use serde::{Deserialize, Serialize};

/// Storage directives the replay engine attaches to every fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRequestDirectives {
    /// Ask the L1 node to keep a copy
    pub l1_store: bool,
    /// Ask the L2 node to keep a copy
    pub l2_store: bool,
    /// L2 node the object is routed to
    pub l2_target: usize,
}

impl CacheRequestDirectives {
    /// Directives used by the replay engine: store everywhere, route L2 by hash
    pub fn store_all(l2_target: usize) -> Self {
        Self {
            l1_store: true,
            l2_store: true,
            l2_target,
        }
    }

    /// Serialize into request headers
    pub fn to_headers(&self) -> [(&'static str, String); 3] {
        [
            (HEADER_L1_STORE, encode_flag(self.l1_store).to_string()),
            (HEADER_L2_STORE, encode_flag(self.l2_store).to_string()),
            (HEADER_L2_SERVER, self.l2_target.to_string()),
        ]
    }

    /// Parse from request headers
    ///
    /// Missing flags read as `false` and a missing or malformed L2 index as `0`;
    /// the origin never rejects a request over its directives.
    pub fn from_headers<'a, F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        Self {
            l1_store: decode_flag(lookup(HEADER_L1_STORE)),
            l2_store: decode_flag(lookup(HEADER_L2_STORE)),
            l2_target: lookup(HEADER_L2_SERVER)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
        }
    }
}
