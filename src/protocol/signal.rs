//! Tier → client result signal

use super::{
    decode_flag, encode_flag, HEADER_L1_STORE, HEADER_L2_STORE, HEADER_NODE, HEADER_STATUS,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Cache Status
// =============================================================================

/// Outcome reported in `X-Cache-Status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    Hit,
    Miss,
    /// Header missing or carrying a value outside the protocol
    Unknown,
}

impl CacheStatus {
    /// Parse the header value
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("HIT") => CacheStatus::Hit,
            Some("MISS") => CacheStatus::Miss,
            _ => CacheStatus::Unknown,
        }
    }

    /// Label used for the header and for metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Cache Node
// =============================================================================

/// Tier that answered, reported in `X-Cache-Node`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheNode {
    Origin,
    L1,
    L2,
    Unknown,
}

impl CacheNode {
    /// Parse the header value
    ///
    /// Tier nodes may tag themselves (`L2-3`, `varnish-L1`), so L1/L2 are
    /// matched by substring.
    pub fn parse(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim) else {
            return CacheNode::Unknown;
        };

        if value.eq_ignore_ascii_case("ORIGIN") {
            CacheNode::Origin
        } else if value.contains("L2") {
            CacheNode::L2
        } else if value.contains("L1") {
            CacheNode::L1
        } else {
            CacheNode::Unknown
        }
    }

    /// Label used for the header
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheNode::Origin => "ORIGIN",
            CacheNode::L1 => "L1",
            CacheNode::L2 => "L2",
            CacheNode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for CacheNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Result Signal
// =============================================================================

/// What a responder reports about a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheResultSignal {
    pub status: CacheStatus,
    pub node: CacheNode,
    pub l1_store: bool,
    pub l2_store: bool,
}

impl CacheResultSignal {
    /// Signal emitted by the origin: always a miss served by the origin itself
    pub fn origin_miss(l1_store: bool, l2_store: bool) -> Self {
        Self {
            status: CacheStatus::Miss,
            node: CacheNode::Origin,
            l1_store,
            l2_store,
        }
    }

    /// The request missed the whole hierarchy
    pub fn is_miss(&self) -> bool {
        self.status == CacheStatus::Miss
    }

    /// L1 did not satisfy the request: either a full miss or an L2 hit
    pub fn missed_l1(&self) -> bool {
        self.is_miss() || self.node == CacheNode::L2
    }

    /// Reject a status outside the protocol
    pub fn validate(&self) -> Result<()> {
        if self.status == CacheStatus::Unknown {
            return Err(Error::Protocol(format!(
                "unknown {} from node {}",
                HEADER_STATUS, self.node
            )));
        }
        Ok(())
    }

    /// Serialize into response headers
    pub fn to_headers(&self) -> [(&'static str, &'static str); 4] {
        [
            (HEADER_STATUS, self.status.as_str()),
            (HEADER_NODE, self.node.as_str()),
            (HEADER_L1_STORE, encode_flag(self.l1_store)),
            (HEADER_L2_STORE, encode_flag(self.l2_store)),
        ]
    }

    /// Parse from response headers
    pub fn from_headers<'a, F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        Self {
            status: CacheStatus::parse(lookup(HEADER_STATUS)),
            node: CacheNode::parse(lookup(HEADER_NODE)),
            l1_store: decode_flag(lookup(HEADER_L1_STORE)),
            l2_store: decode_flag(lookup(HEADER_L2_STORE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn parse(pairs: &[(&'static str, &'static str)]) -> CacheResultSignal {
        let raw: HashMap<&str, &str> = pairs.iter().copied().collect();
        CacheResultSignal::from_headers(|name| raw.get(name).copied())
    }

    #[test]
    fn test_origin_signal_headers() {
        let headers = CacheResultSignal::origin_miss(true, false).to_headers();
        assert_eq!(headers[0], ("X-Cache-Status", "MISS"));
        assert_eq!(headers[1], ("X-Cache-Node", "ORIGIN"));
        assert_eq!(headers[2], ("X-Cache-L1-Store", "True"));
        assert_eq!(headers[3], ("X-Cache-L2-Store", "False"));
    }

    #[test]
    fn test_parse_tier_hits() {
        let l2_hit = parse(&[("X-Cache-Status", "HIT"), ("X-Cache-Node", "L2-1")]);
        assert_eq!(l2_hit.status, CacheStatus::Hit);
        assert_eq!(l2_hit.node, CacheNode::L2);
        assert!(!l2_hit.is_miss());
        assert!(l2_hit.missed_l1());

        let l1_hit = parse(&[("X-Cache-Status", "HIT"), ("X-Cache-Node", "L1")]);
        assert!(!l1_hit.missed_l1());

        let miss = parse(&[("X-Cache-Status", "MISS"), ("X-Cache-Node", "ORIGIN")]);
        assert!(miss.is_miss());
        assert!(miss.missed_l1());
        assert!(miss.validate().is_ok());
    }

    #[test]
    fn test_unknown_status_is_protocol_error() {
        let signal = parse(&[("X-Cache-Status", "STALE")]);
        assert_eq!(signal.status, CacheStatus::Unknown);
        assert_eq!(signal.node, CacheNode::Unknown);
        assert_matches!(signal.validate(), Err(Error::Protocol(_)));

        let empty = parse(&[]);
        assert_eq!(empty.status, CacheStatus::Unknown);
    }
}
