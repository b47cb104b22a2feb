//! Cache Simulation Protocol
//!
//! The replay engine and the origin negotiate simulated cache behavior purely
//! through HTTP headers. This module owns the typed view of that contract:
//!
//! - [`CacheRequestDirectives`]: what the client asks the tiers to do
//! - [`CacheResultSignal`]: what the responder reports back
//!
//! Headers are only touched at the boundary. Both sides hand in a lookup
//! closure and receive `(name, value)` pairs, so the codec does not depend on
//! which `http` crate version the server or client stack uses.

pub mod directives;
pub mod signal;

pub use directives::CacheRequestDirectives;
pub use signal::{CacheNode, CacheResultSignal, CacheStatus};

// =============================================================================
// Header Names
// =============================================================================

/// Client asks L1 to store the object; echoed by the origin
pub const HEADER_L1_STORE: &str = "X-Cache-L1-Store";

/// Client asks L2 to store the object; origin may force it to `True`
pub const HEADER_L2_STORE: &str = "X-Cache-L2-Store";

/// Decimal index of the L2 node the object is routed to
pub const HEADER_L2_SERVER: &str = "X-Cache-L2-Server";

/// `HIT` or `MISS`
pub const HEADER_STATUS: &str = "X-Cache-Status";

/// Tier that satisfied the request (`ORIGIN`, `L1`, `L2`)
pub const HEADER_NODE: &str = "X-Cache-Node";

/// Cache-Control value the origin attaches to every object
pub const ORIGIN_CACHE_CONTROL: &str = "public, max-age=172800";

// =============================================================================
// Header Boolean Encoding
// =============================================================================

/// Encode a flag the way the tier nodes expect it
pub fn encode_flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Decode a flag; absent or unrecognized values read as `false`
pub fn decode_flag(value: Option<&str>) -> bool {
    value
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_encoding() {
        assert_eq!(encode_flag(true), "True");
        assert_eq!(encode_flag(false), "False");

        assert!(decode_flag(Some("True")));
        assert!(decode_flag(Some("true")));
        assert!(decode_flag(Some(" TRUE ")));
        assert!(!decode_flag(Some("False")));
        assert!(!decode_flag(Some("1")));
        assert!(!decode_flag(Some("")));
        assert!(!decode_flag(None));
    }
}
