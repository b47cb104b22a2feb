//! Origin Simulator
//!
//! HTTP responder standing in for the content origin behind the L1/L2 tiers.
//! It stores nothing: every object is a filler body of the requested size,
//! and cache behavior is signalled through response headers.
//!
//! # Endpoints
//!
//! - `GET /origin`: greeting
//! - `GET /origin/objects/:id?size=N`: object fetch, consumes L2 intents
//! - `GET /origin/objects/enforce-l2/:id?size=N`: registers an L2 intent

pub mod enforcement;
pub mod handlers;
pub mod server;

pub use enforcement::L2EnforcementMap;
pub use handlers::{OriginRouter, SizeQuery, ENFORCED_L2_BODY, ORIGIN_GREETING};
pub use server::{OriginConfig, OriginServer};
