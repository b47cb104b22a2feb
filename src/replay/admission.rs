//! Admission control
//!
//! Token bucket gating how fast the replay loop submits new fetches,
//! independent of how fast fetches complete.

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;

/// Rate limiter for the read/route/submit loop
pub struct AdmissionController {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    rate: NonZeroU32,
}

impl AdmissionController {
    /// One token every `1/rate` seconds, burst of one; a rate of 0 becomes 1
    pub fn new(rate_per_sec: u32) -> Self {
        let rate = NonZeroU32::new(rate_per_sec).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(rate).allow_burst(NonZeroU32::MIN);

        Self {
            limiter: RateLimiter::direct(quota),
            rate,
        }
    }

    /// Wait for a token; suspends only the calling task
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Take a token if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Effective admission rate
    pub fn rate(&self) -> u32 {
        self.rate.get()
    }
}

impl std::fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionController")
            .field("rate", &self.rate)
            .finish()
    }
}
