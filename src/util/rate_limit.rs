//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Controller input messages per second. Phones send one per frame at most.
pub const INPUT_RATE_LIMIT: u32 = 90;

/// Host console actions (launch/reset) per second
pub const CONSOLE_RATE_LIMIT: u32 = 2;

/// Per-controller rate limiter state
#[derive(Clone)]
pub struct ControllerRateLimiter {
    input_limiter: Arc<Limiter>,
}

impl ControllerRateLimiter {
    pub fn new() -> Self {
        Self {
            input_limiter: create_limiter(INPUT_RATE_LIMIT),
        }
    }

    /// Check if an input message is allowed (returns true if allowed)
    pub fn check_input(&self) -> bool {
        self.input_limiter.check().is_ok()
    }
}

impl Default for ControllerRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
