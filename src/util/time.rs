//! Time utilities for the host frame loop

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Milliseconds on the host clock. All gameplay timers use this unit.
pub type Millis = u64;

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> Millis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Tick rate configuration
pub const SIMULATION_TPS: u32 = 60; // frame loop rate
pub const SNAPSHOT_TPS: u32 = 20; // frames pushed to stream screens
pub const TICK_DURATION_MICROS: u64 = 1_000_000 / SIMULATION_TPS as u64;

/// Calculate delta time for physics (in seconds)
pub fn tick_delta() -> f32 {
    1.0 / SIMULATION_TPS as f32
}

/// Whole milliseconds elapsed between two host timestamps, saturating at zero
/// when the clock went backwards.
pub fn elapsed_since(earlier: Millis, now: Millis) -> Millis {
    now.saturating_sub(earlier)
}
