//! # Engine configuration.
//!
//! [`EngineConfig`] centralizes the knobs of the dispatch loop and the
//! outbound bus. All fields are public; defaults match the reference
//! behavior (100 ms warm-up, `"init"` startup key, 1024-slot bus).

use std::borrow::Cow;
use std::time::Duration;

/// Configuration for a [`Manager`](crate::engine::Manager).
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Sleep before the first dispatch, so an external transport can finish
    /// initializing. `Duration::ZERO` skips the warm-up.
    pub warmup: Duration,

    /// Well-known key fired once on the global context when the loop starts.
    pub init_key: Cow<'static, str>,

    /// Capacity of the outbound broadcast ring buffer.
    ///
    /// Receivers that lag behind more than this many messages observe
    /// `Lagged` and skip older items. Minimum value is 1 (clamped).
    pub outbound_capacity: usize,
}

impl EngineConfig {
    /// Returns the outbound capacity clamped to a minimum of 1.
    #[inline]
    pub fn outbound_capacity_clamped(&self) -> usize {
        self.outbound_capacity.max(1)
    }
}

impl Default for EngineConfig {
    /// Default configuration:
    ///
    /// - `warmup = 100ms`
    /// - `init_key = "init"`
    /// - `outbound_capacity = 1024`
    fn default() -> Self {
        Self {
            warmup: Duration::from_millis(100),
            init_key: Cow::Borrowed("init"),
            outbound_capacity: 1024,
        }
    }
}
