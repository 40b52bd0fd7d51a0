//! Randomized identities and delays that make crawl traffic look less
//! mechanical.
//!
//! Nothing here guarantees evasion; it only keeps request timing and browser
//! identity from being trivially uniform.

use std::time::Duration;

use rand::seq::IndexedRandom;
use rand::Rng;

/// Realistic desktop browser identity strings. One is picked per session.
pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// An inclusive delay window in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWindow {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayWindow {
    /// Builds a window, swapping the bounds if they arrive inverted.
    #[must_use]
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        if min_ms <= max_ms {
            Self { min_ms, max_ms }
        } else {
            Self {
                min_ms: max_ms,
                max_ms: min_ms,
            }
        }
    }

    /// Settle pause taken after navigation, before extraction.
    pub const SETTLE: DelayWindow = DelayWindow {
        min_ms: 500,
        max_ms: 1000,
    };

    /// Pause after an item selector appears, before the in-page script runs.
    pub const RENDER: DelayWindow = DelayWindow {
        min_ms: 500,
        max_ms: 1500,
    };

    /// Pause between scroll steps.
    pub const SCROLL: DelayWindow = DelayWindow {
        min_ms: 2000,
        max_ms: 4000,
    };

    /// Samples a duration uniformly from the window.
    #[must_use]
    pub fn sample(self) -> Duration {
        Duration::from_millis(random_delay_ms(self.min_ms, self.max_ms))
    }
}

/// Picks one of [`USER_AGENTS`] uniformly at random.
#[must_use]
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Samples a delay uniformly from `[min_ms, max_ms]`, both inclusive.
///
/// Inverted bounds are swapped rather than rejected.
#[must_use]
pub fn random_delay_ms(min_ms: u64, max_ms: u64) -> u64 {
    let (lo, hi) = if min_ms <= max_ms {
        (min_ms, max_ms)
    } else {
        (max_ms, min_ms)
    };
    rand::rng().random_range(lo..=hi)
}

/// Sleeps for a randomized duration drawn from `window`.
pub async fn pause(window: DelayWindow) {
    let delay = window.sample();
    tracing::trace!(delay_ms = %delay.as_millis(), "pacing pause");
    tokio::time::sleep(delay).await;
}
