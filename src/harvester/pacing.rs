//! Pacing between page loads
//!
//! All waiting is explicit: a fixed-plus-jitter delay before every
//! navigation and a longer cooldown after a rate-limited page.

use crate::config::PacingConfig;
use std::time::Duration;

/// Sleeps between page loads
#[derive(Debug, Clone)]
pub struct Pacer {
    config: PacingConfig,
}

impl Pacer {
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// Delay applied before the next navigation
    pub fn navigation_delay(&self) -> Duration {
        jittered(
            self.config.navigation_delay_ms,
            self.config.navigation_jitter_ms,
        )
    }

    /// Delay applied after a rate-limited page
    pub fn cooldown_delay(&self) -> Duration {
        jittered(
            self.config.rate_limit_cooldown_ms,
            self.config.rate_limit_jitter_ms,
        )
    }

    pub async fn before_navigation(&self) {
        let delay = self.navigation_delay();
        if !delay.is_zero() {
            tracing::trace!(delay_ms = delay.as_millis() as u64, "Waiting before navigation");
            tokio::time::sleep(delay).await;
        }
    }

    pub async fn cool_down(&self) {
        let delay = self.cooldown_delay();
        if !delay.is_zero() {
            tracing::warn!(
                delay_ms = delay.as_millis() as u64,
                "Rate limited, cooling down"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// `base` plus a random share of `jitter`, in milliseconds
fn jittered(base_ms: u64, jitter_ms: u64) -> Duration {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let extra = (jitter_ms as f64 * rand::random::<f64>()) as u64;
    Duration::from_millis(base_ms.saturating_add(extra.min(jitter_ms)))
}
