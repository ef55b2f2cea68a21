//! Exponential backoff with jitter, shared by the wire-level retry sender
//! and anything else that needs a jittered delay law.
//!
//! Delay for attempt `i` (0-indexed): `min(base * 2^i, max) + jitter`, where
//! `jitter` is sampled uniformly from `[-base * 2^i * jitter_factor, +base *
//! 2^i * jitter_factor]` and the whole result is clamped to `>= 0`.

use rand::Rng;

/// Parameters governing a retry/backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base_ms: u64,
    pub max_ms: u64,
    pub max_attempts: u32,
    pub jitter_factor: f64,
}

impl BackoffPolicy {
    /// The unjittered exponential term for attempt `attempt` (0-indexed),
    /// capped at `max_ms`.
    pub fn capped_exponential_ms(&self, attempt: u32) -> u64 {
        let exp = (self.base_ms as f64) * 2f64.powi(attempt as i32);
        exp.min(self.max_ms as f64).max(0.0) as u64
    }

    /// The inclusive `[low, high]` bound the jittered delay for `attempt`
    /// must fall within, per the retry law.
    pub fn bounds_ms(&self, attempt: u32) -> (u64, u64) {
        let capped = self.capped_exponential_ms(attempt) as f64;
        let uncapped = (self.base_ms as f64) * 2f64.powi(attempt as i32);
        let low = (capped * (1.0 - self.jitter_factor)).max(0.0);
        let high = (uncapped.min(self.max_ms as f64) * (1.0 + self.jitter_factor)).max(0.0);
        (low as u64, high as u64)
    }

    /// Sample a concrete delay for `attempt` using `rng`.
    pub fn sample_delay_ms(&self, attempt: u32, rng: &mut impl Rng) -> u64 {
        let capped = self.capped_exponential_ms(attempt) as f64;
        let spread = capped * self.jitter_factor;
        let jitter = if spread > 0.0 {
            rng.random_range(-spread..=spread)
        } else {
            0.0
        };
        (capped + jitter).max(0.0) as u64
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
