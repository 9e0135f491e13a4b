//! Failure gate for optional dependencies.
//!
//! An explicit, instance-owned failure counter: after `threshold`
//! consecutive failures the gate closes and stays closed until the cooldown
//! elapses. No process-wide state; owners hold one gate per dependency.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct FailureGate {
    threshold: u32,
    cooldown: Duration,
    failure_count: u32,
    last_failure_at: Option<Instant>,
}

impl FailureGate {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            failure_count: 0,
            last_failure_at: None,
        }
    }

    /// Whether the guarded dependency should be attempted right now.
    ///
    /// Once the cooldown has elapsed a single probe attempt is allowed; the
    /// caller reports its outcome via [`record_failure`](Self::record_failure)
    /// or [`reset`](Self::reset).
    pub fn should_attempt(&self) -> bool {
        if self.failure_count < self.threshold {
            return true;
        }
        match self.last_failure_at {
            Some(at) => at.elapsed() >= self.cooldown,
            None => true,
        }
    }

    pub fn record_failure(&mut self) {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure_at = Some(Instant::now());
    }

    pub fn reset(&mut self) {
        self.failure_count = 0;
        self.last_failure_at = None;
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }
}
