//! Typing cadence tracking and adaptive debounce delay.
//!
//! [`CadenceTracker`] keeps the most recent edit timestamps.
//! [`AdaptiveDelay`] is retuned on a fixed period from the average interval
//! between the last few edits: fast typing lengthens the debounce delay,
//! slow typing shortens it, one step per retune and always within bounds.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Tunables for [`AdaptiveDelay`] and [`CadenceTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPolicy {
    pub initial_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub step_ms: u64,
    /// Average inter-edit intervals below this count as fast typing.
    pub fast_interval_ms: u64,
    /// Number of most recent samples a retune looks at and keeps.
    pub window: usize,
    /// Samples retained between retunes.
    pub max_samples: usize,
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self {
            initial_ms: 800,
            min_ms: 500,
            max_ms: 1200,
            step_ms: 50,
            fast_interval_ms: 200,
            window: 5,
            max_samples: 20,
        }
    }
}

/// Capped, ordered record of edit timestamps.
#[derive(Debug, Clone)]
pub struct CadenceTracker {
    samples: VecDeque<Instant>,
    max_samples: usize,
}

impl CadenceTracker {
    pub fn new(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    /// Append an edit timestamp, dropping the oldest beyond the cap.
    pub fn record_edit(&mut self, now: Instant) {
        self.samples.push_back(now);
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean gap between consecutive timestamps among the last `window` samples.
    ///
    /// `None` when fewer than two samples fall in the window.
    pub fn average_interval(&self, window: usize) -> Option<Duration> {
        let take = window.min(self.samples.len());
        if take < 2 {
            return None;
        }
        let recent: Vec<Instant> = self
            .samples
            .iter()
            .skip(self.samples.len() - take)
            .copied()
            .collect();
        let total: Duration = recent
            .windows(2)
            .map(|pair| pair[1].saturating_duration_since(pair[0]))
            .sum();
        Some(total / (take as u32 - 1))
    }

    /// Drop everything but the newest `keep` samples.
    pub fn retain_last(&mut self, keep: usize) {
        while self.samples.len() > keep {
            self.samples.pop_front();
        }
    }
}

impl Default for CadenceTracker {
    fn default() -> Self {
        Self::new(DelayPolicy::default().max_samples)
    }
}

/// Outcome of one retune cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayAdjustment {
    pub previous_ms: u64,
    pub current_ms: u64,
    pub average_interval: Duration,
}

impl DelayAdjustment {
    pub fn changed(&self) -> bool {
        self.previous_ms != self.current_ms
    }
}

/// The debounce delay, bounded to `[policy.min_ms, policy.max_ms]`.
#[derive(Debug, Clone)]
pub struct AdaptiveDelay {
    policy: DelayPolicy,
    current_ms: u64,
}

impl AdaptiveDelay {
    pub fn new(policy: DelayPolicy) -> Self {
        let current_ms = policy.initial_ms.clamp(policy.min_ms, policy.max_ms);
        Self { policy, current_ms }
    }

    pub fn current_ms(&self) -> u64 {
        self.current_ms
    }

    pub fn current(&self) -> Duration {
        Duration::from_millis(self.current_ms)
    }

    /// Run one retune cycle against `cadence`.
    ///
    /// Does nothing and returns `None` until at least `window` samples exist.
    /// Otherwise moves the delay one step, then trims `cadence` to the last
    /// `window` samples.
    pub fn retune(&mut self, cadence: &mut CadenceTracker) -> Option<DelayAdjustment> {
        let window = self.policy.window;
        if cadence.len() < window {
            return None;
        }
        let average_interval = cadence.average_interval(window)?;

        let previous_ms = self.current_ms;
        if average_interval < Duration::from_millis(self.policy.fast_interval_ms) {
            self.current_ms = (self.current_ms + self.policy.step_ms).min(self.policy.max_ms);
        } else {
            self.current_ms = self
                .current_ms
                .saturating_sub(self.policy.step_ms)
                .max(self.policy.min_ms);
        }

        cadence.retain_last(window);

        Some(DelayAdjustment {
            previous_ms,
            current_ms: self.current_ms,
            average_interval,
        })
    }
}

impl Default for AdaptiveDelay {
    fn default() -> Self {
        Self::new(DelayPolicy::default())
    }
}
