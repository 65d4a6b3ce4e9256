//! Request scheduler: the state machine behind `analyze_prompt`.
//!
//! The scheduler decides, for every edit, timer fire, and request
//! completion, what should happen next. It never sleeps, spawns, or calls the
//! network itself; each transition returns an ordered list of [`Effect`]s for
//! the runtime to carry out.
//!
//! # States
//!
//! ```text
//!            edit (miss)                 timer fires
//!   Idle ───────────────▶ Debouncing ─────────────────▶ InFlight
//!    ▲                     │   ▲ edit re-arms              │   │ timer fires
//!    │                     └───┘                           │   ▼
//!    │        completion, nothing queued                   │ InFlight + Queued
//!    └─────────────────────────────────────────────────────┘   │ (latest wins)
//!                         completion drains the queue ◀────────┘
//! ```
//!
//! At most one request is in flight and at most one content waits behind it.
//! A queued content is dispatched as soon as the slot frees, without another
//! debounce wait.

use std::time::Duration;

use crate::cache::ResultCache;
use crate::fingerprint::fingerprint;
use crate::models::{Finding, Phase, RawIssue};
use crate::parse::parse_findings;

/// User-facing message published when a request fails for any reason.
pub const ANALYSIS_FAILED: &str = "Failed to analyze prompt. Please try again.";

/// Side effect requested by a scheduler transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Replace the published findings.
    Publish(Vec<Finding>),
    SetAnalyzing(bool),
    SetError(Option<String>),
    /// Start the debounce timer, replacing any timer already armed.
    ArmTimer { seq: u64, delay: Duration },
    /// Cancel the armed debounce timer.
    CancelTimer,
    /// Send `content` to the analyze client.
    Dispatch(String),
}

/// An armed debounce timer and the content it will submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debounce {
    pub content: String,
    pub seq: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerState {
    /// Content of the most recent successful analysis.
    pub last_analyzed: Option<String>,
    pub debounce: Option<Debounce>,
    /// Content of the outstanding request, if any.
    pub in_flight: Option<String>,
    /// The single content waiting for the in-flight request to finish.
    pub pending: Option<String>,
}

impl SchedulerState {
    pub fn phase(&self) -> Phase {
        match (&self.in_flight, &self.pending, &self.debounce) {
            (Some(_), Some(_), _) => Phase::InFlightQueued,
            (Some(_), None, _) => Phase::InFlight,
            (None, _, Some(_)) => Phase::Debouncing,
            (None, _, None) => Phase::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub min_content_length: usize,
    pub cache_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_content_length: crate::MIN_CONTENT_LENGTH,
            cache_capacity: crate::MAX_CACHE_ITEMS,
        }
    }
}

pub struct Scheduler {
    state: SchedulerState,
    cache: ResultCache,
    min_content_length: usize,
    next_seq: u64,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            state: SchedulerState::default(),
            cache: ResultCache::new(config.cache_capacity),
            min_content_length: config.min_content_length,
            next_seq: 0,
        }
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// True when no timer is armed, nothing is in flight, and nothing is queued.
    pub fn is_idle(&self) -> bool {
        self.state.debounce.is_none()
            && self.state.in_flight.is_none()
            && self.state.pending.is_none()
    }

    fn is_short(&self, content: &str) -> bool {
        crate::trimmed_len(content) < self.min_content_length
    }

    /// An edit produced `content`.
    ///
    /// Short content clears the findings and drops any armed timer or queued
    /// content. Content equal to the last analysis is ignored. A cache hit is
    /// published immediately and leaves in-flight and queued work untouched.
    /// Anything else (re)arms the debounce timer for `delay`.
    pub fn on_edit(&mut self, content: String, delay: Duration) -> Vec<Effect> {
        if self.is_short(&content) {
            let mut effects = vec![Effect::Publish(Vec::new())];
            if self.state.debounce.take().is_some() {
                effects.push(Effect::CancelTimer);
            }
            self.state.pending = None;
            return effects;
        }

        if self.state.last_analyzed.as_deref() == Some(content.as_str()) {
            return Vec::new();
        }

        if let Some(hit) = self.cache.get(&fingerprint(&content)) {
            return vec![Effect::Publish(hit.to_vec())];
        }

        self.next_seq += 1;
        let seq = self.next_seq;
        self.state.debounce = Some(Debounce {
            content,
            seq,
        });
        vec![Effect::ArmTimer { seq, delay }]
    }

    /// The debounce timer armed with `seq` fired.
    ///
    /// Fires from timers that have since been re-armed or cancelled are
    /// ignored. If a request is in flight the content replaces whatever was
    /// queued; otherwise it is dispatched.
    pub fn on_timer(&mut self, seq: u64) -> Vec<Effect> {
        let content = match self.state.debounce.take() {
            Some(debounce) if debounce.seq == seq => debounce.content,
            other => {
                self.state.debounce = other;
                return Vec::new();
            }
        };

        if self.state.in_flight.is_some() {
            self.state.pending = Some(content);
            return Vec::new();
        }

        self.begin(content)
    }

    /// The in-flight request returned `issues`.
    pub fn on_success(&mut self, issues: &[RawIssue]) -> Vec<Effect> {
        let Some(content) = self.state.in_flight.take() else {
            return Vec::new();
        };

        let findings = parse_findings(&content, issues);
        let key = fingerprint(&content);
        self.state.last_analyzed = Some(content);
        self.cache.put(key, findings.clone());

        let mut effects = vec![Effect::Publish(findings), Effect::SetAnalyzing(false)];
        effects.extend(self.drain());
        effects
    }

    /// The in-flight request failed. The queue still drains.
    pub fn on_failure(&mut self) -> Vec<Effect> {
        if self.state.in_flight.take().is_none() {
            return Vec::new();
        }

        let mut effects = vec![
            Effect::SetError(Some(ANALYSIS_FAILED.to_string())),
            Effect::Publish(Vec::new()),
            Effect::SetAnalyzing(false),
        ];
        effects.extend(self.drain());
        effects
    }

    fn drain(&mut self) -> Vec<Effect> {
        match self.state.pending.take() {
            Some(next) => self.begin(next),
            None => Vec::new(),
        }
    }

    /// Start a request for `content` unless the answer is already known.
    fn begin(&mut self, content: String) -> Vec<Effect> {
        if self.is_short(&content) {
            return vec![Effect::Publish(Vec::new())];
        }
        if self.state.last_analyzed.as_deref() == Some(content.as_str()) {
            return Vec::new();
        }
        if let Some(hit) = self.cache.get(&fingerprint(&content)) {
            return vec![Effect::Publish(hit.to_vec())];
        }

        self.state.in_flight = Some(content.clone());
        vec![
            Effect::SetAnalyzing(true),
            Effect::SetError(None),
            Effect::Dispatch(content),
        ]
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
