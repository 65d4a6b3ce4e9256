//! Tokio runtime for the request scheduler.
//!
//! A single actor task owns the [`Scheduler`], the [`CadenceTracker`], and the
//! [`AdaptiveDelay`]. Edits arrive over a channel, so the state machine is
//! only ever touched from one task even on a multi-threaded runtime.
//!
//! ```text
//!  analyze_prompt ──▶ commands ──┐
//!                                ▼
//!  debounce timer ──▶ internal ──▶ actor ──▶ watch<AnalysisView>
//!  analyze call   ──▶ internal ──┘   ▲
//!  retune tick (every 5s) ───────────┘
//! ```
//!
//! Debounce timers and analyze calls run as spawned tasks that report back
//! to the actor. Re-arming a timer aborts the previous task; a late fire from
//! an aborted timer is discarded by the scheduler's sequence check. In-flight
//! analyze calls are never cancelled.

use anyhow::{Context, Result};
use resonnet_core::cadence::{AdaptiveDelay, CadenceTracker, DelayPolicy};
use resonnet_core::models::{AnalysisView, RawIssue};
use resonnet_core::scheduler::{Effect, Scheduler, SchedulerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::client::{AnalyzeClient, AnalyzeError};
use crate::config::Config;

/// Everything the coordinator needs besides the client.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorSettings {
    pub scheduler: SchedulerConfig,
    pub delay: DelayPolicy,
    pub retune_interval: Duration,
}

impl CoordinatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scheduler: config.analysis.scheduler(),
            delay: config.debounce.policy(),
            retune_interval: config.debounce.retune_interval(),
        }
    }
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            delay: DelayPolicy::default(),
            retune_interval: Duration::from_secs(5),
        }
    }
}

enum Command {
    Edit(String),
    WaitIdle(oneshot::Sender<AnalysisView>),
}

enum Internal {
    TimerFired(u64),
    Completed(Result<Vec<RawIssue>, AnalyzeError>),
}

/// Cloneable handle to a running coordinator.
///
/// The coordinator stops once every handle has been dropped.
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<AnalysisView>,
}

impl CoordinatorHandle {
    /// Submit the current buffer content. Never blocks; safe on every keystroke.
    pub fn analyze_prompt(&self, content: impl Into<String>) {
        if self.commands.send(Command::Edit(content.into())).is_err() {
            debug!("coordinator stopped, edit dropped");
        }
    }

    /// Receiver that observes every published [`AnalysisView`].
    pub fn subscribe(&self) -> watch::Receiver<AnalysisView> {
        self.view.clone()
    }

    /// The most recently published view.
    pub fn snapshot(&self) -> AnalysisView {
        self.view.borrow().clone()
    }

    /// Wait until every edit submitted so far has settled: no timer armed,
    /// nothing in flight, nothing queued.
    pub async fn wait_idle(&self) -> Result<AnalysisView> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::WaitIdle(tx))
            .map_err(|_| anyhow::anyhow!("coordinator is not running"))?;
        rx.await.context("coordinator stopped before becoming idle")
    }
}

pub struct Coordinator;

impl Coordinator {
    /// Start the coordinator actor on the current tokio runtime.
    pub fn spawn(
        client: Arc<dyn AnalyzeClient>,
        settings: CoordinatorSettings,
    ) -> CoordinatorHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        let delay = AdaptiveDelay::new(settings.delay);
        let (view_tx, view_rx) = watch::channel(AnalysisView {
            debounce_ms: delay.current_ms(),
            ..AnalysisView::default()
        });

        let actor = Actor {
            client,
            scheduler: Scheduler::new(settings.scheduler),
            cadence: CadenceTracker::new(settings.delay.max_samples),
            delay,
            view: view_tx,
            internal_tx,
            timer: None,
            idle_waiters: Vec::new(),
        };
        tokio::spawn(actor.run(command_rx, internal_rx, settings.retune_interval));

        CoordinatorHandle {
            commands: command_tx,
            view: view_rx,
        }
    }
}

struct Actor {
    client: Arc<dyn AnalyzeClient>,
    scheduler: Scheduler,
    cadence: CadenceTracker,
    delay: AdaptiveDelay,
    view: watch::Sender<AnalysisView>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    timer: Option<JoinHandle<()>>,
    idle_waiters: Vec<oneshot::Sender<AnalysisView>>,
}

impl Actor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
        retune_interval: Duration,
    ) {
        let first_tick = Instant::now() + retune_interval;
        let mut retune = tokio::time::interval_at(first_tick, retune_interval);
        retune.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Edit(content)) => self.on_edit(content),
                    Some(Command::WaitIdle(tx)) => self.idle_waiters.push(tx),
                    None => break,
                },
                Some(event) = internal.recv() => match event {
                    Internal::TimerFired(seq) => {
                        let effects = self.scheduler.on_timer(seq);
                        self.apply(effects);
                    }
                    Internal::Completed(result) => self.on_completed(result),
                },
                _ = retune.tick() => self.on_retune(),
            }
            self.notify_idle();
        }

        self.cancel_timer();
        self.log_cache_stats();
        debug!("coordinator stopped");
    }

    fn on_edit(&mut self, content: String) {
        let now = Instant::now().into_std();
        self.cadence.record_edit(now);
        let effects = self.scheduler.on_edit(content, self.delay.current());
        self.apply(effects);
    }

    fn on_completed(&mut self, result: Result<Vec<RawIssue>, AnalyzeError>) {
        let effects = match result {
            Ok(issues) => {
                debug!(issues = issues.len(), "analysis completed");
                self.scheduler.on_success(&issues)
            }
            Err(err) => {
                warn!(error = %err, reason = %err.user_message(), "analysis failed");
                self.scheduler.on_failure()
            }
        };
        self.apply(effects);
        self.log_cache_stats();
    }

    fn on_retune(&mut self) {
        if let Some(adjustment) = self.delay.retune(&mut self.cadence) {
            if adjustment.changed() {
                debug!(
                    previous_ms = adjustment.previous_ms,
                    current_ms = adjustment.current_ms,
                    average_interval_ms = adjustment.average_interval.as_millis() as u64,
                    "debounce delay retuned"
                );
            }
        }
        self.apply(Vec::new());
    }

    fn log_cache_stats(&self) {
        let cache = self.scheduler.cache();
        let stats = cache.stats();
        debug!(
            entries = cache.len(),
            hits = stats.hits,
            misses = stats.misses,
            evictions = stats.evictions,
            hit_rate = stats.hit_rate(),
            "result cache"
        );
    }

    /// Carry out `effects` in order, then publish the resulting view.
    ///
    /// Only the final view of a pass is published. A failure that drains a
    /// queued request sets and then clears the error in one pass, so
    /// subscribers see the next request in flight with no error.
    fn apply(&mut self, effects: Vec<Effect>) {
        let mut next = self.view.borrow().clone();
        let touched = !effects.is_empty();

        for effect in effects {
            match effect {
                Effect::Publish(findings) => next.findings = findings,
                Effect::SetAnalyzing(analyzing) => next.is_analyzing = analyzing,
                Effect::SetError(error) => next.error = error,
                Effect::ArmTimer { seq, delay } => self.arm_timer(seq, delay),
                Effect::CancelTimer => self.cancel_timer(),
                Effect::Dispatch(content) => self.dispatch(content),
            }
        }
        next.phase = self.scheduler.phase();
        next.debounce_ms = self.delay.current_ms();

        if touched || *self.view.borrow() != next {
            self.view.send_replace(next);
        }
    }

    fn arm_timer(&mut self, seq: u64, delay: Duration) {
        self.cancel_timer();
        let tx = self.internal_tx.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Internal::TimerFired(seq));
        }));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn dispatch(&mut self, content: String) {
        debug!(
            chars = content.chars().count(),
            model = self.client.model_name(),
            "dispatching analysis"
        );
        let client = self.client.clone();
        let tx = self.internal_tx.clone();
        let call = tokio::spawn(async move { client.analyze(&content).await });
        // The slot is freed even when the call panics.
        tokio::spawn(async move {
            let result = match call.await {
                Ok(result) => result,
                Err(join_err) => Err(AnalyzeError::Other(format!(
                    "analysis task failed: {}",
                    join_err
                ))),
            };
            let _ = tx.send(Internal::Completed(result));
        });
    }

    fn notify_idle(&mut self) {
        if self.idle_waiters.is_empty() || !self.scheduler.is_idle() {
            return;
        }
        let view = self.view.borrow().clone();
        for waiter in self.idle_waiters.drain(..) {
            let _ = waiter.send(view.clone());
        }
    }
}
