#![allow(dead_code)]

use async_trait::async_trait;
use resonnet::client::{AnalyzeClient, AnalyzeError};
use resonnet::coordinator::CoordinatorSettings;
use resonnet_core::models::RawIssue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const C1: &str = "this is vague wording";
pub const C2: &str = "this is vague wording, refined";
pub const C3: &str = "this is vague wording, refined twice";

type Responder = Box<dyn Fn(&str) -> Result<Vec<RawIssue>, AnalyzeError> + Send + Sync>;

/// In-memory analyze client with fixed latency and a scripted answer.
pub struct ScriptedClient {
    latency: Duration,
    respond: Responder,
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(
        latency: Duration,
        respond: impl Fn(&str) -> Result<Vec<RawIssue>, AnalyzeError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            latency,
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }

    /// Flags every occurrence of "vague" as an ambiguous instruction.
    pub fn flags_vague(latency: Duration) -> Arc<Self> {
        Self::new(latency, |content| {
            if content.contains("vague") {
                Ok(vec![RawIssue::new(
                    "vague",
                    "AMBIGUOUS_INSTRUCTION",
                    "Say exactly what you mean",
                )])
            } else {
                Ok(Vec::new())
            }
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalyzeClient for ScriptedClient {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn analyze(&self, content: &str) -> Result<Vec<RawIssue>, AnalyzeError> {
        self.calls.lock().unwrap().push(content.to_string());
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        (self.respond)(content)
    }
}

pub fn settings() -> CoordinatorSettings {
    CoordinatorSettings::default()
}
