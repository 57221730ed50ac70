// Execution polling: a cancellable task that watches one execution until
// a terminal status, instead of ambient timer side effects.
use crate::schemas::{Execution, ExecutionStatus, TraceStep};
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Where the watcher sends the user once polling ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationTarget {
    Document(String),
    Dashboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    Completed { target: NavigationTarget },
    Failed { target: NavigationTarget },
    Cancelled,
}

#[async_trait]
pub trait ExecutionSource: Send + Sync {
    async fn fetch_execution(&self, id: &str) -> Result<Execution>;
}

pub struct ExecutionPoller<S> {
    source: S,
    interval: Duration,
    cancel: CancellationToken,
}

impl<S: ExecutionSource> ExecutionPoller<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            interval: DEFAULT_POLL_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Token for external teardown. Cancellation and natural completion
    /// share the same exit path; either way the loop stops for good.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Polls until the execution reaches a terminal status. `on_step` is
    /// invoked once per newly observed trace step, with a flag marking
    /// steps that appeared after the first tick.
    pub async fn run<F>(&self, execution_id: &str, mut on_step: F) -> PollResult
    where
        F: FnMut(&TraceStep, bool),
    {
        let mut tracker = TraceTracker::default();
        let mut ticks = tokio::time::interval(self.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return PollResult::Cancelled,
                _ = ticks.tick() => {}
            }

            // A failed tick is "not yet terminal": keep the fixed cadence.
            let execution = match self.source.fetch_execution(execution_id).await {
                Ok(execution) => execution,
                Err(err) => {
                    warn!("poll tick for execution {execution_id} failed: {err}");
                    continue;
                }
            };

            for (step, fresh) in tracker.observe(&execution.trace) {
                on_step(&step, fresh);
            }

            match execution.status {
                ExecutionStatus::Running => {}
                ExecutionStatus::Success => {
                    let target = match extract_document_id(&execution.trace) {
                        Some(id) => NavigationTarget::Document(id),
                        None => {
                            warn!(
                                "execution {execution_id} finished without a document reference"
                            );
                            NavigationTarget::Dashboard
                        }
                    };
                    return PollResult::Completed { target };
                }
                ExecutionStatus::Error => {
                    return PollResult::Failed {
                        target: NavigationTarget::Dashboard,
                    };
                }
            }
        }
    }
}

/// Tracks which trace steps have been observed. Step identity is the
/// timestamp when present, the positional index otherwise; trace array
/// order is step order.
#[derive(Default)]
pub struct TraceTracker {
    seen: HashSet<String>,
    primed: bool,
}

impl TraceTracker {
    /// Returns steps not observed before, in array order. Steps already
    /// present on the very first observation carry `fresh = false`.
    pub fn observe(&mut self, trace: &[TraceStep]) -> Vec<(TraceStep, bool)> {
        let fresh = self.primed;
        let mut unseen = Vec::new();
        for (index, step) in trace.iter().enumerate() {
            let key = match &step.ts {
                Some(ts) => format!("ts:{ts}"),
                None => format!("idx:{index}"),
            };
            if self.seen.insert(key) {
                unseen.push((step.clone(), fresh));
            }
        }
        self.primed = true;
        unseen
    }
}

/// Best-effort scrape of a document reference out of free-text trace
/// summaries, newest entry first. The trace has no structured field for
/// this; a miss is recoverable and falls back to the dashboard.
pub fn extract_document_id(trace: &[TraceStep]) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"/documents/([A-Za-z0-9][A-Za-z0-9_-]*)").expect("valid regex"));
    trace.iter().rev().find_map(|step| {
        pattern
            .captures(&step.summary)
            .and_then(|captures| captures.get(1))
            .map(|found| found.as_str().to_string())
    })
}
