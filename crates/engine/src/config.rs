//! Engine configuration and per-submission options

use cellgate_core::Priority;
use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;

/// How commits validate and publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStrategy {
    /// Single-clock MVCC: snapshot reads at the attempt's start timestamp,
    /// read-set validation against the newest versions, full history kept.
    #[default]
    Mvcc,
    /// Per-cell modification counters: reads see the current head,
    /// validation compares counters, publication replaces the value in
    /// place. No history, and thus no historical reads.
    ModCount,
    /// Probabilistic fast path: the first attempt commits without read
    /// validation if a Bernoulli trial succeeds, and every later attempt
    /// falls back to the MVCC path. A benchmark knob, never the default —
    /// concurrent fast-path writers can violate serializability.
    HtmFast,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_htm_success_p() -> f64 {
    0.9
}

/// Engine-wide configuration.
///
/// # Example
///
/// ```
/// use cellgate_engine::{CommitStrategy, EngineConfig};
///
/// let config = EngineConfig::default()
///     .with_workers(4)
///     .with_commit_strategy(CommitStrategy::Mvcc);
/// assert_eq!(config.workers, 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker pool size. Defaults to the host's available parallelism.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Default commit strategy for submissions that do not override it.
    #[serde(default)]
    pub commit_strategy: CommitStrategy,
    /// Retry budget and back-off schedule.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Success probability of the fast-path Bernoulli trial.
    #[serde(default = "default_htm_success_p")]
    pub htm_success_p: f64,
    /// Whether a commit may create cells its write set references but the
    /// store does not contain. Off by default: writes to uninitialized
    /// cells fail with `NotFound` at commit time.
    #[serde(default)]
    pub create_on_commit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            workers: default_workers(),
            commit_strategy: CommitStrategy::default(),
            retry: RetryConfig::default(),
            htm_success_p: default_htm_success_p(),
            create_on_commit: false,
        }
    }
}

impl EngineConfig {
    /// Set the worker pool size.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the default commit strategy.
    pub fn with_commit_strategy(mut self, strategy: CommitStrategy) -> Self {
        self.commit_strategy = strategy;
        self
    }

    /// Set the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the fast-path success probability.
    pub fn with_htm_success_p(mut self, p: f64) -> Self {
        self.htm_success_p = p.clamp(0.0, 1.0);
        self
    }

    /// Allow commits to create cells referenced only by their write set.
    pub fn with_create_on_commit(mut self, create: bool) -> Self {
        self.create_on_commit = create;
        self
    }
}

/// Per-submission options, overriding engine defaults where set.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Priority; higher dispatches first, FIFO within a class.
    pub priority: Priority,
    /// Label carried into tracing events.
    pub label: String,
    /// Commit strategy override for this submission.
    pub commit_strategy: Option<CommitStrategy>,
    /// Attempt-budget override for this submission.
    pub max_attempts: Option<u32>,
}

impl SubmitOptions {
    /// Options with defaults: priority 0, empty label, engine strategy and
    /// budget.
    pub fn new() -> Self {
        SubmitOptions::default()
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Override the commit strategy.
    pub fn with_commit_strategy(mut self, strategy: CommitStrategy) -> Self {
        self.commit_strategy = Some(strategy);
        self
    }

    /// Override the attempt budget.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }
}
