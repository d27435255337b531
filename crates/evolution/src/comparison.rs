//! Baseline-vs-shadow comparison and the human approval gate.
//!
//! The evolution loop never waits on a human. Callers that want an explicit
//! go-ahead before adopting a cheaper or faster strategy run the two
//! [`Metrics`] through [`ShadowReview`], which asks an [`ApprovalGate`].

use async_trait::async_trait;
use shadow_core::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Risk attached to a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    /// Internal configuration change
    Low,
    /// Visible behavior change
    Medium,
    /// Irreversible or costly change
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

/// A human (or policy) that approves changes.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    /// Ask for permission; `true` means approved.
    async fn ask_permission(&self, risk: RiskLevel, prompt: &str) -> bool;
}

/// Thresholds used when comparing a shadow run against its baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonThresholds {
    /// Shadow output must be at least this fraction of the baseline length
    pub min_output_ratio: f64,
    /// Minimum cost saving, in percent, to count as an improvement
    pub min_cost_saving_pct: f64,
    /// Minimum latency saving, as a fraction of baseline latency
    pub min_latency_saving: f64,
}

impl Default for ComparisonThresholds {
    fn default() -> Self {
        Self {
            min_output_ratio: 0.8,
            min_cost_saving_pct: 10.0,
            min_latency_saving: 0.2,
        }
    }
}

/// Outcome of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Shadow output is too short to be trusted
    Degraded,
    /// Shadow is not meaningfully better
    NoImprovement,
    /// Shadow is cheaper and/or faster
    Improvement {
        /// Cost saved, in percent of the baseline
        cost_saved_pct: f64,
        /// Latency saved (zero if the shadow was not faster)
        latency_saved: Duration,
        /// Human-readable reasons ("save 40% cost", ...)
        reasons: Vec<String>,
    },
}

/// Compare a shadow run against its baseline.
pub fn compare(baseline: &Metrics, shadow: &Metrics, thresholds: &ComparisonThresholds) -> Verdict {
    let required = (baseline.output.chars().count() as f64 * thresholds.min_output_ratio) as usize;
    if shadow.output.chars().count() < required {
        return Verdict::Degraded;
    }

    let cost_saved_pct = if baseline.cost > 0.0 {
        (baseline.cost - shadow.cost) / baseline.cost * 100.0
    } else {
        0.0
    };
    let latency_saved = baseline.latency.saturating_sub(shadow.latency);

    let mut reasons = Vec::new();
    if cost_saved_pct >= thresholds.min_cost_saving_pct {
        reasons.push(format!("save {:.0}% cost", cost_saved_pct));
    }
    if latency_saved > baseline.latency.mul_f64(thresholds.min_latency_saving) {
        reasons.push(format!("run {:?} faster", latency_saved));
    }

    if reasons.is_empty() {
        Verdict::NoImprovement
    } else {
        Verdict::Improvement {
            cost_saved_pct,
            latency_saved,
            reasons,
        }
    }
}

/// What happened to a proposed upgrade.
#[derive(Debug, Clone, PartialEq)]
pub enum UpgradeOutcome {
    /// Not worth asking about
    Discarded(Verdict),
    /// The gate approved
    Approved,
    /// The gate rejected
    Rejected,
}

/// Asks an approval gate before a shadow strategy replaces its baseline.
pub struct ShadowReview {
    gate: Arc<dyn ApprovalGate>,
    thresholds: ComparisonThresholds,
}

impl ShadowReview {
    /// Create a review backed by `gate`.
    pub fn new(gate: Arc<dyn ApprovalGate>) -> Self {
        Self {
            gate,
            thresholds: ComparisonThresholds::default(),
        }
    }

    /// Override the comparison thresholds.
    pub fn with_thresholds(mut self, thresholds: ComparisonThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Compare the runs and, if the shadow is better, ask the gate.
    pub async fn propose_upgrade(&self, task_name: &str, baseline: &Metrics, shadow: &Metrics) -> UpgradeOutcome {
        let verdict = compare(baseline, shadow, &self.thresholds);
        let reasons = match &verdict {
            Verdict::Improvement { reasons, .. } => reasons.join(" and "),
            _ => {
                debug!(task = task_name, ?verdict, "Shadow run discarded");
                return UpgradeOutcome::Discarded(verdict);
            }
        };

        let prompt = format!(
            "Found a way to {} on '{}'.\n\n\
             [Baseline] Cost: {:.4} | Latency: {:?}\n\
             [Shadow]   Cost: {:.4} | Latency: {:?}\n\n\
             Output Diff Preview:\n{}\n\n\
             Approve upgrade? [Y/N]",
            reasons,
            task_name,
            baseline.cost,
            baseline.latency,
            shadow.cost,
            shadow.latency,
            diff_preview(&baseline.output, &shadow.output),
        );

        if self.gate.ask_permission(RiskLevel::Low, &prompt).await {
            info!(task = task_name, "Shadow upgrade approved");
            UpgradeOutcome::Approved
        } else {
            info!(task = task_name, "Shadow upgrade rejected");
            UpgradeOutcome::Rejected
        }
    }
}

/// Two-line preview of the outputs, truncated and flattened.
pub fn diff_preview(baseline: &str, shadow: &str) -> String {
    fn truncate(s: &str) -> String {
        let flat = s.replace('\n', " ");
        if flat.chars().count() > 50 {
            format!("{}...", flat.chars().take(47).collect::<String>())
        } else {
            flat
        }
    }
    format!("- {}\n+ {}", truncate(baseline), truncate(shadow))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingGate {
        approve: bool,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingGate {
        fn new(approve: bool) -> Arc<Self> {
            Arc::new(Self {
                approve,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ApprovalGate for RecordingGate {
        async fn ask_permission(&self, _risk: RiskLevel, prompt: &str) -> bool {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.approve
        }
    }

    const DIGEST: &str = "Here is your morning digest with 5 news articles and weather.";

    #[tokio::test]
    async fn test_cost_saving_asks_gate() {
        let gate = RecordingGate::new(true);
        let review = ShadowReview::new(gate.clone());
        let baseline = Metrics::new(DIGEST).with_cost(0.10).with_latency(Duration::from_secs(2));
        let shadow = Metrics::new(DIGEST).with_cost(0.06).with_latency(Duration::from_secs(2));

        let outcome = review.propose_upgrade("morning digest", &baseline, &shadow).await;

        assert_eq!(outcome, UpgradeOutcome::Approved);
        let prompts = gate.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("save 40% cost"));
    }

    #[tokio::test]
    async fn test_degraded_output_is_discarded() {
        let gate = RecordingGate::new(true);
        let review = ShadowReview::new(gate.clone());
        let baseline = Metrics::new("A very long detailed report containing 10 sections of deep research.").with_cost(0.10);
        let shadow = Metrics::new("Too short.").with_cost(0.01);

        let outcome = review.propose_upgrade("deep research", &baseline, &shadow).await;

        assert_eq!(outcome, UpgradeOutcome::Discarded(Verdict::Degraded));
        assert!(gate.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_is_reported() {
        let review = ShadowReview::new(RecordingGate::new(false));
        let baseline = Metrics::new("same").with_latency(Duration::from_secs(10));
        let shadow = Metrics::new("same").with_latency(Duration::from_secs(5));

        assert_eq!(
            review.propose_upgrade("summary", &baseline, &shadow).await,
            UpgradeOutcome::Rejected
        );
    }

    #[test]
    fn test_small_gains_are_ignored() {
        let baseline = Metrics::new("out").with_cost(1.0).with_latency(Duration::from_millis(1000));
        let shadow = Metrics::new("out").with_cost(0.95).with_latency(Duration::from_millis(900));
        assert_eq!(compare(&baseline, &shadow, &ComparisonThresholds::default()), Verdict::NoImprovement);
    }

    #[test]
    fn test_latency_reason() {
        let baseline = Metrics::new("out").with_latency(Duration::from_millis(1000));
        let shadow = Metrics::new("out").with_latency(Duration::from_millis(500));
        match compare(&baseline, &shadow, &ComparisonThresholds::default()) {
            Verdict::Improvement { latency_saved, reasons, .. } => {
                assert_eq!(latency_saved, Duration::from_millis(500));
                assert_eq!(reasons, vec!["run 500ms faster".to_string()]);
            }
            other => panic!("unexpected verdict: {:?}", other),
        }
    }

    #[test]
    fn test_diff_preview_truncates() {
        let long = "x".repeat(80);
        let preview = diff_preview(&long, "line one\nline two");
        assert_eq!(preview, format!("- {}...\n+ line one line two", "x".repeat(47)));
    }
}
