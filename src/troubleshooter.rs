use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::collector::SnapshotCollector;
use crate::evaluators::{EvaluationContext, EvaluatorSet};
use crate::kubernetes::ClusterApi;
use crate::report::DiagnosticReport;
use crate::types::{Config, ThresholdConfig};

/// One diagnostic pass: fetch a snapshot, run every evaluator, aggregate.
pub struct Troubleshooter<'a, A: ClusterApi + ?Sized> {
    api: &'a A,
    evaluators: EvaluatorSet,
    thresholds: ThresholdConfig,
    cluster_name: Option<String>,
    fetch_timeout: Option<Duration>,
}

impl<'a, A: ClusterApi + ?Sized> Troubleshooter<'a, A> {
    pub fn new(api: &'a A, config: &Config) -> Self {
        Self {
            api,
            evaluators: EvaluatorSet::standard(config),
            thresholds: config.thresholds,
            cluster_name: config.cluster_name.clone(),
            fetch_timeout: config.fetch_timeout,
        }
    }

    pub fn with_evaluators(mut self, evaluators: EvaluatorSet) -> Self {
        self.evaluators = evaluators;
        self
    }

    pub async fn run(&self) -> DiagnosticReport {
        let mut collector = SnapshotCollector::new(self.api);
        if let Some(timeout) = self.fetch_timeout {
            collector = collector.with_timeout(timeout);
        }
        info!("Collecting cluster snapshot");
        let snapshot = collector.fetch().await;

        let ctx = Arc::new(EvaluationContext::new(snapshot, self.thresholds));
        info!("Running {} evaluators", self.evaluators.len());
        let outcomes = self.evaluators.run(Arc::clone(&ctx)).await;

        let report = DiagnosticReport::new(self.cluster_name.clone(), Utc::now(), &ctx.snapshot, outcomes);
        info!(
            "Diagnostic complete: {} total issues found{}",
            report.summary.total_issues(),
            if report.is_degraded() { " (partial data)" } else { "" }
        );
        report
    }
}
