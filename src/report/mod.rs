use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::collector::Snapshot;
use crate::error::{EvaluatorError, FetchError};
use crate::evaluators::EvaluatorOutcome;
use crate::types::{Category, Finding, PodPhase, ResourceKind};

/// Headline numbers about the cluster, shown before any finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterOverview {
    pub version: Result<String, FetchError>,
    /// (node name, ready)
    pub nodes: Vec<(String, bool)>,
    pub namespaces: Vec<String>,
    pub total_pods: usize,
    pub running_pods: usize,
    pub pending_pods: usize,
    pub failed_pods: usize,
    pub fetch_errors: Vec<FetchError>,
}

impl ClusterOverview {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let pods = &snapshot.pods.items;
        let count = |phase: PodPhase| pods.iter().filter(|p| p.phase == phase).count();
        Self {
            version: snapshot.version.clone(),
            nodes: snapshot
                .nodes
                .items
                .iter()
                .map(|n| (n.name.clone(), n.ready))
                .collect(),
            namespaces: snapshot.namespaces.items.clone(),
            total_pods: pods.len(),
            running_pods: count(PodPhase::Running),
            pending_pods: count(PodPhase::Pending),
            failed_pods: count(PodPhase::Failed),
            fetch_errors: [ResourceKind::Nodes, ResourceKind::Namespaces, ResourceKind::Pods]
                .into_iter()
                .filter_map(|k| snapshot.fetch_error(k).cloned())
                .collect(),
        }
    }
}

/// Output of one evaluator, with the fetch errors of the inputs it read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub title: String,
    pub findings: Vec<Finding>,
    pub fetch_errors: Vec<FetchError>,
    pub evaluator_error: Option<EvaluatorError>,
}

impl ReportSection {
    pub fn from_outcome(outcome: EvaluatorOutcome, snapshot: &Snapshot) -> Self {
        let fetch_errors = outcome
            .inputs
            .iter()
            .filter_map(|k| snapshot.fetch_error(*k).cloned())
            .collect();
        let (findings, evaluator_error) = match outcome.result {
            Ok(findings) => (findings, None),
            Err(e) => (Vec::new(), Some(e)),
        };
        Self { title: outcome.name, findings, fetch_errors, evaluator_error }
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty() && self.fetch_errors.is_empty() && self.evaluator_error.is_none()
    }
}

/// Fixed follow-up advice, one line per category that had at least one finding.
pub fn next_step_for(category: Category) -> &'static str {
    match category {
        Category::Critical => "Address the critical issues in the identified namespaces and nodes.",
        Category::Performance => "Investigate and optimize resource usage on high-demand nodes and stuck pods.",
        Category::Security => "Review flagged images and update affected workloads.",
        Category::Network => "Review service endpoints, pod networking and DNS configuration.",
        Category::Storage => "Reconcile persistent volumes that are not bound.",
        Category::Disruption => "Restore healthy replica counts for workloads below their disruption budget.",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub counts: BTreeMap<Category, usize>,
    pub next_steps: Vec<String>,
}

impl Summary {
    /// Fold over all findings. Every category is present in `counts`, zero or not.
    pub fn from_findings<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Self {
        let mut counts: BTreeMap<Category, usize> = Category::ALL.iter().map(|c| (*c, 0)).collect();
        for f in findings {
            *counts.entry(f.category).or_insert(0) += 1;
        }
        let next_steps = Category::ALL
            .iter()
            .filter(|c| counts.get(*c).copied().unwrap_or(0) > 0)
            .map(|c| next_step_for(*c).to_string())
            .collect();
        Self { counts, next_steps }
    }

    pub fn count(&self, category: Category) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    pub fn total_issues(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn has_issues(&self) -> bool {
        self.total_issues() > 0
    }
}

/// Complete result of one diagnostic run, handed to the report sinks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticReport {
    pub cluster_name: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub overview: ClusterOverview,
    pub sections: Vec<ReportSection>,
    pub summary: Summary,
}

impl DiagnosticReport {
    pub fn new(
        cluster_name: Option<String>,
        generated_at: DateTime<Utc>,
        snapshot: &Snapshot,
        outcomes: Vec<EvaluatorOutcome>,
    ) -> Self {
        let sections: Vec<ReportSection> = outcomes
            .into_iter()
            .map(|o| ReportSection::from_outcome(o, snapshot))
            .collect();
        let summary = Summary::from_findings(sections.iter().flat_map(|s| s.findings.iter()));
        Self {
            cluster_name,
            generated_at,
            overview: ClusterOverview::from_snapshot(snapshot),
            sections,
            summary,
        }
    }

    /// All findings in section order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.sections.iter().flat_map(|s| s.findings.iter())
    }

    pub fn has_issues(&self) -> bool {
        self.summary.has_issues()
    }

    /// True when some section could not be fully produced.
    pub fn is_degraded(&self) -> bool {
        self.overview.version.is_err()
            || self
                .sections
                .iter()
                .any(|s| !s.fetch_errors.is_empty() || s.evaluator_error.is_some())
    }
}
