//! Rule evaluators: pure functions from a snapshot plus thresholds to findings.
//!
//! Each concern area is one [`Evaluator`]. [`EvaluatorSet::run`] executes them
//! on blocking tasks, waits for all of them, and returns one outcome per
//! evaluator in declared order. A panicking evaluator yields an error outcome
//! without affecting the others.

pub mod availability;
pub mod disruption;
pub mod network;
pub mod performance;
pub mod security;
pub mod storage;

use chrono::{DateTime, Utc};
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, error};

use crate::collector::Snapshot;
use crate::error::EvaluatorError;
use crate::types::{Config, Finding, ResourceKind, ThresholdConfig};

pub use availability::AvailabilityEvaluator;
pub use disruption::DisruptionBudgetEvaluator;
pub use network::NetworkEvaluator;
pub use performance::PerformanceEvaluator;
pub use security::{ImageMatcher, SecurityEvaluator, SubstringMatcher};
pub use storage::StorageEvaluator;

/// Everything an evaluator may look at. `now` is fixed for the whole run.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub snapshot: Snapshot,
    pub thresholds: ThresholdConfig,
    pub now: DateTime<Utc>,
}

impl EvaluationContext {
    pub fn new(snapshot: Snapshot, thresholds: ThresholdConfig) -> Self {
        Self { snapshot, thresholds, now: Utc::now() }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

pub trait Evaluator: Send + Sync {
    /// Report section title.
    fn name(&self) -> &str;

    /// Snapshot kinds this evaluator reads; their fetch errors are shown in its section.
    fn inputs(&self) -> &[ResourceKind];

    fn evaluate(&self, ctx: &EvaluationContext) -> Vec<Finding>;
}

#[derive(Debug, Clone)]
pub struct EvaluatorOutcome {
    pub name: String,
    pub inputs: Vec<ResourceKind>,
    pub result: Result<Vec<Finding>, EvaluatorError>,
}

#[derive(Clone, Default)]
pub struct EvaluatorSet {
    evaluators: Vec<Arc<dyn Evaluator>>,
}

impl EvaluatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The six built-in evaluators in report order.
    pub fn standard(config: &Config) -> Self {
        Self::new()
            .with_evaluator(AvailabilityEvaluator)
            .with_evaluator(PerformanceEvaluator)
            .with_evaluator(SecurityEvaluator::new(Arc::new(SubstringMatcher::new(
                config.sensitive_images.clone(),
            ))))
            .with_evaluator(NetworkEvaluator::new(config.default_dns_policy.clone()))
            .with_evaluator(StorageEvaluator)
            .with_evaluator(DisruptionBudgetEvaluator)
    }

    pub fn with_evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluators.push(Arc::new(evaluator));
        self
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }

    pub async fn run(&self, ctx: Arc<EvaluationContext>) -> Vec<EvaluatorOutcome> {
        let handles: Vec<_> = self
            .evaluators
            .iter()
            .map(|evaluator| {
                let evaluator = Arc::clone(evaluator);
                let ctx = Arc::clone(&ctx);
                tokio::task::spawn_blocking(move || evaluator.evaluate(&ctx))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (evaluator, handle) in self.evaluators.iter().zip(handles) {
            let name = evaluator.name().to_string();
            let result = match handle.await {
                Ok(findings) => {
                    debug!("{}: {} findings", name, findings.len());
                    Ok(findings)
                }
                Err(e) if e.is_panic() => Err(EvaluatorError::Panicked {
                    evaluator: name.clone(),
                    message: panic_message(e.into_panic()),
                }),
                Err(_) => Err(EvaluatorError::Cancelled { evaluator: name.clone() }),
            };
            if let Err(e) = &result {
                error!("{}", e);
            }
            outcomes.push(EvaluatorOutcome {
                name,
                inputs: evaluator.inputs().to_vec(),
                result,
            });
        }
        outcomes
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::types::*;

    pub fn pod(namespace: &str, name: &str, phase: PodPhase) -> PodInfo {
        PodInfo {
            namespace: namespace.to_string(),
            name: name.to_string(),
            phase,
            container_statuses: Vec::new(),
            pod_ip: Some("10.0.0.1".to_string()),
            start_time: None,
            dns_policy: Some("ClusterFirst".to_string()),
            container_images: Vec::new(),
        }
    }

    pub fn node(name: &str) -> NodeInfo {
        NodeInfo {
            name: name.to_string(),
            ready: true,
            conditions: vec![NodeCondition { type_: "Ready".to_string(), status: true }],
            allocatable_cpu_millicores: Some(4000),
            allocatable_memory_bytes: Some(16 * 1024 * 1024 * 1024),
            usage: None,
        }
    }

    pub fn context(snapshot: Snapshot) -> EvaluationContext {
        EvaluationContext::new(snapshot, ThresholdConfig::default())
    }
}
