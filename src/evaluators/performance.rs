use super::{EvaluationContext, Evaluator};
use crate::parsing::{bytes_to_gib, exceeds, millicores_to_cores, usage_percent};
use crate::types::{Category, Finding, FindingDetail, NodeInfo, PodPhase, ResourceKind, ResourceMetric};

const RESOURCE_ACTIONS: &[&str] = &[
    "Monitor resource usage trends.",
    "Consider scaling the cluster or optimizing resource allocation.",
];

const SCHEDULING_ACTIONS: &[&str] = &[
    "Check the pod's events for unsatisfiable resource requests, taints or affinity rules.",
    "Verify the cluster has enough free capacity or scale the node pool.",
];

/// Node resource pressure against allocatable capacity, and pods stuck in scheduling.
pub struct PerformanceEvaluator;

impl Evaluator for PerformanceEvaluator {
    fn name(&self) -> &str {
        "Performance Warnings"
    }

    fn inputs(&self) -> &[ResourceKind] {
        &[ResourceKind::Nodes, ResourceKind::NodeMetrics, ResourceKind::Pods]
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> Vec<Finding> {
        let mut findings = Vec::new();
        for node in &ctx.snapshot.nodes.items {
            for metric in [ResourceMetric::Cpu, ResourceMetric::Memory] {
                findings.extend(resource_finding(node, metric, ctx));
            }
        }
        findings.extend(scheduling_findings(ctx));
        findings
    }
}

fn resource_finding(node: &NodeInfo, metric: ResourceMetric, ctx: &EvaluationContext) -> Option<Finding> {
    let usage = node.usage?;
    let (used, allocatable, threshold) = match metric {
        ResourceMetric::Cpu => (
            usage.cpu_millicores,
            node.allocatable_cpu_millicores?,
            ctx.thresholds.cpu_usage_percent(),
        ),
        ResourceMetric::Memory => (
            usage.memory_bytes,
            node.allocatable_memory_bytes?,
            ctx.thresholds.memory_usage_percent(),
        ),
    };
    let used_percent = usage_percent(used, allocatable)?;
    if !exceeds(used_percent, threshold) {
        return None;
    }

    let amounts = match metric {
        ResourceMetric::Cpu => format!(
            "{:.2} of {:.2} cores",
            millicores_to_cores(used),
            millicores_to_cores(allocatable)
        ),
        ResourceMetric::Memory => {
            format!("{:.2} of {:.2} GiB", bytes_to_gib(used), bytes_to_gib(allocatable))
        }
    };
    let message = format!(
        "{} usage at {:.2}% of allocatable ({}), above the {}% threshold.",
        metric, used_percent, amounts, threshold
    );
    Some(
        Finding::new(Category::Performance, node.name.clone(), message)
            .with_actions(RESOURCE_ACTIONS)
            .with_detail(FindingDetail::ResourceUsage {
                metric,
                used_percent,
                threshold_percent: threshold,
            }),
    )
}

fn scheduling_findings(ctx: &EvaluationContext) -> Vec<Finding> {
    let threshold = ctx.thresholds.pod_pending_minutes();
    ctx.snapshot
        .pods
        .items
        .iter()
        .filter(|p| p.phase == PodPhase::Pending)
        .filter_map(|pod| {
            // no start time recorded: nothing to measure against
            let start = pod.start_time?;
            let elapsed_minutes = (ctx.now - start).num_milliseconds() as f64 / 60_000.0;
            if !exceeds(elapsed_minutes, threshold) {
                return None;
            }
            Some(
                Finding::new(
                    Category::Performance,
                    pod.subject(),
                    format!(
                        "Pod \"{}\" has been Pending for {:.1} minutes (threshold {} minutes).",
                        pod.name, elapsed_minutes, threshold
                    ),
                )
                .with_actions(SCHEDULING_ACTIONS)
                .with_detail(FindingDetail::PendingMinutes { elapsed_minutes, threshold_minutes: threshold }),
            )
        })
        .collect()
}
