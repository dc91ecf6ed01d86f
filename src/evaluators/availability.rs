use super::{EvaluationContext, Evaluator};
use crate::parsing::last_log_line;
use crate::types::{Category, Finding, FindingDetail, PodInfo, PodPhase, ResourceKind};

pub const CRASH_LOOP_BACK_OFF: &str = "CrashLoopBackOff";

/// Pods whose logs the collector fetches as evidence for the crash rule.
pub fn needs_log_evidence(pod: &PodInfo) -> bool {
    pod.phase == PodPhase::Failed || pod.has_waiting_reason(CRASH_LOOP_BACK_OFF)
}

/// Container whose log is read as evidence: the first one in CrashLoopBackOff,
/// otherwise the first container reported in the pod status.
pub fn log_container(pod: &PodInfo) -> Option<&str> {
    pod.container_statuses
        .iter()
        .find(|c| c.waiting_reason.as_deref() == Some(CRASH_LOOP_BACK_OFF))
        .or_else(|| pod.container_statuses.first())
        .map(|c| c.name.as_str())
}

/// A node condition that is a critical issue when reported as "True".
struct ConditionRule {
    condition: &'static str,
    message: &'static str,
    actions: &'static [&'static str],
}

const NODE_PRESSURE_RULES: &[ConditionRule] = &[
    ConditionRule {
        condition: "MemoryPressure",
        message: "Node is under MemoryPressure.",
        actions: &[
            "Investigate memory-intensive pods running on this node.",
            "Consider redistributing workloads or adding more memory resources.",
        ],
    },
    ConditionRule {
        condition: "DiskPressure",
        message: "Node is under DiskPressure.",
        actions: &[
            "Free up disk space on the node.",
            "Consider moving pods to other nodes with more available disk space.",
        ],
    },
];

const CRASH_ACTIONS: &[&str] = &[
    "Check the application code or configuration causing the crash.",
    "Redeploy the pod and monitor its status.",
];

const UNAVAILABLE_REPLICA_ACTIONS: &[&str] = &[
    "Check the liveness and readiness probes in the deployment configuration.",
    "Redeploy the application and monitor the pods' status.",
];

const EXCESS_REPLICA_ACTIONS: &[&str] = &[
    "Check whether a rollout is still in progress.",
    "Verify that no other controller is scaling the deployment.",
];

/// Critical issues: crashing pods, node pressure, replica shortfalls.
pub struct AvailabilityEvaluator;

impl Evaluator for AvailabilityEvaluator {
    fn name(&self) -> &str {
        "Critical Issues"
    }

    fn inputs(&self) -> &[ResourceKind] {
        &[ResourceKind::Pods, ResourceKind::Nodes, ResourceKind::Deployments]
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> Vec<Finding> {
        let mut findings = crash_findings(ctx);
        findings.extend(node_pressure_findings(ctx));
        findings.extend(deployment_findings(ctx));
        findings
    }
}

fn crash_findings(ctx: &EvaluationContext) -> Vec<Finding> {
    ctx.snapshot
        .pods
        .items
        .iter()
        .filter(|p| needs_log_evidence(p))
        .map(|pod| {
            let message = if pod.phase == PodPhase::Failed {
                format!("Pod \"{}\" in Failed state.", pod.name)
            } else {
                let crashing: Vec<&str> = pod
                    .container_statuses
                    .iter()
                    .filter(|c| c.waiting_reason.as_deref() == Some(CRASH_LOOP_BACK_OFF))
                    .map(|c| c.name.as_str())
                    .collect();
                format!(
                    "Pod \"{}\" has containers in {}: {}.",
                    pod.name,
                    CRASH_LOOP_BACK_OFF,
                    crashing.join(", ")
                )
            };
            let evidence = match ctx.snapshot.pod_log(&pod.key()) {
                Some(Ok(log)) => last_log_line(log),
                Some(Err(e)) => Some(e.to_string()),
                None => None,
            };
            Finding::new(Category::Critical, pod.subject(), message)
                .with_actions(CRASH_ACTIONS)
                .with_evidence(evidence)
        })
        .collect()
}

fn node_pressure_findings(ctx: &EvaluationContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    for node in &ctx.snapshot.nodes.items {
        for rule in NODE_PRESSURE_RULES {
            if node.has_condition(rule.condition) {
                findings.push(
                    Finding::new(Category::Critical, node.name.clone(), rule.message)
                        .with_actions(rule.actions),
                );
            }
        }
    }
    findings
}

fn deployment_findings(ctx: &EvaluationContext) -> Vec<Finding> {
    ctx.snapshot
        .deployments
        .items
        .iter()
        .filter(|d| d.available_replicas != d.desired_replicas)
        .map(|d| {
            // negative while a rollout briefly runs extra replicas; reported as-is
            let unavailable = d.desired_replicas - d.available_replicas;
            let (message, actions) = if unavailable > 0 {
                (
                    format!("Deployment \"{}\" has {} replicas not available.", d.name, unavailable),
                    UNAVAILABLE_REPLICA_ACTIONS,
                )
            } else {
                (
                    format!(
                        "Deployment \"{}\" has {} more available replicas than desired.",
                        d.name, -unavailable
                    ),
                    EXCESS_REPLICA_ACTIONS,
                )
            };
            Finding::new(Category::Critical, format!("{}/{}", d.namespace, d.name), message)
                .with_actions(actions)
                .with_detail(FindingDetail::UnavailableReplicas {
                    desired: d.desired_replicas,
                    available: d.available_replicas,
                    unavailable,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Snapshot;
    use crate::error::LogRetrievalError;
    use crate::evaluators::test_support::*;
    use crate::types::{ContainerStatusInfo, DeploymentInfo, NodeCondition};

    fn failed_pod_snapshot(log: &str) -> Snapshot {
        let mut snapshot = Snapshot::default();
        let pod = pod("prod", "worker-7", PodPhase::Failed);
        snapshot.pod_logs.insert(pod.key(), Ok(log.to_string()));
        snapshot.pods.items.push(pod);
        snapshot
    }

    #[test]
    fn test_failed_pod_evidence_is_last_log_line() {
        for log in ["panic: boom", "starting\nloading config\npanic: boom\n"] {
            let findings = AvailabilityEvaluator.evaluate(&context(failed_pod_snapshot(log)));
            assert_eq!(findings.len(), 1);
            assert_eq!(findings[0].category, Category::Critical);
            assert_eq!(findings[0].subject, "prod/worker-7");
            assert_eq!(findings[0].evidence.as_deref(), Some("panic: boom"));
            assert_eq!(findings[0].suggested_actions.len(), 2);
        }
    }

    #[test]
    fn test_crash_loop_with_log_error_still_reported() {
        let mut snapshot = Snapshot::default();
        let mut p = pod("dev", "api-1", PodPhase::Running);
        p.container_statuses = vec![
            ContainerStatusInfo { name: "sidecar".to_string(), waiting_reason: None },
            ContainerStatusInfo {
                name: "api".to_string(),
                waiting_reason: Some(CRASH_LOOP_BACK_OFF.to_string()),
            },
        ];
        snapshot.pod_logs.insert(
            p.key(),
            Err(LogRetrievalError {
                namespace: "dev".to_string(),
                pod: "api-1".to_string(),
                message: "container api is waiting to start".to_string(),
            }),
        );
        snapshot.pods.items.push(p);

        let findings = AvailabilityEvaluator.evaluate(&context(snapshot));
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("CrashLoopBackOff: api"));
        assert!(findings[0]
            .evidence
            .as_deref()
            .unwrap()
            .contains("failed to retrieve logs for dev/api-1"));
    }

    #[test]
    fn test_log_container_prefers_crashing_container() {
        let mut p = pod("dev", "api-1", PodPhase::Running);
        assert_eq!(log_container(&p), None);

        p.container_statuses = vec![
            ContainerStatusInfo { name: "istio-proxy".to_string(), waiting_reason: None },
            ContainerStatusInfo {
                name: "api".to_string(),
                waiting_reason: Some(CRASH_LOOP_BACK_OFF.to_string()),
            },
        ];
        assert_eq!(log_container(&p), Some("api"));

        p.container_statuses[1].waiting_reason = None;
        assert_eq!(log_container(&p), Some("istio-proxy"));
    }

    #[test]
    fn test_healthy_pods_are_ignored() {
        let mut snapshot = Snapshot::default();
        snapshot.pods.items.push(pod("dev", "ok", PodPhase::Running));
        snapshot.pods.items.push(pod("dev", "done", PodPhase::Succeeded));
        let mut waiting = pod("dev", "pulling", PodPhase::Pending);
        waiting.container_statuses.push(ContainerStatusInfo {
            name: "app".to_string(),
            waiting_reason: Some("ImagePullBackOff".to_string()),
        });
        snapshot.pods.items.push(waiting);
        assert!(AvailabilityEvaluator.evaluate(&context(snapshot)).is_empty());
    }

    #[test]
    fn test_node_with_both_pressures_yields_two_findings() {
        let mut snapshot = Snapshot::default();
        let mut n = node("worker-1");
        n.conditions.push(NodeCondition { type_: "MemoryPressure".to_string(), status: true });
        n.conditions.push(NodeCondition { type_: "DiskPressure".to_string(), status: true });
        snapshot.nodes.items.push(n);
        let mut calm = node("worker-2");
        calm.conditions.push(NodeCondition { type_: "MemoryPressure".to_string(), status: false });
        snapshot.nodes.items.push(calm);

        let findings = AvailabilityEvaluator.evaluate(&context(snapshot));
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.subject == "worker-1"));
        assert_eq!(findings[0].message, "Node is under MemoryPressure.");
        assert_eq!(findings[1].message, "Node is under DiskPressure.");
    }

    #[test]
    fn test_deployment_replica_mismatch() {
        let mut snapshot = Snapshot::default();
        for (name, desired, available) in [("steady", 3, 3), ("short", 5, 2), ("surge", 2, 3)] {
            snapshot.deployments.items.push(DeploymentInfo {
                namespace: "prod".to_string(),
                name: name.to_string(),
                desired_replicas: desired,
                available_replicas: available,
            });
        }

        let findings = AvailabilityEvaluator.evaluate(&context(snapshot));
        assert_eq!(findings.len(), 2);

        assert_eq!(findings[0].subject, "prod/short");
        assert_eq!(
            findings[0].detail,
            Some(FindingDetail::UnavailableReplicas { desired: 5, available: 2, unavailable: 3 })
        );
        assert!(findings[0].message.contains("3 replicas not available"));

        assert_eq!(findings[1].subject, "prod/surge");
        assert_eq!(
            findings[1].detail,
            Some(FindingDetail::UnavailableReplicas { desired: 2, available: 3, unavailable: -1 })
        );
        assert!(findings[1].message.contains("1 more available replicas than desired"));
    }
}
