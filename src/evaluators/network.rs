use super::{EvaluationContext, Evaluator};
use crate::types::{Category, Finding, PodPhase, ResourceKind, ServiceType};

pub const DEFAULT_DNS_POLICY: &str = "ClusterFirst";

const NO_ENDPOINT_ACTIONS: &[&str] = &[
    "Check if the associated pods are running and ready.",
    "Verify the service selector matches the pod labels correctly.",
];

const NO_IP_ACTIONS: &[&str] = &[
    "Ensure the CNI plugin is functioning correctly.",
    "Investigate network policy or security group configurations.",
];

/// Services without endpoints, pods without an IP, and running pods that
/// bypass the cluster's default DNS policy.
pub struct NetworkEvaluator {
    default_dns_policy: String,
}

impl NetworkEvaluator {
    pub fn new(default_dns_policy: impl Into<String>) -> Self {
        Self { default_dns_policy: default_dns_policy.into() }
    }
}

impl Default for NetworkEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_DNS_POLICY)
    }
}

impl Evaluator for NetworkEvaluator {
    fn name(&self) -> &str {
        "Network Diagnostics"
    }

    fn inputs(&self) -> &[ResourceKind] {
        &[ResourceKind::Services, ResourceKind::Pods]
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> Vec<Finding> {
        let mut findings = Vec::new();

        for svc in &ctx.snapshot.services.items {
            if svc.service_type == ServiceType::ClusterIP && !svc.has_active_endpoints {
                findings.push(
                    Finding::new(
                        Category::Network,
                        format!("{}/{}", svc.namespace, svc.name),
                        format!(
                            "Service {} in namespace {} has no active endpoints.",
                            svc.name, svc.namespace
                        ),
                    )
                    .with_actions(NO_ENDPOINT_ACTIONS),
                );
            }
        }

        for pod in &ctx.snapshot.pods.items {
            if pod.pod_ip.is_none() {
                findings.push(
                    Finding::new(
                        Category::Network,
                        pod.subject(),
                        format!(
                            "Pod {} in namespace {} has no IP address assigned.",
                            pod.name, pod.namespace
                        ),
                    )
                    .with_actions(NO_IP_ACTIONS),
                );
            }
            if pod.phase != PodPhase::Running {
                continue;
            }
            if let Some(policy) = pod.dns_policy.as_deref() {
                if policy != self.default_dns_policy {
                    let advice = format!(
                        "Set dnsPolicy to {} unless the pod needs a custom resolver.",
                        self.default_dns_policy
                    );
                    let mut finding = Finding::new(
                        Category::Network,
                        pod.subject(),
                        format!(
                            "Pod {} uses DNS policy {} instead of the cluster default {}.",
                            pod.name, policy, self.default_dns_policy
                        ),
                    );
                    finding.suggested_actions = vec![
                        advice,
                        "Verify in-cluster service names resolve from the pod.".to_string(),
                    ];
                    findings.push(finding);
                }
            }
        }

        findings
    }
}
