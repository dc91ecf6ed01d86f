use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::error::ConfigError;

/// Object kinds pulled into a snapshot. Used to tag fetch errors and to tell
/// the report which sections depend on which API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ResourceKind {
    Version,
    Nodes,
    NodeMetrics,
    Namespaces,
    Pods,
    Deployments,
    Services,
    PersistentVolumes,
    DisruptionBudgets,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Version => "cluster version",
            ResourceKind::Nodes => "nodes",
            ResourceKind::NodeMetrics => "node metrics",
            ResourceKind::Namespaces => "namespaces",
            ResourceKind::Pods => "pods",
            ResourceKind::Deployments => "deployments",
            ResourceKind::Services => "services",
            ResourceKind::PersistentVolumes => "persistent volumes",
            ResourceKind::DisruptionBudgets => "pod disruption budgets",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeCondition {
    pub type_: String,
    pub status: bool,
}

/// Live usage reported by the metrics API for a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeUsage {
    pub cpu_millicores: i64,
    pub memory_bytes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeInfo {
    pub name: String,
    pub ready: bool,
    pub conditions: Vec<NodeCondition>,
    pub allocatable_cpu_millicores: Option<i64>,
    pub allocatable_memory_bytes: Option<i64>,
    pub usage: Option<NodeUsage>,
}

impl NodeInfo {
    /// True when the node reports condition `type_` with status "True".
    pub fn has_condition(&self, type_: &str) -> bool {
        self.conditions.iter().any(|c| c.type_ == type_ && c.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    pub fn parse(s: &str) -> Self {
        match s {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerStatusInfo {
    pub name: String,
    pub waiting_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodInfo {
    pub namespace: String,
    pub name: String,
    pub phase: PodPhase,
    pub container_statuses: Vec<ContainerStatusInfo>,
    pub pod_ip: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub dns_policy: Option<String>,
    pub container_images: Vec<String>,
}

impl PodInfo {
    pub fn key(&self) -> PodKey {
        PodKey::new(&self.namespace, &self.name)
    }

    pub fn subject(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    pub fn has_waiting_reason(&self, reason: &str) -> bool {
        self.container_statuses
            .iter()
            .any(|c| c.waiting_reason.as_deref() == Some(reason))
    }
}

/// (namespace, name) pair identifying a pod inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PodKey {
    pub namespace: String,
    pub name: String,
}

impl PodKey {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self { namespace: namespace.to_string(), name: name.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentInfo {
    pub namespace: String,
    pub name: String,
    pub desired_replicas: i32,
    pub available_replicas: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServiceType {
    ClusterIP,
    NodePort,
    LoadBalancer,
    ExternalName,
}

impl ServiceType {
    /// Kubernetes treats an absent type as ClusterIP.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("NodePort") => ServiceType::NodePort,
            Some("LoadBalancer") => ServiceType::LoadBalancer,
            Some("ExternalName") => ServiceType::ExternalName,
            _ => ServiceType::ClusterIP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceInfo {
    pub namespace: String,
    pub name: String,
    pub service_type: ServiceType,
    pub has_active_endpoints: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum VolumePhase {
    Bound,
    Available,
    Released,
    Failed,
    Pending,
    Other(String),
}

impl VolumePhase {
    pub fn parse(s: &str) -> Self {
        match s {
            "Bound" => VolumePhase::Bound,
            "Available" => VolumePhase::Available,
            "Released" => VolumePhase::Released,
            "Failed" => VolumePhase::Failed,
            "Pending" => VolumePhase::Pending,
            other => VolumePhase::Other(other.to_string()),
        }
    }
}

impl fmt::Display for VolumePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumePhase::Other(s) => f.write_str(s),
            known => fmt::Debug::fmt(known, f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistentVolumeInfo {
    pub name: String,
    pub phase: VolumePhase,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisruptionBudgetInfo {
    pub namespace: String,
    pub name: String,
    pub current_healthy: i32,
    pub desired_healthy: i32,
}

/// Resolved numeric limits. Only constructible through [`ThresholdConfig::new`],
/// so every instance holds finite values greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdConfig {
    cpu_usage_percent: f64,
    memory_usage_percent: f64,
    pod_pending_minutes: f64,
}

impl ThresholdConfig {
    pub fn new(
        cpu_usage_percent: f64,
        memory_usage_percent: f64,
        pod_pending_minutes: f64,
    ) -> Result<Self, ConfigError> {
        for (name, value) in [
            ("cpuUsageThresholdPercent", cpu_usage_percent),
            ("memoryUsageThresholdPercent", memory_usage_percent),
            ("podSchedulingDelayThresholdMinutes", pod_pending_minutes),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        Ok(Self { cpu_usage_percent, memory_usage_percent, pod_pending_minutes })
    }

    pub fn cpu_usage_percent(&self) -> f64 {
        self.cpu_usage_percent
    }

    pub fn memory_usage_percent(&self) -> f64 {
        self.memory_usage_percent
    }

    pub fn pod_pending_minutes(&self) -> f64 {
        self.pod_pending_minutes
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpu_usage_percent: 80.0,
            memory_usage_percent: 80.0,
            pod_pending_minutes: 5.0,
        }
    }
}

/// Finding categories, declared in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    Critical,
    Performance,
    Security,
    Network,
    Storage,
    Disruption,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Critical,
        Category::Performance,
        Category::Security,
        Category::Network,
        Category::Storage,
        Category::Disruption,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResourceMetric {
    Cpu,
    Memory,
}

impl fmt::Display for ResourceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceMetric::Cpu => f.write_str("CPU"),
            ResourceMetric::Memory => f.write_str("Memory"),
        }
    }
}

/// Structured values a finding carries besides its text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingDetail {
    UnavailableReplicas { desired: i32, available: i32, unavailable: i32 },
    ResourceUsage { metric: ResourceMetric, used_percent: f64, threshold_percent: f64 },
    PendingMinutes { elapsed_minutes: f64, threshold_minutes: f64 },
    Image { image: String, matched: String },
    VolumePhase { phase: String },
    HealthyReplicas { current: i32, desired: i32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub category: Category,
    pub subject: String,
    pub message: String,
    pub suggested_actions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<FindingDetail>,
}

impl Finding {
    pub fn new(category: Category, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category,
            subject: subject.into(),
            message: message.into(),
            suggested_actions: Vec::new(),
            evidence: None,
            detail: None,
        }
    }

    pub fn with_actions(mut self, actions: &[&str]) -> Self {
        self.suggested_actions = actions.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_evidence(mut self, evidence: Option<String>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_detail(mut self, detail: FindingDetail) -> Self {
        self.detail = Some(detail);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub thresholds: ThresholdConfig,
    pub sensitive_images: Vec<String>,
    pub default_dns_policy: String,
    pub fetch_timeout: Option<std::time::Duration>,
    pub cluster_name: Option<String>,
    pub output_format: OutputFormat,
    pub slack_webhook_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_validation() {
        assert!(ThresholdConfig::new(80.0, 75.0, 5.0).is_ok());
        assert!(ThresholdConfig::new(0.0, 75.0, 5.0).is_err());
        assert!(ThresholdConfig::new(80.0, -1.0, 5.0).is_err());
        assert!(ThresholdConfig::new(80.0, 75.0, f64::NAN).is_err());
        assert!(ThresholdConfig::new(f64::INFINITY, 75.0, 5.0).is_err());

        let err = ThresholdConfig::new(80.0, 75.0, 0.0).unwrap_err();
        assert!(err.to_string().contains("podSchedulingDelayThresholdMinutes"));
    }

    #[test]
    fn test_category_order_is_report_order() {
        let mut shuffled = vec![Category::Disruption, Category::Critical, Category::Network, Category::Performance];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![Category::Critical, Category::Performance, Category::Network, Category::Disruption]
        );
    }

    #[test]
    fn test_phase_parsing() {
        assert_eq!(PodPhase::parse("Failed"), PodPhase::Failed);
        assert_eq!(PodPhase::parse("weird"), PodPhase::Unknown);
        assert_eq!(VolumePhase::parse("Bound"), VolumePhase::Bound);
        assert_eq!(VolumePhase::parse("Lost").to_string(), "Lost");
        assert_eq!(ServiceType::parse(None), ServiceType::ClusterIP);
        assert_eq!(ServiceType::parse(Some("NodePort")), ServiceType::NodePort);
    }

    #[test]
    fn test_node_condition_lookup() {
        let node = NodeInfo {
            name: "n1".to_string(),
            ready: true,
            conditions: vec![
                NodeCondition { type_: "MemoryPressure".to_string(), status: true },
                NodeCondition { type_: "DiskPressure".to_string(), status: false },
            ],
            allocatable_cpu_millicores: None,
            allocatable_memory_bytes: None,
            usage: None,
        };
        assert!(node.has_condition("MemoryPressure"));
        assert!(!node.has_condition("DiskPressure"));
        assert!(!node.has_condition("PIDPressure"));
    }
}
