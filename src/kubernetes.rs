use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Endpoints, Namespace, Node, PersistentVolume, Pod, Service};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use kube::api::{ListParams, LogParams};
use kube::{Api, Client};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::collector::convert;
use crate::types::{
    DeploymentInfo, DisruptionBudgetInfo, NodeInfo, NodeUsage, PersistentVolumeInfo, PodInfo,
    ServiceInfo,
};
use crate::parsing::{parse_cpu_to_millicores, parse_memory_to_bytes};

/// Read-only view of the cluster consumed by the snapshot collector.
/// Every method is independent so one failing call never blocks the others.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn server_version(&self) -> Result<String>;
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>>;
    /// Current CPU/memory usage per node name, from the metrics API.
    async fn node_usage(&self) -> Result<HashMap<String, NodeUsage>>;
    async fn list_namespaces(&self) -> Result<Vec<String>>;
    async fn list_pods_all_namespaces(&self) -> Result<Vec<PodInfo>>;
    async fn list_deployments_all_namespaces(&self) -> Result<Vec<DeploymentInfo>>;
    async fn list_services_all_namespaces(&self) -> Result<Vec<ServiceInfo>>;
    async fn list_persistent_volumes(&self) -> Result<Vec<PersistentVolumeInfo>>;
    async fn list_disruption_budgets_all_namespaces(&self) -> Result<Vec<DisruptionBudgetInfo>>;
    /// Tail of one container's log. `container` is required by the API
    /// server for pods with more than one container.
    async fn pod_log(&self, namespace: &str, name: &str, container: Option<&str>) -> Result<String>;
}

/// Lines requested per crashing pod; only the last one ends up in a finding.
const LOG_TAIL_LINES: i64 = 50;

/// [`ClusterApi`] backed by a live `kube::Client`. Credential resolution is
/// left to the caller (`Client::try_default` in the binary).
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn server_version(&self) -> Result<String> {
        let info = self.client.apiserver_version().await?;
        Ok(info.git_version)
    }

    async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api.list(&ListParams::default()).await?.items;
        Ok(nodes.iter().filter_map(convert::node_info).collect())
    }

    async fn node_usage(&self) -> Result<HashMap<String, NodeUsage>> {
        let items = list_node_metrics_http(&self.client)
            .await
            .context("metrics.k8s.io unavailable")?;
        Ok(build_node_usage_map(items))
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespaces = api.list(&ListParams::default()).await?.items;
        Ok(namespaces.into_iter().filter_map(|ns| ns.metadata.name).collect())
    }

    async fn list_pods_all_namespaces(&self) -> Result<Vec<PodInfo>> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let pods = api.list(&ListParams::default()).await?.items;
        Ok(pods.iter().filter_map(convert::pod_info).collect())
    }

    async fn list_deployments_all_namespaces(&self) -> Result<Vec<DeploymentInfo>> {
        let api: Api<Deployment> = Api::all(self.client.clone());
        let deployments = api.list(&ListParams::default()).await?.items;
        Ok(deployments.iter().filter_map(convert::deployment_info).collect())
    }

    async fn list_services_all_namespaces(&self) -> Result<Vec<ServiceInfo>> {
        let svc_api: Api<Service> = Api::all(self.client.clone());
        let services = svc_api.list(&ListParams::default()).await?.items;

        // One cluster-wide endpoints list instead of a read per service.
        let ep_api: Api<Endpoints> = Api::all(self.client.clone());
        let endpoints = ep_api.list(&ListParams::default()).await?.items;
        let active: HashSet<(String, String)> = convert::active_endpoint_keys(&endpoints);
        debug!("{} services, {} with active endpoints", services.len(), active.len());

        Ok(services
            .iter()
            .filter_map(|s| convert::service_info(s, &active))
            .collect())
    }

    async fn list_persistent_volumes(&self) -> Result<Vec<PersistentVolumeInfo>> {
        let api: Api<PersistentVolume> = Api::all(self.client.clone());
        let volumes = api.list(&ListParams::default()).await?.items;
        Ok(volumes.iter().filter_map(convert::persistent_volume_info).collect())
    }

    async fn list_disruption_budgets_all_namespaces(&self) -> Result<Vec<DisruptionBudgetInfo>> {
        let api: Api<PodDisruptionBudget> = Api::all(self.client.clone());
        let budgets = api.list(&ListParams::default()).await?.items;
        Ok(budgets.iter().filter_map(convert::disruption_budget_info).collect())
    }

    async fn pod_log(&self, namespace: &str, name: &str, container: Option<&str>) -> Result<String> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            container: container.map(str::to_string),
            tail_lines: Some(LOG_TAIL_LINES),
            ..Default::default()
        };
        Ok(api.logs(name, &params).await?)
    }
}

// metrics.k8s.io node metrics, not covered by k8s-openapi
#[derive(Debug, Deserialize)]
pub(crate) struct NodeMetricsItem {
    pub metadata: serde_json::Value,
    pub usage: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct NodeMetricsList {
    items: Vec<NodeMetricsItem>,
}

async fn list_node_metrics_http(client: &Client) -> Result<Vec<NodeMetricsItem>> {
    use http::Request as HttpRequest;
    let req = HttpRequest::builder()
        .method("GET")
        .uri("/apis/metrics.k8s.io/v1beta1/nodes")
        .body(Vec::new())
        .map_err(|e| anyhow!("build request: {}", e))?;
    let list: NodeMetricsList = client.request(req).await?;
    Ok(list.items)
}

pub(crate) fn build_node_usage_map(items: Vec<NodeMetricsItem>) -> HashMap<String, NodeUsage> {
    let mut map = HashMap::new();
    for item in items {
        let name = match item.metadata.get("name").and_then(|v| v.as_str()) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => continue,
        };
        let cpu = item.usage.get("cpu").and_then(|q| parse_cpu_to_millicores(q));
        let memory = item.usage.get("memory").and_then(|q| parse_memory_to_bytes(q));
        if let (Some(cpu_millicores), Some(memory_bytes)) = (cpu, memory) {
            map.insert(name, NodeUsage { cpu_millicores, memory_bytes });
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_node_usage_map() {
        let mut usage = HashMap::new();
        usage.insert("cpu".to_string(), "1500000000n".to_string());
        usage.insert("memory".to_string(), "2Gi".to_string());

        let mut partial = HashMap::new();
        partial.insert("cpu".to_string(), "250m".to_string());

        let items = vec![
            NodeMetricsItem { metadata: serde_json::json!({"name": "worker-1"}), usage },
            NodeMetricsItem { metadata: serde_json::json!({"name": "worker-2"}), usage: partial },
            NodeMetricsItem { metadata: serde_json::json!({}), usage: HashMap::new() },
        ];

        let map = build_node_usage_map(items);
        assert_eq!(map.len(), 1);
        let w1 = map.get("worker-1").unwrap();
        assert_eq!(w1.cpu_millicores, 1500);
        assert_eq!(w1.memory_bytes, 2 * 1024 * 1024 * 1024);
    }
}
