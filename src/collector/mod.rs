pub mod convert;

use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{FetchError, LogRetrievalError};
use crate::evaluators::availability::{log_container, needs_log_evidence};
use crate::kubernetes::ClusterApi;
use crate::types::*;

/// One resource kind as seen by the collector: the listed objects, or an
/// empty list plus the error that prevented listing them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fetched<T> {
    pub items: Vec<T>,
    pub error: Option<FetchError>,
}

impl<T> Fetched<T> {
    pub fn ok(items: Vec<T>) -> Self {
        Self { items, error: None }
    }

    pub fn failed(error: FetchError) -> Self {
        Self { items: Vec::new(), error: Some(error) }
    }

    fn from_result(result: Result<Vec<T>, FetchError>) -> Self {
        match result {
            Ok(items) => Self::ok(items),
            Err(e) => Self::failed(e),
        }
    }
}

impl<T> Default for Fetched<T> {
    fn default() -> Self {
        Self::ok(Vec::new())
    }
}

/// Immutable view of the cluster taken once per run. Every sequence is
/// sorted so evaluation order, and therefore output, is reproducible.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: Result<String, FetchError>,
    pub nodes: Fetched<NodeInfo>,
    /// Why node usage is missing, when the metrics API could not be read.
    pub node_metrics_error: Option<FetchError>,
    pub namespaces: Fetched<String>,
    pub pods: Fetched<PodInfo>,
    pub deployments: Fetched<DeploymentInfo>,
    pub services: Fetched<ServiceInfo>,
    pub persistent_volumes: Fetched<PersistentVolumeInfo>,
    pub disruption_budgets: Fetched<DisruptionBudgetInfo>,
    /// Logs of pods flagged by the crash rule, keyed by pod.
    pub pod_logs: BTreeMap<PodKey, Result<String, LogRetrievalError>>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: Ok("unknown".to_string()),
            nodes: Fetched::default(),
            node_metrics_error: None,
            namespaces: Fetched::default(),
            pods: Fetched::default(),
            deployments: Fetched::default(),
            services: Fetched::default(),
            persistent_volumes: Fetched::default(),
            disruption_budgets: Fetched::default(),
            pod_logs: BTreeMap::new(),
        }
    }
}

impl Snapshot {
    pub fn fetch_error(&self, kind: ResourceKind) -> Option<&FetchError> {
        match kind {
            ResourceKind::Version => self.version.as_ref().err(),
            ResourceKind::Nodes => self.nodes.error.as_ref(),
            ResourceKind::NodeMetrics => self.node_metrics_error.as_ref(),
            ResourceKind::Namespaces => self.namespaces.error.as_ref(),
            ResourceKind::Pods => self.pods.error.as_ref(),
            ResourceKind::Deployments => self.deployments.error.as_ref(),
            ResourceKind::Services => self.services.error.as_ref(),
            ResourceKind::PersistentVolumes => self.persistent_volumes.error.as_ref(),
            ResourceKind::DisruptionBudgets => self.disruption_budgets.error.as_ref(),
        }
    }

    pub fn fetch_errors(&self) -> Vec<&FetchError> {
        [
            ResourceKind::Version,
            ResourceKind::Nodes,
            ResourceKind::NodeMetrics,
            ResourceKind::Namespaces,
            ResourceKind::Pods,
            ResourceKind::Deployments,
            ResourceKind::Services,
            ResourceKind::PersistentVolumes,
            ResourceKind::DisruptionBudgets,
        ]
        .into_iter()
        .filter_map(|k| self.fetch_error(k))
        .collect()
    }

    pub fn pod_log(&self, key: &PodKey) -> Option<&Result<String, LogRetrievalError>> {
        self.pod_logs.get(key)
    }

    /// Sort every sequence: cluster-scoped kinds by name, namespaced kinds by
    /// namespace then name.
    pub fn sort(&mut self) {
        self.nodes.items.sort_by(|a, b| a.name.cmp(&b.name));
        self.namespaces.items.sort();
        self.pods
            .items
            .sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        self.deployments
            .items
            .sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        self.services
            .items
            .sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        self.persistent_volumes.items.sort_by(|a, b| a.name.cmp(&b.name));
        self.disruption_budgets
            .items
            .sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
    }
}

/// Snapshot fetcher. Lists every kind concurrently; a failure or an expired
/// deadline on one kind is recorded on that kind only.
pub struct SnapshotCollector<'a, A: ClusterApi + ?Sized> {
    api: &'a A,
    deadline: Option<Instant>,
}

impl<'a, A: ClusterApi + ?Sized> SnapshotCollector<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api, deadline: None }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline measured from now. A timeout too large to represent as an
    /// instant means no deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => {
                warn!("fetch timeout of {:?} is out of range, fetching without a deadline", timeout);
                self
            }
        }
    }

    pub async fn fetch(&self) -> Snapshot {
        let api = self.api;
        let (version, nodes, usage, namespaces, pods, deployments, services, volumes, budgets) = tokio::join!(
            self.guarded(ResourceKind::Version, api.server_version()),
            self.guarded(ResourceKind::Nodes, api.list_nodes()),
            self.guarded(ResourceKind::NodeMetrics, api.node_usage()),
            self.guarded(ResourceKind::Namespaces, api.list_namespaces()),
            self.guarded(ResourceKind::Pods, api.list_pods_all_namespaces()),
            self.guarded(ResourceKind::Deployments, api.list_deployments_all_namespaces()),
            self.guarded(ResourceKind::Services, api.list_services_all_namespaces()),
            self.guarded(ResourceKind::PersistentVolumes, api.list_persistent_volumes()),
            self.guarded(ResourceKind::DisruptionBudgets, api.list_disruption_budgets_all_namespaces()),
        );

        let mut nodes = Fetched::from_result(nodes);
        let node_metrics_error = match usage {
            Ok(usage) => {
                for node in &mut nodes.items {
                    node.usage = usage.get(&node.name).copied();
                }
                None
            }
            Err(e) => Some(e),
        };

        let mut snapshot = Snapshot {
            version,
            nodes,
            node_metrics_error,
            namespaces: Fetched::from_result(namespaces),
            pods: Fetched::from_result(pods),
            deployments: Fetched::from_result(deployments),
            services: Fetched::from_result(services),
            persistent_volumes: Fetched::from_result(volumes),
            disruption_budgets: Fetched::from_result(budgets),
            pod_logs: BTreeMap::new(),
        };
        snapshot.sort();
        snapshot.pod_logs = self.fetch_crash_logs(&snapshot.pods.items).await;

        info!(
            "snapshot: {} nodes, {} pods, {} deployments, {} services, {} volumes, {} budgets ({} fetch errors)",
            snapshot.nodes.items.len(),
            snapshot.pods.items.len(),
            snapshot.deployments.items.len(),
            snapshot.services.items.len(),
            snapshot.persistent_volumes.items.len(),
            snapshot.disruption_budgets.items.len(),
            snapshot.fetch_errors().len(),
        );
        snapshot
    }

    async fn fetch_crash_logs(
        &self,
        pods: &[PodInfo],
    ) -> BTreeMap<PodKey, Result<String, LogRetrievalError>> {
        let mut logs = BTreeMap::new();
        for pod in pods.iter().filter(|p| needs_log_evidence(p)) {
            let container = log_container(pod);
            debug!("fetching logs for {} (container {:?})", pod.subject(), container);
            let log = self.api.pod_log(&pod.namespace, &pod.name, container);
            let result = match self.before_deadline(log).await {
                Some(Ok(log)) => Ok(log),
                Some(Err(e)) => Err(format!("{:#}", e)),
                None => Err("deadline expired before the API answered".to_string()),
            }
            .map_err(|message| LogRetrievalError {
                namespace: pod.namespace.clone(),
                pod: pod.name.clone(),
                message,
            });
            if let Err(e) = &result {
                warn!("{}", e);
            }
            logs.insert(pod.key(), result);
        }
        logs
    }

    async fn guarded<T, F>(&self, kind: ResourceKind, fut: F) -> Result<T, FetchError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let result = match self.before_deadline(fut).await {
            Some(r) => r.map_err(|e| FetchError::new(kind, format!("{:#}", e))),
            None => Err(FetchError::timed_out(kind)),
        };
        if let Err(e) = &result {
            warn!("{}", e);
        }
        result
    }

    /// `None` when the deadline expired first.
    async fn before_deadline<T, F>(&self, fut: F) -> Option<anyhow::Result<T>>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut).await.ok(),
            None => Some(fut.await),
        }
    }
}
