//! Conversion from `k8s_openapi` objects into snapshot entities.
//! Objects without a name (or namespace, for namespaced kinds) are dropped.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Endpoints, Node, PersistentVolume, Pod, Service};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use std::collections::HashSet;

use crate::parsing::{parse_cpu_to_millicores, parse_memory_to_bytes};
use crate::types::{
    ContainerStatusInfo, DeploymentInfo, DisruptionBudgetInfo, NodeCondition, NodeInfo,
    PersistentVolumeInfo, PodInfo, PodPhase, ServiceInfo, ServiceType, VolumePhase,
};

/// Usage is left empty; the collector fills it from the node metrics API.
pub fn node_info(node: &Node) -> Option<NodeInfo> {
    let name = node.metadata.name.clone()?;
    let status = node.status.as_ref();

    let conditions: Vec<NodeCondition> = status
        .and_then(|s| s.conditions.as_ref())
        .map(|conds| {
            conds
                .iter()
                .map(|c| NodeCondition { type_: c.type_.clone(), status: c.status == "True" })
                .collect()
        })
        .unwrap_or_default();
    let ready = conditions.iter().any(|c| c.type_ == "Ready" && c.status);

    let allocatable = status.and_then(|s| s.allocatable.as_ref());
    let allocatable_cpu_millicores = allocatable
        .and_then(|a| a.get("cpu"))
        .and_then(|q| parse_cpu_to_millicores(&q.0));
    let allocatable_memory_bytes = allocatable
        .and_then(|a| a.get("memory"))
        .and_then(|q| parse_memory_to_bytes(&q.0));

    Some(NodeInfo {
        name,
        ready,
        conditions,
        allocatable_cpu_millicores,
        allocatable_memory_bytes,
        usage: None,
    })
}

pub fn pod_info(pod: &Pod) -> Option<PodInfo> {
    let name = pod.metadata.name.clone()?;
    let namespace = pod.metadata.namespace.clone()?;
    let status = pod.status.as_ref();

    let phase = status
        .and_then(|s| s.phase.as_deref())
        .map(PodPhase::parse)
        .unwrap_or(PodPhase::Unknown);

    let container_statuses = status
        .and_then(|s| s.container_statuses.as_ref())
        .map(|statuses| {
            statuses
                .iter()
                .map(|cs| ContainerStatusInfo {
                    name: cs.name.clone(),
                    waiting_reason: cs
                        .state
                        .as_ref()
                        .and_then(|st| st.waiting.as_ref())
                        .and_then(|w| w.reason.clone()),
                })
                .collect()
        })
        .unwrap_or_default();

    let container_images = pod
        .spec
        .as_ref()
        .map(|spec| spec.containers.iter().filter_map(|c| c.image.clone()).collect())
        .unwrap_or_default();

    Some(PodInfo {
        namespace,
        name,
        phase,
        container_statuses,
        pod_ip: status.and_then(|s| s.pod_ip.clone()).filter(|ip| !ip.is_empty()),
        start_time: status.and_then(|s| s.start_time.as_ref()).map(|t| t.0),
        dns_policy: pod.spec.as_ref().and_then(|s| s.dns_policy.clone()),
        container_images,
    })
}

pub fn deployment_info(deployment: &Deployment) -> Option<DeploymentInfo> {
    Some(DeploymentInfo {
        namespace: deployment.metadata.namespace.clone()?,
        name: deployment.metadata.name.clone()?,
        // the API defaults an unset replica count to 1
        desired_replicas: deployment.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
        available_replicas: deployment
            .status
            .as_ref()
            .and_then(|s| s.available_replicas)
            .unwrap_or(0),
    })
}

/// (namespace, name) of every Endpoints object with at least one subset.
pub fn active_endpoint_keys(endpoints: &[Endpoints]) -> HashSet<(String, String)> {
    endpoints
        .iter()
        .filter(|ep| ep.subsets.as_ref().map(|s| !s.is_empty()).unwrap_or(false))
        .filter_map(|ep| Some((ep.metadata.namespace.clone()?, ep.metadata.name.clone()?)))
        .collect()
}

pub fn service_info(service: &Service, active: &HashSet<(String, String)>) -> Option<ServiceInfo> {
    let namespace = service.metadata.namespace.clone()?;
    let name = service.metadata.name.clone()?;
    let service_type = ServiceType::parse(service.spec.as_ref().and_then(|s| s.type_.as_deref()));
    let has_active_endpoints = active.contains(&(namespace.clone(), name.clone()));
    Some(ServiceInfo { namespace, name, service_type, has_active_endpoints })
}

pub fn persistent_volume_info(volume: &PersistentVolume) -> Option<PersistentVolumeInfo> {
    let phase = volume
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map(VolumePhase::parse)
        .unwrap_or(VolumePhase::Pending);
    Some(PersistentVolumeInfo { name: volume.metadata.name.clone()?, phase })
}

pub fn disruption_budget_info(pdb: &PodDisruptionBudget) -> Option<DisruptionBudgetInfo> {
    let (current_healthy, desired_healthy) = pdb
        .status
        .as_ref()
        .map(|s| (s.current_healthy, s.desired_healthy))
        .unwrap_or((0, 0));
    Some(DisruptionBudgetInfo {
        namespace: pdb.metadata.namespace.clone()?,
        name: pdb.metadata.name.clone()?,
        current_healthy,
        desired_healthy,
    })
}
