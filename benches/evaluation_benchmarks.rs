use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kube_troubleshooter::evaluators::{
    AvailabilityEvaluator, NetworkEvaluator, PerformanceEvaluator, StorageEvaluator,
};
use kube_troubleshooter::parsing::{parse_cpu_to_millicores, parse_memory_to_bytes};
use kube_troubleshooter::{
    EvaluationContext, Evaluator, NodeCondition, NodeInfo, NodeUsage, PersistentVolumeInfo, PodInfo,
    PodPhase, ServiceInfo, ServiceType, Snapshot, ThresholdConfig, VolumePhase,
};

fn quantity_parsing_benchmark(c: &mut Criterion) {
    let cpu_values = ["100m", "1", "0.5", "2.5", "1000000000n", "1000000u", "1500m"];
    let memory_values = ["1Ki", "1Mi", "1Gi", "1K", "1M", "512Mi", "2.5Gi"];

    c.bench_function("parse_quantities", |b| {
        b.iter(|| {
            for value in &cpu_values {
                black_box(parse_cpu_to_millicores(black_box(value)));
            }
            for value in &memory_values {
                black_box(parse_memory_to_bytes(black_box(value)));
            }
        })
    });
}

/// A mid-sized cluster where roughly one object in ten is unhealthy.
fn synthetic_snapshot(nodes: usize, pods_per_node: usize) -> Snapshot {
    let mut snapshot = Snapshot::default();
    for n in 0..nodes {
        let mut conditions = vec![NodeCondition { type_: "Ready".to_string(), status: true }];
        if n % 10 == 0 {
            conditions.push(NodeCondition { type_: "MemoryPressure".to_string(), status: true });
        }
        snapshot.nodes.items.push(NodeInfo {
            name: format!("node-{:04}", n),
            ready: true,
            conditions,
            allocatable_cpu_millicores: Some(8000),
            allocatable_memory_bytes: Some(32 * 1024 * 1024 * 1024),
            usage: Some(NodeUsage {
                cpu_millicores: (n as i64 * 97) % 8000,
                memory_bytes: (n as i64 * 1_000_003_000) % (32 * 1024 * 1024 * 1024),
            }),
        });
        for p in 0..pods_per_node {
            let phase = if (n + p) % 10 == 0 { PodPhase::Pending } else { PodPhase::Running };
            snapshot.pods.items.push(PodInfo {
                namespace: format!("ns-{}", p % 5),
                name: format!("pod-{}-{}", n, p),
                phase,
                container_statuses: vec![],
                pod_ip: if p % 17 == 0 { None } else { Some("10.0.0.1".to_string()) },
                start_time: Some(chrono::Utc::now() - chrono::Duration::minutes((p % 20) as i64)),
                dns_policy: Some(if p % 13 == 0 { "Default" } else { "ClusterFirst" }.to_string()),
                container_images: vec![format!("registry.local/app-{}:1.0", p % 7)],
            });
        }
        snapshot.services.items.push(ServiceInfo {
            namespace: "default".to_string(),
            name: format!("svc-{}", n),
            service_type: ServiceType::ClusterIP,
            has_active_endpoints: n % 9 != 0,
        });
        snapshot.persistent_volumes.items.push(PersistentVolumeInfo {
            name: format!("pv-{}", n),
            phase: if n % 11 == 0 { VolumePhase::Released } else { VolumePhase::Bound },
        });
    }
    snapshot.sort();
    snapshot
}

fn evaluator_benchmark(c: &mut Criterion) {
    let ctx = EvaluationContext::new(synthetic_snapshot(200, 30), ThresholdConfig::default());
    let evaluators: Vec<Box<dyn Evaluator>> = vec![
        Box::new(AvailabilityEvaluator),
        Box::new(PerformanceEvaluator),
        Box::new(NetworkEvaluator::default()),
        Box::new(StorageEvaluator),
    ];

    c.bench_function("evaluate_6000_pods", |b| {
        b.iter(|| {
            for evaluator in &evaluators {
                black_box(evaluator.evaluate(black_box(&ctx)));
            }
        })
    });
}

criterion_group!(benches, quantity_parsing_benchmark, evaluator_benchmark);
criterion_main!(benches);
