use super::{EvaluationContext, Evaluator};
use crate::types::{Category, Finding, FindingDetail, ResourceKind, VolumePhase};

pub struct StorageEvaluator;

/// Advice per observed phase.
fn actions_for(phase: &VolumePhase) -> &'static [&'static str] {
    match phase {
        VolumePhase::Bound => &[],
        VolumePhase::Available => &[
            "The volume is not claimed; delete it or create a matching PersistentVolumeClaim.",
        ],
        VolumePhase::Released => &[
            "The claim was deleted; reclaim the volume manually or delete it.",
            "Check the reclaim policy of the volume.",
        ],
        VolumePhase::Failed => &[
            "Automatic reclamation failed; inspect the volume's events and storage backend.",
        ],
        VolumePhase::Pending | VolumePhase::Other(_) => &[
            "Check the StorageClass provisioner and its logs.",
            "Verify access modes and capacity match an available volume.",
        ],
    }
}

impl Evaluator for StorageEvaluator {
    fn name(&self) -> &str {
        "Storage"
    }

    fn inputs(&self) -> &[ResourceKind] {
        &[ResourceKind::PersistentVolumes]
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> Vec<Finding> {
        ctx.snapshot
            .persistent_volumes
            .items
            .iter()
            .filter(|pv| pv.phase != VolumePhase::Bound)
            .map(|pv| {
                Finding::new(
                    Category::Storage,
                    pv.name.clone(),
                    format!("PersistentVolume {} is in phase {}, not Bound.", pv.name, pv.phase),
                )
                .with_actions(actions_for(&pv.phase))
                .with_detail(FindingDetail::VolumePhase { phase: pv.phase.to_string() })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Snapshot;
    use crate::evaluators::test_support::context;
    use crate::types::PersistentVolumeInfo;

    fn volume(name: &str, phase: &str) -> PersistentVolumeInfo {
        PersistentVolumeInfo { name: name.to_string(), phase: VolumePhase::parse(phase) }
    }

    #[test]
    fn test_pending_volume_reported() {
        let mut snapshot = Snapshot::default();
        snapshot.persistent_volumes.items.push(volume("pv-1", "Pending"));
        let findings = StorageEvaluator.evaluate(&context(snapshot));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::Storage);
        assert_eq!(findings[0].subject, "pv-1");
        assert_eq!(findings[0].detail, Some(FindingDetail::VolumePhase { phase: "Pending".to_string() }));
    }

    #[test]
    fn test_bound_volume_ignored() {
        let mut snapshot = Snapshot::default();
        snapshot.persistent_volumes.items.push(volume("pv-1", "Bound"));
        assert!(StorageEvaluator.evaluate(&context(snapshot)).is_empty());
    }

    #[test]
    fn test_every_unbound_phase_has_advice() {
        let mut snapshot = Snapshot::default();
        for (i, phase) in ["Available", "Released", "Failed", "Lost"].iter().enumerate() {
            snapshot.persistent_volumes.items.push(volume(&format!("pv-{}", i), phase));
        }
        let findings = StorageEvaluator.evaluate(&context(snapshot));
        assert_eq!(findings.len(), 4);
        assert!(findings.iter().all(|f| !f.suggested_actions.is_empty()));
        assert!(findings[3].message.contains("phase Lost"));
    }
}
