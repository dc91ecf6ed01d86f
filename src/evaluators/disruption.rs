use super::{EvaluationContext, Evaluator};
use crate::types::{Category, Finding, FindingDetail, ResourceKind};

const BUDGET_ACTIONS: &[&str] = &[
    "Find out why the selected pods are not healthy before draining or upgrading nodes.",
    "Verify the budget's minAvailable/maxUnavailable matches the workload's replica count.",
];

pub struct DisruptionBudgetEvaluator;

impl Evaluator for DisruptionBudgetEvaluator {
    fn name(&self) -> &str {
        "Disruption Budgets"
    }

    fn inputs(&self) -> &[ResourceKind] {
        &[ResourceKind::DisruptionBudgets]
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> Vec<Finding> {
        ctx.snapshot
            .disruption_budgets
            .items
            .iter()
            .filter(|b| b.current_healthy < b.desired_healthy)
            .map(|b| {
                Finding::new(
                    Category::Disruption,
                    format!("{}/{}", b.namespace, b.name),
                    format!(
                        "PodDisruptionBudget {} has {} healthy pods, below the {} it requires.",
                        b.name, b.current_healthy, b.desired_healthy
                    ),
                )
                .with_actions(BUDGET_ACTIONS)
                .with_detail(FindingDetail::HealthyReplicas {
                    current: b.current_healthy,
                    desired: b.desired_healthy,
                })
            })
            .collect()
    }
}
