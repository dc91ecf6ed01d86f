use std::collections::HashSet;
use std::sync::Arc;

use super::{EvaluationContext, Evaluator};
use crate::types::{Category, Finding, FindingDetail, ResourceKind};

/// Decides whether a container image reference should be flagged.
/// Returns a short description of what matched.
pub trait ImageMatcher: Send + Sync {
    fn matches(&self, image: &str) -> Option<String>;
}

/// Flags images whose reference contains any configured substring.
/// With no patterns it never matches.
#[derive(Debug, Clone, Default)]
pub struct SubstringMatcher {
    patterns: Vec<String>,
}

impl SubstringMatcher {
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns: patterns.into_iter().filter(|p| !p.is_empty()).collect(),
        }
    }
}

impl ImageMatcher for SubstringMatcher {
    fn matches(&self, image: &str) -> Option<String> {
        self.patterns
            .iter()
            .find(|p| image.contains(p.as_str()))
            .cloned()
    }
}

const IMAGE_ACTIONS: &[&str] = &[
    "Update the image to a patched version.",
    "Review image security policies and ensure regular vulnerability scans.",
];

/// One finding per flagged image per pod. Containers of the same pod that
/// share an image produce a single finding, since subject and message would
/// be identical.
pub struct SecurityEvaluator {
    matcher: Arc<dyn ImageMatcher>,
}

impl SecurityEvaluator {
    pub fn new(matcher: Arc<dyn ImageMatcher>) -> Self {
        Self { matcher }
    }
}

impl Evaluator for SecurityEvaluator {
    fn name(&self) -> &str {
        "Security Scan Results"
    }

    fn inputs(&self) -> &[ResourceKind] {
        &[ResourceKind::Pods]
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> Vec<Finding> {
        let mut findings = Vec::new();
        for pod in &ctx.snapshot.pods.items {
            // one finding per distinct image within a pod
            let mut seen = HashSet::new();
            for image in &pod.container_images {
                if !seen.insert(image.as_str()) {
                    continue;
                }
                if let Some(matched) = self.matcher.matches(image) {
                    findings.push(
                        Finding::new(
                            Category::Security,
                            pod.subject(),
                            format!("Image \"{}\" used by pod \"{}\" is flagged ({}).", image, pod.name, matched),
                        )
                        .with_actions(IMAGE_ACTIONS)
                        .with_detail(FindingDetail::Image { image: image.clone(), matched }),
                    );
                }
            }
        }
        findings
    }
}
