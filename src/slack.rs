use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info};

use crate::render::ReportSink;
use crate::report::DiagnosticReport;
use crate::types::Category;

#[derive(Debug, Serialize)]
pub struct SlackPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub blocks: Vec<serde_json::Value>,
}

/// Slack rejects section text longer than 3000 characters.
const MAX_SECTION_CHARS: usize = 2900;

pub fn build_slack_payload(report: &DiagnosticReport) -> SlackPayload {
    let mut blocks: Vec<serde_json::Value> = Vec::new();
    let title = match &report.cluster_name {
        Some(c) => format!("Kubernetes Diagnostic Report - {}", c),
        None => "Kubernetes Diagnostic Report".to_string(),
    };
    blocks.push(serde_json::json!({
        "type": "header",
        "text": {"type": "plain_text", "text": title}
    }));

    let overview = &report.overview;
    let version = match &overview.version {
        Ok(v) => v.clone(),
        Err(_) => "unknown".to_string(),
    };
    let not_ready = overview.nodes.iter().filter(|(_, ready)| !ready).count();
    let overview_text = format!(
        "Version: {}\nNodes: {} ({} NotReady)\nPods: {} ({} Running, {} Pending, {} Failed)",
        version,
        overview.nodes.len(),
        not_ready,
        overview.total_pods,
        overview.running_pods,
        overview.pending_pods,
        overview.failed_pods,
    );
    blocks.push(serde_json::json!({
        "type": "section",
        "text": {"type": "mrkdwn", "text": overview_text}
    }));

    for section in &report.sections {
        let mut lines: Vec<String> = Vec::new();
        for e in &section.fetch_errors {
            lines.push(format!(":warning: {}", e));
        }
        if let Some(e) = &section.evaluator_error {
            lines.push(format!(":warning: {}", e));
        }
        for f in &section.findings {
            lines.push(format!("• `{}` {}", f.subject, f.message));
            if let Some(evidence) = &f.evidence {
                lines.push(format!("  last log: `{}`", evidence));
            }
        }
        if lines.is_empty() {
            lines.push("No issues detected.".to_string());
        }
        blocks.push(serde_json::json!({
            "type": "section",
            "text": {"type": "mrkdwn", "text": truncate(&format!("*{}*\n{}", section.title, lines.join("\n")))}
        }));
    }

    let counts: Vec<String> = Category::ALL
        .iter()
        .map(|c| format!("{} {}", report.summary.count(*c), c))
        .collect();
    let mut summary_text = format!("*Summary*\n{}", counts.join(" | "));
    for (i, step) in report.summary.next_steps.iter().enumerate() {
        summary_text.push_str(&format!("\n{}. {}", i + 1, step));
    }
    blocks.push(serde_json::json!({
        "type": "section",
        "text": {"type": "mrkdwn", "text": summary_text}
    }));

    SlackPayload { text: None, blocks }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_SECTION_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_SECTION_CHARS).collect();
    format!("{}\n…", cut)
}

pub async fn send_to_slack(webhook_url: &str, payload: &SlackPayload) -> Result<()> {
    let client = reqwest::Client::new();
    let res = client
        .post(webhook_url)
        .json(payload)
        .send()
        .await
        .context("Failed to send Slack request")?;
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        error!("Slack webhook failed: {} - {}", status, body);
        return Err(anyhow!("Slack webhook returned non-success status {}", status));
    }
    Ok(())
}

/// Posts the report to a Slack incoming webhook when it has findings or missing data.
pub struct SlackSink {
    webhook_url: String,
}

impl SlackSink {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self { webhook_url: webhook_url.into() }
    }
}

#[async_trait]
impl ReportSink for SlackSink {
    async fn emit(&self, report: &DiagnosticReport) -> Result<()> {
        if !report.has_issues() && !report.is_degraded() {
            info!("No issues detected, skipping Slack notification");
            return Ok(());
        }
        send_to_slack(&self.webhook_url, &build_slack_payload(report)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Snapshot;
    use crate::evaluators::EvaluatorOutcome;
    use crate::types::{Finding, ResourceKind};
    use chrono::Utc;

    fn report_with(findings: Vec<Finding>) -> DiagnosticReport {
        let outcomes = vec![
            EvaluatorOutcome {
                name: "Network Diagnostics".to_string(),
                inputs: vec![ResourceKind::Services],
                result: Ok(findings),
            },
            EvaluatorOutcome {
                name: "Storage".to_string(),
                inputs: vec![ResourceKind::PersistentVolumes],
                result: Ok(vec![]),
            },
        ];
        DiagnosticReport::new(Some("test-cluster".to_string()), Utc::now(), &Snapshot::default(), outcomes)
    }

    #[test]
    fn test_build_slack_payload_basic() {
        let report = report_with(vec![Finding::new(
            Category::Network,
            "dev/backend",
            "Service backend in namespace dev has no active endpoints.",
        )]);
        let payload = build_slack_payload(&report);

        // header, overview, one block per section, summary
        assert_eq!(payload.blocks.len(), 5);
        assert_eq!(payload.text, None);

        let header_text = payload.blocks[0]["text"]["text"].as_str().unwrap();
        assert!(header_text.contains("test-cluster"));

        let network_text = payload.blocks[2]["text"]["text"].as_str().unwrap();
        assert!(network_text.starts_with("*Network Diagnostics*"));
        assert!(network_text.contains("`dev/backend`"));

        let storage_text = payload.blocks[3]["text"]["text"].as_str().unwrap();
        assert!(storage_text.contains("No issues detected."));

        let summary_text = payload.blocks[4]["text"]["text"].as_str().unwrap();
        assert!(summary_text.contains("1 Network"));
        assert!(summary_text.contains("1. Review service endpoints"));
    }

    #[test]
    fn test_long_sections_are_truncated() {
        let findings = (0..200)
            .map(|i| Finding::new(Category::Network, format!("dev/svc-{}", i), "Service has no active endpoints."))
            .collect();
        let payload = build_slack_payload(&report_with(findings));
        let text = payload.blocks[2]["text"]["text"].as_str().unwrap();
        assert!(text.chars().count() <= MAX_SECTION_CHARS + 2);
        assert!(text.ends_with('…'));
    }

    #[tokio::test]
    async fn test_slack_sink_skips_clean_report() {
        // Unroutable URL: any request attempt would fail the emit.
        let sink = SlackSink::new("http://127.0.0.1:9/unused");
        assert!(sink.emit(&report_with(vec![])).await.is_ok());
    }
}
