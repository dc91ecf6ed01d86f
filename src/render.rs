use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt::Write as _;

use crate::report::{ClusterOverview, DiagnosticReport, ReportSection};
use crate::types::{Category, Finding};

/// Destination for a finished report. Called once per run.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn emit(&self, report: &DiagnosticReport) -> Result<()>;
}

/// Human-readable report on stdout.
pub struct TextSink;

#[async_trait]
impl ReportSink for TextSink {
    async fn emit(&self, report: &DiagnosticReport) -> Result<()> {
        println!("{}", render_text(report));
        Ok(())
    }
}

/// Pretty-printed JSON on stdout.
pub struct JsonSink;

#[async_trait]
impl ReportSink for JsonSink {
    async fn emit(&self, report: &DiagnosticReport) -> Result<()> {
        println!("{}", render_json(report)?);
        Ok(())
    }
}

pub fn render_json(report: &DiagnosticReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("serialize report")
}

pub fn render_text(report: &DiagnosticReport) -> String {
    let mut out = String::new();
    let title = match &report.cluster_name {
        Some(name) => format!("[K8S Troubleshooter] Cluster diagnostic for {}", name),
        None => "[K8S Troubleshooter] Cluster diagnostic".to_string(),
    };
    let _ = writeln!(
        out,
        "{} ({})\n",
        title,
        report.generated_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    );

    render_overview(&mut out, &report.overview);
    for section in &report.sections {
        render_section(&mut out, section);
    }

    let _ = writeln!(out, "Summary:");
    for category in Category::ALL {
        let _ = writeln!(out, "- {} {} findings.", report.summary.count(category), category);
    }
    if report.summary.next_steps.is_empty() {
        let _ = writeln!(out, "\nNo issues detected.");
    } else {
        let _ = writeln!(out, "\nSuggested Next Steps:");
        for (i, step) in report.summary.next_steps.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, step);
        }
    }
    out
}

fn render_overview(out: &mut String, overview: &ClusterOverview) {
    let _ = writeln!(out, "Cluster Overview:");
    match &overview.version {
        Ok(v) => {
            let _ = writeln!(out, "- Kubernetes Version: {}", v);
        }
        Err(e) => {
            let _ = writeln!(out, "- {}", capitalize(&e.to_string()));
        }
    }
    for e in &overview.fetch_errors {
        let _ = writeln!(out, "- {}", capitalize(&e.to_string()));
    }
    let _ = writeln!(out, "- Nodes: {}", overview.nodes.len());
    for (name, ready) in &overview.nodes {
        let _ = writeln!(out, "  - {}: {}", name, if *ready { "Ready" } else { "NotReady" });
    }
    let _ = writeln!(
        out,
        "- Namespaces: {} ({})",
        overview.namespaces.len(),
        overview.namespaces.join(", ")
    );
    let _ = writeln!(
        out,
        "- Total Pods: {} ({} Running, {} Pending, {} Failed)\n",
        overview.total_pods, overview.running_pods, overview.pending_pods, overview.failed_pods
    );
}

fn render_section(out: &mut String, section: &ReportSection) {
    let _ = writeln!(out, "{}:", section.title);
    for e in &section.fetch_errors {
        let _ = writeln!(out, "- {}", capitalize(&e.to_string()));
    }
    if let Some(e) = &section.evaluator_error {
        let _ = writeln!(out, "- Error: {}", e);
    }
    if section.findings.is_empty() && section.evaluator_error.is_none() {
        let _ = writeln!(out, "- No issues detected.");
    }
    for (i, finding) in section.findings.iter().enumerate() {
        render_finding(out, i + 1, finding);
    }
    let _ = writeln!(out);
}

fn render_finding(out: &mut String, index: usize, finding: &Finding) {
    let _ = writeln!(out, "{}. **{}**", index, finding.subject);
    let _ = writeln!(out, "   - Issue: {}", finding.message);
    if let Some(evidence) = &finding.evidence {
        let _ = writeln!(out, "   - Logs:\n     ```\n     {}\n     ```", evidence);
    }
    if !finding.suggested_actions.is_empty() {
        let _ = writeln!(out, "   - Suggested Action:");
        for action in &finding.suggested_actions {
            let _ = writeln!(out, "     - {}", action);
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
