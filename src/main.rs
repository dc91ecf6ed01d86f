use anyhow::Result;
use kube::Client;
use tracing::{error, info};

use kube_troubleshooter::{
    load_config, JsonSink, KubeClusterApi, OutputFormat, ReportSink, SlackSink, TextSink, Troubleshooter,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cfg = load_config()?;
    info!(
        "thresholds: cpu {}%, memory {}%, pending {} min",
        cfg.thresholds.cpu_usage_percent(),
        cfg.thresholds.memory_usage_percent(),
        cfg.thresholds.pod_pending_minutes()
    );

    let client = Client::try_default().await?;
    let api = KubeClusterApi::new(client);
    let troubleshooter = Troubleshooter::new(&api, &cfg);

    let report = tokio::select! {
        report = troubleshooter.run() => report,
        _ = tokio::signal::ctrl_c() => {
            println!("\nDiagnostic interrupted by user. Exiting...");
            return Ok(());
        }
    };

    let mut sinks: Vec<Box<dyn ReportSink>> = Vec::new();
    match cfg.output_format {
        OutputFormat::Text => sinks.push(Box::new(TextSink)),
        OutputFormat::Json => sinks.push(Box::new(JsonSink)),
    }
    if let Some(url) = &cfg.slack_webhook_url {
        sinks.push(Box::new(SlackSink::new(url.clone())));
    }

    // A failing sink does not stop the others.
    let mut failed = false;
    for sink in &sinks {
        if let Err(e) = sink.emit(&report).await {
            error!("failed to emit report: {:#}", e);
            failed = true;
        }
    }
    if failed {
        anyhow::bail!("one or more report sinks failed");
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
