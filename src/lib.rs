// Public modules
pub mod types;
pub mod error;
pub mod config;
pub mod parsing;
pub mod kubernetes;
pub mod collector;
pub mod evaluators;
pub mod report;
pub mod render;
pub mod slack;
pub mod troubleshooter;

// Re-export commonly used items
pub use types::*;
pub use error::{ConfigError, EvaluatorError, FetchError, LogRetrievalError};
pub use config::{load_config, load_config_with_env, load_thresholds_with_env, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use parsing::{parse_cpu_to_millicores, parse_memory_to_bytes};
pub use kubernetes::{ClusterApi, KubeClusterApi};
pub use collector::{Fetched, Snapshot, SnapshotCollector};
pub use evaluators::{EvaluationContext, Evaluator, EvaluatorOutcome, EvaluatorSet};
pub use report::{DiagnosticReport, Summary};
pub use render::{render_json, render_text, JsonSink, ReportSink, TextSink};
pub use slack::{build_slack_payload, send_to_slack, SlackSink};
pub use troubleshooter::Troubleshooter;
