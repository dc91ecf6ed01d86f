use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigError;
use crate::evaluators::network::DEFAULT_DNS_POLICY;
use crate::types::{Config, OutputFormat, ThresholdConfig};

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }
    
    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }
    
    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

/// Threshold file layout, mirroring the documented configuration surface.
/// Every field is optional; env vars override file values, defaults fill the rest.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ThresholdFile {
    cpu_usage_threshold_percent: Option<f64>,
    memory_usage_threshold_percent: Option<f64>,
    pod_scheduling_delay_threshold_minutes: Option<f64>,
}

fn read_threshold_file(path: &str) -> Result<ThresholdFile, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ThresholdFileRead {
        path: path.to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::ThresholdFileFormat {
        path: path.to_string(),
        source,
    })
}

fn parse_f64_var<E: EnvironmentProvider>(
    env: &E,
    name: &'static str,
) -> Result<Option<f64>, ConfigError> {
    match env.get_var(name).map(|v| v.trim().to_string()) {
        None => Ok(None),
        Some(v) if v.is_empty() => Ok(None),
        Some(v) => v
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ConfigError::Unparsable { name, value: v }),
    }
}

pub fn load_thresholds_with_env<E: EnvironmentProvider>(env: &E) -> Result<ThresholdConfig, ConfigError> {
    let file = match env.get_var("THRESHOLDS_FILE").filter(|p| !p.trim().is_empty()) {
        Some(path) => read_threshold_file(path.trim())?,
        None => ThresholdFile::default(),
    };
    let defaults = ThresholdConfig::default();

    let cpu = parse_f64_var(env, "CPU_THRESHOLD_PERCENT")?
        .or(file.cpu_usage_threshold_percent)
        .unwrap_or(defaults.cpu_usage_percent());
    let memory = parse_f64_var(env, "MEMORY_THRESHOLD_PERCENT")?
        .or(file.memory_usage_threshold_percent)
        .unwrap_or(defaults.memory_usage_percent());
    let pending = parse_f64_var(env, "POD_PENDING_THRESHOLD_MINUTES")?
        .or(file.pod_scheduling_delay_threshold_minutes)
        .unwrap_or(defaults.pod_pending_minutes());

    ThresholdConfig::new(cpu, memory, pending)
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    let thresholds = load_thresholds_with_env(env)?;

    let sensitive_images: Vec<String> = env
        .get_var("SENSITIVE_IMAGES")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let default_dns_policy = env
        .get_var("DEFAULT_DNS_POLICY")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_DNS_POLICY.to_string());

    let fetch_timeout = match parse_f64_var(env, "FETCH_TIMEOUT_SECONDS")? {
        Some(secs) if secs > 0.0 => match Duration::try_from_secs_f64(secs) {
            Ok(timeout) => Some(timeout),
            Err(_) => {
                return Err(ConfigError::InvalidThreshold { name: "FETCH_TIMEOUT_SECONDS", value: secs }.into());
            }
        },
        Some(secs) => {
            return Err(ConfigError::InvalidThreshold { name: "FETCH_TIMEOUT_SECONDS", value: secs }.into());
        }
        None => None,
    };

    let output_format = match env.get_var("OUTPUT_FORMAT").as_deref().map(str::trim) {
        None | Some("") | Some("text") => OutputFormat::Text,
        Some("json") => OutputFormat::Json,
        Some(other) => return Err(ConfigError::OutputFormat(other.to_string()).into()),
    };

    let cluster_name = env.get_var("CLUSTER_NAME").filter(|v| !v.trim().is_empty());
    let slack_webhook_url = env.get_var("SLACK_WEBHOOK_URL").filter(|v| !v.trim().is_empty());

    Ok(Config {
        thresholds,
        sensitive_images,
        default_dns_policy,
        fetch_timeout,
        cluster_name,
        output_format,
        slack_webhook_url,
    })
}
