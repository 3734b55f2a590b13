use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use extract_core::{SessionConfig, DEFAULT_NAMESPACE};
use extract_engine::EngineSettings;
use log::LevelFilter;
use serde::Deserialize;
use serde_json::Value;

use crate::logging::LogDestination;

pub const DEFAULT_CONFIG: &str = "replay.ron";
const DEFAULT_ENGINE_EXPRESSION: &str = "syphonx.extract";

/// Replay settings, read from a RON file. Relative paths are resolved
/// against the directory holding the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
    pub template: PathBuf,
    #[serde(default)]
    pub contract: Option<PathBuf>,
    pub recording: PathBuf,
    pub page_url: String,
    #[serde(default)]
    pub reload: bool,
    #[serde(default)]
    pub auto_refresh: bool,
    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,
    #[serde(default)]
    pub response_timeout_ms: Option<u64>,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_engine_expression")]
    pub engine_expression: String,
    #[serde(default)]
    pub log: LogDestination,
    #[serde(default)]
    pub verbose: bool,
}

fn default_wait_ms() -> u64 {
    1000
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_engine_expression() -> String {
    DEFAULT_ENGINE_EXPRESSION.to_string()
}

/// Envelopes the page sends back after each evaluation, in order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Recording {
    pub rounds: Vec<Vec<Value>>,
}

impl ReplayConfig {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            auto_refresh: self.auto_refresh,
            wait: Duration::from_millis(self.wait_ms),
            ..SessionConfig::default()
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            namespace: self.namespace.clone(),
            response_timeout: self.response_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    fn resolve_paths(&mut self, base: &Path) {
        self.template = base.join(&self.template);
        self.recording = base.join(&self.recording);
        if let Some(contract) = self.contract.take() {
            self.contract = Some(base.join(contract));
        }
    }
}

pub fn load_config(path: &Path) -> Result<ReplayConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading replay config {:?}", path))?;
    let mut config: ReplayConfig =
        ron::from_str(&content).with_context(|| format!("parsing replay config {:?}", path))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);
    Ok(config)
}

pub fn load_recording(path: &Path) -> Result<Recording> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading recording {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("parsing recording {:?}", path))
}

pub fn read_document(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults_and_resolves_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.ron");
        fs::write(
            &path,
            r#"(template: "template.json", recording: "recording.json", page_url: "https://example.com")"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.template, dir.path().join("template.json"));
        assert_eq!(config.recording, dir.path().join("recording.json"));
        assert_eq!(config.contract, None);
        assert_eq!(config.wait_ms, 1000);
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.log, LogDestination::File);
        assert_eq!(config.engine_settings().response_timeout, None);
        assert!(config.session_config().debug);
    }

    #[test]
    fn broken_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.ron");
        fs::write(&path, "(template: ").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("replay.ron"));
    }
}
