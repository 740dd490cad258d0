//! Configuration file handling.
//!
//! This module handles loading, overriding and rewriting the
//! `.talkscope.toml` configuration store.

use crate::models::{AnalysisEndpoint, EndpointKind};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".talkscope.toml";

/// Prefix of per-endpoint URL overrides, e.g. `TALKSCOPE_ENDPOINT_SUMMARY`.
pub const ENDPOINT_ENV_PREFIX: &str = "TALKSCOPE_ENDPOINT_";

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Analysis host settings.
    #[serde(default)]
    pub host: HostConfig,

    /// Analysis endpoints, called in the listed order.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<AnalysisEndpoint>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            host: HostConfig::default(),
            endpoints: default_endpoints(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory holding transcript JSON files.
    #[serde(default = "default_transcripts_dir")]
    pub transcripts_dir: PathBuf,

    /// Per-request timeout in seconds. The HTTP client default applies when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_seconds: Option<u64>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            transcripts_dir: default_transcripts_dir(),
            request_timeout_seconds: None,
        }
    }
}

fn default_transcripts_dir() -> PathBuf {
    PathBuf::from("transcripts")
}

/// Langflow host settings used by the flow tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Base URL of the Langflow host.
    #[serde(default = "default_host_url")]
    pub url: String,

    /// Directory holding flow definition JSON files to import.
    #[serde(default = "default_flows_dir")]
    pub flows_dir: PathBuf,

    /// Number of health checks before giving up.
    #[serde(default = "default_health_retries")]
    pub health_retries: usize,

    /// Seconds between health checks.
    #[serde(default = "default_health_interval")]
    pub health_interval_seconds: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            url: default_host_url(),
            flows_dir: default_flows_dir(),
            health_retries: default_health_retries(),
            health_interval_seconds: default_health_interval(),
        }
    }
}

fn default_host_url() -> String {
    "http://localhost:7860".to_string()
}

fn default_flows_dir() -> PathBuf {
    PathBuf::from("flows")
}

fn default_health_retries() -> usize {
    30
}

fn default_health_interval() -> u64 {
    10
}

fn default_endpoints() -> Vec<AnalysisEndpoint> {
    let host = default_host_url();
    ["summary", "intent", "sentiment", "keywords"]
        .into_iter()
        .map(|name| {
            let endpoint = AnalysisEndpoint::new(name, format!("{}/api/v1/run/{}", host, name));
            if name == "sentiment" {
                endpoint.sentiment()
            } else {
                endpoint
            }
        })
        .collect()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Write the configuration back to `path`, replacing its contents.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Apply command-line overrides.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref host) = args.host {
            self.host.url = host.trim_end_matches('/').to_string();
        }
    }

    /// Apply `TALKSCOPE_ENDPOINT_<NAME>` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply endpoint URL overrides using `lookup` to resolve variables.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for endpoint in &mut self.endpoints {
            let key = format!("{}{}", ENDPOINT_ENV_PREFIX, endpoint.name.to_uppercase());
            if let Some(url) = lookup(&key).filter(|u| !u.trim().is_empty()) {
                tracing::debug!("{} overrides {} endpoint", key, endpoint.name);
                endpoint.url = url;
            }
        }
    }

    /// Check endpoint names are unique and URLs are HTTP(S).
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for endpoint in &self.endpoints {
            if endpoint.name.trim().is_empty() {
                bail!("Endpoint names must not be empty");
            }
            if !seen.insert(endpoint.name.as_str()) {
                bail!("Duplicate endpoint name: {}", endpoint.name);
            }
            if !is_http_url(&endpoint.url) {
                bail!(
                    "Endpoint {} URL must start with 'http://' or 'https://': {}",
                    endpoint.name,
                    endpoint.url
                );
            }
        }

        if !is_http_url(&self.host.url) {
            bail!("Host URL must start with 'http://' or 'https://'");
        }

        Ok(())
    }

    /// Set (or add) the URL of the endpoint called `name`.
    pub fn set_endpoint_url(
        &mut self,
        name: &str,
        url: &str,
        kind: Option<EndpointKind>,
    ) -> Result<()> {
        if !is_http_url(url) {
            bail!("URL must start with 'http://' or 'https://'");
        }

        match self.endpoints.iter_mut().find(|e| e.name == name) {
            Some(endpoint) => {
                endpoint.url = url.to_string();
                if let Some(kind) = kind {
                    endpoint.kind = kind;
                }
            }
            None => {
                let mut endpoint = AnalysisEndpoint::new(name, url);
                endpoint.kind = kind.unwrap_or_default();
                self.endpoints.push(endpoint);
            }
        }

        Ok(())
    }

    /// Endpoints to call, optionally restricted to `only` (config order is kept).
    pub fn select_endpoints(&self, only: Option<&[String]>) -> Result<Vec<AnalysisEndpoint>> {
        let Some(only) = only else {
            return Ok(self.endpoints.clone());
        };

        for name in only {
            if !self.endpoints.iter().any(|e| &e.name == name) {
                bail!("Unknown endpoint: {}", name);
            }
        }

        Ok(self
            .endpoints
            .iter()
            .filter(|e| only.contains(&e.name))
            .cloned()
            .collect())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.host.url, "http://localhost:7860");
        assert_eq!(config.host.health_retries, 30);
        assert_eq!(config.endpoints.len(), 4);
        assert_eq!(config.endpoints[2].kind, EndpointKind::Sentiment);
        assert_eq!(
            config.endpoints[0].url,
            "http://localhost:7860/api/v1/run/summary"
        );
        assert!(config.general.request_timeout_seconds.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
transcripts_dir = "data/calls"

[host]
url = "http://langflow:7860"
health_retries = 5

[[endpoints]]
name = "summary"
url = "http://langflow:7860/api/v1/run/abc"
placeholder = "No summary"

[[endpoints]]
name = "sentiment"
url = "http://langflow:7860/api/v1/run/def"
kind = "sentiment"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.transcripts_dir, PathBuf::from("data/calls"));
        assert_eq!(config.host.url, "http://langflow:7860");
        assert_eq!(config.host.health_retries, 5);
        assert_eq!(config.host.health_interval_seconds, 10);
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[0].placeholder(), "No summary");
        assert_eq!(config.endpoints[1].kind, EndpointKind::Sentiment);
    }

    #[test]
    fn test_validation_rejects_duplicates_and_bad_urls() {
        let mut config = Config::default();
        config.endpoints.push(AnalysisEndpoint::new("summary", "http://x"));
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.endpoints[1].url = "langflow:7860/run".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        let vars: HashMap<&str, &str> = [
            ("TALKSCOPE_ENDPOINT_SUMMARY", "http://other/summary"),
            ("TALKSCOPE_ENDPOINT_INTENT", "  "),
        ]
        .into_iter()
        .collect();

        config.apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.endpoints[0].url, "http://other/summary");
        assert_eq!(
            config.endpoints[1].url,
            "http://localhost:7860/api/v1/run/intent"
        );
    }

    #[test]
    fn test_set_endpoint_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        let mut config = Config::default();
        config.save(&path).unwrap();

        let mut loaded = Config::load(&path).unwrap();
        loaded
            .set_endpoint_url("summary", "http://langflow:7860/api/v1/run/new", None)
            .unwrap();
        loaded
            .set_endpoint_url("topics", "http://langflow:7860/api/v1/run/topics", None)
            .unwrap();
        loaded.save(&path).unwrap();

        config = Config::load(&path).unwrap();
        assert_eq!(config.endpoints[0].url, "http://langflow:7860/api/v1/run/new");
        assert_eq!(config.endpoints.last().unwrap().name, "topics");
        assert!(config.set_endpoint_url("summary", "ftp://x", None).is_err());
    }

    #[test]
    fn test_select_endpoints_keeps_config_order() {
        let config = Config::default();
        let only = vec!["sentiment".to_string(), "summary".to_string()];
        let selected = config.select_endpoints(Some(&only)).unwrap();
        let names: Vec<&str> = selected.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["summary", "sentiment"]);

        assert!(config
            .select_endpoints(Some(&["nope".to_string()]))
            .is_err());
        assert_eq!(config.select_endpoints(None).unwrap().len(), 4);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[host]"));
        assert!(toml_str.contains("[[endpoints]]"));
    }
}
