//! HTTP client for the Langflow flow API.

use super::import::{local_flow_files, plan_import, read_local_flow, ImportAction, ImportReport};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Errors raised by the flow tooling.
#[derive(thiserror::Error, Debug)]
pub enum FlowError {
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("Langflow host at {url} not ready after {attempts} attempt(s)")]
    HostUnavailable { url: String, attempts: usize },
    #[error("Flow directory not found: {}", path.display())]
    MissingDir { path: PathBuf },
    #[error("Error reading flow file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Flow file {} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A flow as listed by the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlowSummary {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Client for one Langflow host.
pub struct FlowClient {
    base_url: String,
    client: reqwest::Client,
}

impl FlowClient {
    /// Create a client for the host at `base_url`.
    pub fn new(base_url: &str, timeout_seconds: Option<u64>) -> reqwest::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }

    pub fn flows_url(&self) -> String {
        format!("{}/api/v1/flows/", self.base_url)
    }

    /// One health probe. Any transport error or non-2xx counts as not ready.
    pub async fn check_health(&self) -> bool {
        match self.client.get(self.health_url()).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }

    /// Poll the health endpoint until it answers 2xx.
    ///
    /// Returns the number of attempts used.
    pub async fn wait_until_healthy(
        &self,
        retries: usize,
        interval: Duration,
    ) -> Result<usize, FlowError> {
        for attempt in 1..=retries {
            if self.check_health().await {
                info!("Langflow host ready after {} attempt(s)", attempt);
                return Ok(attempt);
            }

            info!("Waiting for Langflow host... ({}/{})", attempt, retries);
            if attempt < retries {
                tokio::time::sleep(interval).await;
            }
        }

        Err(FlowError::HostUnavailable {
            url: self.base_url.clone(),
            attempts: retries,
        })
    }

    /// List the flows the host already has.
    pub async fn list_flows(&self) -> Result<Vec<FlowSummary>, FlowError> {
        let url = self.flows_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FlowError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FlowError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|source| FlowError::Http { url, source })
    }

    /// Upload one flow definition.
    pub async fn create_flow(&self, body: &Value) -> Result<(), FlowError> {
        let url = self.flows_url();
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|source| FlowError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FlowError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    /// Import every flow definition in `dir` that the host does not have yet.
    ///
    /// Waits for the host first. Failures on individual files are recorded
    /// in the report and the remaining files are still processed.
    pub async fn import_dir(
        &self,
        dir: &Path,
        retries: usize,
        interval: Duration,
    ) -> Result<ImportReport, FlowError> {
        self.wait_until_healthy(retries, interval).await?;

        let existing: HashSet<String> = match self.list_flows().await {
            Ok(flows) => flows.into_iter().map(|f| f.name).collect(),
            Err(e) => {
                warn!("Could not list existing flows: {}", e);
                HashSet::new()
            }
        };
        info!("Host has {} existing flow(s)", existing.len());

        let mut report = ImportReport::default();
        let mut flows = Vec::new();

        for path in local_flow_files(dir)? {
            match read_local_flow(&path) {
                Ok(flow) => flows.push(flow),
                Err(e) => {
                    warn!("{}", e);
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();
                    report.failed.push((file_name, e.to_string()));
                }
            }
        }

        for action in plan_import(flows, &existing) {
            match action {
                ImportAction::Skip { file_name, name } => {
                    info!("Skipping existing flow: {} ({})", name, file_name);
                    report.skipped.push(file_name);
                }
                ImportAction::Upload(flow) => match self.create_flow(&flow.body).await {
                    Ok(()) => {
                        info!("Imported flow {}", flow.file_name);
                        report.imported.push(flow.file_name);
                    }
                    Err(e) => {
                        warn!("Import of {} failed: {}", flow.file_name, e);
                        report.failed.push((flow.file_name, e.to_string()));
                    }
                },
            }
        }

        Ok(report)
    }
}
