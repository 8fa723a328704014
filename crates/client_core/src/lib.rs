use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use shared::{
    domain::{ClusterId, ClusterStats},
    error::ErrorDetail,
    protocol::{ClusterRunQuery, ClusterRunResponse, ClusterStatsResponse, ImageListResponse},
};
use tracing::{info, warn};

pub mod aggregator;
pub mod config;
pub mod controller;
pub mod error;
pub mod notification;
pub mod sensitivity;
pub mod state;

pub use aggregator::{group_images, ClusterGroups, StatsBatch};
pub use config::{load_settings, ClientSettings};
pub use controller::{ActionOutcome, ConfirmationGate, PreConfirmed, SkipReason, WorkflowController};
pub use error::GatewayError;
pub use notification::{Notification, NotificationKind, NOTIFICATION_TTL};
pub use sensitivity::{SensitivityLabel, SensitivityLevel};
pub use state::{Action, DashboardState, DashboardStore};

/// One file queued for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("'{}' has no file name", path.display()))?;
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Ok(Self {
            filename,
            mime_type,
            bytes,
        })
    }
}

/// Outcome of a best-effort upload batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub attempted: usize,
    /// Filenames that were not accepted.
    pub failed: Vec<String>,
}

impl UploadReport {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed.len()
    }

    pub fn into_result(self) -> Result<usize, GatewayError> {
        if self.failed.is_empty() {
            Ok(self.attempted)
        } else {
            Err(GatewayError::PartialUpload {
                attempted: self.attempted,
                failed: self.failed,
            })
        }
    }
}

/// One operation per remote capability of the clustering service. No retries
/// happen at this layer.
#[async_trait]
pub trait ClusterGateway: Send + Sync {
    async fn list_images(&self) -> Result<ImageListResponse, GatewayError>;
    async fn fetch_cluster_stats(&self, cluster_id: ClusterId)
        -> Result<ClusterStats, GatewayError>;
    async fn run_clustering(
        &self,
        eps: f64,
        min_samples: u32,
    ) -> Result<ClusterRunResponse, GatewayError>;
    async fn upload_image(&self, file: &UploadFile) -> Result<(), GatewayError>;
    async fn clear_all(&self) -> Result<(), GatewayError>;
    async fn download_cluster(&self, cluster_id: ClusterId) -> Result<Vec<u8>, GatewayError>;
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, GatewayError>;

    /// Submits each file on its own; a failed file is logged and the rest continue.
    async fn upload_images(&self, files: &[UploadFile]) -> UploadReport {
        let mut report = UploadReport {
            attempted: files.len(),
            failed: Vec::new(),
        };
        for file in files {
            match self.upload_image(file).await {
                Ok(()) => info!(filename = %file.filename, "image uploaded"),
                Err(err) => {
                    warn!(filename = %file.filename, "upload failed: {err}");
                    report.failed.push(file.filename.clone());
                }
            }
        }
        report
    }
}

pub struct HttpClusterGateway {
    http: Client,
    server_url: String,
}

impl HttpClusterGateway {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Self { http, server_url }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.server_url)
    }
}

fn expect_success(response: Response, endpoint: &str) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(GatewayError::UnexpectedStatus {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl ClusterGateway for HttpClusterGateway {
    async fn list_images(&self) -> Result<ImageListResponse, GatewayError> {
        let response = self
            .http
            .get(self.endpoint("/images"))
            .send()
            .await
            .map_err(GatewayError::from_send)?;
        expect_success(response, "/images")?
            .json()
            .await
            .map_err(GatewayError::Decode)
    }

    async fn fetch_cluster_stats(
        &self,
        cluster_id: ClusterId,
    ) -> Result<ClusterStats, GatewayError> {
        let path = format!("/cluster/stats/{}", cluster_id.0);
        let response = self
            .http
            .get(self.endpoint(&path))
            .send()
            .await
            .map_err(GatewayError::from_send)?;
        let body: ClusterStatsResponse = expect_success(response, &path)?
            .json()
            .await
            .map_err(GatewayError::Decode)?;
        Ok(body.into())
    }

    async fn run_clustering(
        &self,
        eps: f64,
        min_samples: u32,
    ) -> Result<ClusterRunResponse, GatewayError> {
        let response = self
            .http
            .get(self.endpoint("/cluster"))
            .query(&ClusterRunQuery { eps, min_samples })
            .send()
            .await
            .map_err(GatewayError::from_send)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(GatewayError::Clustering {
                status: status.as_u16(),
                detail: ErrorDetail::from_body(&body).into_detail(),
            });
        }

        response.json().await.map_err(GatewayError::Decode)
    }

    async fn upload_image(&self, file: &UploadFile) -> Result<(), GatewayError> {
        let mut part = Part::bytes(file.bytes.clone()).file_name(file.filename.clone());
        if let Some(mime_type) = &file.mime_type {
            part = part.mime_str(mime_type).map_err(GatewayError::Transport)?;
        }
        let response = self
            .http
            .post(self.endpoint("/upload"))
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .map_err(GatewayError::from_send)?;
        expect_success(response, "/upload")?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), GatewayError> {
        let response = self
            .http
            .delete(self.endpoint("/clear"))
            .send()
            .await
            .map_err(GatewayError::from_send)?;
        expect_success(response, "/clear")?;
        Ok(())
    }

    async fn download_cluster(&self, cluster_id: ClusterId) -> Result<Vec<u8>, GatewayError> {
        let response = self
            .http
            .get(self.endpoint(&format!("/download/cluster/{}", cluster_id.0)))
            .send()
            .await
            .map_err(GatewayError::from_send)?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Download {
                cluster_id,
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(GatewayError::Transport)?;
        Ok(bytes.to_vec())
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, GatewayError> {
        let url = url::Url::parse(url)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(GatewayError::from_send)?;
        let bytes = expect_success(response, "image")?
            .bytes()
            .await
            .map_err(GatewayError::Transport)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
