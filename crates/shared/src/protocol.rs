use serde::{Deserialize, Serialize};

use crate::domain::{ClusterId, ClusterStats, Coherence, Image};

/// Body of `GET /images`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageListResponse {
    pub total: usize,
    pub images: Vec<Image>,
}

/// Query string of `GET /cluster`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClusterRunQuery {
    pub eps: f64,
    pub min_samples: u32,
}

/// Body of a successful `GET /cluster`. The service also echoes the clusters
/// and noise images; the client only needs the count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterRunResponse {
    pub num_clusters: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of `GET /cluster/stats/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterStatsResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<ClusterId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_images: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_similarity: Option<f64>,
    pub similarity_percent: f64,
    pub coherence: Coherence,
}

impl From<ClusterStatsResponse> for ClusterStats {
    fn from(value: ClusterStatsResponse) -> Self {
        Self {
            similarity_percent: value.similarity_percent,
            coherence: value.coherence,
        }
    }
}

/// Body of a successful `POST /upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub total_images: Option<usize>,
}
