//! Failures raised by the remote data gateway.

use shared::domain::ClusterId;
use thiserror::Error;

const GENERIC_CLUSTERING_FAILURE: &str = "Clustering failed";
const GENERIC_DOWNLOAD_FAILURE: &str = "Download failed";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("clustering rejected with status {status}: {}", .detail.as_deref().unwrap_or(GENERIC_CLUSTERING_FAILURE))]
    Clustering { status: u16, detail: Option<String> },
    #[error("download of cluster {cluster_id} failed with status {status}")]
    Download { cluster_id: ClusterId, status: u16 },
    #[error("{} of {attempted} uploads failed", .failed.len())]
    PartialUpload {
        attempted: usize,
        failed: Vec<String>,
    },
    #[error("{endpoint} returned status {status}")]
    UnexpectedStatus { endpoint: String, status: u16 },
    #[error("malformed response body: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl GatewayError {
    /// Text surfaced to the user in a notification.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Clustering { detail, .. } => detail
                .clone()
                .unwrap_or_else(|| GENERIC_CLUSTERING_FAILURE.to_string()),
            GatewayError::Download { .. } => GENERIC_DOWNLOAD_FAILURE.to_string(),
            GatewayError::Transport(_) => "Server unreachable; check the URL and retry".to_string(),
            other => other.to_string(),
        }
    }

    pub(crate) fn from_send(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err)
        } else {
            GatewayError::Transport(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clustering_detail_is_surfaced_verbatim() {
        let err = GatewayError::Clustering {
            status: 400,
            detail: Some("Need at least 2 images".to_string()),
        };
        assert_eq!(err.user_message(), "Need at least 2 images");

        let err = GatewayError::Clustering {
            status: 500,
            detail: None,
        };
        assert_eq!(err.user_message(), "Clustering failed");
    }

    #[test]
    fn download_failures_use_generic_text() {
        let err = GatewayError::Download {
            cluster_id: ClusterId(2),
            status: 404,
        };
        assert_eq!(err.user_message(), "Download failed");
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn partial_upload_reports_counts() {
        let err = GatewayError::PartialUpload {
            attempted: 3,
            failed: vec!["b.png".to_string()],
        };
        assert_eq!(err.user_message(), "1 of 3 uploads failed");
    }
}
