use serde::{Deserialize, Serialize};

/// Error body returned by the clustering service on non-success statuses,
/// e.g. `{"detail": "Need at least 2 images for clustering"}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
        }
    }

    /// Parses a response body, treating anything unreadable as "no detail".
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// Non-empty detail text, if the service sent one.
    pub fn into_detail(self) -> Option<String> {
        self.detail.filter(|detail| !detail.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorDetail;

    #[test]
    fn reads_detail_from_service_body() {
        let detail = ErrorDetail::from_body(br#"{"detail":"Need at least 2 images"}"#);
        assert_eq!(detail.into_detail().as_deref(), Some("Need at least 2 images"));
    }

    #[test]
    fn garbage_or_blank_bodies_have_no_detail() {
        assert_eq!(ErrorDetail::from_body(b"<html>").into_detail(), None);
        assert_eq!(ErrorDetail::from_body(br#"{"detail":"  "}"#).into_detail(), None);
        assert_eq!(ErrorDetail::from_body(br#"{}"#).into_detail(), None);
    }
}
