//! Events flowing from the backend worker to the UI thread.

use client_core::DashboardState;

use crate::media::PreviewImage;

pub enum UiEvent {
    /// Latest dashboard snapshot; older ones still queued are superseded.
    State(DashboardState),
    ImageLoaded {
        url: String,
        image: PreviewImage,
    },
    ImageFailed {
        url: String,
        reason: String,
    },
    /// The worker could not start; nothing else will arrive.
    BackendFailed(String),
}

pub fn classify_backend_failure(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if lower.contains("invalid server url") || lower.contains("must use http") {
        format!("Server URL is not usable; fix the setting and relaunch. ({message})")
    } else if lower.contains("runtime") {
        "Backend worker startup failure; relaunch the app.".to_string()
    } else {
        format!("Backend error: {message}")
    }
}
