//! Backend commands queued from UI to backend worker.

use shared::domain::ClusterId;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum BackendCommand {
    Load,
    Recluster,
    Upload {
        paths: Vec<PathBuf>,
    },
    /// Sent only after the confirmation dialog closed with "yes".
    Clear,
    Download {
        cluster_id: ClusterId,
    },
    SetSensitivity {
        eps: f64,
    },
    SelectImage {
        url: String,
    },
    CloseImage,
    FetchImage {
        url: String,
    },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Load => "load",
            BackendCommand::Recluster => "recluster",
            BackendCommand::Upload { .. } => "upload",
            BackendCommand::Clear => "clear",
            BackendCommand::Download { .. } => "download",
            BackendCommand::SetSensitivity { .. } => "set_sensitivity",
            BackendCommand::SelectImage { .. } => "select_image",
            BackendCommand::CloseImage => "close_image",
            BackendCommand::FetchImage { .. } => "fetch_image",
        }
    }
}
