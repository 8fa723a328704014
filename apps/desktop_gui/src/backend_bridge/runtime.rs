//! Runtime bridge between UI command queue and backend event intake.

use std::{path::PathBuf, sync::Arc, thread};

use client_core::{
    ClientSettings, ClusterGateway, HttpClusterGateway, NotificationKind, PreConfirmed,
    UploadFile, WorkflowController,
};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use tokio::sync::watch;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{classify_backend_failure, UiEvent};
use crate::media::decode_preview_image;

pub fn launch(settings: ClientSettings, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::BackendFailed(classify_backend_failure(
                    &format!("failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let server_url = match settings.validated_server_url() {
                Ok(url) => url,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::BackendFailed(classify_backend_failure(
                        &format!("{err:#}"),
                    )));
                    tracing::error!("backend worker not started: {err:#}");
                    return;
                }
            };
            tracing::info!(%server_url, "backend worker ready");

            let gateway: Arc<dyn ClusterGateway> = Arc::new(HttpClusterGateway::new(server_url));
            let controller = WorkflowController::new(Arc::clone(&gateway), &settings);
            tokio::spawn(forward_state(controller.store().subscribe(), ui_tx.clone()));

            while let Ok(cmd) = cmd_rx.recv() {
                tracing::debug!(command = cmd.name(), "backend command received");
                let controller = Arc::clone(&controller);
                let gateway = Arc::clone(&gateway);
                let ui_tx = ui_tx.clone();
                tokio::spawn(async move {
                    run_command(cmd, &controller, gateway.as_ref(), &ui_tx).await;
                });
            }
            tracing::info!("ui command queue closed; backend worker stopping");
        });
    });
}

async fn run_command(
    cmd: BackendCommand,
    controller: &WorkflowController,
    gateway: &dyn ClusterGateway,
    ui_tx: &Sender<UiEvent>,
) {
    match cmd {
        BackendCommand::Load => {
            controller.load().await;
        }
        BackendCommand::Recluster => {
            controller.recluster().await;
        }
        BackendCommand::Upload { paths } => {
            let files = read_upload_files(controller, paths).await;
            if !files.is_empty() {
                controller.upload(files).await;
            }
        }
        BackendCommand::Clear => {
            controller.clear(&PreConfirmed).await;
        }
        BackendCommand::Download { cluster_id } => {
            controller.download(cluster_id).await;
        }
        BackendCommand::SetSensitivity { eps } => {
            controller.set_sensitivity(eps);
        }
        BackendCommand::SelectImage { url } => {
            controller.select_image(url);
        }
        BackendCommand::CloseImage => {
            controller.close_image();
        }
        BackendCommand::FetchImage { url } => {
            let event = match gateway.fetch_image(&url).await {
                Ok(bytes) => match decode_preview_image(&bytes) {
                    Ok(image) => UiEvent::ImageLoaded { url, image },
                    Err(reason) => UiEvent::ImageFailed { url, reason },
                },
                Err(err) => {
                    tracing::warn!(%url, "image fetch failed: {err}");
                    UiEvent::ImageFailed {
                        url,
                        reason: err.user_message(),
                    }
                }
            };
            send_event(ui_tx, event);
        }
    }
}

/// Unreadable files are reported and skipped; the rest are uploaded.
async fn read_upload_files(controller: &WorkflowController, paths: Vec<PathBuf>) -> Vec<UploadFile> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match UploadFile::from_path(&path).await {
            Ok(file) => files.push(file),
            Err(err) => {
                tracing::warn!(path = %path.display(), "skipping unreadable file: {err:#}");
                controller.notify(format!("{err:#}"), NotificationKind::Error);
            }
        }
    }
    files
}

async fn forward_state(
    mut rx: watch::Receiver<client_core::DashboardState>,
    ui_tx: Sender<UiEvent>,
) {
    loop {
        let snapshot = rx.borrow_and_update().clone();
        if !send_event(&ui_tx, UiEvent::State(snapshot)) {
            break;
        }
        if rx.changed().await.is_err() {
            break;
        }
    }
}

/// Returns false once the UI side is gone.
fn send_event(ui_tx: &Sender<UiEvent>, event: UiEvent) -> bool {
    match ui_tx.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!("ui event queue full; dropping event");
            true
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}
