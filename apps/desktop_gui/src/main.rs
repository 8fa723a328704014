mod backend_bridge;
mod controller;
mod media;
mod ui;

use client_core::{load_settings, ClientSettings};
use crossbeam_channel::bounded;
use eframe::egui;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::ui::DashboardApp;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings().unwrap_or_else(|err| {
        tracing::warn!("falling back to default settings: {err:#}");
        ClientSettings::default()
    });

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(settings.clone(), cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Image Cluster Dashboard")
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([900.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Image Cluster Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(DashboardApp::new(cmd_tx, ui_rx, settings)))),
    )
}
