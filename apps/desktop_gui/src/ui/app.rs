use std::collections::HashMap;

use chrono::Local;
use client_core::{
    sensitivity::{EPS_STEP, MAX_EPS, MIN_EPS},
    ClientSettings, DashboardState, NotificationKind, SensitivityLevel,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui::TextureHandle;
use shared::domain::{ClusterId, Image};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::controller::orchestration::dispatch_backend_command;
use crate::media::PreviewImage;
use crate::ui::theme;

const THUMBNAIL_SIDE: f32 = 120.0;
const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "webp", "bmp"];

enum ThumbnailState {
    Loading,
    Ready {
        texture: TextureHandle,
        size: egui::Vec2,
    },
    Failed(String),
}

pub struct DashboardApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    settings: ClientSettings,

    state: DashboardState,
    eps: f64,
    thumbnails: HashMap<String, ThumbnailState>,
    confirm_clear_open: bool,

    /// Local problems (queue full, backend gone) that never reach the store.
    status: String,
    backend_failure: Option<String>,
}

impl DashboardApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        settings: ClientSettings,
    ) -> Self {
        let sensitivity = settings.initial_sensitivity();
        let mut app = Self {
            cmd_tx,
            ui_rx,
            settings,
            state: DashboardState {
                sensitivity,
                ..DashboardState::default()
            },
            eps: sensitivity.eps(),
            thumbnails: HashMap::new(),
            confirm_clear_open: false,
            status: String::new(),
            backend_failure: None,
        };
        app.queue(BackendCommand::Load);
        app
    }

    fn queue(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status);
    }

    fn process_ui_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::State(state) => self.apply_state(state),
                UiEvent::ImageLoaded { url, image } => {
                    let (texture, size) = upload_texture(ctx, &url, &image);
                    self.thumbnails
                        .insert(url, ThumbnailState::Ready { texture, size });
                }
                UiEvent::ImageFailed { url, reason } => {
                    tracing::debug!(%url, "thumbnail unavailable: {reason}");
                    self.thumbnails.insert(url, ThumbnailState::Failed(reason));
                }
                UiEvent::BackendFailed(message) => {
                    self.backend_failure = Some(message);
                }
            }
        }
    }

    /// The slider only follows the store when the stored level moved, so
    /// unrelated updates never pull it back mid-drag.
    fn apply_state(&mut self, state: DashboardState) {
        if state.sensitivity != self.state.sensitivity {
            self.eps = state.sensitivity.eps();
        }
        if state.total_images == 0 {
            self.thumbnails.clear();
        }
        self.state = state;
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header")
            .exact_height(56.0)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.heading("Image Cluster Dashboard");
                    ui.separator();

                    if ui.button("Upload Images").clicked() {
                        if let Some(paths) = rfd::FileDialog::new()
                            .add_filter("Images", &IMAGE_EXTENSIONS)
                            .pick_files()
                        {
                            self.queue(BackendCommand::Upload { paths });
                        }
                    }

                    ui.separator();
                    let level = SensitivityLevel::new(self.eps);
                    ui.label(format!("Sensitivity: {} ({})", level, level.label()));
                    let slider = ui.add(
                        egui::Slider::new(&mut self.eps, MIN_EPS..=MAX_EPS)
                            .step_by(EPS_STEP)
                            .fixed_decimals(2)
                            .show_value(false),
                    );
                    if slider.changed() {
                        self.queue(BackendCommand::SetSensitivity { eps: self.eps });
                    }

                    let cluster = ui.add_enabled(
                        self.state.can_recluster(),
                        egui::Button::new("Cluster"),
                    );
                    if cluster.clicked() {
                        self.queue(BackendCommand::Recluster);
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Clear All").clicked() {
                            self.confirm_clear_open = true;
                        }
                    });
                });
            });
    }

    fn show_stats_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(format!("Total images: {}", self.state.total_images));
            ui.separator();
            ui.label(format!("Clusters: {}", self.state.cluster_count()));
            ui.separator();
            ui.label(format!("Status: {}", self.state.status_label()));
            if let Some(at) = self.state.refreshed_at {
                ui.separator();
                ui.label(format!(
                    "Updated {}",
                    at.with_timezone(&Local).format("%H:%M:%S")
                ));
            }
            if !self.status.is_empty() {
                ui.separator();
                ui.colored_label(theme::ERROR_FILL, self.status.as_str());
            }
        });
    }

    fn show_groups(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(message) = &self.backend_failure {
                egui::Frame::NONE
                    .fill(theme::ERROR_FILL)
                    .corner_radius(8.0)
                    .inner_margin(egui::Margin::symmetric(10, 8))
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new(message).color(egui::Color32::WHITE));
                    });
                ui.add_space(8.0);
            }

            self.show_stats_bar(ui);
            ui.separator();

            if self.state.groups.is_empty() {
                ui.centered_and_justified(|ui| {
                    ui.label("No groups yet. Upload images and run clustering.");
                });
                return;
            }

            let groups = std::sync::Arc::clone(&self.state.groups);
            egui::ScrollArea::vertical().show(ui, |ui| {
                for (index, (cluster_id, images)) in groups.iter().enumerate() {
                    self.show_group(ui, index, *cluster_id, images);
                    ui.add_space(12.0);
                }
            });
        });
    }

    fn show_group(&mut self, ui: &mut egui::Ui, index: usize, cluster_id: ClusterId, images: &[Image]) {
        let accent = theme::group_accent(index);
        egui::Frame::group(ui.style())
            .stroke(egui::Stroke::new(2.0, accent))
            .corner_radius(8.0)
            .inner_margin(egui::Margin::same(10))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(format!("Group {}", cluster_id.display_number()))
                            .strong()
                            .color(accent),
                    );
                    if let Some(stats) = self.state.stats_for(cluster_id) {
                        ui.label(
                            egui::RichText::new(format!(
                                "{:.0}% similar {}",
                                stats.similarity_percent,
                                theme::coherence_stars(&stats.coherence)
                            ))
                            .color(theme::coherence_color(&stats.coherence)),
                        )
                        .on_hover_text(stats.coherence.as_str());
                    }
                    ui.label(format!("{} Images", images.len()));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Download").clicked() {
                            self.queue(BackendCommand::Download { cluster_id });
                        }
                    });
                });

                ui.horizontal_wrapped(|ui| {
                    for image in images {
                        self.show_thumbnail(ui, image);
                    }
                });
            });
    }

    fn show_thumbnail(&mut self, ui: &mut egui::Ui, image: &Image) {
        let url = self.settings.resolve_image_url(image);
        let clicked = match self.thumbnails.get(&url) {
            Some(ThumbnailState::Ready { texture, size }) => {
                let scale = (THUMBNAIL_SIDE / size.x).min(THUMBNAIL_SIDE / size.y).min(1.0);
                ui.add(
                    egui::Image::new(texture)
                        .fit_to_exact_size(*size * scale)
                        .sense(egui::Sense::click()),
                )
                .on_hover_text(image.filename.as_str())
                .clicked()
            }
            Some(ThumbnailState::Failed(reason)) => ui
                .add_sized(
                    [THUMBNAIL_SIDE, THUMBNAIL_SIDE],
                    egui::Button::new(image.filename.as_str()),
                )
                .on_hover_text(reason.as_str())
                .clicked(),
            Some(ThumbnailState::Loading) => {
                ui.add_sized([THUMBNAIL_SIDE, THUMBNAIL_SIDE], egui::Spinner::new());
                false
            }
            None => {
                self.thumbnails.insert(url.clone(), ThumbnailState::Loading);
                self.queue(BackendCommand::FetchImage { url: url.clone() });
                false
            }
        };
        if clicked {
            self.queue(BackendCommand::SelectImage { url });
        }
    }

    fn show_clear_confirmation(&mut self, ctx: &egui::Context) {
        if !self.confirm_clear_open {
            return;
        }
        egui::Window::new("Clear all data?")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label("Are you sure? This removes every uploaded image and grouping.");
                ui.horizontal(|ui| {
                    if ui.button("Clear").clicked() {
                        self.confirm_clear_open = false;
                        self.queue(BackendCommand::Clear);
                    }
                    if ui.button("Cancel").clicked() {
                        self.confirm_clear_open = false;
                    }
                });
            });
    }

    /// Clicking the backdrop dismisses the viewer like its Close button.
    fn show_image_viewer(&mut self, ctx: &egui::Context) {
        let Some(url) = self.state.selected_image.clone() else {
            return;
        };

        let max_size = ctx.screen_rect().size() * 0.8;
        let viewer = egui::Modal::new(egui::Id::new("image_viewer")).show(ctx, |ui| {
            match self.thumbnails.get(&url) {
                Some(ThumbnailState::Ready { texture, size }) => {
                    let scale = (max_size.x / size.x).min(max_size.y / size.y).min(1.0);
                    ui.add(egui::Image::new(texture).fit_to_exact_size(*size * scale));
                }
                _ => {
                    ui.label("Preview not available.");
                }
            }
            ui.button("Close").clicked()
        });

        if viewer.inner || viewer.should_close() {
            self.state.selected_image = None;
            self.queue(BackendCommand::CloseImage);
        }
    }

    fn show_loading_overlay(&self, ctx: &egui::Context) {
        if !self.state.loading {
            return;
        }
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("loading_overlay"),
        ));
        let rect = ctx.screen_rect();
        painter.rect_filled(rect, 0.0, theme::OVERLAY_FILL);
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            format!("Processing with eps={}...", self.state.sensitivity),
            egui::FontId::proportional(22.0),
            egui::Color32::WHITE,
        );
    }

    fn show_toast(&self, ctx: &egui::Context) {
        let Some(notification) = self.state.notification.visible() else {
            return;
        };
        let fill = match notification.kind {
            NotificationKind::Success => theme::SUCCESS_FILL,
            NotificationKind::Error => theme::ERROR_FILL,
        };
        egui::Area::new(egui::Id::new("toast"))
            .order(egui::Order::Tooltip)
            .anchor(egui::Align2::RIGHT_BOTTOM, [-16.0, -16.0])
            .show(ctx, |ui| {
                egui::Frame::NONE
                    .fill(fill)
                    .corner_radius(8.0)
                    .inner_margin(egui::Margin::symmetric(14, 10))
                    .show(ui, |ui| {
                        ui.label(
                            egui::RichText::new(&notification.message).color(egui::Color32::WHITE),
                        );
                    });
            });
    }
}

fn upload_texture(ctx: &egui::Context, url: &str, image: &PreviewImage) -> (TextureHandle, egui::Vec2) {
    let color_image = egui::ColorImage::from_rgba_unmultiplied(image.size(), &image.rgba);
    let texture = ctx.load_texture(url, color_image, egui::TextureOptions::LINEAR);
    let size = egui::vec2(image.width as f32, image.height as f32);
    (texture, size)
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events(ctx);

        self.show_header(ctx);
        self.show_groups(ctx);
        self.show_clear_confirmation(ctx);
        self.show_image_viewer(ctx);
        self.show_loading_overlay(ctx);
        self.show_toast(ctx);

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> (DashboardApp, Receiver<BackendCommand>) {
        let (cmd_tx, cmd_rx) = crossbeam_channel::bounded(8);
        let (_ui_tx, ui_rx) = crossbeam_channel::bounded(8);
        let app = DashboardApp::new(cmd_tx, ui_rx, ClientSettings::default());
        assert!(matches!(cmd_rx.try_recv(), Ok(BackendCommand::Load)));
        (app, cmd_rx)
    }

    #[test]
    fn unrelated_state_updates_leave_the_slider_alone() {
        let (mut app, _cmd_rx) = app();
        app.eps = 0.35;

        let listed = DashboardState {
            total_images: 3,
            ..app.state.clone()
        };
        app.apply_state(listed);
        assert_eq!(app.eps, 0.35);
        assert_eq!(app.state.total_images, 3);

        let moved = SensitivityLevel::new(0.15);
        app.apply_state(DashboardState {
            sensitivity: moved,
            ..app.state.clone()
        });
        assert_eq!(app.eps, moved.eps());
    }

    #[test]
    fn clicking_the_backdrop_closes_the_viewer() {
        let (mut app, cmd_rx) = app();
        app.state.selected_image = Some("http://localhost:5000/uploads/a.png".into());

        let ctx = egui::Context::default();
        let corner = egui::pos2(4.0, 4.0);
        let click = |pressed| egui::Event::PointerButton {
            pos: corner,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        };
        let frames = [
            vec![],
            vec![egui::Event::PointerMoved(corner), click(true)],
            vec![click(false)],
        ];
        for events in frames {
            let input = egui::RawInput {
                screen_rect: Some(egui::Rect::from_min_size(
                    egui::Pos2::ZERO,
                    egui::vec2(800.0, 600.0),
                )),
                events,
                ..Default::default()
            };
            let _ = ctx.run(input, |ctx| app.show_image_viewer(ctx));
        }

        assert!(app.state.selected_image.is_none());
        assert!(matches!(cmd_rx.try_recv(), Ok(BackendCommand::CloseImage)));
        assert!(cmd_rx.try_recv().is_err());
    }
}
