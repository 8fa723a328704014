//! Clustering workflow controller: user intents in, gateway calls and state
//! transitions out.
//!
//! Every gateway failure is turned into a notification here; nothing above
//! this layer sees a [`GatewayError`].

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use chrono::Utc;
use shared::domain::ClusterId;
use tokio::{task::JoinHandle, time::Instant};
use tracing::{error, info, warn};

use crate::{
    aggregator::{spawn_stats_fetches, GroupingCache, StatsBatch},
    config::ClientSettings,
    error::GatewayError,
    notification::NotificationKind,
    sensitivity::SensitivityLevel,
    state::{Action, DashboardState, DashboardStore, MIN_IMAGES_FOR_CLUSTERING},
    ClusterGateway, UploadFile,
};

/// DBSCAN `min_samples` sent with every clustering pass.
pub const MIN_SAMPLES: u32 = 2;

const CLEAR_PROMPT: &str = "Are you sure? This removes every uploaded image and grouping.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Busy,
    NotEnoughImages,
    NoFiles,
    NotConfirmed,
}

/// What a user action ended in. `Completed` and `Failed` carry the
/// notification text that was shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed(String),
    Failed(String),
    Skipped(SkipReason),
}

/// Blocking yes/no question put to the user before destructive actions.
pub trait ConfirmationGate: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// For callers that already asked (e.g. a dialog that has closed with "yes").
pub struct PreConfirmed;

impl ConfirmationGate for PreConfirmed {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Releases the loading flag when dropped, whatever path the action took.
struct LoadingGuard {
    store: DashboardStore,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.store.dispatch(Action::LoadingFinished);
    }
}

struct Notifier {
    store: DashboardStore,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Notifier {
    /// The timer lock is held from the state update until the new timer is
    /// stored, so the stored timer always belongs to the visible notification.
    fn show(&self, message: impl Into<String>, kind: NotificationKind) {
        let mut slot = match self.timer.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };

        let snapshot = self.store.dispatch(Action::Notify {
            message: message.into(),
            kind,
            now: Instant::now(),
        });
        let Some(notification) = snapshot.notification.latest() else {
            return;
        };
        let token = notification.token();
        let expires_at = notification.expires_at;

        let store = self.store.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(expires_at).await;
            store.dispatch(Action::NotificationExpired(token));
        });

        if let Some(previous) = slot.replace(timer) {
            previous.abort();
        }
    }
}

pub struct WorkflowController {
    gateway: Arc<dyn ClusterGateway>,
    store: DashboardStore,
    notifier: Notifier,
    grouping: Mutex<GroupingCache>,
    download_dir: PathBuf,
}

impl WorkflowController {
    pub fn new(gateway: Arc<dyn ClusterGateway>, settings: &ClientSettings) -> Arc<Self> {
        let store = DashboardStore::new(DashboardState {
            sensitivity: settings.initial_sensitivity(),
            ..DashboardState::default()
        });
        Arc::new(Self {
            gateway,
            notifier: Notifier {
                store: store.clone(),
                timer: Mutex::new(None),
            },
            store,
            grouping: Mutex::new(GroupingCache::default()),
            download_dir: settings.download_dir.clone(),
        })
    }

    pub fn store(&self) -> &DashboardStore {
        &self.store
    }

    pub fn snapshot(&self) -> DashboardState {
        self.store.snapshot()
    }

    fn begin_loading(&self) -> Option<LoadingGuard> {
        self.store.begin_loading().then(|| LoadingGuard {
            store: self.store.clone(),
        })
    }

    /// Shows a notification, replacing any visible one and restarting the expiry timer.
    pub fn notify(&self, message: impl Into<String>, kind: NotificationKind) {
        self.notifier.show(message, kind);
    }

    /// Replaces the cached image list and groups, then fans out one stats
    /// request per group. The returned batch may be dropped.
    pub async fn refresh_images(&self) -> Result<StatsBatch, GatewayError> {
        let listing = self.gateway.list_images().await?;
        let images = Arc::new(listing.images);
        let groups = {
            let mut cache = match self.grouping.lock() {
                Ok(cache) => cache,
                Err(poisoned) => poisoned.into_inner(),
            };
            cache.groups_for(&images)
        };
        info!(
            total = listing.total,
            clusters = groups.len(),
            "image list refreshed"
        );

        let cluster_ids: Vec<ClusterId> = groups.keys().copied().collect();
        self.store.dispatch(Action::ImagesLoaded {
            total: listing.total,
            images,
            groups,
            at: Utc::now(),
        });
        Ok(spawn_stats_fetches(&self.gateway, &self.store, cluster_ids))
    }

    /// Startup load of the image list.
    pub async fn load(&self) -> ActionOutcome {
        match self.refresh_images().await {
            Ok(_) => ActionOutcome::Completed(format!(
                "Loaded {} image(s)",
                self.store.snapshot().total_images
            )),
            Err(err) => {
                error!("initial image load failed: {err}");
                let message = err.user_message();
                self.notify(message.clone(), NotificationKind::Error);
                ActionOutcome::Failed(message)
            }
        }
    }

    pub async fn recluster(&self) -> ActionOutcome {
        if self.store.snapshot().total_images < MIN_IMAGES_FOR_CLUSTERING {
            return ActionOutcome::Skipped(SkipReason::NotEnoughImages);
        }
        let Some(_loading) = self.begin_loading() else {
            return ActionOutcome::Skipped(SkipReason::Busy);
        };

        let eps = self.store.snapshot().sensitivity.eps();
        info!(eps, min_samples = MIN_SAMPLES, "running clustering pass");
        match self.gateway.run_clustering(eps, MIN_SAMPLES).await {
            Ok(result) => {
                if let Err(err) = self.refresh_images().await {
                    warn!("refresh after clustering failed: {err}");
                }
                let message = format!("Found {} clusters!", result.num_clusters);
                self.notify(message.clone(), NotificationKind::Success);
                ActionOutcome::Completed(message)
            }
            Err(err) => {
                error!("clustering failed: {err}");
                let message = err.user_message();
                self.notify(message.clone(), NotificationKind::Error);
                ActionOutcome::Failed(message)
            }
        }
    }

    pub async fn upload(&self, files: Vec<UploadFile>) -> ActionOutcome {
        if files.is_empty() {
            return ActionOutcome::Skipped(SkipReason::NoFiles);
        }
        let Some(loading) = self.begin_loading() else {
            return ActionOutcome::Skipped(SkipReason::Busy);
        };

        let report = self.gateway.upload_images(&files).await;
        if let Err(err) = self.refresh_images().await {
            warn!("refresh after upload failed: {err}");
        }
        drop(loading);

        let attempted = report.attempted;
        match report.into_result() {
            Ok(_) => {
                let message = format!("Uploaded {attempted} image(s)");
                self.notify(message.clone(), NotificationKind::Success);
                ActionOutcome::Completed(message)
            }
            Err(GatewayError::PartialUpload { failed, .. }) => {
                let message = format!(
                    "Uploaded {attempted} image(s); {} failed: {}",
                    failed.len(),
                    failed.join(", ")
                );
                self.notify(message.clone(), NotificationKind::Error);
                ActionOutcome::Failed(message)
            }
            Err(err) => {
                let message = err.user_message();
                self.notify(message.clone(), NotificationKind::Error);
                ActionOutcome::Failed(message)
            }
        }
    }

    /// Clears remote data after confirmation. Local state is reset even when
    /// the remote call fails.
    pub async fn clear(&self, gate: &dyn ConfirmationGate) -> ActionOutcome {
        if !gate.confirm(CLEAR_PROMPT) {
            return ActionOutcome::Skipped(SkipReason::NotConfirmed);
        }

        let result = self.gateway.clear_all().await;
        self.store.dispatch(Action::Cleared);

        match result {
            Ok(()) => {
                info!("all data cleared");
                let message = "All data cleared".to_string();
                self.notify(message.clone(), NotificationKind::Success);
                ActionOutcome::Completed(message)
            }
            Err(err) => {
                warn!("clear request failed, local view reset anyway: {err}");
                let message = format!("Clear failed: {}", err.user_message());
                self.notify(message.clone(), NotificationKind::Error);
                ActionOutcome::Failed(message)
            }
        }
    }

    /// Fetches a group's archive and saves it as `group_<n>.zip` in the
    /// download directory. Not gated by the loading flag.
    pub async fn download(&self, cluster_id: ClusterId) -> ActionOutcome {
        self.notify("Preparing download...", NotificationKind::Success);

        let bytes = match self.gateway.download_cluster(cluster_id).await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(cluster_id = cluster_id.0, "download failed: {err}");
                let message = err.user_message();
                self.notify(message.clone(), NotificationKind::Error);
                return ActionOutcome::Failed(message);
            }
        };

        match save_archive(&self.download_dir, cluster_id, &bytes).await {
            Ok(path) => {
                info!(cluster_id = cluster_id.0, path = %path.display(), "archive saved");
                let message = format!("Downloaded {}", cluster_id.archive_filename());
                self.notify(message.clone(), NotificationKind::Success);
                ActionOutcome::Completed(message)
            }
            Err(err) => {
                error!(cluster_id = cluster_id.0, "failed to save archive: {err}");
                let message = format!("Could not save {}: {err}", cluster_id.archive_filename());
                self.notify(message.clone(), NotificationKind::Error);
                ActionOutcome::Failed(message)
            }
        }
    }

    /// Slider moves never trigger a clustering pass.
    pub fn set_sensitivity(&self, eps: f64) -> SensitivityLevel {
        let level = SensitivityLevel::new(eps);
        self.store.dispatch(Action::SensitivityChanged(level));
        level
    }

    pub fn select_image(&self, url: impl Into<String>) {
        self.store.dispatch(Action::ImageSelected(url.into()));
    }

    pub fn close_image(&self) {
        self.store.dispatch(Action::SelectionCleared);
    }

    pub fn archive_path(&self, cluster_id: ClusterId) -> PathBuf {
        self.download_dir.join(cluster_id.archive_filename())
    }
}

async fn save_archive(dir: &Path, cluster_id: ClusterId, bytes: &[u8]) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(cluster_id.archive_filename());
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
