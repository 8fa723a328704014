//! Dashboard state container.
//!
//! State lives in a `watch` channel as whole snapshots. Every change is an
//! [`Action`] folded in by [`reduce`]; nothing mutates fields directly.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use shared::domain::{ClusterId, ClusterStats, Image};
use tokio::{sync::watch, time::Instant};

use crate::{
    aggregator::ClusterGroups,
    notification::{ExpiryToken, NotificationKind, NotificationSlot},
    sensitivity::SensitivityLevel,
};

/// The service refuses to cluster fewer images than this.
pub const MIN_IMAGES_FOR_CLUSTERING: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub images: Arc<Vec<Image>>,
    pub total_images: usize,
    pub groups: Arc<ClusterGroups>,
    pub stats: BTreeMap<ClusterId, ClusterStats>,
    pub loading: bool,
    pub notification: NotificationSlot,
    pub sensitivity: SensitivityLevel,
    /// Full URL of the image open in the viewer.
    pub selected_image: Option<String>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl DashboardState {
    pub fn cluster_count(&self) -> usize {
        self.groups.len()
    }

    pub fn can_recluster(&self) -> bool {
        !self.loading && self.total_images >= MIN_IMAGES_FOR_CLUSTERING
    }

    pub fn status_label(&self) -> &'static str {
        if self.loading {
            "Processing..."
        } else if self.cluster_count() > 0 {
            "Clustered"
        } else {
            "Ready"
        }
    }

    pub fn stats_for(&self, cluster_id: ClusterId) -> Option<&ClusterStats> {
        self.stats.get(&cluster_id)
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    LoadingStarted,
    LoadingFinished,
    ImagesLoaded {
        total: usize,
        images: Arc<Vec<Image>>,
        groups: Arc<ClusterGroups>,
        at: DateTime<Utc>,
    },
    StatsLoaded {
        cluster_id: ClusterId,
        stats: ClusterStats,
    },
    Cleared,
    Notify {
        message: String,
        kind: NotificationKind,
        now: Instant,
    },
    NotificationExpired(ExpiryToken),
    SensitivityChanged(SensitivityLevel),
    ImageSelected(String),
    SelectionCleared,
}

pub fn reduce(mut state: DashboardState, action: Action) -> DashboardState {
    match action {
        Action::LoadingStarted => state.loading = true,
        Action::LoadingFinished => state.loading = false,
        Action::ImagesLoaded {
            total,
            images,
            groups,
            at,
        } => {
            state.total_images = total;
            state.images = images;
            state.groups = groups;
            // Stats are rebuilt for the new groups rather than carried over.
            state.stats = BTreeMap::new();
            state.refreshed_at = Some(at);
        }
        Action::StatsLoaded { cluster_id, stats } => {
            if state.groups.contains_key(&cluster_id) {
                state.stats.insert(cluster_id, stats);
            }
        }
        Action::Cleared => {
            state.images = Arc::default();
            state.total_images = 0;
            state.groups = Arc::default();
            state.stats = BTreeMap::new();
            state.selected_image = None;
        }
        Action::Notify { message, kind, now } => {
            state.notification.show(message, kind, now);
        }
        Action::NotificationExpired(token) => {
            state.notification.expire(token);
        }
        Action::SensitivityChanged(level) => state.sensitivity = level,
        Action::ImageSelected(url) => state.selected_image = Some(url),
        Action::SelectionCleared => state.selected_image = None,
    }
    state
}

/// Cloneable handle to the shared snapshot channel.
#[derive(Debug, Clone)]
pub struct DashboardStore {
    tx: Arc<watch::Sender<DashboardState>>,
}

impl DashboardStore {
    pub fn new(initial: DashboardState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Applies `action` and returns the resulting snapshot.
    pub fn dispatch(&self, action: Action) -> DashboardState {
        let mut next = None;
        self.tx.send_modify(|state| {
            let previous = std::mem::take(state);
            *state = reduce(previous, action);
            next = Some(state.clone());
        });
        next.unwrap_or_else(|| self.snapshot())
    }

    /// Sets the loading flag unless it is already set. Returns whether this call set it.
    pub fn begin_loading(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if state.loading {
                return false;
            }
            let previous = std::mem::take(state);
            *state = reduce(previous, Action::LoadingStarted);
            true
        })
    }

    pub fn snapshot(&self) -> DashboardState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.tx.subscribe()
    }
}

impl Default for DashboardStore {
    fn default() -> Self {
        Self::new(DashboardState::default())
    }
}
