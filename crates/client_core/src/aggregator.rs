//! Folds the flat image list into per-cluster groups and fans out the
//! per-cluster stats requests.

use std::{collections::BTreeMap, sync::Arc};

use futures::future::join_all;
use shared::domain::{ClusterId, Image};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    state::{Action, DashboardStore},
    ClusterGateway,
};

/// Images grouped by cluster id. Iteration is ascending by id; images keep
/// their order from the source list.
pub type ClusterGroups = BTreeMap<ClusterId, Vec<Image>>;

/// Groups every image that has a cluster assignment. Unassigned images are skipped.
pub fn group_images(images: &[Image]) -> ClusterGroups {
    let mut groups = ClusterGroups::new();
    for image in images {
        if let Some(cluster_id) = image.cluster_id {
            groups.entry(cluster_id).or_default().push(image.clone());
        }
    }
    groups
}

/// Remembers the last grouping keyed on the identity of the image list it
/// was computed from.
#[derive(Debug, Default)]
pub struct GroupingCache {
    source: Option<Arc<Vec<Image>>>,
    groups: Arc<ClusterGroups>,
}

impl GroupingCache {
    pub fn groups_for(&mut self, images: &Arc<Vec<Image>>) -> Arc<ClusterGroups> {
        if let Some(source) = &self.source {
            if Arc::ptr_eq(source, images) {
                return Arc::clone(&self.groups);
            }
        }
        let groups = Arc::new(group_images(images));
        self.source = Some(Arc::clone(images));
        self.groups = Arc::clone(&groups);
        groups
    }
}

/// In-flight stats fetches from one refresh. Dropping it detaches the tasks;
/// they still merge their results into the store when they finish.
#[derive(Debug, Default)]
pub struct StatsBatch {
    handles: Vec<JoinHandle<()>>,
}

impl StatsBatch {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits until every fetch in the batch has either merged or failed.
    pub async fn settled(self) {
        join_all(self.handles).await;
    }
}

/// Spawns one independent stats request per cluster id.
pub fn spawn_stats_fetches(
    gateway: &Arc<dyn ClusterGateway>,
    store: &DashboardStore,
    cluster_ids: impl IntoIterator<Item = ClusterId>,
) -> StatsBatch {
    let handles = cluster_ids
        .into_iter()
        .map(|cluster_id| {
            let gateway = Arc::clone(gateway);
            let store = store.clone();
            tokio::spawn(async move {
                match gateway.fetch_cluster_stats(cluster_id).await {
                    Ok(stats) => {
                        debug!(cluster_id = cluster_id.0, "cluster stats loaded");
                        store.dispatch(Action::StatsLoaded { cluster_id, stats });
                    }
                    Err(err) => {
                        warn!(cluster_id = cluster_id.0, "failed to fetch cluster stats: {err}");
                    }
                }
            })
        })
        .collect();
    StatsBatch { handles }
}
