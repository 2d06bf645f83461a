//! Snapshot endpoints.

use crate::client::{AptlyClient, Call};
use crate::config::Resource;
use crate::normalize::ApiResult;
use crate::transport::Transport;
use crate::types::{
    CreateSnapshotFromPackages, DeleteSnapshot, DiffQuery, PackageQuery, SnapshotListQuery,
    UpdateSnapshot,
};

/// Snapshots: `/api/snapshots`.
impl<T: Transport> AptlyClient<T> {
    pub fn list_snapshots(&self, query: &SnapshotListQuery) -> ApiResult {
        self.dispatch(
            Call::get(Resource::Snapshots)
                .query(query)
                .context("list snapshots"),
        )
    }

    /// Create a snapshot from package references, optionally recording the
    /// snapshots they came from.
    pub fn create_snapshot_from_packages(&self, snapshot: &CreateSnapshotFromPackages) -> ApiResult {
        self.dispatch(
            Call::post(Resource::Snapshots)
                .json(snapshot)?
                .context(format!("create snapshot {}", snapshot.name)),
        )
    }

    /// Rename a snapshot or change its description.
    pub fn update_snapshot(&self, name: &str, update: &UpdateSnapshot) -> ApiResult {
        self.dispatch(
            Call::put(Resource::Snapshots)
                .segment(name)
                .json(update)?
                .context(format!("update snapshot {name}")),
        )
    }

    pub fn show_snapshot(&self, name: &str) -> ApiResult {
        self.dispatch(
            Call::get(Resource::Snapshots)
                .segment(name)
                .context(format!("show snapshot {name}")),
        )
    }

    /// Delete a snapshot. Published snapshots cannot be deleted; snapshots
    /// used as a source of others need `force`.
    pub fn delete_snapshot(&self, name: &str, options: &DeleteSnapshot) -> ApiResult {
        self.dispatch(
            Call::delete(Resource::Snapshots)
                .segment(name)
                .query(options)
                .context(format!("delete snapshot {name}")),
        )
    }

    /// List or search the packages of a snapshot.
    pub fn show_snapshot_packages(&self, name: &str, query: &PackageQuery) -> ApiResult {
        self.dispatch(
            Call::get(Resource::Snapshots)
                .segment(name)
                .segment("packages")
                .query(query)
                .context(format!("list packages of snapshot {name}")),
        )
    }

    /// Difference between `left` and `right`.
    pub fn diff_snapshots(&self, left: &str, right: &str, query: &DiffQuery) -> ApiResult {
        self.dispatch(
            Call::get(Resource::Snapshots)
                .segment(left)
                .segment("diff")
                .segment(right)
                .query(query)
                .context(format!("diff {left} {right}")),
        )
    }
}
