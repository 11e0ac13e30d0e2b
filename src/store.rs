//! Entity store
//!
//! Keyed, observable registry of elector projections. The single source of
//! truth for "what is this elector's guarantee state right now": every
//! concurrently rendered view (table, card list, dialog, relationship
//! panels) reads from here and subscribes for changes, so no two views can
//! diverge.
//!
//! The store holds no network knowledge. It is mutated exclusively through
//! [`EntityStore::commit`], which the mutation gateway calls only after a
//! confirmed remote success - never speculatively. A commit is an atomic
//! whole-projection replacement followed by a broadcast; views read a
//! consistent snapshot per render.

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

use crate::model::{
    ConfirmationStatus, ElectorProjection, GuaranteeField, GuaranteePatch, GuaranteeStatus,
};
use crate::types::{EngineError, Result};

/// Buffered notifications per elector channel before a slow subscriber lags
const CHANNEL_CAPACITY: usize = 16;

/// Aggregate guarantee tally across the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub none: usize,
    pub pending: usize,
    pub guaranteed: usize,
    /// Active guarantees whose confirmation is `Confirmed`
    pub confirmed: usize,
}

/// Observable keyed registry of elector projections
pub struct EntityStore {
    electors: DashMap<String, ElectorProjection>,
    /// Per-elector notification channels, created lazily on first subscribe
    watchers: DashMap<String, broadcast::Sender<ElectorProjection>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            electors: DashMap::new(),
            watchers: DashMap::new(),
        }
    }

    /// Seed or replace an elector's projection (from a list or detail fetch)
    ///
    /// Subscribers are notified, so a refetch that lands while a dialog is
    /// open still converges every view.
    pub fn upsert(&self, projection: ElectorProjection) {
        let koc_id = projection.koc_id.clone();
        self.electors.insert(koc_id.clone(), projection.clone());
        self.notify(&koc_id, projection);
    }

    /// Snapshot of one elector's projection
    pub fn get(&self, koc_id: &str) -> Option<ElectorProjection> {
        self.electors.get(koc_id).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.electors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.electors.is_empty()
    }

    /// Subscribe to commits for one elector
    ///
    /// Each successful commit (and upsert) delivers the full post-commit
    /// snapshot.
    pub fn subscribe(&self, koc_id: &str) -> broadcast::Receiver<ElectorProjection> {
        self.watchers
            .entry(koc_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Apply a validated patch and notify subscribers
    ///
    /// Atomic: the patch is fully applied or rejected. A field or status
    /// patch against an elector with no active guarantee, or any patch
    /// against an unknown elector, indicates a bug in the caller and is
    /// rejected without touching the projection.
    pub fn commit(&self, koc_id: &str, patch: GuaranteePatch) -> Result<ElectorProjection> {
        let snapshot = {
            let mut entry = self
                .electors
                .get_mut(koc_id)
                .ok_or_else(|| EngineError::UnknownElector(koc_id.to_string()))?;

            let projection = entry.value_mut();
            match &patch {
                GuaranteePatch::Created { .. } if projection.has_guarantee() => {
                    return Err(EngineError::invalid_state(
                        koc_id,
                        "already has an active guarantee",
                    ));
                }
                GuaranteePatch::Status { .. } | GuaranteePatch::Field(_) | GuaranteePatch::Cleared
                    if !projection.has_guarantee() =>
                {
                    return Err(EngineError::invalid_state(koc_id, "no active guarantee"));
                }
                _ => {}
            }

            apply(projection, patch);
            debug_assert!(projection.invariant_holds(), "commit broke the projection invariant");
            projection.clone()
        };

        debug!(koc_id = %koc_id, status = ?snapshot.guarantee_status, "Entity store: committed");
        self.notify(koc_id, snapshot.clone());
        Ok(snapshot)
    }

    /// Tally guarantee statuses across all projections
    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for entry in self.electors.iter() {
            match entry.guarantee_status {
                GuaranteeStatus::None => counts.none += 1,
                GuaranteeStatus::Pending => counts.pending += 1,
                GuaranteeStatus::Guaranteed => counts.guaranteed += 1,
            }
            if entry.guarantee_confirmation == Some(ConfirmationStatus::Confirmed) {
                counts.confirmed += 1;
            }
        }
        counts
    }

    /// Null out membership of a group the collaborator deleted
    ///
    /// Re-commits `group = None` for every projection referencing the
    /// group, so open views converge without a refetch. Returns how many
    /// projections were touched.
    pub fn clear_group_refs(&self, group_id: i64) -> usize {
        let members: Vec<String> = self
            .electors
            .iter()
            .filter(|entry| {
                entry
                    .guarantee_group
                    .as_ref()
                    .is_some_and(|g| g.id == group_id)
            })
            .map(|entry| entry.koc_id.clone())
            .collect();

        let mut touched = 0;
        for koc_id in members {
            if self
                .commit(&koc_id, GuaranteePatch::Field(GuaranteeField::Group(None)))
                .is_ok()
            {
                touched += 1;
            }
        }
        debug!(group_id, touched, "Entity store: cleared group refs");
        touched
    }

    fn notify(&self, koc_id: &str, snapshot: ElectorProjection) {
        if let Some(sender) = self.watchers.get(koc_id) {
            // No receivers is fine; views come and go
            let _ = sender.send(snapshot);
        }
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply a patch in place. Validation happened before this is called.
fn apply(projection: &mut ElectorProjection, patch: GuaranteePatch) {
    match patch {
        GuaranteePatch::Created {
            id,
            status,
            group,
            mobile,
            note,
        } => {
            projection.guarantee_status = status.into();
            projection.guarantee_id = Some(id);
            projection.guarantee_group = group;
            projection.guarantee_mobile = mobile;
            projection.guarantee_confirmation = Some(ConfirmationStatus::Pending);
            projection.guarantee_note = note;
        }
        GuaranteePatch::Status {
            id,
            status,
            confirmation,
        } => {
            projection.guarantee_status = status.into();
            projection.guarantee_id = Some(id);
            // Backfill only; a confirmation that was actually fetched is
            // never overwritten by a status flip
            if projection.guarantee_confirmation.is_none() {
                projection.guarantee_confirmation = Some(confirmation);
            }
        }
        GuaranteePatch::Field(field) => match field {
            GuaranteeField::Group(group) => projection.guarantee_group = group,
            GuaranteeField::Mobile(mobile) => projection.guarantee_mobile = mobile,
            GuaranteeField::Confirmation(confirmation) => {
                projection.guarantee_confirmation = Some(confirmation)
            }
            GuaranteeField::QuickNote(note) => projection.guarantee_note = note,
        },
        GuaranteePatch::Cleared => {
            projection.guarantee_status = GuaranteeStatus::None;
            projection.guarantee_id = None;
            projection.guarantee_group = None;
            projection.guarantee_mobile = String::new();
            projection.guarantee_confirmation = None;
            projection.guarantee_note = String::new();
        }
    }
}
