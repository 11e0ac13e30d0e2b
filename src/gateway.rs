//! Mutation gateway
//!
//! The only writer of guarantee state. Each of the four intents (create,
//! quick-status-update, field-update, delete) is scoped to a single
//! elector id and follows the same sequence: lock the id, validate the
//! local precondition, call the remote service, and commit to the entity
//! store only after a confirmed success. On failure the lock is released
//! and nothing changes, so no view ever observes partial state.
//!
//! ## Concurrency guard
//!
//! At most one mutation is in flight per elector id. A second intent for a
//! locked id is rejected immediately with `Busy` - never queued - which
//! closes the double-submit races: two clicks on the same control, or a
//! "remove" racing a "confirm" on the same elector from two open views.
//! The lock is released when the remote call settles, success or failure,
//! so an abandoned request cannot deadlock the elector.

use std::sync::Arc;

use dashmap::DashSet;
use tracing::{debug, warn};

use crate::model::{
    ActiveStatus, ConfirmationStatus, ElectorProjection, GroupRef, GuaranteeField, GuaranteePatch,
};
use crate::remote::{CreateGuaranteeRequest, GuaranteeFieldsPatch, GuaranteeRef, GuaranteeService};
use crate::store::EntityStore;
use crate::types::{EngineError, Result};

/// Issues guarantee mutations against the remote service and commits
/// confirmed results to the entity store
pub struct MutationGateway {
    service: Arc<dyn GuaranteeService>,
    store: Arc<EntityStore>,
    locks: Arc<DashSet<String>>,
}

/// Releases the elector lock when the intent settles, on every path
struct ElectorLock {
    locks: Arc<DashSet<String>>,
    koc_id: String,
}

impl Drop for ElectorLock {
    fn drop(&mut self) {
        self.locks.remove(&self.koc_id);
        debug!(koc_id = %self.koc_id, "Gateway: lock released");
    }
}

impl MutationGateway {
    pub fn new(service: Arc<dyn GuaranteeService>, store: Arc<EntityStore>) -> Self {
        Self {
            service,
            store,
            locks: Arc::new(DashSet::new()),
        }
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    /// Whether a mutation for this elector is currently in flight
    ///
    /// Views disable the triggering control while locked instead of
    /// surfacing `Busy` as an error.
    pub fn is_locked(&self, koc_id: &str) -> bool {
        self.locks.contains(koc_id)
    }

    /// Create a guarantee for an elector with none
    pub async fn create(
        &self,
        koc_id: &str,
        status: ActiveStatus,
        group: Option<GroupRef>,
        mobile: Option<String>,
        note: Option<String>,
    ) -> Result<ElectorProjection> {
        let _lock = self.lock(koc_id)?;
        let current = self.current(koc_id)?;
        if current.has_guarantee() {
            return Err(EngineError::invalid_state(
                koc_id,
                "already has an active guarantee",
            ));
        }

        let request = CreateGuaranteeRequest {
            elector_koc_id: koc_id.to_string(),
            guarantee_status: status,
            group_id: group.as_ref().map(|g| g.id),
            mobile: mobile.clone(),
            quick_note: note.clone(),
        };
        let created = self.service.create_guarantee(&request).await?;

        self.store.commit(
            koc_id,
            GuaranteePatch::Created {
                id: created.id,
                status,
                group,
                mobile: mobile.unwrap_or_default(),
                note: note.unwrap_or_default(),
            },
        )
    }

    /// Flip the status of an existing guarantee, leaving confirmation,
    /// group, mobile and note untouched
    ///
    /// Addresses the guarantee by id when cached; the by-elector fallback
    /// exists for projections seeded from relationship queries. The
    /// status-not-none precondition is asserted before any network call,
    /// so the fallback can never turn into an ambiguous create.
    pub async fn quick_status_update(
        &self,
        koc_id: &str,
        status: ActiveStatus,
    ) -> Result<ElectorProjection> {
        let _lock = self.lock(koc_id)?;
        let current = self.current(koc_id)?;
        if !current.has_guarantee() {
            return Err(EngineError::invalid_state(koc_id, "no active guarantee"));
        }

        let target = guarantee_ref(&current);
        let updated = self.service.update_guarantee_status(&target, status).await?;

        self.store.commit(
            koc_id,
            GuaranteePatch::Status {
                id: updated.id,
                status,
                confirmation: updated
                    .confirmation_status
                    .unwrap_or(ConfirmationStatus::Pending),
            },
        )
    }

    /// Patch a single guarantee field
    pub async fn update_field(
        &self,
        koc_id: &str,
        field: GuaranteeField,
    ) -> Result<ElectorProjection> {
        let _lock = self.lock(koc_id)?;
        self.field_update_inner(koc_id, field).await
    }

    /// Field update without the elector lock
    ///
    /// Used only by the dirty-field tracker: an inline mobile/note save
    /// must not be blocked by a status mutation in flight for the same
    /// elector. The tracker's per-field saving flag supplies the
    /// no-concurrent-identical-save discipline instead.
    pub(crate) async fn update_field_unlocked(
        &self,
        koc_id: &str,
        field: GuaranteeField,
    ) -> Result<ElectorProjection> {
        self.field_update_inner(koc_id, field).await
    }

    /// Delete the elector's guarantee and reset its projection
    ///
    /// Prefers delete-by-guarantee-id (authoritative and unambiguous);
    /// falls back to delete-by-elector-id only when the id was never
    /// fetched.
    pub async fn delete(&self, koc_id: &str) -> Result<ElectorProjection> {
        let _lock = self.lock(koc_id)?;
        let current = self.current(koc_id)?;
        if !current.has_guarantee() {
            return Err(EngineError::invalid_state(
                koc_id,
                "no active guarantee to remove",
            ));
        }

        let target = guarantee_ref(&current);
        self.service.delete_guarantee(&target).await?;

        self.store.commit(koc_id, GuaranteePatch::Cleared)
    }

    async fn field_update_inner(
        &self,
        koc_id: &str,
        field: GuaranteeField,
    ) -> Result<ElectorProjection> {
        let current = self.current(koc_id)?;
        if !current.has_guarantee() {
            return Err(EngineError::invalid_state(koc_id, "no active guarantee"));
        }
        let guarantee_id = current.guarantee_id.ok_or_else(|| {
            EngineError::invalid_state(koc_id, "guarantee id not yet known locally")
        })?;

        debug!(koc_id = %koc_id, field = field.name(), "Gateway: field update");
        let wire_patch = GuaranteeFieldsPatch::from(&field);
        self.service
            .update_guarantee(guarantee_id, &wire_patch)
            .await?;

        self.store.commit(koc_id, GuaranteePatch::Field(field))
    }

    fn lock(&self, koc_id: &str) -> Result<ElectorLock> {
        if !self.locks.insert(koc_id.to_string()) {
            warn!(koc_id = %koc_id, "Gateway: intent rejected, mutation already in flight");
            return Err(EngineError::Busy(koc_id.to_string()));
        }
        debug!(koc_id = %koc_id, "Gateway: lock acquired");
        Ok(ElectorLock {
            locks: Arc::clone(&self.locks),
            koc_id: koc_id.to_string(),
        })
    }

    fn current(&self, koc_id: &str) -> Result<ElectorProjection> {
        self.store
            .get(koc_id)
            .ok_or_else(|| EngineError::UnknownElector(koc_id.to_string()))
    }
}

/// Prefer the cached guarantee id over the elector fallback
fn guarantee_ref(projection: &ElectorProjection) -> GuaranteeRef {
    match projection.guarantee_id {
        Some(id) => GuaranteeRef::ById(id),
        None => GuaranteeRef::ByElector(projection.koc_id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GuaranteeStatus;
    use crate::remote::{GuaranteeFieldsPatch, GuaranteeSummary, RelationshipQuery, Relationships};

    /// Always-succeeding service that assigns id 1
    struct OkService;

    #[async_trait::async_trait]
    impl GuaranteeService for OkService {
        async fn create_guarantee(
            &self,
            request: &CreateGuaranteeRequest,
        ) -> Result<GuaranteeSummary> {
            Ok(GuaranteeSummary {
                id: 1,
                guarantee_status: request.guarantee_status,
                confirmation_status: None,
            })
        }

        async fn update_guarantee_status(
            &self,
            target: &GuaranteeRef,
            status: ActiveStatus,
        ) -> Result<GuaranteeSummary> {
            let id = match target {
                GuaranteeRef::ById(id) => *id,
                GuaranteeRef::ByElector(_) => 1,
            };
            Ok(GuaranteeSummary {
                id,
                guarantee_status: status,
                confirmation_status: None,
            })
        }

        async fn update_guarantee(&self, _: i64, _: &GuaranteeFieldsPatch) -> Result<()> {
            Ok(())
        }

        async fn delete_guarantee(&self, _: &GuaranteeRef) -> Result<()> {
            Ok(())
        }

        async fn fetch_relationships(&self, _: &RelationshipQuery) -> Result<Relationships> {
            unimplemented!("not exercised here")
        }
    }

    fn gateway_with_elector(koc_id: &str) -> MutationGateway {
        let store = Arc::new(EntityStore::new());
        store.upsert(ElectorProjection::new(koc_id, "Test Elector"));
        MutationGateway::new(Arc::new(OkService), store)
    }

    #[tokio::test]
    async fn test_create_requires_no_guarantee() {
        let gateway = gateway_with_elector("K1");
        gateway
            .create("K1", ActiveStatus::Pending, None, None, None)
            .await
            .unwrap();

        let err = gateway
            .create("K1", ActiveStatus::Pending, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_quick_status_rejected_without_guarantee() {
        let gateway = gateway_with_elector("K1");
        let err = gateway
            .quick_status_update("K1", ActiveStatus::Guaranteed)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_unknown_elector_rejected_before_network() {
        let gateway = gateway_with_elector("K1");
        let err = gateway.delete("K9").await.unwrap_err();
        assert!(matches!(err, EngineError::UnknownElector(_)));
        assert!(!gateway.is_locked("K9"));
    }

    #[tokio::test]
    async fn test_lock_released_after_failed_precondition() {
        let gateway = gateway_with_elector("K1");
        let _ = gateway.delete("K1").await.unwrap_err();
        assert!(!gateway.is_locked("K1"));

        // A follow-up intent is accepted normally
        gateway
            .create("K1", ActiveStatus::Guaranteed, None, None, None)
            .await
            .unwrap();
        assert_eq!(
            gateway.store().get("K1").unwrap().guarantee_status,
            GuaranteeStatus::Guaranteed
        );
    }

    #[tokio::test]
    async fn test_full_lifecycle_keeps_invariant() {
        let gateway = gateway_with_elector("K1");
        let after = gateway
            .create("K1", ActiveStatus::Pending, None, Some("555-1111".into()), None)
            .await
            .unwrap();
        assert!(after.invariant_holds());

        let after = gateway
            .quick_status_update("K1", ActiveStatus::Guaranteed)
            .await
            .unwrap();
        assert!(after.invariant_holds());
        assert_eq!(after.guarantee_mobile, "555-1111");

        let after = gateway.delete("K1").await.unwrap();
        assert!(after.invariant_holds());
        assert!(!after.has_guarantee());
    }
}
