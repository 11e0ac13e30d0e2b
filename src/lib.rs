//! guarantee-core - Guarantee-status synchronization engine
//!
//! Keeps an elector's canvassing state (none / pending / guaranteed, with a
//! confirmation sub-status and optional group membership) consistent across
//! every view that renders it at the same time: paginated tables, card
//! lists, detail dialogs and relationship panels.
//!
//! ## Services
//!
//! - **Entity Store**: observable keyed registry of elector projections;
//!   the single source of truth for guarantee state
//! - **Mutation Gateway**: the four guarantee mutations (create,
//!   quick-status-update, field-update, delete) with an elector-scoped
//!   in-flight lock against double submits
//! - **Dirty-Field Tracker**: edit/save/flash lifecycle for the two
//!   inline-editable guarantee fields (contact mobile, quick note)
//! - **Relationship Projector**: same-department / same-team / family
//!   panels for a focal elector, reconciled in place when a mutation
//!   lands anywhere else
//!
//! Views never mutate state directly: they issue intents to the gateway,
//! and the store is committed only after the remote service confirms. On
//! failure the lock is released and nothing changes, so no view can ever
//! observe partial state.

pub mod config;
pub mod gateway;
pub mod model;
pub mod relations;
pub mod remote;
pub mod store;
pub mod tracker;
pub mod types;

pub use config::EngineConfig;
pub use gateway::MutationGateway;
pub use model::{
    ActiveStatus, ConfirmationStatus, ElectorProjection, GroupRef, GuaranteeField,
    GuaranteePatch, GuaranteeStatus, Page, Relationship, Relative,
};
pub use relations::{RelationTab, RelationshipProjector};
pub use remote::{GuaranteeRef, GuaranteeService};
pub use store::EntityStore;
pub use tracker::{DirtyFieldTracker, SaveOutcome, TrackedField};
pub use types::{EngineError, Result};
