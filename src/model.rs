//! Domain model: electors, guarantees, relatives and pages
//!
//! The guarantee fields on [`ElectorProjection`] are a derived projection
//! of the elector's single guarantee record (at most one per elector at
//! any time). All mutations flow through the closed [`GuaranteePatch`]
//! union, so a commit that would break the projection invariants is
//! unrepresentable or rejected before it touches the store.

use serde::{Deserialize, Serialize};

/// Canvassing status of an elector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuaranteeStatus {
    None,
    Pending,
    Guaranteed,
}

/// Status of an *active* guarantee - the only statuses create and
/// quick-status-update can target. `GuaranteeStatus::None` is reached
/// exclusively through delete, so it is not representable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActiveStatus {
    Pending,
    Guaranteed,
}

impl From<ActiveStatus> for GuaranteeStatus {
    fn from(status: ActiveStatus) -> Self {
        match status {
            ActiveStatus::Pending => GuaranteeStatus::Pending,
            ActiveStatus::Guaranteed => GuaranteeStatus::Guaranteed,
        }
    }
}

/// Verification sub-state of an active guarantee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationStatus {
    Pending,
    Confirmed,
    NotAvailable,
}

/// Reference to a guarantee group. Groups are referenced, never owned:
/// deleting a group on the collaborator side nulls memberships out, it is
/// never blocked by them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRef {
    pub id: i64,
    pub name: String,
    /// Display-only
    pub color: String,
}

/// Canonical per-elector projection held by the entity store
///
/// Invariants (hold after every commit):
/// - `guarantee_id.is_some()` iff `guarantee_status != None`
/// - `guarantee_confirmation.is_some()` iff `guarantee_status != None`
///
/// Seeded projections (from list or relationship queries that never
/// carried the guarantee id) may arrive partial; commits restore the
/// invariant because every patch that activates a guarantee carries its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectorProjection {
    /// Globally unique, immutable elector identifier
    pub koc_id: String,
    pub full_name: String,
    pub department: String,
    pub team: String,
    pub area: String,
    pub section: String,
    /// The elector's own contact number
    pub mobile: String,
    pub guarantee_status: GuaranteeStatus,
    pub guarantee_id: Option<i64>,
    pub guarantee_group: Option<GroupRef>,
    /// Override contact number on the guarantee, distinct from `mobile`
    pub guarantee_mobile: String,
    pub guarantee_confirmation: Option<ConfirmationStatus>,
    pub guarantee_note: String,
}

impl ElectorProjection {
    /// A projection with no active guarantee
    pub fn new(koc_id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            koc_id: koc_id.into(),
            full_name: full_name.into(),
            department: String::new(),
            team: String::new(),
            area: String::new(),
            section: String::new(),
            mobile: String::new(),
            guarantee_status: GuaranteeStatus::None,
            guarantee_id: None,
            guarantee_group: None,
            guarantee_mobile: String::new(),
            guarantee_confirmation: None,
            guarantee_note: String::new(),
        }
    }

    pub fn has_guarantee(&self) -> bool {
        self.guarantee_status != GuaranteeStatus::None
    }

    /// Check the id/confirmation coherence invariants
    pub fn invariant_holds(&self) -> bool {
        let active = self.has_guarantee();
        self.guarantee_id.is_some() == active && self.guarantee_confirmation.is_some() == active
    }
}

/// Single-field update against an existing guarantee
///
/// A closed union: the four inline-editable fields and nothing else, so an
/// invalid field/operation combination fails to type-check instead of
/// failing a string comparison at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum GuaranteeField {
    Group(Option<GroupRef>),
    Mobile(String),
    Confirmation(ConfirmationStatus),
    QuickNote(String),
}

impl GuaranteeField {
    /// Short name for log lines
    pub fn name(&self) -> &'static str {
        match self {
            Self::Group(_) => "group",
            Self::Mobile(_) => "mobile",
            Self::Confirmation(_) => "confirmationStatus",
            Self::QuickNote(_) => "quickNote",
        }
    }
}

/// A whole, validated commit against one elector's projection
///
/// The store applies a patch atomically (full replacement, notify) or
/// rejects it; there is no partial application.
#[derive(Debug, Clone, PartialEq)]
pub enum GuaranteePatch {
    /// Guarantee created; confirmation starts as `Pending`
    Created {
        id: i64,
        status: ActiveStatus,
        group: Option<GroupRef>,
        mobile: String,
        note: String,
    },
    /// Quick status flip; everything else untouched. Carries the server's
    /// guarantee id and confirmation so a projection seeded without them
    /// (a relationship-query row flipped through the by-elector fallback)
    /// is backfilled instead of landing with a dangling active status.
    Status {
        id: i64,
        status: ActiveStatus,
        confirmation: ConfirmationStatus,
    },
    /// Single-field update against an existing guarantee
    Field(GuaranteeField),
    /// Guarantee deleted; projection reset to the no-guarantee baseline
    Cleared,
}

/// Relationship tag on a relative row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
    SameDepartment,
    SameTeam,
    Family,
    #[serde(rename = "SELF")]
    SelfElector,
}

/// Read-only, relationship-tagged view of another elector
///
/// Materialized per relationship query, never persisted separately. The
/// guarantee fields mirror [`ElectorProjection`] so a store commit can be
/// reconciled into cached relative rows without a refetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relative {
    pub koc_id: String,
    pub full_name: String,
    pub department: String,
    pub team: String,
    pub relationship: Relationship,
    pub guarantee_status: GuaranteeStatus,
    pub guarantee_id: Option<i64>,
    pub guarantee_group: Option<GroupRef>,
    pub guarantee_mobile: String,
    pub guarantee_confirmation: Option<ConfirmationStatus>,
}

impl Relative {
    /// Overwrite the guarantee fields from a canonical store snapshot
    pub fn sync_from(&mut self, snapshot: &ElectorProjection) {
        self.guarantee_status = snapshot.guarantee_status;
        self.guarantee_id = snapshot.guarantee_id;
        self.guarantee_group = snapshot.guarantee_group.clone();
        self.guarantee_mobile = snapshot.guarantee_mobile.clone();
        self.guarantee_confirmation = snapshot.guarantee_confirmation;
    }
}

/// One page of a server-paginated result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub results: Vec<T>,
    pub count: u64,
    pub page: u32,
    pub page_size: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    /// An empty first page
    pub fn empty(page_size: u32) -> Self {
        Self {
            results: Vec::new(),
            count: 0,
            page: 1,
            page_size,
            has_next: false,
            has_previous: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
