//! Remote guarantee service boundary
//!
//! The engine consumes, but does not implement, a remote guarantee
//! service. The transport lives behind [`GuaranteeService`]; the engine
//! only cares about the operation contracts and the error taxonomy
//! (`RemoteRejected` for a non-success response, `RemoteUnreachable` for
//! transport failure). [`rest`] is the production implementation.

pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{ActiveStatus, ConfirmationStatus, GuaranteeField, Page, Relative};
use crate::types::Result;

pub use rest::RestGuaranteeService;

/// How a mutation addresses a guarantee on the wire
///
/// By guarantee id when it is cached locally (authoritative and
/// unambiguous), by elector id only as a fallback for projections that
/// came from a relationship query and were never individually fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuaranteeRef {
    ById(i64),
    ByElector(String),
}

/// Payload for the create-guarantee operation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGuaranteeRequest {
    pub elector_koc_id: String,
    pub guarantee_status: ActiveStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_note: Option<String>,
}

/// Server response to create / status-update operations
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuaranteeSummary {
    pub id: i64,
    pub guarantee_status: ActiveStatus,
    #[serde(default)]
    pub confirmation_status: Option<ConfirmationStatus>,
}

/// Partial-field payload for the update-guarantee operation
///
/// Exactly one field is set per request; built from the closed
/// [`GuaranteeField`] union so nothing else can leak onto the wire.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuaranteeFieldsPatch {
    /// `Some(None)` clears the group, `Some(Some(id))` assigns it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_status: Option<ConfirmationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_note: Option<String>,
}

impl From<&GuaranteeField> for GuaranteeFieldsPatch {
    fn from(field: &GuaranteeField) -> Self {
        let mut patch = Self::default();
        match field {
            GuaranteeField::Group(group) => {
                patch.group_id = Some(group.as_ref().map(|g| g.id));
            }
            GuaranteeField::Mobile(mobile) => patch.mobile = Some(mobile.clone()),
            GuaranteeField::Confirmation(confirmation) => {
                patch.confirmation_status = Some(*confirmation);
            }
            GuaranteeField::QuickNote(note) => patch.quick_note = Some(note.clone()),
        }
        patch
    }
}

/// Query for the relationships operation
#[derive(Debug, Clone)]
pub struct RelationshipQuery {
    pub elector_koc_id: String,
    pub dept_page: u32,
    pub team_page: u32,
    pub dept_page_size: u32,
    pub team_page_size: u32,
}

/// The three relationship sets for a focal elector
///
/// Department and team are paginated independently; family is fetched
/// whole.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationships {
    pub same_department: Page<Relative>,
    pub same_team: Page<Relative>,
    pub family: Vec<Relative>,
}

/// Remote guarantee service operations
#[async_trait]
pub trait GuaranteeService: Send + Sync {
    /// Create a guarantee for an elector that has none
    async fn create_guarantee(&self, request: &CreateGuaranteeRequest) -> Result<GuaranteeSummary>;

    /// Flip the status of an existing guarantee
    async fn update_guarantee_status(
        &self,
        target: &GuaranteeRef,
        status: ActiveStatus,
    ) -> Result<GuaranteeSummary>;

    /// Patch a single field of an existing guarantee
    async fn update_guarantee(&self, guarantee_id: i64, fields: &GuaranteeFieldsPatch)
        -> Result<()>;

    /// Delete a guarantee, by id or by elector
    async fn delete_guarantee(&self, target: &GuaranteeRef) -> Result<()>;

    /// Fetch the three relationship sets for a focal elector
    async fn fetch_relationships(&self, query: &RelationshipQuery) -> Result<Relationships>;
}
