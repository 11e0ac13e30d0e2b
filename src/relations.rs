//! Relationship projector
//!
//! Per-focal-elector cache of the three relationship sets: same-department
//! and same-team (paginated independently, unrelated cursors) and family
//! (fetched whole). The projector owns its lists; callers never reach into
//! them. When a guarantee mutation lands anywhere - the table, a card, a
//! dialog - the committed snapshot is sent here as a reconciliation event
//! and applied in place to every cached list, so an elector appearing in
//! more than one list (a family member who is also a department colleague)
//! stays consistent without a refetch.
//!
//! Refetching happens only on explicit page navigation or a page-size
//! change, never implicitly because of a mutation.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::config::EngineConfig;
use crate::model::{ElectorProjection, Page, Relative};
use crate::remote::{GuaranteeService, RelationshipQuery};
use crate::types::Result;

/// Which relationship panel is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationTab {
    Department,
    Team,
    Family,
}

#[derive(Debug)]
struct ProjectorState {
    department: Page<Relative>,
    team: Page<Relative>,
    family: Vec<Relative>,
    active_tab: RelationTab,
    dept_page_size: u32,
    team_page_size: u32,
}

/// Cached relationship lists for one focal elector
pub struct RelationshipProjector {
    service: Arc<dyn GuaranteeService>,
    focal_koc_id: String,
    state: RwLock<ProjectorState>,
}

impl RelationshipProjector {
    pub fn new(
        service: Arc<dyn GuaranteeService>,
        focal_koc_id: impl Into<String>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            service,
            focal_koc_id: focal_koc_id.into(),
            state: RwLock::new(ProjectorState {
                department: Page::empty(config.dept_page_size),
                team: Page::empty(config.team_page_size),
                family: Vec::new(),
                active_tab: RelationTab::Department,
                dept_page_size: config.dept_page_size,
                team_page_size: config.team_page_size,
            }),
        }
    }

    pub fn focal_koc_id(&self) -> &str {
        &self.focal_koc_id
    }

    /// Initial fetch of all three lists; picks the default active tab
    /// (department if non-empty, else team, else family, else department)
    pub async fn load(&self) -> Result<()> {
        self.refresh(1, 1).await?;

        let mut state = self.state.write().await;
        state.active_tab = if !state.department.is_empty() {
            RelationTab::Department
        } else if !state.team.is_empty() {
            RelationTab::Team
        } else if !state.family.is_empty() {
            RelationTab::Family
        } else {
            RelationTab::Department
        };
        debug!(focal = %self.focal_koc_id, tab = ?state.active_tab, "Projector: loaded");
        Ok(())
    }

    /// Navigate the same-department list; the team cursor is untouched
    pub async fn department_page(&self, page: u32) -> Result<()> {
        let team_page = self.state.read().await.team.page;
        self.refresh(page, team_page).await
    }

    /// Navigate the same-team list; the department cursor is untouched
    pub async fn team_page(&self, page: u32) -> Result<()> {
        let dept_page = self.state.read().await.department.page;
        self.refresh(dept_page, page).await
    }

    /// Change page sizes and refetch from the first page of both lists
    pub async fn set_page_sizes(&self, dept_page_size: u32, team_page_size: u32) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.dept_page_size = dept_page_size.max(1);
            state.team_page_size = team_page_size.max(1);
        }
        self.refresh(1, 1).await
    }

    pub async fn active_tab(&self) -> RelationTab {
        self.state.read().await.active_tab
    }

    pub async fn set_active_tab(&self, tab: RelationTab) {
        self.state.write().await.active_tab = tab;
    }

    /// Snapshot of the same-department page
    pub async fn department(&self) -> Page<Relative> {
        self.state.read().await.department.clone()
    }

    /// Snapshot of the same-team page
    pub async fn team(&self) -> Page<Relative> {
        self.state.read().await.team.clone()
    }

    /// Snapshot of the family list
    pub async fn family(&self) -> Vec<Relative> {
        self.state.read().await.family.clone()
    }

    /// Apply an updater to every cached occurrence of one elector
    ///
    /// A relative may appear in more than one list; all occurrences get
    /// the identical result. No other relative is touched, and nothing is
    /// refetched.
    pub async fn update_relative<F>(&self, koc_id: &str, updater: F) -> usize
    where
        F: Fn(&mut Relative),
    {
        let mut state = self.state.write().await;
        let state = &mut *state;
        let mut touched = 0;

        for relative in state
            .department
            .results
            .iter_mut()
            .chain(state.team.results.iter_mut())
            .chain(state.family.iter_mut())
        {
            if relative.koc_id == koc_id {
                updater(relative);
                touched += 1;
            }
        }

        if touched > 0 {
            debug!(focal = %self.focal_koc_id, koc_id = %koc_id, touched, "Projector: reconciled relative");
        }
        touched
    }

    /// Reconciliation event: push a committed store snapshot into every
    /// cached list
    pub async fn reconcile(&self, snapshot: &ElectorProjection) -> usize {
        self.update_relative(&snapshot.koc_id, |relative| relative.sync_from(snapshot))
            .await
    }

    async fn refresh(&self, dept_page: u32, team_page: u32) -> Result<()> {
        let (dept_page_size, team_page_size) = {
            let state = self.state.read().await;
            (state.dept_page_size, state.team_page_size)
        };

        let relationships = self
            .service
            .fetch_relationships(&RelationshipQuery {
                elector_koc_id: self.focal_koc_id.clone(),
                dept_page,
                team_page,
                dept_page_size,
                team_page_size,
            })
            .await?;

        let mut state = self.state.write().await;
        state.department = relationships.same_department;
        state.team = relationships.same_team;
        state.family = relationships.family;
        Ok(())
    }
}
