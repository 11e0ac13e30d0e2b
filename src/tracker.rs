//! Dirty-field tracker
//!
//! Save lifecycle for the two inline-editable guarantee fields: the
//! override contact mobile and the quick note. Each (elector, field) pair
//! buffers a local value against the last saved one; the save affordance
//! is shown while the buffer is dirty or while the post-save flash is
//! visible, and hidden otherwise.
//!
//! Deliberately decoupled from the guarantee status machine: an inline
//! save goes through the gateway's unlocked field path, so a status
//! mutation in flight for the same elector does not block it. The
//! per-field `saving` flag enforces the shared discipline instead: one
//! save in flight per (elector, field), further saves rejected until it
//! settles.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;

use crate::gateway::MutationGateway;
use crate::model::GuaranteeField;
use crate::types::{EngineError, Result};

/// The two fields the tracker buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedField {
    Mobile,
    QuickNote,
}

impl TrackedField {
    fn to_guarantee_field(self, value: String) -> GuaranteeField {
        match self {
            Self::Mobile => GuaranteeField::Mobile(value),
            Self::QuickNote => GuaranteeField::QuickNote(value),
        }
    }
}

/// What a save call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The value was sent and committed
    Saved,
    /// Local value equals the last saved one; no remote call was made
    Unchanged,
}

/// Buffer state for one (elector, field) pair
#[derive(Debug, Clone, Default)]
struct FieldState {
    local: String,
    last_saved: String,
    saving: bool,
    flash: bool,
    /// Bumped on every flash so a stale auto-clear timer cannot wipe a
    /// newer flash
    flash_epoch: u64,
}

/// Edit/save/flash state for inline-editable guarantee fields
pub struct DirtyFieldTracker {
    fields: Arc<DashMap<(String, TrackedField), FieldState>>,
    flash_duration: Duration,
}

impl DirtyFieldTracker {
    pub fn new(flash_duration: Duration) -> Self {
        Self {
            fields: Arc::new(DashMap::new()),
            flash_duration,
        }
    }

    /// Seed both buffers from the saved value (on detail load)
    pub fn begin(&self, koc_id: &str, field: TrackedField, saved_value: &str) {
        self.fields.insert(
            (koc_id.to_string(), field),
            FieldState {
                local: saved_value.to_string(),
                last_saved: saved_value.to_string(),
                ..FieldState::default()
            },
        );
    }

    /// Record a keystroke
    pub fn edit(&self, koc_id: &str, field: TrackedField, value: &str) {
        let mut state = self
            .fields
            .entry((koc_id.to_string(), field))
            .or_default();
        state.local = value.to_string();
    }

    pub fn local_value(&self, koc_id: &str, field: TrackedField) -> String {
        self.state(koc_id, field).local
    }

    /// Dirty iff the local value differs from the last saved one
    pub fn is_dirty(&self, koc_id: &str, field: TrackedField) -> bool {
        let state = self.state(koc_id, field);
        state.local != state.last_saved
    }

    pub fn is_saving(&self, koc_id: &str, field: TrackedField) -> bool {
        self.state(koc_id, field).saving
    }

    pub fn flash_visible(&self, koc_id: &str, field: TrackedField) -> bool {
        self.state(koc_id, field).flash
    }

    /// The save button/icon is visible iff the field is dirty or the
    /// saved-flash is still showing
    pub fn show_save_affordance(&self, koc_id: &str, field: TrackedField) -> bool {
        let state = self.state(koc_id, field);
        state.local != state.last_saved || state.flash
    }

    /// Save the local value through the gateway's unlocked field path
    ///
    /// An unchanged value is a local no-op: no remote call, no flash. A
    /// changed value that saves successfully flashes for the configured
    /// duration, then auto-clears.
    pub async fn save(
        &self,
        gateway: &MutationGateway,
        koc_id: &str,
        field: TrackedField,
    ) -> Result<SaveOutcome> {
        let key = (koc_id.to_string(), field);
        let value = {
            let mut state = self.fields.entry(key.clone()).or_default();
            if state.local == state.last_saved {
                return Ok(SaveOutcome::Unchanged);
            }
            if state.saving {
                return Err(EngineError::Busy(koc_id.to_string()));
            }
            state.saving = true;
            state.local.clone()
        };

        let result = gateway
            .update_field_unlocked(koc_id, field.to_guarantee_field(value.clone()))
            .await;

        let mut state = self.fields.entry(key.clone()).or_default();
        state.saving = false;
        match result {
            Ok(_) => {
                state.last_saved = value;
                state.flash = true;
                state.flash_epoch += 1;
                let epoch = state.flash_epoch;
                drop(state);
                debug!(koc_id = %koc_id, field = ?field, "Tracker: saved, flash on");
                self.spawn_flash_clear(key, epoch);
                Ok(SaveOutcome::Saved)
            }
            Err(err) => {
                // Buffer stays dirty; the user re-triggers the save
                drop(state);
                Err(err)
            }
        }
    }

    fn state(&self, koc_id: &str, field: TrackedField) -> FieldState {
        self.fields
            .get(&(koc_id.to_string(), field))
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    fn spawn_flash_clear(&self, key: (String, TrackedField), epoch: u64) {
        let fields = Arc::clone(&self.fields);
        let duration = self.flash_duration;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(mut state) = fields.get_mut(&key) {
                if state.flash_epoch == epoch {
                    state.flash = false;
                }
            }
        });
    }
}
