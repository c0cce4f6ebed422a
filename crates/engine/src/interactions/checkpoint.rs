//! Step checkpoints: `Pending → Completed`, persisted per workflow and step position.
//!
//! A pending checkpoint on step N holds step N+1 back. This is a sequencing aid and independent
//! of access-mode gating.

use pf_util::{FlagStore, FlagStoreError};
use serde::Serialize;
use tracing::debug;

use super::InteractionError;
use crate::page::{PageError, PromptPage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointState {
    Pending,
    Completed,
}

pub fn checkpoint_flag_key(workflow_id: u64, idx: usize) -> String {
    format!("pf_checkpoint_{workflow_id}_{idx}")
}

pub fn checkpoint_state(flags: &dyn FlagStore, workflow_id: u64, idx: usize) -> Result<CheckpointState, FlagStoreError> {
    if flags.is_set(&checkpoint_flag_key(workflow_id, idx))? {
        Ok(CheckpointState::Completed)
    } else {
        Ok(CheckpointState::Pending)
    }
}

/// Marks completed checkpoints on the page from persisted flags.
pub fn restore_checkpoints(page: &mut PromptPage, flags: &dyn FlagStore) -> Result<(), FlagStoreError> {
    let workflow_id = page.workflow_id;
    for step in page.steps.iter_mut().filter(|step| step.checkpoint.is_some()) {
        step.checkpoint_completed = checkpoint_state(flags, workflow_id, step.idx)? == CheckpointState::Completed;
    }
    Ok(())
}

/// Completes the checkpoint on step `idx`. Completing twice is harmless.
pub fn complete_checkpoint(page: &mut PromptPage, idx: usize, flags: &dyn FlagStore) -> Result<CheckpointState, InteractionError> {
    let workflow_id = page.workflow_id;
    let step = page.step_mut(idx).ok_or(PageError::UnknownStep(idx))?;
    if step.checkpoint.is_none() {
        debug!(workflow_id, step = idx, "step has no checkpoint");
        return Ok(CheckpointState::Completed);
    }
    flags.set(&checkpoint_flag_key(workflow_id, idx), "1")?;
    step.checkpoint_completed = true;
    Ok(CheckpointState::Completed)
}
