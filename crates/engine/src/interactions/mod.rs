//! Micro-interactions layered on the page: rating, favorites, and checkpoints.
//!
//! Each widget is a small state machine driven in two halves. `begin` validates against the
//! persisted flags and either short-circuits or yields the request to send; `complete` applies
//! the endpoint's answer. The async `submit`/`toggle` helpers glue both halves to an
//! [`InteractionEndpoints`] implementation.

use async_trait::async_trait;
use pf_api::{ApiError, PromptFinderClient};
use pf_types::{FavoriteRequest, FavoriteToggle, RatingRequest, RatingSummary};
use pf_util::FlagStoreError;
use thiserror::Error;

pub mod checkpoint;
pub mod favorite;
pub mod rating;

pub use checkpoint::{CheckpointState, checkpoint_flag_key, checkpoint_state, complete_checkpoint, restore_checkpoints};
pub use favorite::{FavoriteState, FavoriteStep, FavoriteWidget};
pub use rating::{RatingState, RatingStep, RatingWidget};

/// Flag key set once a workflow has been rated.
pub fn rated_flag_key(workflow_id: u64) -> String {
    format!("pf_rated_{workflow_id}")
}

/// Flag key holding the last star value chosen, for repainting.
pub fn rating_score_key(workflow_id: u64) -> String {
    format!("pf_rating_{workflow_id}")
}

/// Flag key set when the how-to box was dismissed for a workflow.
pub fn howto_hidden_key(workflow_id: u64) -> String {
    format!("pf_hide_howto_{workflow_id}")
}

/// Flag key set when the variables hint was dismissed (site-wide).
pub const VARS_HINT_HIDDEN_KEY: &str = "pf_hide_vars_hint";

#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("rating {0} is outside 1..=5")]
    InvalidRating(u8),
    #[error(transparent)]
    Flags(#[from] FlagStoreError),
    #[error(transparent)]
    Page(#[from] crate::page::PageError),
}

/// Server round trips the widgets depend on.
#[async_trait]
pub trait InteractionEndpoints: Send + Sync {
    async fn submit_rating(&self, request: RatingRequest) -> Result<RatingSummary, ApiError>;

    async fn toggle_favorite(&self, request: FavoriteRequest) -> Result<FavoriteToggle, ApiError>;
}

#[async_trait]
impl InteractionEndpoints for PromptFinderClient {
    async fn submit_rating(&self, request: RatingRequest) -> Result<RatingSummary, ApiError> {
        PromptFinderClient::submit_rating(self, &request).await
    }

    async fn toggle_favorite(&self, request: FavoriteRequest) -> Result<FavoriteToggle, ApiError> {
        PromptFinderClient::toggle_favorite(self, &request).await
    }
}
