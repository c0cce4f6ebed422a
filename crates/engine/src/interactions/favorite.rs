//! Favorite toggle: `Off ⇄ On` through `Busy`, with transient `Denied` and `Failed` states.

use pf_api::ApiError;
use pf_types::{CopyStrings, FavoriteDenial, FavoriteRequest, FavoriteToggle};
use serde::Serialize;
use tracing::warn;

use super::InteractionEndpoints;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FavoriteState {
    Off,
    On,
    Busy { was_on: bool },
    /// Shown briefly; [`FavoriteWidget::settle`] returns to the prior state.
    Denied { was_on: bool, reason: FavoriteDenial },
    /// The request failed or was rejected; also cleared by [`FavoriteWidget::settle`].
    Failed { was_on: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteStep {
    Submit(FavoriteRequest),
    Busy,
    /// Refused locally without a network call.
    Denied(FavoriteDenial),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FavoriteWidget {
    pub workflow_id: u64,
    pub state: FavoriteState,
    pub label: String,
    pub count: Option<u64>,
    logged_in: bool,
}

impl FavoriteWidget {
    pub fn new(workflow_id: u64, is_favorite: bool, logged_in: bool) -> Self {
        let state = if is_favorite { FavoriteState::On } else { FavoriteState::Off };
        Self {
            workflow_id,
            state,
            label: resting_label(is_favorite).to_string(),
            count: None,
            logged_in,
        }
    }

    pub fn is_on(&self) -> bool {
        match self.state {
            FavoriteState::On => true,
            FavoriteState::Off => false,
            FavoriteState::Busy { was_on }
            | FavoriteState::Denied { was_on, .. }
            | FavoriteState::Failed { was_on } => was_on,
        }
    }

    pub fn begin(&mut self) -> FavoriteStep {
        if matches!(self.state, FavoriteState::Busy { .. }) {
            return FavoriteStep::Busy;
        }
        let was_on = self.is_on();
        if !self.logged_in {
            self.deny(was_on, FavoriteDenial::NotLoggedIn);
            return FavoriteStep::Denied(FavoriteDenial::NotLoggedIn);
        }
        self.state = FavoriteState::Busy { was_on };
        FavoriteStep::Submit(FavoriteRequest {
            workflow_id: self.workflow_id,
        })
    }

    pub fn complete(&mut self, result: Result<FavoriteToggle, ApiError>, copy: &CopyStrings) {
        let was_on = self.is_on();
        match result {
            Ok(toggle) => {
                self.state = if toggle.added { FavoriteState::On } else { FavoriteState::Off };
                self.count = Some(toggle.count);
                self.label = if toggle.added { "Saved to favorites" } else { "Removed from favorites" }.to_string();
            }
            Err(ApiError::Denied(reason)) => self.deny(was_on, reason),
            Err(error) => {
                warn!(workflow_id = self.workflow_id, %error, "favorite toggle failed");
                self.state = FavoriteState::Failed { was_on };
                self.label = copy.text("copy_failed", "Error");
            }
        }
    }

    /// Ends a transient message and shows the resting label.
    pub fn settle(&mut self) {
        let on = self.is_on();
        self.settle_to(on);
    }

    pub async fn toggle(&mut self, endpoints: &dyn InteractionEndpoints, copy: &CopyStrings) -> FavoriteState {
        if let FavoriteStep::Submit(request) = self.begin() {
            let result = endpoints.toggle_favorite(request).await;
            self.complete(result, copy);
        }
        self.state
    }

    fn deny(&mut self, was_on: bool, reason: FavoriteDenial) {
        self.state = FavoriteState::Denied { was_on, reason };
        self.label = match reason {
            FavoriteDenial::NotLoggedIn => "Please log in",
            FavoriteDenial::NotEntitled => "Not allowed",
        }
        .to_string();
    }

    fn settle_to(&mut self, on: bool) {
        self.state = if on { FavoriteState::On } else { FavoriteState::Off };
        self.label = resting_label(on).to_string();
    }
}

fn resting_label(on: bool) -> &'static str {
    if on { "Saved" } else { "Save to favorites" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guests_are_denied_without_a_request() {
        let mut favorite = FavoriteWidget::new(9, false, false);
        assert_eq!(favorite.begin(), FavoriteStep::Denied(FavoriteDenial::NotLoggedIn));
        assert_eq!(favorite.label, "Please log in");
        favorite.settle();
        assert_eq!(favorite.state, FavoriteState::Off);
        assert_eq!(favorite.label, "Save to favorites");
    }

    #[test]
    fn toggles_through_busy() {
        let mut favorite = FavoriteWidget::new(9, false, true);
        assert_eq!(favorite.begin(), FavoriteStep::Submit(FavoriteRequest { workflow_id: 9 }));
        assert_eq!(favorite.begin(), FavoriteStep::Busy);

        favorite.complete(Ok(FavoriteToggle { added: true, count: 4 }), &CopyStrings::default());
        assert_eq!(favorite.state, FavoriteState::On);
        assert_eq!(favorite.label, "Saved to favorites");
        assert_eq!(favorite.count, Some(4));
    }

    #[test]
    fn server_denial_keeps_prior_state_after_settling() {
        let mut favorite = FavoriteWidget::new(9, true, true);
        favorite.begin();
        favorite.complete(Err(ApiError::Denied(FavoriteDenial::NotEntitled)), &CopyStrings::default());
        assert_eq!(
            favorite.state,
            FavoriteState::Denied {
                was_on: true,
                reason: FavoriteDenial::NotEntitled
            }
        );
        assert_eq!(favorite.label, "Not allowed");
        favorite.settle();
        assert_eq!(favorite.state, FavoriteState::On);
    }

    #[test]
    fn network_failure_shows_an_error_until_settled() {
        let mut favorite = FavoriteWidget::new(9, false, true);
        favorite.begin();
        favorite.complete(Err(ApiError::Network("timeout".into())), &CopyStrings::default());
        assert_eq!(favorite.state, FavoriteState::Failed { was_on: false });
        assert_eq!(favorite.label, "Error");
        assert!(!favorite.is_on());

        favorite.settle();
        assert_eq!(favorite.state, FavoriteState::Off);
        assert_eq!(favorite.label, "Save to favorites");
    }

    #[test]
    fn rejected_toggle_uses_the_configured_error_text() {
        let copy: CopyStrings = serde_json::from_str(r#"{"copy_failed":"Something went wrong"}"#).expect("copy");
        let mut favorite = FavoriteWidget::new(9, true, true);
        favorite.begin();
        favorite.complete(
            Err(ApiError::Rejected {
                status: 429,
                message: "slow down".into(),
            }),
            &copy,
        );
        assert_eq!(favorite.state, FavoriteState::Failed { was_on: true });
        assert_eq!(favorite.label, "Something went wrong");

        favorite.settle();
        assert_eq!(favorite.state, FavoriteState::On);
        assert_eq!(favorite.label, "Saved");
    }
}
