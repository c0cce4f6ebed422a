//! Star rating: `Unrated → Submitting → Rated`.

use pf_api::ApiError;
use pf_types::{CopyStrings, MAX_RATING, MIN_RATING, RatingRequest, RatingSummary};
use pf_util::FlagStore;
use serde::Serialize;
use tracing::{debug, warn};

use super::{InteractionEndpoints, InteractionError, rated_flag_key, rating_score_key};

const ALREADY_RATED_MESSAGE: &str = "You already rated.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RatingState {
    Unrated,
    Submitting { value: u8 },
    /// Terminal: further input is disabled.
    Rated,
}

/// What the caller should do after [`RatingWidget::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingStep {
    /// Send this request and pass the answer to [`RatingWidget::complete`].
    Submit(RatingRequest),
    /// A submission is already in flight.
    Busy,
    /// The lock flag is present; nothing is sent.
    AlreadyRated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingWidget {
    pub workflow_id: u64,
    pub state: RatingState,
    pub summary: RatingSummary,
    /// Highlighted star value.
    pub painted: Option<u8>,
    pub message: String,
}

impl RatingWidget {
    /// Restores the widget from persisted flags.
    pub fn load(workflow_id: u64, summary: RatingSummary, flags: &dyn FlagStore, copy: &CopyStrings) -> Result<Self, InteractionError> {
        let mut widget = Self {
            workflow_id,
            state: RatingState::Unrated,
            summary,
            painted: None,
            message: copy.text("rating_hint", "Click a star to rate"),
        };
        if flags.is_set(&rated_flag_key(workflow_id))? {
            widget.state = RatingState::Rated;
            widget.message = ALREADY_RATED_MESSAGE.to_string();
        }
        widget.painted = flags
            .get(&rating_score_key(workflow_id))?
            .and_then(|flag| flag.value.parse::<u8>().ok())
            .filter(|value| (MIN_RATING..=MAX_RATING).contains(value));
        Ok(widget)
    }

    pub fn is_locked(&self) -> bool {
        self.state == RatingState::Rated
    }

    /// Handles a star click.
    pub fn begin(&mut self, value: u8, flags: &dyn FlagStore) -> Result<RatingStep, InteractionError> {
        if self.is_locked() || flags.is_set(&rated_flag_key(self.workflow_id))? {
            self.state = RatingState::Rated;
            self.message = ALREADY_RATED_MESSAGE.to_string();
            return Ok(RatingStep::AlreadyRated);
        }
        if matches!(self.state, RatingState::Submitting { .. }) {
            return Ok(RatingStep::Busy);
        }
        let request = RatingRequest {
            workflow_id: self.workflow_id,
            rating: value,
        };
        if !request.is_in_range() {
            return Err(InteractionError::InvalidRating(value));
        }

        self.painted = Some(value);
        flags.set(&rating_score_key(self.workflow_id), &value.to_string())?;
        self.state = RatingState::Submitting { value };
        Ok(RatingStep::Submit(request))
    }

    /// Applies the endpoint answer. "Already rated" is a successful terminal state.
    pub fn complete(
        &mut self,
        result: Result<RatingSummary, ApiError>,
        flags: &dyn FlagStore,
        copy: &CopyStrings,
    ) -> Result<(), InteractionError> {
        let value = match self.state {
            RatingState::Submitting { value } => value,
            _ => {
                debug!(workflow_id = self.workflow_id, "rating answer without a pending submission");
                return Ok(());
            }
        };

        match result {
            Ok(summary) => {
                self.lock(summary, flags)?;
                self.message = copy.text("rating_thanks", "Thanks! ({val}/5)").replace("{val}", &value.to_string());
            }
            Err(ApiError::AlreadyRated(summary)) => {
                self.lock(summary, flags)?;
                self.message = ALREADY_RATED_MESSAGE.to_string();
            }
            Err(error) => {
                warn!(workflow_id = self.workflow_id, %error, "rating submission failed");
                self.state = RatingState::Unrated;
                self.message = copy.text("copy_failed", "Error");
            }
        }
        Ok(())
    }

    /// Runs a full click: begin, send when needed, complete.
    pub async fn submit(
        &mut self,
        value: u8,
        endpoints: &dyn InteractionEndpoints,
        flags: &dyn FlagStore,
        copy: &CopyStrings,
    ) -> Result<RatingState, InteractionError> {
        if let RatingStep::Submit(request) = self.begin(value, flags)? {
            let result = endpoints.submit_rating(request).await;
            self.complete(result, flags, copy)?;
        }
        Ok(self.state)
    }

    fn lock(&mut self, summary: RatingSummary, flags: &dyn FlagStore) -> Result<(), InteractionError> {
        self.summary = summary;
        self.state = RatingState::Rated;
        flags.set(&rated_flag_key(self.workflow_id), "1")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_util::InMemoryFlagStore;

    fn widget(flags: &InMemoryFlagStore) -> RatingWidget {
        RatingWidget::load(5, RatingSummary::default(), flags, &CopyStrings::default()).unwrap()
    }

    #[test]
    fn success_locks_and_thanks() {
        let flags = InMemoryFlagStore::new();
        let mut rating = widget(&flags);

        let step = rating.begin(4, &flags).unwrap();
        assert_eq!(step, RatingStep::Submit(RatingRequest { workflow_id: 5, rating: 4 }));
        assert_eq!(rating.state, RatingState::Submitting { value: 4 });
        assert_eq!(rating.begin(5, &flags).unwrap(), RatingStep::Busy);

        rating
            .complete(Ok(RatingSummary { avg: 4.0, count: 1 }), &flags, &CopyStrings::default())
            .unwrap();
        assert_eq!(rating.state, RatingState::Rated);
        assert_eq!(rating.message, "Thanks! (4/5)");
        assert!(flags.is_set("pf_rated_5").unwrap());
        assert_eq!(flags.get("pf_rating_5").unwrap().map(|flag| flag.value), Some("4".into()));
    }

    #[test]
    fn already_rated_answer_is_terminal_success() {
        let flags = InMemoryFlagStore::new();
        let mut rating = widget(&flags);
        rating.begin(2, &flags).unwrap();

        let current = RatingSummary { avg: 3.7, count: 12 };
        rating
            .complete(Err(ApiError::AlreadyRated(current)), &flags, &CopyStrings::default())
            .unwrap();
        assert_eq!(rating.state, RatingState::Rated);
        assert_eq!(rating.summary, current);
        assert_eq!(rating.message, "You already rated.");
    }

    #[test]
    fn failure_returns_to_unrated() {
        let flags = InMemoryFlagStore::new();
        let mut rating = widget(&flags);
        rating.begin(3, &flags).unwrap();
        rating
            .complete(Err(ApiError::Network("offline".into())), &flags, &CopyStrings::default())
            .unwrap();
        assert_eq!(rating.state, RatingState::Unrated);
        assert_eq!(rating.message, "Error");
        assert!(!flags.is_set("pf_rated_5").unwrap());
    }

    #[test]
    fn persisted_flag_short_circuits() {
        let flags = InMemoryFlagStore::new();
        flags.set("pf_rated_5", "1").unwrap();
        flags.set("pf_rating_5", "5").unwrap();

        let mut rating = widget(&flags);
        assert!(rating.is_locked());
        assert_eq!(rating.painted, Some(5));
        assert_eq!(rating.begin(1, &flags).unwrap(), RatingStep::AlreadyRated);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let flags = InMemoryFlagStore::new();
        let mut rating = widget(&flags);
        assert!(matches!(rating.begin(6, &flags), Err(InteractionError::InvalidRating(6))));
        assert_eq!(rating.state, RatingState::Unrated);
    }
}
