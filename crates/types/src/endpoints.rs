//! Request and response payloads for the rating and favorite endpoints.

use serde::{Deserialize, Serialize};

/// Lowest accepted star rating.
pub const MIN_RATING: u8 = 1;
/// Highest accepted star rating.
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRequest {
    pub workflow_id: u64,
    pub rating: u8,
}

impl RatingRequest {
    pub fn is_in_range(&self) -> bool {
        (MIN_RATING..=MAX_RATING).contains(&self.rating)
    }
}

/// Current aggregate for a workflow's ratings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingSummary {
    #[serde(default)]
    pub avg: f64,
    #[serde(default)]
    pub count: u64,
}

impl RatingSummary {
    /// Builds a summary from stored totals, rounding the average to one decimal.
    pub fn from_totals(sum: u64, count: u64) -> Self {
        let avg = if count == 0 {
            0.0
        } else {
            (sum as f64 / count as f64 * 10.0).round() / 10.0
        };
        Self { avg, count }
    }

    /// Average formatted for display; `–` when nobody has rated yet.
    pub fn display_average(&self) -> String {
        if self.avg > 0.0 {
            format!("{:.1}", self.avg)
        } else {
            "–".to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRequest {
    pub workflow_id: u64,
}

/// Result of a successful favorite toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteToggle {
    /// `true` when the workflow is now a favorite.
    pub added: bool,
    /// Number of favorites the viewer now has.
    pub count: u64,
}

/// Why the favorite endpoint refused a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteDenial {
    NotLoggedIn,
    NotEntitled,
}
