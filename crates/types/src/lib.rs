//! Strongly typed model shared by the Prompt Finder renderer, page engine, API client, and CLI.
//!
//! Everything that crosses a crate boundary lives here: the authored workflow document, the
//! viewer context supplied per request, site-wide configuration, the global context lookup used
//! for prompt injection, and the payloads exchanged with the rating/favorite endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod config;
pub mod context;
pub mod endpoints;
pub mod workflow;

pub use config::{BehaviorOptions, CopyStrings, FeatureFlags, LayoutOptions, SiteConfig, SiteUrls, WorkflowDefaults};
pub use context::{ContextRequirement, ContextType, GlobalContext, ReferenceExample};
pub use endpoints::{FavoriteDenial, FavoriteRequest, FavoriteToggle, MAX_RATING, MIN_RATING, RatingRequest, RatingSummary};
pub use workflow::{
    StepDefinition, VariableSpec, WorkflowDefinition, WorkflowGating, WorkflowIssue, normalize_variable_name, validate_workflow,
};

/// Placeholder that marks carry-over from the previous step's output.
pub const PREVIOUS_OUTPUT_PLACEHOLDER: &str = "{previous_output}";

/// Per-workflow policy controlling which steps a viewer may interact with.
///
/// Unrecognized values are preserved in [`AccessMode::Unknown`] rather than rejected so the
/// gating layer can apply its fail-open rule and log the raw value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccessMode {
    /// Every step is open.
    #[default]
    Free,
    /// The leading `free_step_limit` steps are open; the rest are gated.
    HalfLocked,
    /// The whole workflow is reserved for Pro viewers.
    Pro,
    /// Any other configured value.
    Unknown(String),
}

impl AccessMode {
    /// Parses a configured mode. Blank input yields `None` so callers can fall through to the
    /// next configuration source.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "" => None,
            "free" => Some(Self::Free),
            "half_locked" => Some(Self::HalfLocked),
            "pro" => Some(Self::Pro),
            _ => Some(Self::Unknown(normalized)),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Free => "free",
            Self::HalfLocked => "half_locked",
            Self::Pro => "pro",
            Self::Unknown(raw) => raw.as_str(),
        }
    }
}

impl From<String> for AccessMode {
    fn from(value: String) -> Self {
        Self::parse(&value).unwrap_or_default()
    }
}

impl From<AccessMode> for String {
    fn from(value: AccessMode) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tier of the current visitor, independent of the workflow's access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerPlan {
    #[default]
    Guest,
    Free,
    Pro,
}

impl ViewerPlan {
    /// Resolves a plan string supplied by the identity collaborator.
    ///
    /// Unrecognized plans degrade to `free` for logged-in viewers and `guest` otherwise.
    pub fn resolve(raw: &str, logged_in: bool) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "pro" => Self::Pro,
            "guest" if !logged_in => Self::Guest,
            _ if logged_in => Self::Free,
            _ => Self::Guest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Free => "free",
            Self::Pro => "pro",
        }
    }
}

impl fmt::Display for ViewerPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity facts about the viewer for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewerContext {
    pub plan: ViewerPlan,
    #[serde(default)]
    pub logged_in: bool,
}

impl ViewerContext {
    pub fn new(plan: ViewerPlan, logged_in: bool) -> Self {
        Self { plan, logged_in }
    }

    pub fn guest() -> Self {
        Self::new(ViewerPlan::Guest, false)
    }

    pub fn is_pro(&self) -> bool {
        self.plan == ViewerPlan::Pro
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_mode_parse_normalizes_case_and_whitespace() {
        assert_eq!(AccessMode::parse("  Half_Locked "), Some(AccessMode::HalfLocked));
        assert_eq!(AccessMode::parse("PRO"), Some(AccessMode::Pro));
        assert_eq!(AccessMode::parse("   "), None);
        assert_eq!(AccessMode::parse("members"), Some(AccessMode::Unknown("members".into())));
    }

    #[test]
    fn access_mode_deserializes_unknown_values_without_failing() {
        let mode: AccessMode = serde_json::from_str("\"vip\"").expect("deserialize");
        assert_eq!(mode, AccessMode::Unknown("vip".into()));
        assert_eq!(serde_json::to_string(&AccessMode::HalfLocked).unwrap(), "\"half_locked\"");
    }

    #[test]
    fn viewer_plan_resolution_depends_on_login_state() {
        assert_eq!(ViewerPlan::resolve("PRO", true), ViewerPlan::Pro);
        assert_eq!(ViewerPlan::resolve("", true), ViewerPlan::Free);
        assert_eq!(ViewerPlan::resolve("", false), ViewerPlan::Guest);
        assert_eq!(ViewerPlan::resolve("gold", false), ViewerPlan::Guest);
        assert_eq!(ViewerPlan::resolve("guest", true), ViewerPlan::Free);
    }
}
