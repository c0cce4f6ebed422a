//! Step gating.
//!
//! [`is_step_locked`] is the single decision point for whether a viewer may interact with a step.
//! [`GatingPolicy`] resolves the effective configuration for a workflow (per-workflow override,
//! then site defaults, then the hard-coded fallback) and wraps the predicate with the derived
//! decisions the renderer needs: the lock reason, whether the whole workflow is paywalled, and
//! the mode badge.

use pf_types::{AccessMode, ViewerContext, ViewerPlan, WorkflowDefaults, WorkflowGating};
use serde::Serialize;
use tracing::warn;

/// Fallback free-step limit when neither the workflow nor the site configures one.
pub const DEFAULT_FREE_STEP_LIMIT: i64 = 1;

/// Decides whether step `idx` (1-based) is locked for a viewer.
///
/// Rules are evaluated in order and the first match wins. Unknown modes never block content.
pub fn is_step_locked(
    idx: i64,
    mode: &AccessMode,
    viewer_plan: ViewerPlan,
    free_step_limit: i64,
    login_required: bool,
    logged_in: bool,
) -> bool {
    if idx < 1 {
        return false;
    }
    match mode {
        AccessMode::Free => false,
        _ if viewer_plan == ViewerPlan::Pro => false,
        AccessMode::Pro => true,
        AccessMode::HalfLocked => {
            let limit = free_step_limit.max(1);
            if idx <= limit {
                false
            } else if login_required {
                !logged_in
            } else {
                true
            }
        }
        AccessMode::Unknown(raw) => {
            warn!(access_mode = %raw, step = idx, "unknown access mode; leaving step unlocked");
            false
        }
    }
}

/// Why a step is locked, selecting the call to action shown on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockReason {
    /// Logging in (or signing up) unlocks the step.
    LoginRequired,
    /// Only a Pro plan unlocks the step.
    UpgradeRequired,
}

/// Short label and sub-text describing the access mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeBadge {
    pub label: String,
    pub sub: String,
    pub mode: String,
}

/// Effective gating configuration for one workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatingPolicy {
    pub mode: AccessMode,
    pub free_step_limit: i64,
    pub login_required: bool,
}

impl Default for GatingPolicy {
    fn default() -> Self {
        Self {
            mode: AccessMode::Free,
            free_step_limit: DEFAULT_FREE_STEP_LIMIT,
            login_required: false,
        }
    }
}

impl GatingPolicy {
    pub fn new(mode: AccessMode, free_step_limit: i64, login_required: bool) -> Self {
        Self {
            mode,
            free_step_limit: free_step_limit.max(1),
            login_required,
        }
    }

    /// Resolves each field independently: workflow override, then site default, then fallback.
    /// Blank modes count as unset.
    pub fn resolve(workflow: &WorkflowGating, defaults: &WorkflowDefaults) -> Self {
        let fallback = Self::default();
        let mode = workflow
            .access_mode
            .as_deref()
            .and_then(AccessMode::parse)
            .or_else(|| defaults.access_mode.as_deref().and_then(AccessMode::parse))
            .unwrap_or(fallback.mode);
        let free_step_limit = workflow
            .free_step_limit
            .or(defaults.free_step_limit)
            .unwrap_or(fallback.free_step_limit);
        let login_required = workflow
            .login_required
            .or(defaults.login_required)
            .unwrap_or(fallback.login_required);
        Self::new(mode, free_step_limit, login_required)
    }

    pub fn is_locked(&self, idx: usize, viewer: &ViewerContext) -> bool {
        is_step_locked(
            i64::try_from(idx).unwrap_or(i64::MAX),
            &self.mode,
            viewer.plan,
            self.free_step_limit,
            self.login_required,
            viewer.logged_in,
        )
    }

    /// Reason for the lock on step `idx`, or `None` when the step is open.
    pub fn lock_reason(&self, idx: usize, viewer: &ViewerContext) -> Option<LockReason> {
        if !self.is_locked(idx, viewer) {
            return None;
        }
        if self.mode == AccessMode::HalfLocked && !viewer.logged_in {
            Some(LockReason::LoginRequired)
        } else {
            Some(LockReason::UpgradeRequired)
        }
    }

    /// Whole-workflow paywall: Pro workflows shown to non-Pro viewers render no step bodies.
    pub fn requires_paywall(&self, viewer: &ViewerContext) -> bool {
        self.mode == AccessMode::Pro && !viewer.is_pro()
    }

    pub fn badge(&self) -> ModeBadge {
        let (label, sub) = match self.mode {
            AccessMode::Pro => ("Pro".to_string(), "Members only".to_string()),
            AccessMode::HalfLocked => {
                let mut sub = if self.free_step_limit == 1 {
                    "1 step free".to_string()
                } else {
                    format!("{} steps free", self.free_step_limit)
                };
                if self.login_required {
                    sub.push_str(" • Login needed");
                }
                ("Limited".to_string(), sub)
            }
            _ => ("Free".to_string(), "All steps unlocked".to_string()),
        };
        ModeBadge {
            label,
            sub,
            mode: self.mode.to_string(),
        }
    }
}
