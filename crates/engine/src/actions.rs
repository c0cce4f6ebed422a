//! Page actions decoded from the triggering element.
//!
//! Controls declare what they do through `data-action`; step anchors through `href="#step-N"`.
//! [`ActionTrigger`] captures what the host knows about the element (its action id, enclosing
//! step, and value) and [`PageAction::decode`] turns it into a closed set of variants.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::page::parse_step_hash;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("unknown action '{0}'")]
    Unknown(String),
    #[error("action '{0}' must be triggered inside a step")]
    MissingStep(String),
    #[error("action '{action}' has invalid value '{value}'")]
    InvalidValue { action: String, value: String },
}

/// Description of the element that was activated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTrigger {
    /// `data-action` identifier, or an `href` such as `#step-3`.
    pub action: String,
    /// Position of the enclosing step, if any.
    #[serde(default)]
    pub step: Option<usize>,
    /// `data-value` of the element (star value, checklist position).
    #[serde(default)]
    pub value: Option<String>,
}

impl ActionTrigger {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn in_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum PageAction {
    CopyPrompt { step: usize },
    ContinueCheckpoint { step: usize },
    HideHowto,
    HideVarsHint,
    CopyLink,
    FocusFirst,
    Rate { value: u8 },
    ToggleFavorite,
    GoToStep { step: usize, from: Option<usize> },
    ToggleChecklist { step: usize, position: usize },
}

impl PageAction {
    pub fn decode(trigger: &ActionTrigger) -> Result<Self, ActionError> {
        let action = trigger.action.trim();
        if action.starts_with('#') {
            return parse_step_hash(action)
                .map(|step| Self::GoToStep { step, from: trigger.step })
                .ok_or_else(|| ActionError::Unknown(action.to_string()));
        }

        let step = || trigger.step.ok_or_else(|| ActionError::MissingStep(action.to_string()));
        match action {
            "copy-prompt" => Ok(Self::CopyPrompt { step: step()? }),
            "continue-checkpoint" => Ok(Self::ContinueCheckpoint { step: step()? }),
            "hide-howto" => Ok(Self::HideHowto),
            "hide-vars-hint" => Ok(Self::HideVarsHint),
            "copy-link" => Ok(Self::CopyLink),
            "focus-first" => Ok(Self::FocusFirst),
            "toggle-favorite" => Ok(Self::ToggleFavorite),
            "rate" => Ok(Self::Rate {
                value: parse_value(trigger, action)?,
            }),
            "toggle-checklist" => Ok(Self::ToggleChecklist {
                step: step()?,
                position: parse_value(trigger, action)?,
            }),
            other => Err(ActionError::Unknown(other.to_string())),
        }
    }

    /// Step containing the triggering element, used for lock interception.
    pub fn origin_step(&self) -> Option<usize> {
        match *self {
            Self::CopyPrompt { step } | Self::ContinueCheckpoint { step } | Self::ToggleChecklist { step, .. } => Some(step),
            Self::GoToStep { from, .. } => from,
            _ => None,
        }
    }
}

fn parse_value<T: FromStr>(trigger: &ActionTrigger, action: &str) -> Result<T, ActionError> {
    trigger
        .value
        .as_deref()
        .and_then(|raw| raw.trim().parse().ok())
        .ok_or_else(|| ActionError::InvalidValue {
            action: action.to_string(),
            value: trigger.value.clone().unwrap_or_default(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_step_scoped_actions() {
        let trigger = ActionTrigger::new("copy-prompt").in_step(2);
        assert_eq!(PageAction::decode(&trigger), Ok(PageAction::CopyPrompt { step: 2 }));
        assert_eq!(
            PageAction::decode(&ActionTrigger::new("copy-prompt")),
            Err(ActionError::MissingStep("copy-prompt".into()))
        );
    }

    #[test]
    fn decodes_values_and_anchors() {
        let rate = ActionTrigger::new("rate").with_value("4");
        assert_eq!(PageAction::decode(&rate), Ok(PageAction::Rate { value: 4 }));
        assert!(matches!(
            PageAction::decode(&ActionTrigger::new("rate").with_value("x")),
            Err(ActionError::InvalidValue { .. })
        ));

        let anchor = ActionTrigger::new("#step-3").in_step(2);
        let action = PageAction::decode(&anchor).unwrap();
        assert_eq!(action, PageAction::GoToStep { step: 3, from: Some(2) });
        assert_eq!(action.origin_step(), Some(2));
    }

    #[test]
    fn unknown_actions_are_errors() {
        assert_eq!(
            PageAction::decode(&ActionTrigger::new("fill-examples")),
            Err(ActionError::Unknown("fill-examples".into()))
        );
        assert!(PageAction::decode(&ActionTrigger::new("#top")).is_err());
    }
}
