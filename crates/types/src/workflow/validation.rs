//! Authoring checks for workflow documents.
//!
//! Nothing here blocks rendering: configuration problems are reported as issues so the CLI can
//! print them, while the renderer substitutes documented defaults.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{WorkflowDefinition, normalize_variable_name};
use crate::{AccessMode, PREVIOUS_OUTPUT_PLACEHOLDER};

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^}]+)\}").expect("placeholder pattern compiles"));

/// A single authoring problem found in a workflow document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowIssue {
    /// The access mode is not one of `free`, `half_locked`, `pro`; it will fail open.
    UnknownAccessMode(String),
    /// `free_step_limit` below 1; it will be clamped to 1.
    FreeStepLimitBelowOne(i64),
    /// The workflow has no steps.
    NoSteps,
    /// A step has an empty prompt template.
    EmptyPrompt { step: usize },
    /// A variable spec normalizes to an empty name and is ignored.
    EmptyVariableName { step: usize, position: usize },
    /// Two specs in the same step share a normalized name.
    DuplicateVariable { step: usize, name: String },
    /// A template references a placeholder that no step up to this one declares.
    UndeclaredPlaceholder { step: usize, name: String },
}

impl fmt::Display for WorkflowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAccessMode(mode) => write!(f, "unknown access mode '{}' (steps stay unlocked)", mode),
            Self::FreeStepLimitBelowOne(limit) => write!(f, "free_step_limit {} is below 1 (treated as 1)", limit),
            Self::NoSteps => write!(f, "workflow has no steps"),
            Self::EmptyPrompt { step } => write!(f, "step {} has an empty prompt", step),
            Self::EmptyVariableName { step, position } => {
                write!(f, "step {} variable #{} has an empty name and is ignored", step, position)
            }
            Self::DuplicateVariable { step, name } => write!(f, "step {} declares '{}' more than once", step, name),
            Self::UndeclaredPlaceholder { step, name } => {
                write!(f, "step {} references '{{{}}}' but no variable declares it", step, name)
            }
        }
    }
}

/// Collects every authoring issue in document order.
pub fn validate_workflow(workflow: &WorkflowDefinition) -> Vec<WorkflowIssue> {
    let mut issues = Vec::new();

    if let Some(AccessMode::Unknown(raw)) = workflow.gating.access_mode.as_deref().and_then(AccessMode::parse) {
        issues.push(WorkflowIssue::UnknownAccessMode(raw));
    }
    if let Some(limit) = workflow.gating.free_step_limit
        && limit < 1
    {
        issues.push(WorkflowIssue::FreeStepLimitBelowOne(limit));
    }
    if workflow.steps.is_empty() {
        issues.push(WorkflowIssue::NoSteps);
        return issues;
    }

    let carry_over = normalize_variable_name(PREVIOUS_OUTPUT_PLACEHOLDER);
    let mut declared: HashSet<String> = HashSet::new();

    for (idx, step) in workflow.indexed_steps() {
        if step.prompt.trim().is_empty() {
            issues.push(WorkflowIssue::EmptyPrompt { step: idx });
        }

        let mut seen_in_step = HashSet::new();
        for (position, spec) in step.variables.iter().enumerate() {
            let name = spec.normalized_name();
            if name.is_empty() {
                issues.push(WorkflowIssue::EmptyVariableName {
                    step: idx,
                    position: position + 1,
                });
                continue;
            }
            if !seen_in_step.insert(name.clone()) {
                issues.push(WorkflowIssue::DuplicateVariable { step: idx, name: name.clone() });
            }
            declared.insert(name);
        }

        let mut reported = HashSet::new();
        for captures in PLACEHOLDER_PATTERN.captures_iter(&step.prompt) {
            let name = normalize_variable_name(&captures[1]);
            if name.is_empty() || name == carry_over || declared.contains(&name) {
                continue;
            }
            if reported.insert(name.clone()) {
                issues.push(WorkflowIssue::UndeclaredPlaceholder { step: idx, name });
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{StepDefinition, VariableSpec, WorkflowGating};

    fn variable(name: &str) -> VariableSpec {
        VariableSpec {
            name: name.to_string(),
            ..VariableSpec::default()
        }
    }

    fn step(prompt: &str, variables: Vec<VariableSpec>) -> StepDefinition {
        StepDefinition {
            prompt: prompt.to_string(),
            variables,
            ..StepDefinition::default()
        }
    }

    #[test]
    fn clean_workflow_has_no_issues() {
        let workflow = WorkflowDefinition {
            steps: vec![
                step("Hello {name}", vec![variable("name")]),
                step("Use {previous_output} for {NAME}", vec![]),
            ],
            ..WorkflowDefinition::default()
        };
        assert!(validate_workflow(&workflow).is_empty());
    }

    #[test]
    fn reports_configuration_and_variable_problems() {
        let workflow = WorkflowDefinition {
            gating: WorkflowGating {
                access_mode: Some("vip".into()),
                free_step_limit: Some(0),
                login_required: None,
            },
            steps: vec![
                step("", vec![variable("{}"), variable("a"), variable("A ")]),
                step("Needs {b} and {b}", vec![]),
            ],
            ..WorkflowDefinition::default()
        };

        let issues = validate_workflow(&workflow);
        assert_eq!(
            issues,
            vec![
                WorkflowIssue::UnknownAccessMode("vip".into()),
                WorkflowIssue::FreeStepLimitBelowOne(0),
                WorkflowIssue::EmptyPrompt { step: 1 },
                WorkflowIssue::EmptyVariableName { step: 1, position: 1 },
                WorkflowIssue::DuplicateVariable { step: 1, name: "a".into() },
                WorkflowIssue::UndeclaredPlaceholder { step: 2, name: "b".into() },
            ]
        );
    }

    #[test]
    fn empty_workflow_reports_no_steps() {
        assert_eq!(validate_workflow(&WorkflowDefinition::default()), vec![WorkflowIssue::NoSteps]);
    }
}
