//! Authored workflow documents: gating overrides, ordered steps, and per-step variable specs.
//!
//! Field names accept both the short form used in YAML fixtures (`name`, `label`) and the
//! long-form keys exported by the CMS (`var_name`, `var_label`), so exported documents load
//! without a conversion pass.

use serde::{Deserialize, Deserializer, Serialize};

use crate::context::ContextRequirement;

pub mod validation;

pub use validation::{WorkflowIssue, validate_workflow};

/// Normalizes a placeholder or variable identifier.
///
/// Trims surrounding whitespace, strips one surrounding `{` / `}` pair, trims again, and
/// lowercases. `"  {NAME} "` and `"Name "` both normalize to `"name"`.
pub fn normalize_variable_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_open = trimmed.strip_prefix('{').unwrap_or(trimmed);
    let without_close = without_open.strip_suffix('}').unwrap_or(without_open);
    without_close.trim().to_lowercase()
}

/// Per-workflow gating overrides. Every field is optional; missing values fall through to the
/// site-wide defaults and then to the hard-coded fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowGating {
    /// Raw access mode as authored (`free`, `half_locked`, `pro`).
    #[serde(default)]
    pub access_mode: Option<String>,
    /// Count of leading steps that stay open in `half_locked` mode.
    #[serde(default, deserialize_with = "deserialize_lenient_int")]
    pub free_step_limit: Option<i64>,
    /// Whether logging in unlocks the remaining `half_locked` steps.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub login_required: Option<bool>,
}

/// A complete workflow as authored in the CMS.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Numeric post identifier used by the rating and favorite endpoints.
    #[serde(default, alias = "id")]
    pub workflow_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "Summary")]
    pub summary: String,
    #[serde(default)]
    pub use_case: Option<String>,
    #[serde(default, alias = "Version")]
    pub version: Option<String>,
    #[serde(default)]
    pub stable_version: bool,
    #[serde(default, alias = "lastest_update")]
    pub last_update: Option<String>,
    #[serde(default)]
    pub changelog: Option<String>,
    #[serde(default)]
    pub pain_point: Option<String>,
    #[serde(default)]
    pub expected_outcome: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_minutes")]
    pub time_saved_min: Option<u32>,
    /// Difficulty of the task without AI on a 1–5 scale.
    #[serde(default, alias = "difficulty_wo_ai", deserialize_with = "deserialize_lenient_int")]
    pub difficulty_without_ai: Option<i64>,
    #[serde(flatten)]
    pub gating: WorkflowGating,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Returns the step at the 1-based position `idx`.
    pub fn step(&self, idx: usize) -> Option<&StepDefinition> {
        idx.checked_sub(1).and_then(|position| self.steps.get(position))
    }

    /// Iterates steps paired with their 1-based position.
    pub fn indexed_steps(&self) -> impl Iterator<Item = (usize, &StepDefinition)> {
        self.steps.iter().enumerate().map(|(position, step)| (position + 1, step))
    }

    /// Sum of all per-step time estimates in minutes.
    pub fn total_estimated_minutes(&self) -> u32 {
        self.steps.iter().filter_map(|step| step.estimated_time_min).sum()
    }

    /// Difficulty clamped into `0..=5`.
    pub fn difficulty(&self) -> u8 {
        self.difficulty_without_ai.unwrap_or(0).clamp(0, 5) as u8
    }
}

/// One step of a workflow. Its identity is its 1-based position within the workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Optional author-assigned identifier; not used for gating.
    #[serde(default, alias = "step_id_")]
    pub step_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub objective: String,
    /// Prompt template containing `{placeholder}` tokens.
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
    #[serde(default)]
    pub example_output: Option<String>,
    #[serde(default, deserialize_with = "deserialize_checklist")]
    pub checklist: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_minutes")]
    pub estimated_time_min: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_lenient_flag")]
    pub checkpoint_required: bool,
    #[serde(default)]
    pub checkpoint_message: Option<String>,
    #[serde(default)]
    pub context_requirements: Vec<ContextRequirement>,
}

impl StepDefinition {
    /// Checkpoint message when the step pauses for confirmation before the next one.
    pub fn checkpoint(&self) -> Option<&str> {
        if !self.checkpoint_required {
            return None;
        }
        self.checkpoint_message.as_deref().map(str::trim).filter(|message| !message.is_empty())
    }

    /// Variable specs whose normalized name is non-empty.
    pub fn active_variables(&self) -> impl Iterator<Item = &VariableSpec> {
        self.variables.iter().filter(|spec| !spec.normalized_name().is_empty())
    }
}

/// Declares one user-editable variable for a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Placeholder key as authored; see [`normalize_variable_name`].
    #[serde(default, alias = "var_name")]
    pub name: String,
    #[serde(default, alias = "var_label")]
    pub label: Option<String>,
    #[serde(default, alias = "var_description")]
    pub description: Option<String>,
    #[serde(default)]
    pub example_value: Option<String>,
    #[serde(default, alias = "var_required")]
    pub required: bool,
}

impl VariableSpec {
    pub fn normalized_name(&self) -> String {
        normalize_variable_name(&self.name)
    }

    /// Authored label, or the name title-cased with `_` and `-` turned into spaces.
    pub fn display_label(&self) -> String {
        if let Some(label) = self.label.as_deref().map(str::trim).filter(|label| !label.is_empty()) {
            return label.to_string();
        }
        let name = self.name.trim();
        if name.is_empty() {
            return "Variable".to_string();
        }
        name.replace(['_', '-'], " ")
            .split(' ')
            .map(|word| {
                let mut characters = word.chars();
                match characters.next() {
                    Some(first) => first.to_uppercase().chain(characters).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Text shown inside an empty input: the example value, else `Enter <label>`.
    pub fn input_placeholder(&self) -> String {
        match self.example_value.as_deref().map(str::trim).filter(|example| !example.is_empty()) {
            Some(example) => example.to_string(),
            None => format!("Enter {}", self.display_label().to_lowercase()),
        }
    }
}

/// Scalar shapes a CMS export may use for a numeric or boolean field.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientScalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

impl LenientScalar {
    fn as_int(&self) -> Option<i64> {
        match self {
            LenientScalar::Int(value) => Some(*value),
            LenientScalar::Float(value) if value.is_finite() => Some(*value as i64),
            LenientScalar::Text(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Loose truthiness: `""`, `"0"`, `"false"`, `"no"`, `"off"` and zero are false.
    fn as_bool(&self) -> Option<bool> {
        match self {
            LenientScalar::Bool(value) => Some(*value),
            LenientScalar::Int(value) => Some(*value != 0),
            LenientScalar::Float(value) => Some(*value != 0.0),
            LenientScalar::Text(text) => {
                let text = text.trim().to_ascii_lowercase();
                Some(!matches!(text.as_str(), "" | "0" | "false" | "no" | "off"))
            }
            LenientScalar::Other(_) => None,
        }
    }
}

/// Accepts integers, numeric strings, or null; anything else becomes `None`.
pub(crate) fn deserialize_lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<LenientScalar>::deserialize(deserializer)?.and_then(|value| value.as_int()))
}

/// Non-negative minute counts; negatives and non-numbers become `None`.
fn deserialize_lenient_minutes<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_lenient_int(deserializer)?.and_then(|value| u32::try_from(value).ok()))
}

/// Booleans written as `true`, `1`, `"1"`, `""` and so on; arrays and maps become `None`.
pub(crate) fn deserialize_lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<LenientScalar>::deserialize(deserializer)?.and_then(|value| value.as_bool()))
}

fn deserialize_lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_lenient_bool(deserializer)?.unwrap_or(false))
}

/// Checklists arrive either as plain strings or as `{ check_item: "..." }` rows.
fn deserialize_checklist<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ChecklistEntry {
        Text(String),
        Row { check_item: Option<String> },
    }

    let entries = Option::<Vec<ChecklistEntry>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry {
            ChecklistEntry::Text(text) => Some(text),
            ChecklistEntry::Row { check_item } => check_item,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_decoration_and_case() {
        assert_eq!(normalize_variable_name("Name "), "name");
        assert_eq!(normalize_variable_name("{NAME}"), "name");
        assert_eq!(normalize_variable_name("  { Company } "), "company");
        assert_eq!(normalize_variable_name("{}"), "");
        assert_eq!(normalize_variable_name("   "), "");
    }

    #[test]
    fn parses_cms_export_with_long_form_keys() {
        let yaml = r#"
id: 42
title: "Cold outreach"
Summary: "Write a cold email"
access_mode: "Half_Locked"
free_step_limit: "2"
login_required: true
steps:
  - title: "Research"
    prompt: "Research {company}"
    variables:
      - var_name: "{Company}"
        var_label: ""
        var_required: true
    checklist:
      - check_item: "Found the website"
      - "Noted the industry"
    estimated_time_min: 5
  - title: "Draft"
    prompt: "Draft using {previous_output}"
    estimated_time_min: 10
"#;
        let workflow: WorkflowDefinition = serde_yaml::from_str(yaml).expect("parse workflow");
        assert_eq!(workflow.workflow_id, 42);
        assert_eq!(workflow.summary, "Write a cold email");
        assert_eq!(workflow.gating.access_mode.as_deref(), Some("Half_Locked"));
        assert_eq!(workflow.gating.free_step_limit, Some(2));
        assert_eq!(workflow.gating.login_required, Some(true));
        assert_eq!(workflow.total_estimated_minutes(), 15);

        let first = workflow.step(1).expect("first step");
        assert_eq!(first.checklist, vec!["Found the website", "Noted the industry"]);
        assert_eq!(first.variables[0].normalized_name(), "company");
        assert!(first.variables[0].required);
        assert!(workflow.step(0).is_none());
        assert!(workflow.step(3).is_none());
    }

    #[test]
    fn loosely_typed_scalars_fall_back_instead_of_failing() {
        let yaml = r#"
title: "Loose export"
login_required: "1"
time_saved_min: -5
difficulty_wo_ai: "3"
steps:
  - title: "One"
    estimated_time_min: "10"
    checkpoint_required: "0"
  - title: "Two"
    estimated_time_min: "soon"
    checkpoint_required: 1
    checkpoint_message: "Check the draft"
  - title: "Three"
    estimated_time_min: 2.5
    checkpoint_required: ""
"#;
        let workflow: WorkflowDefinition = serde_yaml::from_str(yaml).expect("parse workflow");
        assert_eq!(workflow.gating.login_required, Some(true));
        assert_eq!(workflow.time_saved_min, None);
        assert_eq!(workflow.difficulty(), 3);
        assert_eq!(workflow.steps[0].estimated_time_min, Some(10));
        assert!(!workflow.steps[0].checkpoint_required);
        assert_eq!(workflow.steps[1].estimated_time_min, None);
        assert_eq!(workflow.step(2).and_then(StepDefinition::checkpoint), Some("Check the draft"));
        assert_eq!(workflow.steps[2].estimated_time_min, Some(2));
        assert!(!workflow.steps[2].checkpoint_required);
        assert_eq!(workflow.total_estimated_minutes(), 12);

        let off: WorkflowDefinition =
            serde_json::from_str(r#"{"login_required":"0","steps":[{"checkpoint_required":[1]}]}"#).expect("parse");
        assert_eq!(off.gating.login_required, Some(false));
        assert!(!off.steps[0].checkpoint_required);
    }

    #[test]
    fn malformed_free_step_limit_is_ignored() {
        let workflow: WorkflowDefinition =
            serde_json::from_str(r#"{"title":"x","free_step_limit":"many","steps":[]}"#).expect("parse");
        assert_eq!(workflow.gating.free_step_limit, None);
    }

    #[test]
    fn display_label_falls_back_to_title_cased_name() {
        let spec = VariableSpec {
            name: "target_audience-segment".into(),
            ..VariableSpec::default()
        };
        assert_eq!(spec.display_label(), "Target Audience Segment");
        assert_eq!(spec.input_placeholder(), "Enter target audience segment");

        let with_example = VariableSpec {
            name: "tone".into(),
            example_value: Some("Friendly".into()),
            ..VariableSpec::default()
        };
        assert_eq!(with_example.input_placeholder(), "Friendly");
    }

    #[test]
    fn checkpoint_requires_flag_and_message() {
        let mut step = StepDefinition {
            checkpoint_required: true,
            checkpoint_message: Some("  ".into()),
            ..StepDefinition::default()
        };
        assert_eq!(step.checkpoint(), None);
        step.checkpoint_message = Some("Review before continuing".into());
        assert_eq!(step.checkpoint(), Some("Review before continuing"));
        step.checkpoint_required = false;
        assert_eq!(step.checkpoint(), None);
    }

    #[test]
    fn difficulty_is_clamped() {
        let workflow = WorkflowDefinition {
            difficulty_without_ai: Some(9),
            ..WorkflowDefinition::default()
        };
        assert_eq!(workflow.difficulty(), 5);
    }
}
