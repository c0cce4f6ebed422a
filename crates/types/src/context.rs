//! Global business context and the per-step requirements that pull it into prompts.

use serde::{Deserialize, Serialize};

/// Source value meaning "read from the site's global context profile".
pub const USER_PROFILE_SOURCE: &str = "user_profile";

/// Read-only business profile maintained outside the workflow documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalContext {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub tone_of_voice: String,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub mission_values: String,
    #[serde(default)]
    pub reference_examples: Vec<ReferenceExample>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceExample {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub ref_text_or_link: String,
}

/// Kind of context a step asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContextType {
    /// Company name, industry, mission.
    Business,
    /// Ideal customer profile / target audience.
    Icp,
    Tone,
    Examples,
    Other(String),
}

impl ContextType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Business => "business",
            Self::Icp => "icp",
            Self::Tone => "tone",
            Self::Examples => "examples",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for ContextType {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "business" => Self::Business,
            "icp" | "audience" => Self::Icp,
            "tone" => Self::Tone,
            "examples" => Self::Examples,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<ContextType> for String {
    fn from(value: ContextType) -> Self {
        value.as_str().to_string()
    }
}

/// A step's declared need for global context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRequirement {
    pub context_type: ContextType,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_source")]
    pub source: String,
    /// Text appended when nothing else was gathered and the requirement is optional.
    #[serde(default)]
    pub default_value: Option<String>,
}

impl ContextRequirement {
    pub fn new(context_type: ContextType) -> Self {
        Self {
            context_type,
            required: false,
            source: default_source(),
            default_value: None,
        }
    }

    pub fn reads_user_profile(&self) -> bool {
        self.source == USER_PROFILE_SOURCE
    }
}

fn default_source() -> String {
    USER_PROFILE_SOURCE.to_string()
}
