//! Global context injection.
//!
//! Steps may declare context requirements (business profile, audience, tone, reference
//! examples). Before a step's template is emitted, the matching profile values are appended in a
//! delimited block so the copied prompt carries them. Missing values are not errors.

use pf_types::{ContextRequirement, ContextType, GlobalContext, ReferenceExample};
use tracing::debug;

const CONTEXT_OPEN: &str = "\n\n--- Context ---\n";
const CONTEXT_CLOSE: &str = "\n--- End Context ---\n";

/// Profile fields a requirement can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextField {
    CompanyName,
    Industry,
    MissionValues,
    TargetAudience,
    ToneOfVoice,
}

/// Read-only lookup of the viewer's or site's global context profile.
pub trait GlobalContextSource {
    /// Value of `field`; `None` or an empty string both mean absent.
    fn value(&self, field: ContextField) -> Option<String>;

    fn reference_examples(&self) -> Vec<ReferenceExample>;
}

impl GlobalContextSource for GlobalContext {
    fn value(&self, field: ContextField) -> Option<String> {
        let raw = match field {
            ContextField::CompanyName => &self.company_name,
            ContextField::Industry => &self.industry,
            ContextField::MissionValues => &self.mission_values,
            ContextField::TargetAudience => &self.target_audience,
            ContextField::ToneOfVoice => &self.tone_of_voice,
        };
        Some(raw.clone())
    }

    fn reference_examples(&self) -> Vec<ReferenceExample> {
        self.reference_examples.clone()
    }
}

/// A source with no values at all.
pub struct NoGlobalContext;

impl GlobalContextSource for NoGlobalContext {
    fn value(&self, _field: ContextField) -> Option<String> {
        None
    }

    fn reference_examples(&self) -> Vec<ReferenceExample> {
        Vec::new()
    }
}

/// Appends the requested global context to `prompt`.
///
/// Each requirement contributes its lines; when it contributes nothing, is optional, and
/// declares a default, the default is used instead. The prompt is returned unchanged when no
/// line was gathered.
pub fn inject_global_context(prompt: &str, requirements: &[ContextRequirement], source: &dyn GlobalContextSource) -> String {
    if requirements.is_empty() {
        return prompt.to_string();
    }

    let mut lines = Vec::new();
    for requirement in requirements {
        let gathered = gather_lines(requirement, source);
        if gathered.is_empty() {
            match requirement.default_value.as_deref().map(str::trim) {
                Some(default) if !requirement.required && !default.is_empty() => lines.push(default.to_string()),
                _ => debug!(context_type = requirement.context_type.as_str(), "no global context available"),
            }
        } else {
            lines.extend(gathered);
        }
    }

    if lines.is_empty() {
        return prompt.to_string();
    }
    format!("{prompt}{CONTEXT_OPEN}{}{CONTEXT_CLOSE}", lines.join("\n"))
}

fn gather_lines(requirement: &ContextRequirement, source: &dyn GlobalContextSource) -> Vec<String> {
    if !requirement.reads_user_profile() {
        return Vec::new();
    }
    let present = |field| source.value(field).filter(|value| !value.trim().is_empty());

    let mut lines = Vec::new();
    match &requirement.context_type {
        ContextType::Business => {
            if let Some(company) = present(ContextField::CompanyName) {
                lines.push(format!("Company: {company}"));
                if let Some(industry) = present(ContextField::Industry) {
                    lines.push(format!("Industry: {industry}"));
                }
                if let Some(mission) = present(ContextField::MissionValues) {
                    lines.push(format!("Mission & Values: {mission}"));
                }
            }
        }
        ContextType::Icp => {
            if let Some(audience) = present(ContextField::TargetAudience) {
                lines.push(format!("Target Audience: {audience}"));
            }
        }
        ContextType::Tone => {
            if let Some(tone) = present(ContextField::ToneOfVoice) {
                lines.push(format!("Tone of Voice: {tone}"));
            }
        }
        ContextType::Examples => {
            let examples: Vec<String> = source
                .reference_examples()
                .into_iter()
                .filter(|example| !example.title.trim().is_empty() && !example.ref_text_or_link.trim().is_empty())
                .map(|example| format!("{}: {}", example.title, example.ref_text_or_link))
                .collect();
            if !examples.is_empty() {
                lines.push(format!("Reference Examples:\n{}", examples.join("\n")));
            }
        }
        ContextType::Other(raw) => {
            debug!(context_type = %raw, "unsupported context type");
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> GlobalContext {
        GlobalContext {
            company_name: "Acme".into(),
            industry: "Logistics".into(),
            tone_of_voice: String::new(),
            target_audience: "Ops leads".into(),
            mission_values: String::new(),
            reference_examples: vec![
                ReferenceExample {
                    title: "Case".into(),
                    ref_text_or_link: "https://acme.test/case".into(),
                },
                ReferenceExample {
                    title: "Untitled".into(),
                    ref_text_or_link: " ".into(),
                },
            ],
        }
    }

    #[test]
    fn without_requirements_the_prompt_is_untouched() {
        assert_eq!(inject_global_context("Do it", &[], &profile()), "Do it");
    }

    #[test]
    fn appends_delimited_block_for_available_values() {
        let requirements = vec![
            ContextRequirement::new(ContextType::Business),
            ContextRequirement::new(ContextType::Icp),
            ContextRequirement::new(ContextType::Examples),
        ];
        let injected = inject_global_context("Draft a post.", &requirements, &profile());
        assert_eq!(
            injected,
            "Draft a post.\n\n--- Context ---\nCompany: Acme\nIndustry: Logistics\nTarget Audience: Ops leads\nReference Examples:\nCase: https://acme.test/case\n--- End Context ---\n"
        );
    }

    #[test]
    fn optional_requirement_without_value_uses_its_default() {
        let mut tone = ContextRequirement::new(ContextType::Tone);
        tone.default_value = Some("Friendly and direct".into());
        let requirements = vec![ContextRequirement::new(ContextType::Icp), tone];

        let injected = inject_global_context("P", &requirements, &profile());
        assert!(injected.contains("Target Audience: Ops leads\nFriendly and direct\n--- End Context ---"));
    }

    #[test]
    fn required_requirement_never_uses_default() {
        let mut tone = ContextRequirement::new(ContextType::Tone);
        tone.required = true;
        tone.default_value = Some("Friendly".into());
        assert_eq!(inject_global_context("P", &[tone], &profile()), "P");
    }

    #[test]
    fn non_profile_sources_contribute_nothing() {
        let mut business = ContextRequirement::new(ContextType::Business);
        business.source = "manual".into();
        assert_eq!(inject_global_context("P", &[business], &profile()), "P");
        assert_eq!(
            inject_global_context("P", &[ContextRequirement::new(ContextType::Business)], &NoGlobalContext),
            "P"
        );
    }
}
