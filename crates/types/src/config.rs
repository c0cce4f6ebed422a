//! Site-wide configuration (`pf-config.json`): feature flags, copy strings, layout switches,
//! workflow gating defaults, and the URLs used by calls to action.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root of the site configuration document. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub feature_flags: FeatureFlags,
    #[serde(default)]
    pub copy: CopyStrings,
    #[serde(default)]
    pub layout: LayoutOptions,
    #[serde(default)]
    pub workflow_defaults: WorkflowDefaults,
    #[serde(default)]
    pub behavior: BehaviorOptions,
    #[serde(default)]
    pub urls: SiteUrls,
}

/// Toggles for optional page sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default)]
    pub mode_legend: bool,
    #[serde(default)]
    pub gating: bool,
    /// Defaults to on when absent.
    #[serde(default)]
    pub value_panel: Option<bool>,
    #[serde(default)]
    pub howto_box: bool,
    #[serde(default)]
    pub lock_badges: bool,
    #[serde(default)]
    pub next_panel: bool,
    #[serde(default)]
    pub share: bool,
    #[serde(default)]
    pub rating: bool,
    #[serde(default)]
    pub show_changelog: bool,
}

impl FeatureFlags {
    pub fn show_value_panel(&self) -> bool {
        self.value_panel.unwrap_or(true)
    }

    pub fn show_mode_legend(&self) -> bool {
        self.mode_legend || self.gating
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutOptions {
    #[serde(default)]
    pub show_info_pills: bool,
    #[serde(default)]
    pub show_thumbnail: bool,
    #[serde(default)]
    pub three_grid_under_steps: bool,
}

/// Site-level gating defaults, consulted when a workflow leaves a field unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefaults {
    #[serde(default)]
    pub access_mode: Option<String>,
    #[serde(default, deserialize_with = "crate::workflow::deserialize_lenient_int")]
    pub free_step_limit: Option<i64>,
    #[serde(default, deserialize_with = "crate::workflow::deserialize_lenient_bool")]
    pub login_required: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorOptions {
    /// Pixel offset applied when scrolling to a step anchor.
    #[serde(default)]
    pub smooth_scroll_offset: Option<i64>,
}

/// Destinations for login and upgrade calls to action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteUrls {
    #[serde(default = "default_login_url")]
    pub login: String,
    #[serde(default = "default_pricing_url")]
    pub pricing: String,
}

impl Default for SiteUrls {
    fn default() -> Self {
        Self {
            login: default_login_url(),
            pricing: default_pricing_url(),
        }
    }
}

fn default_login_url() -> String {
    "/login".to_string()
}

fn default_pricing_url() -> String {
    "/pricing".to_string()
}

/// Editable UI copy keyed by string identifier.
///
/// Values are usually strings; a few keys (such as `howto_items`) hold arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CopyStrings(pub IndexMap<String, Value>);

impl CopyStrings {
    /// Returns the configured string for `key`, or `fallback` when missing or not a string.
    pub fn text(&self, key: &str, fallback: &str) -> String {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_string()
    }

    /// Returns the configured list for `key`; non-string entries are skipped.
    pub fn items(&self, key: &str) -> Vec<String> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|values| values.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), Value::String(value.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_fills_defaults() {
        let config: SiteConfig = serde_json::from_str(
            r#"{
                "feature_flags": {"rating": true, "gating": true},
                "copy": {"copy_prompt": "Copy", "howto_items": ["One", 2, "Three"]},
                "workflow_defaults": {"access_mode": "half_locked", "free_step_limit": 2}
            }"#,
        )
        .expect("parse config");

        assert!(config.feature_flags.rating);
        assert!(config.feature_flags.show_mode_legend());
        assert!(config.feature_flags.show_value_panel());
        assert_eq!(config.copy.text("copy_prompt", "Copy prompt"), "Copy");
        assert_eq!(config.copy.text("missing", "Fallback"), "Fallback");
        assert_eq!(config.copy.items("howto_items"), vec!["One", "Three"]);
        assert_eq!(config.workflow_defaults.free_step_limit, Some(2));
        assert_eq!(config.urls.login, "/login");
        assert_eq!(config.urls.pricing, "/pricing");
    }

    #[test]
    fn string_typed_defaults_keep_the_rest_of_the_config() {
        let config: SiteConfig = serde_json::from_str(
            r#"{
                "feature_flags": {"share": true},
                "urls": {"login": "/signin"},
                "workflow_defaults": {"free_step_limit": "2", "login_required": "1"}
            }"#,
        )
        .expect("parse config");

        assert!(config.feature_flags.share);
        assert_eq!(config.urls.login, "/signin");
        assert_eq!(config.workflow_defaults.free_step_limit, Some(2));
        assert_eq!(config.workflow_defaults.login_required, Some(true));
    }
}
