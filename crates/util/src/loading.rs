//! Loading of the site configuration, the global context profile, and workflow documents.
//!
//! Site configuration and global context follow a forgiving policy: a missing file or a
//! malformed document yields defaults (with a warning) so rendering never fails on them.
//! Workflow documents are the page's subject, so read and parse failures are returned.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pf_types::{GlobalContext, SiteConfig, WorkflowDefinition};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::path_processing::{expand_tilde, prompt_finder_config_dir};

/// Environment variable overriding the site configuration path.
pub const SITE_CONFIG_PATH_ENV: &str = "PF_CONFIG_PATH";
/// Environment variable overriding the global context path.
pub const GLOBAL_CONTEXT_PATH_ENV: &str = "PF_CONTEXT_PATH";

const SITE_CONFIG_FILE_NAME: &str = "pf-config.json";
const GLOBAL_CONTEXT_FILE_NAME: &str = "global-context.json";
const UTF8_BOM: char = '\u{feff}';

/// Error surfaced when a configuration file exists but cannot be read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Returns the site configuration path, honoring [`SITE_CONFIG_PATH_ENV`].
pub fn default_site_config_path() -> PathBuf {
    path_from_env_or_default(SITE_CONFIG_PATH_ENV, SITE_CONFIG_FILE_NAME)
}

/// Returns the global context path, honoring [`GLOBAL_CONTEXT_PATH_ENV`].
pub fn default_global_context_path() -> PathBuf {
    path_from_env_or_default(GLOBAL_CONTEXT_PATH_ENV, GLOBAL_CONTEXT_FILE_NAME)
}

/// Loads `pf-config.json`, falling back to defaults when missing or malformed.
pub fn load_site_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    load_forgiving_json(path, "site config")
}

/// Loads the global context profile, falling back to an empty profile.
pub fn load_global_context(path: &Path) -> Result<GlobalContext, ConfigError> {
    load_forgiving_json(path, "global context")
}

/// Reads a workflow document. YAML is accepted for every extension since JSON is a subset.
pub fn load_workflow_file(path: impl AsRef<Path>) -> Result<WorkflowDefinition> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read workflow file: {}", path.display()))?;
    let content = content.trim_start_matches(UTF8_BOM);
    serde_yaml::from_str::<WorkflowDefinition>(content)
        .with_context(|| format!("Failed to parse workflow file: {}", path.display()))
}

fn path_from_env_or_default(variable: &str, file_name: &str) -> PathBuf {
    if let Ok(path) = env::var(variable)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }
    prompt_finder_config_dir().join(file_name)
}

fn load_forgiving_json<T>(path: &Path, label: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "{} not found; using defaults", label);
            return Ok(T::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    match serde_json::from_str(content.trim_start_matches(UTF8_BOM)) {
        Ok(value) => Ok(value),
        Err(error) => {
            warn!(
                path = %path.display(),
                error = %error,
                "Failed to parse {}; using defaults", label
            );
            Ok(T::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_site_config_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = load_site_config(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn site_config_with_bom_is_parsed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pf-config.json");
        fs::write(&path, "\u{feff}{\"feature_flags\":{\"share\":true}}").unwrap();

        let config = load_site_config(&path).unwrap();
        assert!(config.feature_flags.share);
    }

    #[test]
    fn malformed_global_context_yields_empty_profile() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("global-context.json");
        fs::write(&path, "{ not json").unwrap();

        let context = load_global_context(&path).unwrap();
        assert_eq!(context, GlobalContext::default());
    }

    #[test]
    fn workflow_file_parse_errors_are_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "steps: [").unwrap();

        let error = load_workflow_file(&path).unwrap_err();
        assert!(error.to_string().contains("Failed to parse workflow file"));
    }

    #[test]
    fn workflow_file_loads_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("workflow.yaml");
        fs::write(&path, "title: Demo\naccess_mode: pro\nsteps:\n  - title: One\n    prompt: Hi {name}\n").unwrap();

        let workflow = load_workflow_file(&path).unwrap();
        assert_eq!(workflow.title, "Demo");
        assert_eq!(workflow.gating.access_mode.as_deref(), Some("pro"));
        assert_eq!(workflow.step_count(), 1);
    }

    #[test]
    fn default_path_honors_environment_override() {
        let override_path = "~/custom/pf-config.json";
        temp_env::with_var(SITE_CONFIG_PATH_ENV, Some(override_path), || {
            assert_eq!(default_site_config_path(), expand_tilde(override_path));
        });
    }
}
