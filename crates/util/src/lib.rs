//! Shared helpers for the Prompt Finder crates: configuration and document loading, persisted
//! client flags, path handling, and markup escaping.

pub mod flag_store;
pub mod loading;
pub mod markup;
pub mod path_processing;

pub use flag_store::{FlagStore, FlagStoreError, InMemoryFlagStore, JsonFlagStore, StoredFlag};
pub use loading::{
    ConfigError, GLOBAL_CONTEXT_PATH_ENV, SITE_CONFIG_PATH_ENV, default_global_context_path, default_site_config_path,
    load_global_context, load_site_config, load_workflow_file,
};
pub use markup::{escape_attr, escape_html, escape_multiline};
pub use path_processing::{expand_tilde, prompt_finder_config_dir};
