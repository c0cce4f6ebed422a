use std::path::PathBuf;

use dirs_next::{config_dir, home_dir};

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let p = path.trim();
    if p == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = p.strip_prefix("~/") {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    if let Some(rest) = p.strip_prefix("~\\") {
        // Windows-style
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(p)
}

/// `<config_dir>/prompt-finder`, or `./prompt-finder` when no config directory exists.
pub fn prompt_finder_config_dir() -> PathBuf {
    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("prompt-finder")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_trimmed_but_untouched() {
        assert_eq!(expand_tilde("  /tmp/pf-config.json "), PathBuf::from("/tmp/pf-config.json"));
    }

    #[test]
    fn tilde_prefix_is_expanded() {
        let expanded = expand_tilde("~/pf/flags.json");
        if let Some(home) = home_dir() {
            assert_eq!(expanded, home.join("pf/flags.json"));
        }
    }
}
