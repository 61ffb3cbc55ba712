//! Configuration loading and resolution.

use std::path::{Path, PathBuf};

use anyhow::Context;
use pjax::PjaxConfig;

/// Resolve the config file path.
///
/// Order: explicit path, `PJAX_CONFIG`, `./.pjax/config.json`,
/// `~/.pjax/config.json`. Returns `None` when no file applies.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    resolve_in(
        explicit,
        std::env::var("PJAX_CONFIG").ok(),
        Path::new("."),
        &home_dir(),
    )
}

fn resolve_in(
    explicit: Option<&str>,
    env_path: Option<String>,
    cwd: &Path,
    home: &Path,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Some(path) = env_path.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }

    let cwd_config = cwd.join(".pjax/config.json");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    let home_config = home.join(".pjax/config.json");
    home_config.exists().then_some(home_config)
}

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
}

/// Load the effective config: file (if any), then `PJAX_*` overrides.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<PjaxConfig> {
    let config = match resolve_config_path(explicit) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            PjaxConfig::from_json_file(&path)
                .with_context(|| format!("cannot load config {}", path.display()))?
        }
        None => PjaxConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}
