//! Default locations for config, progress and the mods directory.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Directory name used under the platform config dir.
pub const APP_DIR_NAME: &str = "modbisect";

/// Name of the mods directory inside a game instance.
pub const MODS_DIR_NAME: &str = "mods";

/// Canonical paths for modbisect's own files.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_path: PathBuf,
    pub progress_path: PathBuf,
}

impl AppPaths {
    pub fn new(app_dir: &Path) -> Self {
        Self {
            config_path: app_dir.join("config.toml"),
            progress_path: app_dir.join("progress.json"),
        }
    }

    /// Paths under the platform config directory, or the working directory
    /// when the platform has none.
    pub fn platform_default() -> Self {
        let app_dir = dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(&app_dir)
    }
}

/// Candidate mods directories for a standard launcher install.
pub fn mods_dir_candidates(home: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if cfg!(target_os = "macos") {
        candidates.push(home.join("Library/Application Support/minecraft").join(MODS_DIR_NAME));
    }
    if let Some(roaming) = dirs::config_dir().filter(|_| cfg!(windows)) {
        candidates.push(roaming.join(".minecraft").join(MODS_DIR_NAME));
        candidates.push(roaming.join("minecraft").join(MODS_DIR_NAME));
    }
    candidates.push(home.join(".minecraft").join(MODS_DIR_NAME));
    candidates.push(home.join("minecraft").join(MODS_DIR_NAME));
    candidates
}

/// Replace a leading `~` component with the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// First existing mods directory among the standard candidates.
pub fn detect_mods_dir() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    let found = mods_dir_candidates(&home)
        .into_iter()
        .find(|candidate| candidate.is_dir());
    debug!(found = ?found, "mods directory auto-detection");
    found
}
