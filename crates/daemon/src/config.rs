// Optional configuration files.
//
// Workspace config: `<root>/.autopush/workspace.toml`
// Global config: `~/.autopush/config.toml`
//
// With neither file present every value matches the built-in behaviour:
// `git add .`, commit "Aggiornamento automatico", `git push origin main`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::git::worker::DEFAULT_GIT_PROGRAM;

/// Root directory for autopush global state: `~/.autopush/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".autopush"))
}

/// Path to the global config file: `~/.autopush/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

/// Path to the workspace config file: `<root>/.autopush/workspace.toml`.
pub fn workspace_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".autopush").join("workspace.toml")
}

/// Full configuration. The workspace file replaces the global file as a
/// whole; fields are not merged across files.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AutopushConfig {
    pub git: GitConfig,
    pub watch: WatchConfig,
}

impl AutopushConfig {
    /// Load the workspace file, else the global file, else defaults.
    ///
    /// A file that exists but does not parse is an error.
    pub fn load(workspace_root: &Path) -> Result<Self, ConfigError> {
        let candidates =
            std::iter::once(workspace_config_path(workspace_root)).chain(global_config_path());

        for path in candidates {
            match Self::load_from(&path) {
                Ok(config) => {
                    debug!(path = %path.display(), "loaded config");
                    return Ok(config);
                }
                Err(ConfigError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => return Err(error),
            }
        }

        Ok(Self::default())
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }
}

/// Repository operations run by each push cycle.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GitConfig {
    /// Git executable (defaults to `"git"` on `PATH`).
    pub program: String,
    /// Remote to push to (defaults to `"origin"`).
    pub remote: String,
    /// Remote branch to push (defaults to `"main"`).
    pub branch: String,
    /// Message for every automatic commit.
    pub commit_message: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_GIT_PROGRAM.into(),
            remote: "origin".into(),
            branch: "main".into(),
            commit_message: "Aggiornamento automatico".into(),
        }
    }
}

/// Watcher and wait loop settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Wait loop interval in milliseconds.
    pub tick_ms: u64,
    /// Drop events for paths inside `.git` directories.
    pub ignore_git_dir: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { tick_ms: 1000, ignore_git_dir: true }
    }
}

impl WatchConfig {
    /// Wait loop interval, never shorter than 1ms.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[source] std::io::Error),
    #[error("config parse error in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
