//! Application paths for config and state files.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Default location of the OAuth client secrets document (cwd-relative).
pub const DEFAULT_CLIENT_SECRETS_FILE: &str = "credentials.json";

/// Default location of the cached token record (cwd-relative).
pub const DEFAULT_TOKEN_FILE: &str = "token.json";

/// Default dotenv file holding the Telegram secrets (cwd-relative).
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Application paths.
pub struct AppPaths {
    /// Configuration directory.
    pub config: PathBuf,
}

impl AppPaths {
    /// Create paths for the dqa application.
    #[must_use]
    pub fn new() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("com", "dqa", "dqa") {
            Self {
                config: proj_dirs.config_dir().to_path_buf(),
            }
        } else {
            // Fallback to home directory
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            Self {
                config: home.join(".config/dqa"),
            }
        }
    }

    /// Path to the TOML config file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// Module-level function for accessing dirs crate.
mod dirs {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
    }
}
