//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `BLOOM_ROOT_FOLDER` environment variable
//! 3. `root_folder` key of the module's TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file never stops startup; it logs a warning
//! and the next tier is used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "BLOOM_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "bloom.db";

/// Blob store directory name inside the root folder
pub const BLOB_DIR_NAME: &str = "blobs";

/// Bootstrap configuration loaded from `~/.config/bloom/<module>.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database and blob store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// API key for the completion service (lowest-priority source)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_api_key: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Built-in defaults used when no other configuration source applies
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "linux") {
            // ~/.local/share/bloom
            dirs::data_local_dir()
                .map(|d| d.join("bloom"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/bloom"))
        } else if cfg!(target_os = "macos") {
            // ~/Library/Application Support/bloom
            dirs::data_dir()
                .map(|d| d.join("bloom"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/bloom"))
        } else if cfg!(target_os = "windows") {
            // %LOCALAPPDATA%\bloom
            dirs::data_local_dir()
                .map(|d| d.join("bloom"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\bloom"))
        } else {
            PathBuf::from("./bloom_data")
        };

        Self {
            root_folder,
            log_level: default_log_level(),
        }
    }
}

/// Resolves the root folder for one module
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
        }
    }

    /// Set the command-line override (highest priority)
    pub fn with_cli_arg(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    /// Path of this module's TOML config file, if a config dir exists on this platform
    pub fn config_path(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("bloom").join(format!("{}.toml", self.module_name)))
    }

    /// Resolve the root folder. Never fails; falls back to compiled defaults.
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!("Root folder from command line: {}", path.display());
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                info!("Root folder from {}: {}", ROOT_FOLDER_ENV, path);
                return PathBuf::from(path);
            }
        }

        if let Some(config_path) = self.config_path() {
            if config_path.exists() {
                match load_toml_config(&config_path) {
                    Ok(config) => {
                        if let Some(root) = config.root_folder {
                            info!("Root folder from {}: {}", config_path.display(), root.display());
                            return root;
                        }
                    }
                    Err(e) => warn!("Ignoring unreadable config {}: {}", config_path.display(), e),
                }
            } else {
                debug!("No config file at {}", config_path.display());
            }
        }

        let defaults = CompiledDefaults::for_current_platform();
        info!("Root folder from compiled default: {}", defaults.root_folder.display());
        defaults.root_folder
    }
}

/// Creates the root folder layout and exposes the paths inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn blob_path(&self) -> PathBuf {
        self.root_folder.join(BLOB_DIR_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Create the root folder and blob directory (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.blob_path())?;
        Ok(())
    }
}

/// Load a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Load a TOML config file, falling back to defaults when missing or invalid
pub fn load_toml_config_or_default(path: &Path) -> TomlConfig {
    if !path.exists() {
        return TomlConfig::default();
    }
    match load_toml_config(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Using default configuration: {}", e);
            TomlConfig::default()
        }
    }
}

/// Write a TOML config atomically (temp file + rename)
///
/// On Unix the file is restricted to 0600 since it may hold an API key.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    let temp_path = PathBuf::from(temp_path);

    std::fs::write(&temp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_defaults_to_info() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(config.root_folder.is_none());
        assert!(config.completion_api_key.is_none());
    }

    #[test]
    fn test_initializer_paths() {
        let initializer = RootFolderInitializer::new(PathBuf::from("/srv/bloom"));
        assert_eq!(initializer.database_path(), PathBuf::from("/srv/bloom/bloom.db"));
        assert_eq!(initializer.blob_path(), PathBuf::from("/srv/bloom/blobs"));
    }
}
