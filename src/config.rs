use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the imgmeta CLI and batch pipeline.
///
/// Controls the write policy (purge, output directory), output behavior
/// (dry run, backups) and which XMP sources are consulted when reading.
///
/// # Loading
///
/// ```rust,no_run
/// use imgmeta::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.write.purge_non_camera = false;
/// config.xmp.sources = vec!["scan".into()];
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How edits are applied.
    pub write: WriteConfig,
    /// Output behavior (dry run, backups).
    pub output: OutputConfig,
    /// XMP packet discovery.
    pub xmp: XmpConfig,
}

/// Write policy for edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteConfig {
    /// Drop every EXIF tag not on the camera allow-list before writing.
    /// Used when the edit request does not come from a file that sets it.
    pub purge_non_camera: bool,
    /// Write edited copies here instead of modifying files in place.
    pub output_dir: Option<PathBuf>,
}

/// Output and behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// If `true`, show what would be written without modifying any files.
    pub dry_run: bool,
    /// If `true`, create a `.bak` backup before modifying an image in place.
    pub backup_originals: bool,
}

/// Ordered list of XMP sources, see [`crate::xmp::source_by_name`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XmpConfig {
    pub sources: Vec<String>,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            purge_non_camera: true,
            output_dir: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            backup_originals: true,
        }
    }
}

impl Default for XmpConfig {
    fn default() -> Self {
        Self {
            sources: vec!["segment".to_string(), "scan".to_string()],
        }
    }
}

impl Config {
    /// Resolve the config file path in the same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}
