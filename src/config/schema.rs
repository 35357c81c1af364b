use crate::error::{FetchError, Result};
use crate::tool::Pip;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolConfig {
    /// pip executable; discovered in PATH when unset
    pub program: Option<String>,
    /// Python interpreter to run `python -m pip` with, wins over `program`
    pub python: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Download directory; a temporary one is created when unset
    pub dest: Option<PathBuf>,
    #[serde(default = "default_avoid_binary")]
    pub avoid_binary: bool,
}

// Default value functions
const fn default_avoid_binary() -> bool {
    false
}

impl Config {
    /// Load config from the default location, or defaults if there is no file
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from `path`, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            FetchError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| {
            FetchError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;

        if let Some(dest) = config.download.dest.take() {
            config.download.dest = Some(expand_home(&dest)?);
        }

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config)
        } else {
            home_dir()?.join(".config")
        };

        Ok(config_dir.join("sdistfetch").join("config.toml"))
    }

    /// Build the pip runner this config asks for
    ///
    /// `python` takes precedence over `program`; with neither set pip is
    /// discovered in PATH.
    pub fn build_tool(&self) -> Result<Pip> {
        if let Some(python) = &self.tool.python {
            return Ok(Pip::from_python(resolve_program(python)?));
        }
        if let Some(program) = &self.tool.program {
            return Ok(Pip::new(resolve_program(program)?));
        }
        Pip::discover()
    }
}

fn home_dir() -> Result<PathBuf> {
    std::env::var("HOME")
        .map(PathBuf::from)
        .map_err(|_| FetchError::Config("HOME env var not set".to_string()))
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => Ok(home_dir()?.join(rest)),
        Err(_) => Ok(path.to_path_buf()),
    }
}

/// Look a bare program name up in PATH; paths are used as given
fn resolve_program(program: &str) -> Result<PathBuf> {
    if Path::new(program).components().count() > 1 {
        return Ok(PathBuf::from(program));
    }
    which::which(program)
        .map_err(|e| FetchError::ToolNotFound(format!("{program} not found in PATH: {e}")))
}
