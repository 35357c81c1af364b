use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sdistfetch
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid download request: {0}")]
    InvalidRequest(String),

    #[error("Failed to create download directory {}: {source}\n\nTroubleshooting:\n- Check write permissions on the parent directory\n- Make sure the path is not an existing regular file", .path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("package failed download, exit {status}. Arguments: {args:?}")]
    PackageDownload { status: i32, args: Vec<String> },

    #[error("Package tool not found: {0}\n\nTroubleshooting:\n- Is pip installed and in PATH? Try: python3 -m ensurepip\n- Point at a specific binary with --pip or `program` in config\n- Or set `python` in config to run `python -m pip`")]
    ToolNotFound(String),

    #[error("Failed to launch {program}: {source}")]
    ToolLaunch {
        program: String,
        #[source]
        source: subprocess::PopenError,
    },

    #[error("Could not determine package tool version: {0}\n\nTroubleshooting:\n- Run `pip --version` manually and check its output\n- Run with RUST_LOG=debug for more details")]
    VersionDetection(String),

    #[error("Config error: {0}\n\nTroubleshooting:\n- Check config file: ~/.config/sdistfetch/config.toml\n- Run with RUST_LOG=debug for more details")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Exit status reported by the package tool, if this is a download failure
    #[must_use]
    pub const fn status(&self) -> Option<i32> {
        match self {
            Self::PackageDownload { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
