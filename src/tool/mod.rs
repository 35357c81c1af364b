pub mod pip;
pub mod version;

use crate::error::Result;

pub use pip::Pip;
pub use version::ToolVersion;

/// Flag pointing the tool at the download directory
pub const DEST_FLAG: &str = "-d";

/// Flag telling the tool to read specifiers from a requirements file
pub const REQUIREMENT_FLAG: &str = "-r";

/// Interface to the external package manager that does the actual fetching
///
/// Implementations own dependency resolution, index access and archive
/// handling. The downloader only builds arguments and reads back an exit status.
pub trait PackageTool: Send + Sync {
    /// Report the installed tool version
    fn version(&self) -> Result<ToolVersion>;

    /// Run the tool with `args` and wait for it, returning its exit status (0 = success)
    fn run(&self, args: &[String]) -> Result<i32>;

    /// Get tool name for logging/debugging
    fn tool_name(&self) -> &str;
}

/// Which subcommand the installed tool understands for "download into a directory"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subcommand {
    /// `install -d DIR`, used by tools older than 8.0.0
    Legacy,
    /// `download -d DIR`
    Modern,
}

impl Subcommand {
    /// First tool release with a dedicated `download` subcommand
    pub const MODERN_SINCE: [u64; 3] = [8, 0, 0];

    /// Select the subcommand for a detected tool version
    #[must_use]
    pub fn for_version(version: &ToolVersion) -> Self {
        if *version < ToolVersion::from_release(&Self::MODERN_SINCE) {
            Self::Legacy
        } else {
            Self::Modern
        }
    }

    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Legacy => "install",
            Self::Modern => "download",
        }
    }

    /// Flag that stops the tool from preferring prebuilt binary packages
    ///
    /// `--no-use-wheel` was dropped from newer tools in favour of `--no-binary`.
    #[must_use]
    pub const fn avoid_binary_flag(self) -> &'static str {
        match self {
            Self::Legacy => "--no-use-wheel",
            Self::Modern => "--no-binary=:all:",
        }
    }
}
