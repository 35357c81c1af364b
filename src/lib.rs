pub mod config;
pub mod downloader;
pub mod error;
pub mod tool;

pub use downloader::{DownloadRequest, DownloadedFiles, PackageDownloader};
pub use error::{FetchError, Result};
pub use tool::{PackageTool, Pip, Subcommand, ToolVersion};
