//! Downloading source distributions into a directory
//!
//! [`PackageDownloader`] runs the package tool's download command, e.g. for
//! `DownloadRequest::specifiers(["mock", "requests==1.2.1"])`:
//!
//! ```text
//! pip download -d ~/.packages mock requests==1.2.1
//! ```
//!
//! and for `DownloadRequest::manifest("requirements.txt")`:
//!
//! ```text
//! pip download -d ~/.packages -r requirements.txt
//! ```
//!
//! Tools older than 8.0.0 get `install` in place of `download`.
//!
//! # Example
//!
//! ```no_run
//! use sdistfetch::{DownloadRequest, PackageDownloader, Pip};
//!
//! let mut downloader = PackageDownloader::new(Pip::discover()?, None);
//! let request = DownloadRequest::specifiers(["mock", "requests==1.2.1"]);
//! for path in downloader.download(&request)? {
//!     println!("{}", path.display());
//! }
//! # Ok::<(), sdistfetch::FetchError>(())
//! ```

use crate::error::{FetchError, Result};
use crate::tool::{PackageTool, Pip, Subcommand, DEST_FLAG, REQUIREMENT_FLAG};
use std::fs;
use std::path::{Path, PathBuf};

/// What to download
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Package specifiers such as `requests==1.2.1`
    pub specifiers: Option<Vec<String>>,
    /// Requirements file handed to the tool as-is
    pub manifest: Option<PathBuf>,
    /// Don't prefer prebuilt binary packages
    pub avoid_binary: bool,
}

impl DownloadRequest {
    pub fn specifiers<I, S>(specifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            specifiers: Some(specifiers.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn manifest(path: impl Into<PathBuf>) -> Self {
        Self {
            manifest: Some(path.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn avoid_binary(mut self, avoid_binary: bool) -> Self {
        self.avoid_binary = avoid_binary;
        self
    }

    /// Check that exactly one source of packages was given
    fn source(&self) -> Result<Source<'_>> {
        let specifiers = self.specifiers.as_deref().filter(|s| !s.is_empty());

        match (specifiers, self.manifest.as_deref()) {
            (Some(specifiers), None) => Ok(Source::Specifiers(specifiers)),
            (None, Some(manifest)) => {
                Ok(Source::Manifest(path_arg(manifest, "requirements file")?))
            }
            (None, None) => Err(FetchError::InvalidRequest(
                "either package specifiers or a requirements file must be given".to_string(),
            )),
            (Some(_), Some(_)) => Err(FetchError::InvalidRequest(
                "give package specifiers or a requirements file, not both".to_string(),
            )),
        }
    }
}

enum Source<'a> {
    Specifiers(&'a [String]),
    Manifest(&'a str),
}

/// Paths are handed to the tool as text; anything that isn't UTF-8 would
/// reach it altered, so it is refused
fn path_arg<'a>(path: &'a Path, what: &str) -> Result<&'a str> {
    path.to_str().ok_or_else(|| {
        FetchError::InvalidRequest(format!(
            "{what} path is not valid UTF-8: {}",
            path.display()
        ))
    })
}

/// Downloads packages to a directory through a [`PackageTool`]
///
/// When constructed without a directory, a temporary one is created on the
/// first [`download`](Self::download) and reused by every later call. The
/// temporary directory is left on disk.
#[derive(Debug)]
pub struct PackageDownloader<T: PackageTool = Pip> {
    tool: T,
    download_path: Option<PathBuf>,
}

impl<T: PackageTool> PackageDownloader<T> {
    pub const fn new(tool: T, download_path: Option<PathBuf>) -> Self {
        Self {
            tool,
            download_path,
        }
    }

    /// Directory packages go to, `None` until a temporary one is created
    #[must_use]
    pub fn download_path(&self) -> Option<&Path> {
        self.download_path.as_deref()
    }

    #[must_use]
    pub const fn tool(&self) -> &T {
        &self.tool
    }

    /// Download the packages in `request` and list what landed in the directory
    ///
    /// The tool is run exactly once. The returned iterator reads the
    /// directory lazily and yields the regular files directly inside it.
    ///
    /// # Errors
    /// - `InvalidRequest` if the request names no packages, or both specifiers
    ///   and a requirements file, or a path that isn't UTF-8; nothing is
    ///   touched on disk in that case
    /// - `DirectoryCreation` if the download directory can't be created
    /// - `PackageDownload` if the tool exits unsuccessfully
    pub fn download(&mut self, request: &DownloadRequest) -> Result<DownloadedFiles> {
        request.source()?;
        if let Some(path) = &self.download_path {
            path_arg(path, "download directory")?;
        }

        let dest = self.ensure_download_dir()?;
        let args = self.build_args(request)?;

        tracing::info!(
            "Downloading into {} with {}",
            dest.display(),
            self.tool.tool_name()
        );

        let status = self.tool.run(&args)?;
        if status != 0 {
            return Err(FetchError::PackageDownload { status, args });
        }

        tracing::info!("{} finished, listing {}", self.tool.tool_name(), dest.display());
        DownloadedFiles::new(&dest)
    }

    /// Build the argument list for the tool
    ///
    /// Order: subcommand, `-d DIR`, the binary-avoidance flag if requested,
    /// then the specifiers or `-r FILE`.
    ///
    /// # Errors
    /// `InvalidRequest` for a request without exactly one package source, or
    /// if no download directory has been set up yet. Version detection errors
    /// from the tool are passed through.
    pub fn build_args(&self, request: &DownloadRequest) -> Result<Vec<String>> {
        let source = request.source()?;

        let dest = self.download_path.as_deref().ok_or_else(|| {
            FetchError::InvalidRequest("no download directory has been set up yet".to_string())
        })?;
        let dest = path_arg(dest, "download directory")?;

        let version = self.tool.version()?;
        let subcommand = Subcommand::for_version(&version);
        tracing::debug!(
            "{} {version} uses the {:?} subcommand",
            self.tool.tool_name(),
            subcommand
        );

        let mut args = vec![
            subcommand.token().to_string(),
            DEST_FLAG.to_string(),
            dest.to_string(),
        ];

        if request.avoid_binary {
            args.push(subcommand.avoid_binary_flag().to_string());
        }

        match source {
            Source::Specifiers(specifiers) => args.extend(specifiers.iter().cloned()),
            Source::Manifest(manifest) => {
                args.push(REQUIREMENT_FLAG.to_string());
                args.push(manifest.to_string());
            }
        }

        tracing::debug!("Arguments: {args:?}");
        Ok(args)
    }

    /// Create the download directory, or a temporary one if none was given
    fn ensure_download_dir(&mut self) -> Result<PathBuf> {
        if let Some(path) = &self.download_path {
            // Only "already a directory" is tolerated; create_dir_all fails on
            // files and permission problems
            fs::create_dir_all(path).map_err(|source| FetchError::DirectoryCreation {
                path: path.clone(),
                source,
            })?;

            let absolute = std::path::absolute(path)?;
            if absolute != *path {
                tracing::info!("Using download directory {}", absolute.display());
                self.download_path = Some(absolute.clone());
            }
            return Ok(absolute);
        }

        let temp = tempfile::Builder::new()
            .prefix("sdistfetch-")
            .tempdir()
            .map_err(|source| FetchError::DirectoryCreation {
                path: std::env::temp_dir(),
                source,
            })?
            .keep();

        tracing::info!("Created temporary download directory {}", temp.display());
        self.download_path = Some(temp.clone());
        Ok(temp)
    }
}

/// Regular files directly inside a download directory
///
/// Lazy and single-pass: entries are read from the directory as the iterator
/// advances. Subdirectories are skipped, symlinks to files are kept.
#[derive(Debug)]
pub struct DownloadedFiles {
    dir: PathBuf,
    entries: fs::ReadDir,
}

impl DownloadedFiles {
    /// Start listing `dir`
    ///
    /// # Errors
    /// Returns an IO error if the directory can't be opened
    pub fn new(dir: &Path) -> Result<Self> {
        Ok(Self {
            dir: dir.to_path_buf(),
            entries: fs::read_dir(dir)?,
        })
    }
}

impl Iterator for DownloadedFiles {
    type Item = PathBuf;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() {
                        return Some(path);
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {}: {e}", self.dir.display());
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolVersion;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Tool that records its arguments and exits with a fixed status
    struct RecordingTool {
        version: &'static str,
        status: i32,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingTool {
        fn new(version: &'static str, status: i32) -> Self {
            Self {
                version,
                status,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PackageTool for RecordingTool {
        fn version(&self) -> Result<ToolVersion> {
            ToolVersion::parse(self.version)
        }

        fn run(&self, args: &[String]) -> Result<i32> {
            self.calls.lock().unwrap().push(args.to_vec());
            Ok(self.status)
        }

        fn tool_name(&self) -> &str {
            "recording-tool"
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_request_without_packages_is_rejected() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("never-created");
        let mut downloader =
            PackageDownloader::new(RecordingTool::new("23.0", 0), Some(dest.clone()));

        let err = downloader.download(&DownloadRequest::default()).unwrap_err();

        assert!(matches!(err, FetchError::InvalidRequest(_)));
        assert!(!dest.exists(), "no directory should be created");
        assert!(downloader.tool().calls().is_empty(), "tool must not run");
    }

    #[test]
    fn test_empty_specifiers_count_as_missing() {
        let mut downloader = PackageDownloader::new(RecordingTool::new("23.0", 0), None);

        let request = DownloadRequest::specifiers(Vec::<String>::new());
        let err = downloader.download(&request).unwrap_err();

        assert!(matches!(err, FetchError::InvalidRequest(_)));
        assert!(downloader.download_path().is_none(), "no temp dir should be created");
    }

    #[test]
    fn test_specifiers_and_manifest_together_rejected() {
        let mut downloader = PackageDownloader::new(RecordingTool::new("23.0", 0), None);

        let request = DownloadRequest {
            manifest: Some(PathBuf::from("requirements.txt")),
            ..DownloadRequest::specifiers(["mock"])
        };
        let err = downloader.download(&request).unwrap_err();

        assert!(matches!(err, FetchError::InvalidRequest(_)));
        assert!(downloader.tool().calls().is_empty());
    }

    #[test]
    fn test_build_args_specifiers_modern() {
        let downloader = PackageDownloader::new(
            RecordingTool::new("23.3.1", 0),
            Some(PathBuf::from("/tmp/pkgs")),
        );

        let args = downloader
            .build_args(&DownloadRequest::specifiers(["mock", "requests==1.2.1"]))
            .unwrap();

        assert_eq!(
            args,
            strings(&["download", "-d", "/tmp/pkgs", "mock", "requests==1.2.1"])
        );
    }

    #[test]
    fn test_build_args_legacy_tool() {
        let downloader = PackageDownloader::new(
            RecordingTool::new("7.1.2", 0),
            Some(PathBuf::from("/tmp/pkgs")),
        );

        let args = downloader
            .build_args(&DownloadRequest::specifiers(["mock"]))
            .unwrap();

        assert_eq!(args, strings(&["install", "-d", "/tmp/pkgs", "mock"]));
    }

    #[test]
    fn test_build_args_manifest() {
        let downloader = PackageDownloader::new(
            RecordingTool::new("23.3.1", 0),
            Some(PathBuf::from("/tmp/pkgs")),
        );

        let args = downloader
            .build_args(&DownloadRequest::manifest("requirements.txt"))
            .unwrap();

        assert_eq!(
            args,
            strings(&["download", "-d", "/tmp/pkgs", "-r", "requirements.txt"])
        );
    }

    #[test]
    fn test_build_args_avoid_binary_position() {
        let legacy = PackageDownloader::new(
            RecordingTool::new("6.0", 0),
            Some(PathBuf::from("/tmp/pkgs")),
        );
        let args = legacy
            .build_args(&DownloadRequest::manifest("requirements.txt").avoid_binary(true))
            .unwrap();
        assert_eq!(
            args,
            strings(&[
                "install",
                "-d",
                "/tmp/pkgs",
                "--no-use-wheel",
                "-r",
                "requirements.txt"
            ])
        );

        let modern = PackageDownloader::new(
            RecordingTool::new("24.0", 0),
            Some(PathBuf::from("/tmp/pkgs")),
        );
        let args = modern
            .build_args(&DownloadRequest::specifiers(["mock"]).avoid_binary(true))
            .unwrap();
        assert_eq!(
            args,
            strings(&["download", "-d", "/tmp/pkgs", "--no-binary=:all:", "mock"])
        );
    }

    #[test]
    fn test_build_args_needs_directory() {
        let downloader = PackageDownloader::new(RecordingTool::new("23.0", 0), None);
        let err = downloader
            .build_args(&DownloadRequest::specifiers(["mock"]))
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest(_)));
    }

    #[test]
    fn test_failed_download_reports_status_and_args() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().to_path_buf();
        let mut downloader =
            PackageDownloader::new(RecordingTool::new("23.0", 1), Some(dest.clone()));

        let err = downloader
            .download(&DownloadRequest::specifiers(["does-not-exist"]))
            .unwrap_err();

        let expected_args = strings(&[
            "download",
            "-d",
            &dest.display().to_string(),
            "does-not-exist",
        ]);
        match err {
            FetchError::PackageDownload { status, args } => {
                assert_eq!(status, 1);
                assert_eq!(args, expected_args);
                assert_eq!(downloader.tool().calls(), vec![expected_args]);
            }
            other => panic!("expected PackageDownload, got {other:?}"),
        }
    }

    #[test]
    fn test_temp_dir_created_once_and_reused() {
        let mut downloader = PackageDownloader::new(RecordingTool::new("23.0", 0), None);
        assert!(downloader.download_path().is_none());

        let files: Vec<_> = downloader
            .download(&DownloadRequest::specifiers(["mock"]))
            .unwrap()
            .collect();
        assert!(files.is_empty());

        let first = downloader.download_path().unwrap().to_path_buf();
        assert!(first.is_dir());

        downloader
            .download(&DownloadRequest::manifest("requirements.txt"))
            .unwrap();
        assert_eq!(downloader.download_path().unwrap(), first);

        let calls = downloader.tool().calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c[2] == first.display().to_string()));

        fs::remove_dir_all(first).unwrap();
    }

    #[test]
    fn test_missing_destination_is_created() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("nested").join("packages");
        let mut downloader =
            PackageDownloader::new(RecordingTool::new("23.0", 0), Some(dest.clone()));

        downloader
            .download(&DownloadRequest::specifiers(["mock"]))
            .unwrap();
        assert!(dest.is_dir());

        // Existing directory is fine on the next call too
        downloader
            .download(&DownloadRequest::specifiers(["mock"]))
            .unwrap();
    }

    #[test]
    fn test_existing_destination_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let mut downloader = PackageDownloader::new(
            RecordingTool::new("23.0", 0),
            Some(dir.path().to_path_buf()),
        );

        assert!(downloader
            .download(&DownloadRequest::specifiers(["mock"]))
            .is_ok());
    }

    #[test]
    fn test_destination_that_is_a_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"").unwrap();

        let mut downloader =
            PackageDownloader::new(RecordingTool::new("23.0", 0), Some(file.clone()));
        let err = downloader
            .download(&DownloadRequest::specifiers(["mock"]))
            .unwrap_err();

        match err {
            FetchError::DirectoryCreation { path, .. } => assert_eq!(path, file),
            other => panic!("expected DirectoryCreation, got {other:?}"),
        }
        assert!(downloader.tool().calls().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_destination_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join(OsStr::from_bytes(b"pkgs\xff"));
        let mut downloader =
            PackageDownloader::new(RecordingTool::new("23.0", 0), Some(dest.clone()));

        let err = downloader
            .download(&DownloadRequest::specifiers(["mock"]))
            .unwrap_err();

        assert!(matches!(err, FetchError::InvalidRequest(_)));
        assert!(!dest.exists(), "no directory should be created");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(downloader.tool().calls().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_manifest_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let mut downloader = PackageDownloader::new(
            RecordingTool::new("23.0", 0),
            Some(dir.path().join("packages")),
        );

        let request = DownloadRequest::manifest(OsStr::from_bytes(b"req\xff.txt"));
        let err = downloader.download(&request).unwrap_err();

        assert!(matches!(err, FetchError::InvalidRequest(_)));
        assert!(!dir.path().join("packages").exists());
        assert!(downloader.tool().calls().is_empty());
    }

    #[test]
    fn test_listing_skips_subdirectories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("mock-1.0.tar.gz"), b"sdist").unwrap();
        fs::write(dir.path().join("six-1.16.0.tar.gz"), b"sdist").unwrap();
        fs::create_dir(dir.path().join("build")).unwrap();
        fs::write(dir.path().join("build").join("inner.txt"), b"nested").unwrap();

        let mut files: Vec<_> = DownloadedFiles::new(dir.path()).unwrap().collect();
        files.sort();

        assert_eq!(
            files,
            vec![
                dir.path().join("mock-1.0.tar.gz"),
                dir.path().join("six-1.16.0.tar.gz"),
            ]
        );
    }
}
