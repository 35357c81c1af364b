use crate::error::{FetchError, Result};
use crate::tool::{PackageTool, ToolVersion};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use subprocess::{Exec, ExitStatus, Redirection};

#[cfg(target_os = "windows")]
const PIP_CANDIDATES: &[&str] = &["pip"];

#[cfg(not(target_os = "windows"))]
const PIP_CANDIDATES: &[&str] = &["pip3", "pip"];

#[cfg(target_os = "windows")]
const PYTHON_CANDIDATES: &[&str] = &["python"];

#[cfg(not(target_os = "windows"))]
const PYTHON_CANDIDATES: &[&str] = &["python3", "python"];

/// pip, run as a child process
///
/// Either a pip executable (`pip`, `pip3`, an absolute path) or a Python
/// interpreter running `python -m pip`. The version is queried at most once
/// per instance.
#[derive(Debug)]
pub struct Pip {
    program: PathBuf,
    prefix_args: Vec<String>,
    name: String,
    version: OnceLock<ToolVersion>,
}

impl Pip {
    /// Use a pip executable, looked up in PATH if not a path
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program.display().to_string();
        Self::with_prefix(program, Vec::new(), name)
    }

    /// Run pip through a Python interpreter as `python -m pip`
    pub fn from_python(python: impl Into<PathBuf>) -> Self {
        let python = python.into();
        let name = format!("{} -m pip", python.display());
        Self::with_prefix(python, vec!["-m".to_string(), "pip".to_string()], name)
    }

    /// Run `program` with `prefix_args` ahead of the pip arguments, e.g. `py -3 -m pip`
    pub fn with_args<I, S>(program: impl Into<PathBuf>, prefix_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let program = program.into();
        let prefix_args: Vec<String> = prefix_args.into_iter().map(Into::into).collect();
        let name = std::iter::once(program.display().to_string())
            .chain(prefix_args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        Self::with_prefix(program, prefix_args, name)
    }

    fn with_prefix(program: PathBuf, prefix_args: Vec<String>, name: String) -> Self {
        Self {
            program,
            prefix_args,
            name,
            version: OnceLock::new(),
        }
    }

    /// Find pip in PATH
    ///
    /// Tries the pip executables first, then `python -m pip` for each
    /// Python interpreter found.
    ///
    /// # Errors
    /// Returns `ToolNotFound` if neither pip nor Python is in PATH
    pub fn discover() -> Result<Self> {
        for candidate in PIP_CANDIDATES {
            if let Ok(path) = which::which(candidate) {
                tracing::debug!("Found pip at {}", path.display());
                return Ok(Self::new(path));
            }
        }

        for candidate in PYTHON_CANDIDATES {
            if let Ok(path) = which::which(candidate) {
                tracing::debug!("Falling back to {} -m pip", path.display());
                return Ok(Self::from_python(path));
            }
        }

        let tried = PIP_CANDIDATES
            .iter()
            .chain(PYTHON_CANDIDATES)
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        Err(FetchError::ToolNotFound(format!(
            "no pip or python in PATH (tried: {tried})"
        )))
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self) -> Exec {
        Exec::cmd(&self.program).args(self.prefix_args.as_slice())
    }

    fn launch_error(&self, source: subprocess::PopenError) -> FetchError {
        FetchError::ToolLaunch {
            program: self.name.clone(),
            source,
        }
    }
}

impl PackageTool for Pip {
    fn version(&self) -> Result<ToolVersion> {
        if let Some(version) = self.version.get() {
            return Ok(version.clone());
        }

        let capture = self
            .command()
            .arg("--version")
            .stdout(Redirection::Pipe)
            .stderr(Redirection::Pipe)
            .capture()
            .map_err(|e| self.launch_error(e))?;

        if !capture.success() {
            return Err(FetchError::VersionDetection(format!(
                "`{} --version` exited with {}: {}",
                self.name,
                status_code(capture.exit_status),
                capture.stderr_str().trim()
            )));
        }

        let version = ToolVersion::parse(&capture.stdout_str())?;
        tracing::debug!("Detected {} version {version}", self.name);

        // A concurrent caller may have won the race; both parsed the same output
        let _ = self.version.set(version.clone());
        Ok(version)
    }

    /// Run pip with inherited stderr; its stdout is merged into stderr
    fn run(&self, args: &[String]) -> Result<i32> {
        tracing::debug!("Running {} {}", self.name, args.join(" "));

        // pip's progress output goes to stderr, keeping our stdout for results
        let status = self
            .command()
            .args(args)
            .stdout(Redirection::Merge)
            .join()
            .map_err(|e| self.launch_error(e))?;

        Ok(status_code(status))
    }

    fn tool_name(&self) -> &str {
        &self.name
    }
}

/// Flatten a child exit status to a single integer
///
/// Normal exits keep their code, death by signal `s` becomes `-s`.
#[allow(clippy::cast_possible_wrap)]
fn status_code(status: ExitStatus) -> i32 {
    match status {
        ExitStatus::Exited(code) => code as i32,
        ExitStatus::Signaled(signal) => -i32::from(signal),
        ExitStatus::Other(code) => code,
        ExitStatus::Undetermined => -1,
    }
}
