use crate::error::{FetchError, Result};
use std::cmp::Ordering;
use std::fmt;

/// Release number reported by a package tool
///
/// Only the numeric release segments and whether the version is a
/// pre-release are kept. Missing trailing segments compare as zero, so
/// `8` == `8.0.0`, and a pre-release sorts before its final release.
#[derive(Debug, Clone)]
pub struct ToolVersion {
    release: Vec<u64>,
    pre_release: bool,
    raw: String,
}

impl ToolVersion {
    /// Build a final-release version from numeric segments
    #[must_use]
    pub fn from_release(release: &[u64]) -> Self {
        let raw = release
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        Self {
            release: release.to_vec(),
            pre_release: false,
            raw,
        }
    }

    /// Parse a bare version (`"23.3.1"`) or full `--version` output
    /// (`"pip 23.3.1 from /usr/lib/python3/dist-packages/pip (python 3.11)"`)
    ///
    /// The first whitespace-separated word starting with a digit is taken as the version.
    pub fn parse(output: &str) -> Result<Self> {
        let word = output
            .split_whitespace()
            .find(|w| w.starts_with(|c: char| c.is_ascii_digit()))
            .ok_or_else(|| {
                FetchError::VersionDetection(format!("no version number in {:?}", output.trim()))
            })?;

        // Local version labels (`+ubuntu1`) don't affect ordering here
        let public = word.split('+').next().unwrap_or(word);

        let mut release = Vec::new();
        let mut pre_release = false;

        for segment in public.split('.') {
            let digits_len = segment
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(segment.len());
            let (digits, suffix) = segment.split_at(digits_len);

            if digits.is_empty() {
                // `.dev0` / `.post1` after the release segments
                pre_release = is_pre_release_tag(suffix);
                break;
            }

            let number = digits.parse::<u64>().map_err(|e| {
                FetchError::VersionDetection(format!("bad version segment {segment:?}: {e}"))
            })?;
            release.push(number);

            if !suffix.is_empty() {
                pre_release = is_pre_release_tag(suffix);
                break;
            }
        }

        Ok(Self {
            release,
            pre_release,
            raw: public.to_string(),
        })
    }

    #[must_use]
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    #[must_use]
    pub const fn is_pre_release(&self) -> bool {
        self.pre_release
    }
}

fn is_pre_release_tag(tag: &str) -> bool {
    let tag = tag.trim_start_matches(['-', '_', '.']).to_ascii_lowercase();
    if tag.starts_with("post") || (tag.starts_with('r') && !tag.starts_with("rc")) {
        return false;
    }
    ["a", "b", "c", "rc", "pre", "dev"]
        .iter()
        .any(|p| tag.starts_with(p))
}

impl Ord for ToolVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        for i in 0..len {
            let a = self.release.get(i).copied().unwrap_or(0);
            let b = other.release.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                non_eq => return non_eq,
            }
        }
        // Final releases sort after their pre-releases
        other.pre_release.cmp(&self.pre_release)
    }
}

impl PartialOrd for ToolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ToolVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ToolVersion {}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
