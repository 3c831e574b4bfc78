use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// The directory + file name pair under observation.
///
/// Notifications are subscribed on `directory`; events are matched against
/// `file_name` by base name only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    directory: PathBuf,
    file_name: OsString,
}

impl WatchTarget {
    /// Splits `path` into its containing directory and base file name.
    /// A bare file name is watched in the current directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .with_context(|| format!("Path has no file name: {}", path.display()))?
            .to_os_string();
        let directory = match path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(Self { directory, file_name })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn file_name(&self) -> &OsStr {
        &self.file_name
    }

    /// Full path of the watched file.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    pub fn matches(&self, name: &OsStr) -> bool {
        name == self.file_name
    }
}

/// Name of the processes to terminate, compared exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSelector(String);

impl ProcessSelector {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}
