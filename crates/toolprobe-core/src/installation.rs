//! Installation descriptors and detection outcomes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A validated tool installation rooted at one directory
///
/// Every entry in `executables` pointed at an existing file when the
/// descriptor was built, and `home` (if set) at an existing directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    /// Installation root
    pub path: PathBuf,

    /// User data directory of the tool, if one exists
    pub home: Option<PathBuf>,

    /// Logical executable name -> absolute file path
    pub executables: BTreeMap<String, PathBuf>,

    /// Tool version, when the installation records one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Installation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            home: None,
            executables: BTreeMap::new(),
            version: None,
        }
    }

    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn with_executable(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.executables.insert(name.into(), path.into());
        self
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    /// Path of a named executable
    pub fn executable(&self, name: &str) -> Option<&Path> {
        self.executables.get(name).map(PathBuf::as_path)
    }
}

/// Outcome of one detection pass
///
/// An ordered list of installations in candidate order. Single-result
/// detections hold at most one entry; "none" is the empty detection.
/// Cloning shares the underlying list, which lets callers tell a cached
/// answer apart from a fresh scan with [`Detection::same_as`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    installations: Arc<Vec<Installation>>,
}

impl Detection {
    /// The empty detection
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(installation: Installation) -> Self {
        Self::from(vec![installation])
    }

    /// First installation found, in candidate order
    pub fn first(&self) -> Option<&Installation> {
        self.installations.first()
    }

    pub fn all(&self) -> &[Installation] {
        &self.installations
    }

    pub fn is_none(&self) -> bool {
        self.installations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.installations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installations.is_empty()
    }

    /// True when both values come from the same detection pass
    pub fn same_as(&self, other: &Detection) -> bool {
        Arc::ptr_eq(&self.installations, &other.installations)
    }
}

impl From<Vec<Installation>> for Detection {
    fn from(installations: Vec<Installation>) -> Self {
        Self {
            installations: Arc::new(installations),
        }
    }
}
