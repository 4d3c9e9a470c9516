
use serde::{Deserialize, Deserializer};
use std::cmp::Ordering;
use std::fs;
use std::hash::{Hash, Hasher};

use crate::path::PosixPath;

/// A file used at some point during the traced execution.
///
/// Identity is the path alone: two values with the same path are equal no
/// matter when (or whether) their size was sampled.
#[derive(Debug, Clone)]
pub struct File {
    pub path: PosixPath,
    /// Size on disk when observed, `None` if the file was gone
    pub size: Option<u64>,
}

impl File {
    /// Create a file entry, sampling its size from disk
    pub fn new(path: impl Into<PosixPath>) -> Self {
        let path = path.into();
        let size = fs::metadata(path.as_std()).ok().map(|m| m.len());
        Self { path, size }
    }

    pub fn with_size(path: impl Into<PosixPath>, size: Option<u64>) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }

    /// Whether the file is still present (symbolic links are not followed)
    pub fn exists(&self) -> bool {
        fs::symlink_metadata(self.path.as_std()).is_ok()
    }
}

impl PartialEq for File {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for File {}

impl Hash for File {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl PartialOrd for File {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for File {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path)
    }
}

impl<'de> Deserialize<'de> for File {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let path = PosixPath::deserialize(deserializer)?;
        Ok(File::new(path))
    }
}

/// An installed software package and the files it contributed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Package {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub files: Vec<File>,
    /// Whether the files are copied into the pack, or expected to be
    /// reinstalled from the package at unpack time
    #[serde(default = "default_packfiles")]
    pub packfiles: bool,
    /// Installed size as reported by the package manager
    #[serde(default)]
    pub size: Option<u64>,
}

fn default_packfiles() -> bool {
    true
}

impl Package {
    pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            version,
            files: Vec::new(),
            packfiles: true,
            size: None,
        }
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    pub fn with_packfiles(mut self, packfiles: bool) -> Self {
        self.packfiles = packfiles;
        self
    }

    pub fn add_file(&mut self, file: File) {
        self.files.push(file);
    }

    /// Sum of the known sizes of the files used from this package
    pub fn files_size(&self) -> u64 {
        self.files.iter().filter_map(|f| f.size).sum()
    }
}

/// Canonical description of what goes into a pack.
///
/// After merging, a given path appears at most once across all packages and
/// `other_files`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    /// Run descriptions, passed through untouched
    pub runs: Vec<serde_yaml_ng::Value>,
    pub packages: Vec<Package>,
    pub other_files: Vec<File>,
}

impl Manifest {
    /// Total number of files across packages and loose files
    pub fn file_count(&self) -> usize {
        self.packages.iter().map(|p| p.files.len()).sum::<usize>() + self.other_files.len()
    }
}
