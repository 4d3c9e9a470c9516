use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PackError, Result};
use crate::model::{File, Package};
use crate::packages::PackageIdentifier;
use crate::report::{PackEvent, Reporter};

pub const DEFAULT_ADMIN_DIR: &str = "/var/lib/dpkg";

/// Identifies Debian packages from the dpkg database.
///
/// Reads the per-package file lists in `<admin>/info/*.list` and the version
/// and installed size from `<admin>/status`. Directories are never attributed,
/// since dpkg lists the same directory under many packages.
#[derive(Debug, Clone)]
pub struct DpkgIdentifier {
    admin_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PackageInfo {
    pub version: Option<String>,
    /// Bytes
    pub installed_size: Option<u64>,
}

impl DpkgIdentifier {
    pub fn new(admin_dir: impl Into<PathBuf>) -> Self {
        Self {
            admin_dir: admin_dir.into(),
        }
    }

    /// Map of every path listed by an installed package to its owner, or
    /// `None` if there is no database at all
    fn file_owners(&self) -> Result<Option<HashMap<String, String>>> {
        let info_dir = self.admin_dir.join("info");
        let mut owners = HashMap::new();

        let entries = match fs::read_dir(&info_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(PackError::io(&info_dir)(err)),
        };
        let mut lists: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(PackError::io(&info_dir))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "list") {
                lists.push(path);
            }
        }
        // First owner wins, in a stable order
        lists.sort();

        for list in lists {
            let Some(stem) = list.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let name = stem.split(':').next().unwrap_or(stem).to_string();
            let content = fs::read_to_string(&list).map_err(PackError::io(&list))?;
            for line in content.lines().map(str::trim) {
                if line.starts_with('/') && line != "/." {
                    owners.entry(line.to_string()).or_insert_with(|| name.clone());
                }
            }
        }
        Ok(Some(owners))
    }

    fn status(&self) -> Result<HashMap<String, PackageInfo>> {
        let status = self.admin_dir.join("status");
        match fs::read_to_string(&status) {
            Ok(content) => Ok(parse_status(&content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(PackError::io(&status)(err)),
        }
    }
}

impl Default for DpkgIdentifier {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_DIR)
    }
}

impl PackageIdentifier for DpkgIdentifier {
    fn identify(
        &self,
        files: Vec<File>,
        reporter: &dyn Reporter,
    ) -> Result<(Vec<File>, Vec<Package>)> {
        if files.is_empty() {
            return Ok((files, Vec::new()));
        }

        // Not a dpkg system
        let Some(owners) = self.file_owners()? else {
            reporter.report(PackEvent::PackageDatabaseMissing {
                path: &self.admin_dir,
            });
            return Ok((files, Vec::new()));
        };
        let status = self.status()?;

        let mut loose = Vec::new();
        let mut packages: BTreeMap<String, Package> = BTreeMap::new();
        for file in files {
            let owner = owners.get(file.path.as_str());
            match owner {
                Some(name) if !is_dir(file.path.as_std()) => {
                    let package = packages.entry(name.clone()).or_insert_with(|| {
                        let info = status.get(name);
                        Package::new(name.clone(), info.and_then(|i| i.version.clone()))
                            .with_size(info.and_then(|i| i.installed_size))
                    });
                    package.add_file(file);
                }
                _ => loose.push(file),
            }
        }

        Ok((loose, packages.into_values().collect()))
    }
}

fn is_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.is_dir())
}

/// Parse the stanzas of a dpkg `status` file, keeping installed packages only
pub(crate) fn parse_status(content: &str) -> HashMap<String, PackageInfo> {
    let mut packages = HashMap::new();

    for stanza in content.split("\n\n") {
        let mut name = None;
        let mut info = PackageInfo {
            version: None,
            installed_size: None,
        };
        let mut installed = false;

        for line in stanza.lines() {
            // Continuation lines belong to multi-line fields we don't need
            if line.starts_with(' ') || line.starts_with('\t') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key {
                "Package" => name = Some(value.to_string()),
                "Version" => info.version = Some(value.to_string()),
                "Installed-Size" => {
                    info.installed_size = value.parse::<u64>().ok().map(|kib| kib * 1024)
                }
                "Status" => installed = value.ends_with(" installed"),
                _ => {}
            }
        }

        if let (Some(name), true) = (name, installed) {
            packages.insert(name, info);
        }
    }
    packages
}
