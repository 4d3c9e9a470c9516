
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::model::{File, Package};
use crate::path::PosixPath;

/// Merge newly discovered files into an existing set of loose files and
/// packages.
///
/// Every input file ends up exactly once in the output. A file attributed to
/// a package by either side stays in a package; when packages disagree, the
/// package whose name sorts first keeps it. Packages with the same name are
/// combined, the existing package's metadata winning. Output is sorted, so
/// the order files were discovered in doesn't matter.
pub fn merge_files(
    new_files: Vec<File>,
    new_packages: Vec<Package>,
    other_files: Vec<File>,
    packages: Vec<Package>,
) -> (Vec<File>, Vec<Package>) {
    let mut by_name: BTreeMap<String, Package> = BTreeMap::new();

    for package in packages.into_iter().chain(new_packages) {
        match by_name.get_mut(&package.name) {
            Some(existing) => {
                if existing.version.is_none() {
                    existing.version = package.version;
                }
                if existing.size.is_none() {
                    existing.size = package.size;
                }
                existing.files.extend(package.files);
            }
            None => {
                by_name.insert(package.name.clone(), package);
            }
        }
    }

    let mut claimed: HashSet<PosixPath> = HashSet::new();
    let mut merged = Vec::with_capacity(by_name.len());
    for (_, mut package) in by_name {
        let files: BTreeSet<File> = package
            .files
            .drain(..)
            .filter(|f| !claimed.contains(&f.path))
            .collect();
        claimed.extend(files.iter().map(|f| f.path.clone()));
        package.files = files.into_iter().collect();
        merged.push(package);
    }

    let loose: BTreeSet<File> = other_files
        .into_iter()
        .chain(new_files)
        .filter(|f| !claimed.contains(&f.path))
        .collect();

    (loose.into_iter().collect(), merged)
}
