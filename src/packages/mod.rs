mod dpkg;

pub use dpkg::{DpkgIdentifier, DEFAULT_ADMIN_DIR};

use crate::error::Result;
use crate::model::{File, Package};
use crate::report::Reporter;

/// Classifies files as belonging to installed software packages
pub trait PackageIdentifier {
    /// Split `files` into those no package owns and the packages owning the
    /// rest. Each input file is returned exactly once.
    ///
    /// A missing package database is reported and leaves every file loose.
    fn identify(
        &self,
        files: Vec<File>,
        reporter: &dyn Reporter,
    ) -> Result<(Vec<File>, Vec<Package>)>;
}

/// Attributes nothing; every file stays loose
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPackages;

impl PackageIdentifier for NoPackages {
    fn identify(&self, files: Vec<File>, _: &dyn Reporter) -> Result<(Vec<File>, Vec<Package>)> {
        Ok((files, Vec::new()))
    }
}
