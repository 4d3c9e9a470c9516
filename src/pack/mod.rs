mod tests;

use std::io::Write;
use std::path::Path;

use crate::archive::PackBuilder;
use crate::config::{load_config, render_config, LoadedConfig};
use crate::error::{PackError, Result};
use crate::merge::merge_files;
use crate::model::{File, Manifest};
use crate::packages::PackageIdentifier;
use crate::patterns::expand_patterns;
use crate::report::{PackEvent, Reporter};
use crate::trace::list_directories;

pub const CONFIG_FILE: &str = "config.yml";
pub const TRACE_FILE: &str = "trace.sqlite3";

pub const METADATA_TRACE: &str = "METADATA/trace.sqlite3";
pub const METADATA_VERSION: &str = "METADATA/version";
pub const METADATA_CONFIG: &str = "METADATA/config.yml";

/// Pack format marker stored in `METADATA/version`
pub const FORMAT_MARKER: &str = "REPROZIP VERSION 1\n";

/// What to pack, and how
pub struct PackRequest<'a> {
    /// Archive to create; must not exist
    pub target: &'a Path,
    /// Directory holding `config.yml` and optionally `trace.sqlite3`
    pub directory: &'a Path,
    /// Attributes pattern-matched files to packages; `None` keeps them loose
    pub identifier: Option<&'a dyn PackageIdentifier>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackSummary {
    /// Archive entries, metadata included
    pub entries: usize,
    pub files_packed: usize,
    /// Files listed in the configuration but gone from disk
    pub files_missing: usize,
    /// Directories from the trace record present in the pack
    pub directories: usize,
    /// The manifest stored in the pack
    pub manifest: Manifest,
}

/// Expand the additional patterns and fold the results into the manifest
pub fn canonicalize_config(
    config: LoadedConfig,
    identifier: Option<&dyn PackageIdentifier>,
    reporter: &dyn Reporter,
) -> Result<Manifest> {
    let LoadedConfig {
        manifest,
        additional_patterns,
        ..
    } = config;

    let add_files = expand_patterns(&additional_patterns, reporter)?;
    let (add_files, add_packages) = match identifier {
        Some(identifier) => {
            let (files, packages) = identifier.identify(add_files, reporter)?;
            reporter.report(PackEvent::PackagesIdentified {
                packages: packages.len(),
                files: files.len(),
            });
            (files, packages)
        }
        None => (add_files, Vec::new()),
    };

    let (other_files, packages) =
        merge_files(add_files, add_packages, manifest.other_files, manifest.packages);
    Ok(Manifest {
        runs: manifest.runs,
        packages,
        other_files,
    })
}

/// Build the pack described by `request`.
///
/// Fails before touching anything if the target exists or there is no
/// configuration. Files that disappeared since tracing are reported and left
/// out of both the archive and the stored manifest.
pub fn pack(request: &PackRequest<'_>, reporter: &dyn Reporter) -> Result<PackSummary> {
    // Don't overwrite packs
    if request.target.exists() {
        return Err(PackError::TargetExists(request.target.to_path_buf()));
    }

    let config_file = request.directory.join(CONFIG_FILE);
    if !config_file.is_file() {
        return Err(PackError::MissingConfig(config_file));
    }
    let config = load_config(&config_file)?;
    let mut manifest = canonicalize_config(config, request.identifier, reporter)?;

    reporter.report(PackEvent::CreatingPack {
        target: request.target,
    });
    let mut builder = PackBuilder::create(request.target, reporter)?;
    let mut summary = PackSummary::default();

    let trace = request.directory.join(TRACE_FILE);
    if trace.is_file() {
        reporter.report(PackEvent::TraceStored { source: &trace });
        builder.add(&trace, METADATA_TRACE)?;
    }

    for package in &mut manifest.packages {
        if !package.packfiles {
            reporter.report(PackEvent::SkippingPackageFiles {
                package: &package.name,
            });
            continue;
        }
        reporter.report(PackEvent::AddingPackageFiles {
            package: &package.name,
        });
        let files = std::mem::take(&mut package.files);
        package.files = pack_files(&mut builder, files, Some(&package.name), reporter, &mut summary)?;
    }

    reporter.report(PackEvent::AddingOtherFiles);
    let other_files = std::mem::take(&mut manifest.other_files);
    manifest.other_files = pack_files(&mut builder, other_files, None, reporter, &mut summary)?;

    // Empty directories are not implied by file entries, so working
    // directories need explicit entries
    for directory in list_directories(&trace)? {
        if directory.as_std().is_dir() {
            builder.add_data(&directory)?;
            summary.directories += 1;
        } else {
            reporter.report(PackEvent::MissingDirectory { path: &directory });
        }
    }

    reporter.report(PackEvent::AddingMetadata);
    add_generated(&mut builder, "reprozip_version_", ".txt", FORMAT_MARKER, METADATA_VERSION)?;
    add_generated(
        &mut builder,
        "rpz_config_",
        ".yml",
        &render_config(&manifest)?,
        METADATA_CONFIG,
    )?;

    summary.entries = builder.close()?;
    summary.manifest = manifest;
    Ok(summary)
}

/// Pack each file still present, returning those that were packed
fn pack_files(
    builder: &mut PackBuilder<'_>,
    files: Vec<File>,
    package: Option<&str>,
    reporter: &dyn Reporter,
    summary: &mut PackSummary,
) -> Result<Vec<File>> {
    let mut kept = Vec::with_capacity(files.len());
    for file in files {
        if !file.exists() {
            reporter.report(PackEvent::MissingFile {
                path: &file.path,
                package,
            });
            summary.files_missing += 1;
            continue;
        }
        builder.add_data(&file.path)?;
        summary.files_packed += 1;
        kept.push(file);
    }
    Ok(kept)
}

/// Store generated text through a temporary file, removed on every exit path
fn add_generated(
    builder: &mut PackBuilder<'_>,
    prefix: &str,
    suffix: &str,
    content: &str,
    archive_name: &str,
) -> Result<()> {
    let mut temp = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile()
        .map_err(PackError::io(std::env::temp_dir()))?;
    temp.write_all(content.as_bytes())
        .and_then(|_| temp.flush())
        .map_err(PackError::io(temp.path()))?;
    builder.add(temp.path(), archive_name)
}
