//! Logging capability handed to the packing pipeline.
//!
//! Nothing in the core logs through a global; callers pass a [`Reporter`] and
//! decide where events go. The binary uses [`TracingReporter`], tests use
//! [`RecordingReporter`].

use std::cell::RefCell;
use std::fmt;
use std::path::Path;

use tracing::Level;

use crate::path::PosixPath;

/// Something noteworthy that happened while packing
#[derive(Debug, Clone, Copy)]
pub enum PackEvent<'a> {
    CreatingPack { target: &'a Path },
    TraceStored { source: &'a Path },
    AddingPackageFiles { package: &'a str },
    SkippingPackageFiles { package: &'a str },
    AddingOtherFiles,
    MissingFile { path: &'a PosixPath, package: Option<&'a str> },
    MissingDirectory { path: &'a PosixPath },
    EntryAdded { source: &'a PosixPath, archive_name: &'a str },
    UnsupportedFileType { path: &'a PosixPath },
    UnreadablePath { path: &'a Path, reason: &'a str },
    PatternsExpanded { patterns: usize, files: usize },
    PackagesIdentified { packages: usize, files: usize },
    PackageDatabaseMissing { path: &'a Path },
    AddingMetadata,
}

impl PackEvent<'_> {
    pub fn level(&self) -> Level {
        match self {
            PackEvent::MissingFile { .. }
            | PackEvent::UnsupportedFileType { .. }
            | PackEvent::UnreadablePath { .. }
            | PackEvent::PackageDatabaseMissing { .. } => Level::WARN,
            PackEvent::MissingDirectory { .. } | PackEvent::EntryAdded { .. } => Level::DEBUG,
            _ => Level::INFO,
        }
    }
}

impl fmt::Display for PackEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackEvent::CreatingPack { target } => write!(f, "Creating pack {}...", target.display()),
            PackEvent::TraceStored { source } => {
                write!(f, "Storing trace record {}", source.display())
            }
            PackEvent::AddingPackageFiles { package } => {
                write!(f, "Adding files from package {}...", package)
            }
            PackEvent::SkippingPackageFiles { package } => {
                write!(f, "NOT adding files from package {}", package)
            }
            PackEvent::AddingOtherFiles => f.write_str("Adding other files..."),
            PackEvent::MissingFile {
                path,
                package: Some(package),
            } => write!(f, "Missing file {} from package {}", path, package),
            PackEvent::MissingFile { path, package: None } => write!(f, "Missing file {}", path),
            PackEvent::MissingDirectory { path } => {
                write!(f, "Directory {} no longer exists, skipping", path)
            }
            PackEvent::EntryAdded {
                source,
                archive_name,
            } => write!(f, "{} -> {}", source, archive_name),
            PackEvent::UnsupportedFileType { path } => {
                write!(f, "Not packing {}: unsupported file type", path)
            }
            PackEvent::UnreadablePath { path, reason } => {
                write!(f, "Can't read {}: {}", path.display(), reason)
            }
            PackEvent::PatternsExpanded { patterns, files } => write!(
                f,
                "Expanded {} additional pattern(s) into {} path(s)",
                patterns, files
            ),
            PackEvent::PackagesIdentified { packages, files } => write!(
                f,
                "Identified {} package(s), {} file(s) left unattributed",
                packages, files
            ),
            PackEvent::PackageDatabaseMissing { path } => write!(
                f,
                "No dpkg database at {}, files will not be attributed to packages",
                path.display()
            ),
            PackEvent::AddingMetadata => f.write_str("Adding metadata..."),
        }
    }
}

pub trait Reporter {
    fn report(&self, event: PackEvent<'_>);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: PackEvent<'_>) {
        match event {
            PackEvent::MissingFile { path, package } => {
                tracing::warn!(path = %path, package = package.unwrap_or(""), "{}", event)
            }
            PackEvent::EntryAdded {
                source,
                archive_name,
            } => tracing::debug!(source = %source, archive_name, "{}", event),
            _ => {
                let level = event.level();
                if level == Level::WARN {
                    tracing::warn!("{}", event)
                } else if level == Level::DEBUG {
                    tracing::debug!("{}", event)
                } else {
                    tracing::info!("{}", event)
                }
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingReporter {
    records: RefCell<Vec<(Level, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Level, String)> {
        self.records.borrow().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.records
            .borrow()
            .iter()
            .filter(|(level, _)| *level == Level::WARN)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: PackEvent<'_>) {
        self.records
            .borrow_mut()
            .push((event.level(), event.to_string()));
    }
}
