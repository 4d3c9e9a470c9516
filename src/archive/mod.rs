
use chrono::{DateTime, Datelike, Local, Timelike};
use std::collections::HashSet;
use std::fs::{self, Metadata, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{PackError, Result};
use crate::path::{data_path, PosixPath};
use crate::report::{PackEvent, Reporter};

/// Writes a pack archive.
///
/// Keeps track of every path already stored under `DATA/` so that adding a
/// file also adds each of its ancestor directories exactly once, parents
/// before children. Directories are always stored on their own, never with
/// their contents.
///
/// [`PackBuilder::close`] consumes the builder; a builder dropped without
/// being closed still gets its archive finalized by the zip writer.
pub struct PackBuilder<'a> {
    zip: ZipWriter<fs::File>,
    target: PathBuf,
    seen: HashSet<PosixPath>,
    entries: usize,
    reporter: &'a dyn Reporter,
}

impl<'a> PackBuilder<'a> {
    /// Create the archive at `target`, which must not exist yet
    pub fn create(target: &Path, reporter: &'a dyn Reporter) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(target)
            .map_err(|err| match err.kind() {
                io::ErrorKind::AlreadyExists => PackError::TargetExists(target.to_path_buf()),
                _ => PackError::io(target)(err),
            })?;

        Ok(Self {
            zip: ZipWriter::new(file),
            target: target.to_path_buf(),
            seen: HashSet::new(),
            entries: 0,
            reporter,
        })
    }

    /// Store a single filesystem object under `archive_name`, unconditionally
    pub fn add(&mut self, source: &Path, archive_name: &str) -> Result<()> {
        let metadata = fs::symlink_metadata(source).map_err(PackError::io(source))?;
        if !self.write_entry(source, &metadata, archive_name)? {
            if let Some(path) = PosixPath::from_std(source) {
                self.reporter.report(PackEvent::UnsupportedFileType { path: &path });
            }
        }
        Ok(())
    }

    /// Store `path` under `DATA/`, along with any ancestor not stored yet.
    ///
    /// Adding the same path twice, or two paths with a common ancestor, never
    /// produces duplicate entries.
    pub fn add_data(&mut self, path: &PosixPath) -> Result<()> {
        if self.seen.contains(path) {
            return Ok(());
        }

        for prefix in path.prefixes() {
            if self.seen.contains(&prefix) {
                continue;
            }

            let archive_name = data_path(&prefix);
            self.reporter.report(PackEvent::EntryAdded {
                source: &prefix,
                archive_name: &archive_name,
            });

            let metadata = fs::symlink_metadata(prefix.as_std()).map_err(PackError::io(prefix.as_std()))?;
            if !self.write_entry(prefix.as_std(), &metadata, &archive_name)? {
                self.reporter
                    .report(PackEvent::UnsupportedFileType { path: &prefix });
            }
            self.seen.insert(prefix);
        }
        Ok(())
    }

    /// Paths stored under `DATA/` so far
    pub fn seen(&self) -> &HashSet<PosixPath> {
        &self.seen
    }

    /// Entries written so far, metadata included
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Finalize the archive, returning the number of entries written
    pub fn close(self) -> Result<usize> {
        let file = self.zip.finish()?;
        file.sync_all().map_err(PackError::io(&self.target))?;
        Ok(self.entries)
    }

    /// Write one non-recursive entry. Returns `false` for objects a zip
    /// archive can't represent (sockets, FIFOs, device nodes).
    fn write_entry(&mut self, source: &Path, metadata: &Metadata, archive_name: &str) -> Result<bool> {
        let options = entry_options(metadata);
        let file_type = metadata.file_type();

        if file_type.is_symlink() {
            let target = fs::read_link(source).map_err(PackError::io(source))?;
            self.zip
                .add_symlink(archive_name, target.to_string_lossy(), options)?;
        } else if file_type.is_dir() {
            self.zip.add_directory(format!("{}/", archive_name), options)?;
        } else if file_type.is_file() {
            let mut input = fs::File::open(source).map_err(PackError::io(source))?;
            self.zip
                .start_file(archive_name, options.large_file(metadata.len() >= u32::MAX as u64))?;
            io::copy(&mut input, &mut self.zip).map_err(PackError::io(source))?;
        } else {
            return Ok(false);
        }

        self.entries += 1;
        Ok(true)
    }
}

fn entry_options(metadata: &Metadata) -> SimpleFileOptions {
    let mut options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    if let Ok(modified) = metadata.modified() {
        let modified: DateTime<Local> = modified.into();
        if let Ok(time) = zip::DateTime::from_date_and_time(
            modified.year().clamp(1980, 2107) as u16,
            modified.month() as u8,
            modified.day() as u8,
            modified.hour() as u8,
            modified.minute() as u8,
            modified.second() as u8,
        ) {
            options = options.last_modified_time(time);
        }
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        options = options.unix_permissions(metadata.permissions().mode() & 0o7777);
    }

    options
}
