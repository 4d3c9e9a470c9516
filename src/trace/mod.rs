
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::Result;
use crate::path::PosixPath;

/// How a traced process accessed a path, as stored in `opened_files.mode`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
    WorkingDir,
}

impl AccessMode {
    pub fn code(self) -> i64 {
        match self {
            AccessMode::Read => 1,
            AccessMode::Write => 2,
            AccessMode::WorkingDir => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(AccessMode::Read),
            2 => Some(AccessMode::Write),
            4 => Some(AccessMode::WorkingDir),
            _ => None,
        }
    }
}

/// Read-only view of a trace record
pub struct TraceDb {
    conn: Connection,
}

impl TraceDb {
    /// Open an existing trace record; never creates or modifies it
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Observations recorded with one of the given access modes
    pub fn opened_files(&self, modes: &[AccessMode]) -> Result<Vec<(PosixPath, AccessMode)>> {
        if modes.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; modes.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT name, mode FROM opened_files WHERE mode IN ({})",
            placeholders
        ))?;

        let rows = stmt
            .query_map(params_from_iter(modes.iter().map(|m| m.code())), |row| {
                let name: String = row.get(0)?;
                let mode: i64 = row.get(1)?;
                Ok((name, mode))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(name, mode)| {
                AccessMode::from_code(mode).map(|m| (PosixPath::new(&name), m))
            })
            .collect())
    }

    /// Directories that must exist in the pack.
    ///
    /// A working directory is needed as-is; a written file needs its parent.
    pub fn required_directories(&self) -> Result<BTreeSet<PosixPath>> {
        let observations = self.opened_files(&[AccessMode::WorkingDir, AccessMode::Write])?;
        Ok(observations
            .into_iter()
            .map(|(path, mode)| match mode {
                AccessMode::WorkingDir => path,
                _ => path.parent(),
            })
            .collect())
    }
}

/// Directories the trace record at `trace` requires; none if there is no record
pub fn list_directories(trace: &Path) -> Result<BTreeSet<PosixPath>> {
    if !trace.is_file() {
        return Ok(BTreeSet::new());
    }
    TraceDb::open(trace)?.required_directories()
}
