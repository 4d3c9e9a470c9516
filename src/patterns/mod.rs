
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::collections::BTreeSet;
use walkdir::WalkDir;

use crate::error::{PackError, Result};
use crate::model::File;
use crate::path::PosixPath;
use crate::report::{PackEvent, Reporter};

const GLOB_CHARS: &[char] = &['*', '?', '[', ']', '{', '}', '\\', '!'];

/// Expand path patterns into the files and directories to pack.
///
/// Every matched object is represented once. A matched directory is only kept
/// when nothing else matched below it: the archive builder adds directories
/// non-recursively, so listing it next to its own contents would be redundant.
/// The root is never returned.
pub fn expand_patterns(patterns: &[String], reporter: &dyn Reporter) -> Result<Vec<File>> {
    let mut files = BTreeSet::new();
    let mut dirs = BTreeSet::new();

    for pattern in patterns {
        let matcher = compile(pattern)?;
        let start = walk_start(pattern);

        for entry in WalkDir::new(start.as_std()).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    // The starting point itself not existing just means no match
                    if err.depth() > 0 {
                        let reason = err.to_string();
                        let path = err.path().unwrap_or_else(|| start.as_std());
                        reporter.report(PackEvent::UnreadablePath {
                            path,
                            reason: &reason,
                        });
                    }
                    continue;
                }
            };

            let Some(path) = PosixPath::from_std(entry.path()) else {
                reporter.report(PackEvent::UnreadablePath {
                    path: entry.path(),
                    reason: "name is not valid UTF-8",
                });
                continue;
            };
            if path.is_root() {
                continue;
            }

            let is_dir = entry.file_type().is_dir();
            if matcher.matched(path.as_std(), is_dir).is_ignore() {
                if is_dir {
                    dirs.insert(path);
                } else {
                    files.insert(path);
                }
            }
        }
    }

    let mut non_empty_dirs: BTreeSet<PosixPath> = BTreeSet::new();
    non_empty_dirs.insert(PosixPath::root());
    for path in files.iter().chain(dirs.iter()) {
        non_empty_dirs.extend(path.ancestors());
    }

    let result: Vec<File> = dirs
        .difference(&non_empty_dirs)
        .chain(files.iter())
        .map(|path| File::new(path.clone()))
        .collect();

    reporter.report(PackEvent::PatternsExpanded {
        patterns: patterns.len(),
        files: result.len(),
    });
    Ok(result)
}

/// Build a matcher for one pattern, using gitignore globbing rooted at `/`
fn compile(pattern: &str) -> Result<Gitignore> {
    let to_error = |source| PackError::Pattern {
        pattern: pattern.to_string(),
        source,
    };

    let mut builder = GitignoreBuilder::new("/");
    builder.add_line(None, pattern).map_err(to_error)?;
    builder.build().map_err(to_error)
}

/// Deepest directory that contains every possible match of `pattern`.
///
/// Patterns without a slash (other than a trailing one) match a base name
/// anywhere, so they have to be searched from the root.
fn walk_start(pattern: &str) -> PosixPath {
    let trimmed = pattern.trim_end_matches('/');
    if !trimmed.contains('/') {
        return PosixPath::root();
    }

    let mut start = PosixPath::root();
    for component in trimmed.split('/').filter(|c| !c.is_empty()) {
        if component.contains(GLOB_CHARS) {
            break;
        }
        start = start.join(component);
    }
    start
}
