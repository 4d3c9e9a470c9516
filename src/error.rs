use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackError {
    #[error("Target file exists: {}", .0.display())]
    TargetExists(PathBuf),

    #[error(
        "Configuration file does not exist: {}\n\
         Did you forget to run 'reprozip trace'?\n\
         If not, you might want to use --dir to specify an alternate location.",
        .0.display()
    )]
    MissingConfig(PathBuf),

    #[error("Invalid configuration file {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Failed to render configuration: {0}")]
    Render(#[source] serde_yaml_ng::Error),

    #[error("Invalid file pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: ignore::Error,
    },

    #[error("Failed to read trace record: {0}")]
    Trace(#[from] rusqlite::Error),

    #[error("Failed to write archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PackError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| PackError::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, PackError>;
