// Public API exports
pub mod archive;
pub mod config;
pub mod error;
pub mod merge;
pub mod model;
pub mod pack;
pub mod packages;
pub mod path;
pub mod patterns;
pub mod report;
pub mod trace;

// Re-export main types for convenience
pub use archive::PackBuilder;
pub use config::{load_config, render_config, save_config, LoadedConfig};
pub use error::{PackError, Result};
pub use merge::merge_files;
pub use model::{File, Manifest, Package};
pub use pack::{canonicalize_config, pack, PackRequest, PackSummary};
pub use packages::{DpkgIdentifier, NoPackages, PackageIdentifier};
pub use path::{data_path, PosixPath};
pub use patterns::expand_patterns;
pub use report::{PackEvent, RecordingReporter, Reporter, TracingReporter};
pub use trace::{list_directories, AccessMode, TraceDb};
