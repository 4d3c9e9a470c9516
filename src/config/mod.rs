mod emit;

pub use emit::{hsize, YamlWrite};

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{PackError, Result};
use crate::model::{File, Manifest, Package};

/// Configuration as written by the tracer and possibly edited by the user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedConfig {
    /// Version of the program that wrote the file, if recorded
    pub version: Option<String>,
    pub manifest: Manifest,
    /// Extra paths to pack, as glob patterns; expanded during canonicalization
    pub additional_patterns: Vec<String>,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    version: Option<serde_yaml_ng::Value>,
    #[serde(default)]
    runs: Option<Vec<serde_yaml_ng::Value>>,
    #[serde(default)]
    packages: Option<Vec<Package>>,
    #[serde(default)]
    other_files: Option<Vec<File>>,
    #[serde(default)]
    additional_patterns: Option<Vec<String>>,
}

/// Parse a configuration document
pub fn parse_config(text: &str, origin: &Path) -> Result<LoadedConfig> {
    let raw: RawConfig = serde_yaml_ng::from_str(text).map_err(|source| PackError::Config {
        path: origin.to_path_buf(),
        source,
    })?;

    let version = raw.version.and_then(|v| match v {
        serde_yaml_ng::Value::String(s) => Some(s),
        serde_yaml_ng::Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    Ok(LoadedConfig {
        version,
        manifest: Manifest {
            runs: raw.runs.unwrap_or_default(),
            packages: raw.packages.unwrap_or_default(),
            other_files: raw.other_files.unwrap_or_default(),
        },
        additional_patterns: raw.additional_patterns.unwrap_or_default(),
    })
}

/// Load a configuration file; file sizes are re-sampled from disk
pub fn load_config(path: &Path) -> Result<LoadedConfig> {
    let text = fs::read_to_string(path).map_err(PackError::io(path))?;
    parse_config(&text, path)
}

/// Render the canonical form of a manifest
pub fn render_config(manifest: &Manifest) -> Result<String> {
    let mut out = String::new();
    out.push_str("# ReproZip configuration file\n");
    out.push_str(&format!(
        "# This file was generated by rpzpack {}\n",
        env!("CARGO_PKG_VERSION")
    ));
    out.push_str("# It lists the files packed for the traced runs.\n\n");
    out.push_str(&format!(
        "version: {}\n",
        emit::quote(env!("CARGO_PKG_VERSION"))
    ));
    manifest.write_yaml(&mut out, 0)?;
    Ok(out)
}

/// Write the canonical form of a manifest to a file
pub fn save_config(path: &Path, manifest: &Manifest) -> Result<()> {
    fs::write(path, render_config(manifest)?).map_err(PackError::io(path))
}
