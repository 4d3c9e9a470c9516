use crate::error::{PackError, Result};
use crate::model::{File, Manifest, Package};

const INDENT: &str = "  ";

/// Canonical YAML rendering, implemented per type.
///
/// Output is deterministic and meant to be read and edited by people, hence
/// the size comments; it loads back through [`super::load_config`].
pub trait YamlWrite {
    fn write_yaml(&self, out: &mut String, level: usize) -> Result<()>;
}

/// Double-quoted YAML scalar. JSON string escaping is a subset of YAML's.
pub(crate) fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str(INDENT);
    }
}

impl YamlWrite for File {
    fn write_yaml(&self, out: &mut String, level: usize) -> Result<()> {
        indent(out, level);
        out.push_str("- ");
        out.push_str(&quote(self.path.as_str()));
        out.push_str(" # ");
        out.push_str(&hsize(self.size));
        out.push('\n');
        Ok(())
    }
}

impl YamlWrite for Package {
    fn write_yaml(&self, out: &mut String, level: usize) -> Result<()> {
        indent(out, level);
        out.push_str(&format!("- name: {}\n", quote(&self.name)));
        if let Some(version) = &self.version {
            indent(out, level + 1);
            out.push_str(&format!("version: {}\n", quote(version)));
        }
        if let Some(size) = self.size {
            indent(out, level + 1);
            out.push_str(&format!("size: {}\n", size));
        }
        indent(out, level + 1);
        out.push_str(&format!("packfiles: {}\n", self.packfiles));
        indent(out, level + 1);
        if self.files.is_empty() {
            out.push_str("files: []\n");
            return Ok(());
        }
        out.push_str("files:\n");
        indent(out, level + 2);
        out.push_str(&format!(
            "# Total files used: {}\n",
            hsize(Some(self.files_size()))
        ));
        indent(out, level + 2);
        out.push_str(&format!("# Installed package size: {}\n", hsize(self.size)));
        for file in &self.files {
            file.write_yaml(out, level + 2)?;
        }
        Ok(())
    }
}

impl YamlWrite for Manifest {
    fn write_yaml(&self, out: &mut String, level: usize) -> Result<()> {
        out.push_str("\n# Runs\n");
        if self.runs.is_empty() {
            indent(out, level);
            out.push_str("runs: []\n");
        } else {
            indent(out, level);
            out.push_str("runs:\n");
            // Run descriptions are opaque: render them as-is
            let rendered = serde_yaml_ng::to_string(&self.runs).map_err(PackError::Render)?;
            for line in rendered.lines() {
                indent(out, level);
                out.push_str(line);
                out.push('\n');
            }
        }

        out.push_str("\n# Files from packages\n");
        indent(out, level);
        if self.packages.is_empty() {
            out.push_str("packages: []\n");
        } else {
            out.push_str("packages:\n");
            for package in &self.packages {
                package.write_yaml(out, level + 1)?;
            }
        }

        out.push_str("\n# Other files\n");
        indent(out, level);
        if self.other_files.is_empty() {
            out.push_str("other_files: []\n");
        } else {
            out.push_str("other_files:\n");
            for file in &self.other_files {
                file.write_yaml(out, level + 1)?;
            }
        }
        Ok(())
    }
}

/// Human-readable size
pub fn hsize(bytes: Option<u64>) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    let Some(bytes) = bytes else {
        return "unknown".to_string();
    };
    if bytes < 1024 {
        return format!("{} bytes", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
