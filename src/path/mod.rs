
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Archive directory holding the captured filesystem
pub const DATA_PREFIX: &str = "DATA";

/// A POSIX path, normalized on construction.
///
/// Trace records and configuration files always describe POSIX paths, whatever
/// the host platform is, so all arithmetic here works on `/`-separated strings
/// instead of going through `std::path`.
///
/// Normalization is lexical: empty and `.` components are dropped, `..` removes
/// the previous component, and a `..` directly under the root is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PosixPath(String);

impl PosixPath {
    pub fn new(raw: &str) -> Self {
        let absolute = raw.starts_with('/');
        let mut components: Vec<&str> = Vec::new();

        for part in raw.split('/') {
            match part {
                "" | "." => continue,
                ".." => match components.last() {
                    Some(&last) if last != ".." => {
                        components.pop();
                    }
                    // Escaping above the root stays at the root
                    _ if absolute => {}
                    _ => components.push(part),
                },
                _ => components.push(part),
            }
        }

        let joined = components.join("/");
        if absolute {
            PosixPath(format!("/{}", joined))
        } else if joined.is_empty() {
            PosixPath(".".to_string())
        } else {
            PosixPath(joined)
        }
    }

    /// The filesystem root, `/`
    pub fn root() -> Self {
        PosixPath("/".to_string())
    }

    /// Convert a host path, failing on non-UTF-8 names
    pub fn from_std(path: &Path) -> Option<Self> {
        path.to_str().map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// View as a host path for filesystem access
    pub fn as_std(&self) -> &Path {
        Path::new(&self.0)
    }

    pub fn is_absolute(&self) -> bool {
        self.0.starts_with('/')
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Split into the root marker (`"/"` or `""`) and the remaining relative part
    pub fn split_root(&self) -> (&str, &str) {
        if self.is_absolute() {
            self.0.split_at(1)
        } else {
            ("", &self.0)
        }
    }

    /// Components after the root marker
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.split_root()
            .1
            .split('/')
            .filter(|c| !c.is_empty() && *c != ".")
    }

    /// The containing directory; the root is its own parent
    pub fn parent(&self) -> PosixPath {
        match self.0.rfind('/') {
            Some(0) => PosixPath::root(),
            Some(idx) => PosixPath(self.0[..idx].to_string()),
            None => PosixPath(".".to_string()),
        }
    }

    pub fn join(&self, other: &str) -> PosixPath {
        if other.starts_with('/') {
            PosixPath::new(other)
        } else {
            PosixPath::new(&format!("{}/{}", self.0, other))
        }
    }

    /// Every prefix of this path from the root down, this path included.
    ///
    /// The root itself is not part of the result.
    pub fn prefixes(&self) -> Vec<PosixPath> {
        let (root, _) = self.split_root();
        let mut current = String::from(root);
        let mut prefixes = Vec::new();
        for component in self.components() {
            if !current.is_empty() && !current.ends_with('/') {
                current.push('/');
            }
            current.push_str(component);
            prefixes.push(PosixPath(current.clone()));
        }
        prefixes
    }

    /// Proper ancestors, from the root down; the root is included for
    /// absolute paths other than the root itself.
    pub fn ancestors(&self) -> Vec<PosixPath> {
        let mut ancestors = Vec::new();
        if self.is_absolute() && !self.is_root() {
            ancestors.push(PosixPath::root());
        }
        let mut prefixes = self.prefixes();
        prefixes.pop();
        ancestors.extend(prefixes);
        ancestors
    }
}

impl fmt::Display for PosixPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PosixPath {
    fn from(raw: &str) -> Self {
        PosixPath::new(raw)
    }
}

impl Serialize for PosixPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PosixPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(PosixPath::new(&raw))
    }
}

/// Computes the name under which a filesystem path is stored in the archive.
///
/// The root is stripped and the remainder placed under `DATA/`; since the path
/// is normalized, the result never contains a `..` component:
///
/// ```
/// use rpzpack::path::{data_path, PosixPath};
///
/// assert_eq!(data_path(&PosixPath::new("/var/lib/../../../../tmp/test")), "DATA/tmp/test");
/// assert_eq!(data_path(&PosixPath::new("/var/lib/../www/index.html")), "DATA/var/www/index.html");
/// ```
pub fn data_path(path: &PosixPath) -> String {
    data_path_with_prefix(path, DATA_PREFIX)
}

pub fn data_path_with_prefix(path: &PosixPath, prefix: &str) -> String {
    let relative = path.split_root().1;
    let prefix = prefix.trim_end_matches('/');
    if relative.is_empty() || relative == "." {
        prefix.to_string()
    } else {
        format!("{}/{}", prefix, relative)
    }
}
