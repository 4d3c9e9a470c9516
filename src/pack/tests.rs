#[cfg(test)]
mod tests {
    use crate::config::parse_config;
    use crate::error::Result;
    use crate::model::{File, Package};
    use crate::pack::{
        pack, PackRequest, PackSummary, FORMAT_MARKER, METADATA_CONFIG, METADATA_TRACE,
        METADATA_VERSION,
    };
    use crate::packages::{DpkgIdentifier, PackageIdentifier};
    use crate::path::{data_path, PosixPath};
    use crate::report::{RecordingReporter, Reporter};
    use crate::trace::AccessMode;
    use crate::PackError;
    use rusqlite::{params, Connection};
    use std::fs;
    use std::io::Read;
    use std::path::{Path, PathBuf};
    use tempfile::{tempdir, TempDir};
    use zip::ZipArchive;

    /// A traced "filesystem" and a trace directory inside one temp dir
    struct Fixture {
        _dir: TempDir,
        fs: PosixPath,
        trace_dir: PathBuf,
        target: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let fs_root = dir.path().join("fs");
            fs::create_dir_all(fs_root.join("etc")).unwrap();
            fs::create_dir_all(fs_root.join("home/user/project")).unwrap();
            fs::create_dir_all(fs_root.join("bin")).unwrap();
            fs::write(fs_root.join("etc/hosts"), b"127.0.0.1 localhost\n").unwrap();
            fs::write(fs_root.join("bin/ls"), b"\x7fELF").unwrap();

            let trace_dir = dir.path().join(".reprozip");
            fs::create_dir_all(&trace_dir).unwrap();
            let target = dir.path().join("experiment.rpz");

            Self {
                fs: PosixPath::from_std(&fs_root).unwrap(),
                trace_dir,
                target,
                _dir: dir,
            }
        }

        fn path(&self, relative: &str) -> PosixPath {
            self.fs.join(relative)
        }

        fn write_config(&self, body: &str) {
            fs::write(self.trace_dir.join("config.yml"), body).unwrap();
        }

        fn write_trace(&self, rows: &[(PosixPath, AccessMode)]) {
            let conn = Connection::open(self.trace_dir.join("trace.sqlite3")).unwrap();
            conn.execute_batch(
                "CREATE TABLE opened_files (
                    id INTEGER NOT NULL PRIMARY KEY,
                    name TEXT NOT NULL,
                    mode INTEGER NOT NULL
                );",
            )
            .unwrap();
            for (path, mode) in rows {
                conn.execute(
                    "INSERT INTO opened_files (name, mode) VALUES (?1, ?2)",
                    params![path.as_str(), mode.code()],
                )
                .unwrap();
            }
        }

        fn request<'a>(&'a self, identifier: Option<&'a dyn PackageIdentifier>) -> PackRequest<'a> {
            PackRequest {
                target: &self.target,
                directory: &self.trace_dir,
                identifier,
            }
        }
    }

    fn entry_names(archive: &Path) -> Vec<String> {
        let mut zip = ZipArchive::new(fs::File::open(archive).unwrap()).unwrap();
        (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect()
    }

    fn read_entry(archive: &Path, name: &str) -> String {
        let mut zip = ZipArchive::new(fs::File::open(archive).unwrap()).unwrap();
        let mut content = String::new();
        zip.by_name(name).unwrap().read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_end_to_end_pack() {
        let fx = Fixture::new();
        fx.write_config(&format!(
            "runs: []\npackages: []\nother_files:\n  - \"{}\"\nadditional_patterns: []\n",
            fx.path("etc/hosts")
        ));
        fx.write_trace(&[
            (fx.path("home/user"), AccessMode::WorkingDir),
            (fx.path("home/user/project/out.txt"), AccessMode::Write),
        ]);

        let reporter = RecordingReporter::new();
        let summary = pack(&fx.request(None), &reporter).unwrap();

        let names = entry_names(&fx.target);
        assert!(names.contains(&METADATA_TRACE.to_string()));
        assert!(names.contains(&METADATA_VERSION.to_string()));
        assert!(names.contains(&METADATA_CONFIG.to_string()));
        assert!(names.contains(&data_path(&fx.path("etc/hosts"))));
        assert!(names.contains(&format!("{}/", data_path(&fx.path("home/user")))));
        assert!(names.contains(&format!("{}/", data_path(&fx.path("home/user/project")))));

        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), names.len());
        assert_eq!(summary.entries, names.len());
        assert_eq!(summary.files_packed, 1);
        assert_eq!(summary.directories, 2);

        assert_eq!(read_entry(&fx.target, METADATA_VERSION), FORMAT_MARKER);
        let config = read_entry(&fx.target, METADATA_CONFIG);
        let stored = parse_config(&config, Path::new(METADATA_CONFIG)).unwrap();
        assert_eq!(stored.manifest.other_files, vec![File::with_size(fx.path("etc/hosts"), None)]);
        assert!(reporter.warnings().is_empty());
    }

    #[test]
    fn test_missing_package_file_is_pruned() {
        let fx = Fixture::new();
        fx.write_config(&format!(
            r#"
packages:
  - name: "coreutils"
    version: "8.21"
    packfiles: true
    files:
      - "{}"
      - "{}"
other_files: []
"#,
            fx.path("bin/ls"),
            fx.path("bin/missing")
        ));

        let reporter = RecordingReporter::new();
        let summary = pack(&fx.request(None), &reporter).unwrap();

        let coreutils = &summary.manifest.packages[0];
        assert_eq!(coreutils.files, vec![File::with_size(fx.path("bin/ls"), None)]);
        assert_eq!(summary.files_missing, 1);

        let warnings = reporter.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains(fx.path("bin/missing").as_str()));
        assert!(warnings[0].contains("coreutils"));

        let names = entry_names(&fx.target);
        assert!(names.contains(&data_path(&fx.path("bin/ls"))));
        assert!(!names.iter().any(|n| n.contains("missing")));

        let config = read_entry(&fx.target, METADATA_CONFIG);
        assert!(!config.contains("bin/missing"));
    }

    #[test]
    fn test_missing_other_file_is_pruned() {
        let fx = Fixture::new();
        fx.write_config(&format!(
            "other_files:\n  - \"{}\"\n  - \"{}\"\n",
            fx.path("etc/hosts"),
            fx.path("etc/gone")
        ));

        let reporter = RecordingReporter::new();
        let summary = pack(&fx.request(None), &reporter).unwrap();

        assert_eq!(summary.manifest.other_files, vec![File::with_size(fx.path("etc/hosts"), None)]);
        assert_eq!(reporter.warnings().len(), 1);
        assert!(!read_entry(&fx.target, METADATA_CONFIG).contains("etc/gone"));
    }

    #[test]
    fn test_unpacked_package_keeps_metadata_only() {
        let fx = Fixture::new();
        fx.write_config(&format!(
            r#"
packages:
  - name: "coreutils"
    packfiles: false
    files:
      - "{}"
"#,
            fx.path("bin/ls")
        ));

        let reporter = RecordingReporter::new();
        let summary = pack(&fx.request(None), &reporter).unwrap();

        assert_eq!(summary.manifest.packages[0].files.len(), 1);
        assert_eq!(summary.files_packed, 0);
        let names = entry_names(&fx.target);
        assert!(!names.contains(&data_path(&fx.path("bin/ls"))));
        assert!(read_entry(&fx.target, METADATA_CONFIG).contains("packfiles: false"));
    }

    #[test]
    fn test_existing_target_is_not_modified() {
        let fx = Fixture::new();
        fx.write_config("other_files: []\n");
        fs::write(&fx.target, b"previous pack").unwrap();

        let reporter = RecordingReporter::new();
        let err = pack(&fx.request(None), &reporter).unwrap_err();

        assert!(matches!(err, PackError::TargetExists(_)));
        assert_eq!(fs::read(&fx.target).unwrap(), b"previous pack");
    }

    #[test]
    fn test_missing_config_creates_nothing() {
        let fx = Fixture::new();

        let reporter = RecordingReporter::new();
        let err = pack(&fx.request(None), &reporter).unwrap_err();

        assert!(matches!(err, PackError::MissingConfig(_)));
        assert!(err.to_string().contains("--dir"));
        assert!(!fx.target.exists());
    }

    #[test]
    fn test_additional_patterns_are_packed() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.path("srv/www/empty").as_std()).unwrap();
        fs::write(fx.path("srv/www/index.html").as_std(), b"<html/>").unwrap();
        fx.write_config(&format!(
            "other_files: []\nadditional_patterns:\n  - \"{}/**\"\n",
            fx.path("srv/www")
        ));

        let reporter = RecordingReporter::new();
        let summary = pack(&fx.request(None), &reporter).unwrap();

        assert_eq!(
            summary.manifest.other_files,
            vec![
                File::with_size(fx.path("srv/www/empty"), None),
                File::with_size(fx.path("srv/www/index.html"), None),
            ]
        );
        let names = entry_names(&fx.target);
        assert!(names.contains(&data_path(&fx.path("srv/www/index.html"))));
        assert!(names.contains(&format!("{}/", data_path(&fx.path("srv/www/empty")))));
        assert!(!read_entry(&fx.target, METADATA_CONFIG).contains("additional_patterns"));
    }

    /// Claims every `.so` file for a single package
    struct SharedObjects;

    impl PackageIdentifier for SharedObjects {
        fn identify(
            &self,
            files: Vec<File>,
            _: &dyn Reporter,
        ) -> Result<(Vec<File>, Vec<Package>)> {
            let (owned, loose): (Vec<File>, Vec<File>) = files
                .into_iter()
                .partition(|f| f.path.as_str().ends_with(".so"));
            let mut package = Package::new("libfake", Some("1.0".to_string()));
            for file in owned {
                package.add_file(file);
            }
            Ok((loose, vec![package]))
        }
    }

    #[test]
    fn test_identifier_attributes_discovered_files() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.path("lib").as_std()).unwrap();
        fs::write(fx.path("lib/libfake.so").as_std(), b"so").unwrap();
        fs::write(fx.path("lib/notes.txt").as_std(), b"txt").unwrap();
        fx.write_config(&format!(
            "other_files: []\nadditional_patterns:\n  - \"{}/*\"\n",
            fx.path("lib")
        ));

        let reporter = RecordingReporter::new();
        let identifier: &dyn PackageIdentifier = &SharedObjects;
        let summary = pack(&fx.request(Some(identifier)), &reporter).unwrap();

        assert_eq!(summary.manifest.packages.len(), 1);
        assert_eq!(
            summary.manifest.packages[0].files,
            vec![File::with_size(fx.path("lib/libfake.so"), None)]
        );
        assert_eq!(
            summary.manifest.other_files,
            vec![File::with_size(fx.path("lib/notes.txt"), None)]
        );
        let names = entry_names(&fx.target);
        assert!(names.contains(&data_path(&fx.path("lib/libfake.so"))));
    }

    #[test]
    fn test_pack_without_dpkg_database() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.path("opt/app").as_std()).unwrap();
        fs::write(fx.path("opt/app/run.sh").as_std(), b"#!/bin/sh\n").unwrap();
        fx.write_config(&format!(
            "other_files: []\nadditional_patterns:\n  - \"{}\"\n",
            fx.path("opt/app/run.sh")
        ));

        let reporter = RecordingReporter::new();
        let dpkg = DpkgIdentifier::new(fx.trace_dir.join("no-dpkg"));
        let identifier: &dyn PackageIdentifier = &dpkg;
        let summary = pack(&fx.request(Some(identifier)), &reporter).unwrap();

        assert!(summary.manifest.packages.is_empty());
        assert_eq!(
            summary.manifest.other_files,
            vec![File::with_size(fx.path("opt/app/run.sh"), None)]
        );
        assert_eq!(summary.files_packed, 1);
        let warnings = reporter.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("No dpkg database"));
    }

    #[test]
    fn test_summary_compares_by_value() {
        let fx = Fixture::new();
        fx.write_config("other_files: []\n");

        let reporter = RecordingReporter::new();
        let summary = pack(&fx.request(None), &reporter).unwrap();

        assert_eq!(summary.clone(), summary);
        assert_ne!(summary, PackSummary::default());
    }

    #[test]
    fn test_vanished_working_directory_is_skipped() {
        let fx = Fixture::new();
        fx.write_config("other_files: []\n");
        fx.write_trace(&[
            (fx.path("home/user"), AccessMode::WorkingDir),
            (fx.path("tmp/deleted"), AccessMode::WorkingDir),
        ]);

        let reporter = RecordingReporter::new();
        let summary = pack(&fx.request(None), &reporter).unwrap();

        assert_eq!(summary.directories, 1);
        assert!(reporter.warnings().is_empty());
        let names = entry_names(&fx.target);
        assert!(!names.iter().any(|n| n.contains("deleted")));
    }

    #[test]
    fn test_pack_without_trace_record() {
        let fx = Fixture::new();
        fx.write_config("other_files: []\n");

        let reporter = RecordingReporter::new();
        pack(&fx.request(None), &reporter).unwrap();

        let names = entry_names(&fx.target);
        assert_eq!(names, vec![METADATA_VERSION.to_string(), METADATA_CONFIG.to_string()]);
    }
}
