use crate::{
    library::Category,
    status::{ManagerError, StatusEvent},
    walk::DirectoryWalker,
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

/// Where imported files land.
#[derive(Debug, Clone)]
pub struct ImportTargets {
    pub data_root: PathBuf,
    pub strings_root: PathBuf,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<PathBuf>,
    pub unrecognized: Vec<PathBuf>,
    pub failures: Vec<ManagerError>,
}

impl ImportReport {
    fn merge(&mut self, other: ImportReport) {
        self.imported.extend(other.imported);
        self.unrecognized.extend(other.unrecognized);
        self.failures.extend(other.failures);
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        let mut events: Vec<StatusEvent> = self
            .failures
            .iter()
            .map(StatusEvent::from)
            .collect();
        if !self.unrecognized.is_empty() {
            events.push(StatusEvent::warn(format!(
                "Skipped {} unrecognized file(s).",
                self.unrecognized.len()
            )));
        }
        events.push(StatusEvent::success(format!(
            "Imported {} mod(s).",
            self.imported.len()
        )));
        events
    }
}

/// Copies each recognized file into place. Directories are imported with
/// [`import_folder`]. A failed copy is recorded and the rest continue.
pub fn import_files(targets: &ImportTargets, files: &[PathBuf]) -> ImportReport {
    let mut report = ImportReport::default();
    for file in files {
        if file.is_dir() {
            report.merge(import_folder(targets, file));
            continue;
        }
        import_one(targets, file, &mut report);
    }
    report
}

pub fn import_folder(targets: &ImportTargets, folder: &Path) -> ImportReport {
    let mut report = ImportReport::default();
    if !folder.is_dir() {
        report
            .failures
            .push(ManagerError::MissingRoot(folder.to_path_buf()));
        return report;
    }
    for entry in DirectoryWalker::new(folder).skip_junk().files() {
        if Category::from_file_name(&entry.file_name()).is_some() {
            import_one(targets, &entry.path, &mut report);
        }
    }
    report
}

fn import_one(targets: &ImportTargets, file: &Path, report: &mut ImportReport) {
    let Some(name) = file.file_name() else {
        report.unrecognized.push(file.to_path_buf());
        return;
    };
    let dest_root = match Category::from_file_name(&name.to_string_lossy()) {
        Some(Category::Strings) => &targets.strings_root,
        Some(Category::Archive) | Some(Category::Plugin) => &targets.data_root,
        _ => {
            report.unrecognized.push(file.to_path_buf());
            return;
        }
    };
    match copy_into(file, dest_root, name) {
        Ok(dest) => {
            info!(source = %file.display(), dest = %dest.display(), "imported mod file");
            report.imported.push(dest);
        }
        Err(error) => {
            warn!("{error}");
            report.failures.push(error);
        }
    }
}

fn copy_into(file: &Path, dest_root: &Path, name: &std::ffi::OsStr) -> Result<PathBuf, ManagerError> {
    fs::create_dir_all(dest_root).map_err(|err| ManagerError::io("create folder", dest_root, err))?;
    let dest = dest_root.join(name);
    fs::copy(file, &dest).map_err(|err| ManagerError::io("copy", file, err))?;
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(root: &Path) -> ImportTargets {
        ImportTargets {
            data_root: root.join("Data"),
            strings_root: root.join("Data/Strings"),
        }
    }

    #[test]
    fn files_are_routed_by_category() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("download");
        fs::create_dir_all(&src).unwrap();
        for name in ["Mod.ba2", "Mod.esp", "Mod_en.STRINGS", "readme.txt"] {
            fs::write(src.join(name), name).unwrap();
        }
        let game = dir.path().join("game");
        let report = import_files(
            &targets(&game),
            &[
                src.join("Mod.ba2"),
                src.join("Mod.esp"),
                src.join("Mod_en.STRINGS"),
                src.join("readme.txt"),
                src.join("missing.ba2"),
            ],
        );
        assert!(game.join("Data/Mod.ba2").is_file());
        assert!(game.join("Data/Mod.esp").is_file());
        assert!(game.join("Data/Strings/Mod_en.STRINGS").is_file());
        assert_eq!(report.imported.len(), 3);
        assert_eq!(report.unrecognized, vec![src.join("readme.txt")]);
        assert_eq!(report.failures.len(), 1);

        let events = report.events();
        assert!(events[0].is_error());
        assert_eq!(events.last().unwrap().message, "Imported 3 mod(s).");
    }

    #[test]
    fn folder_import_skips_junk_and_unknown_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("extracted");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::create_dir_all(src.join("__MACOSX")).unwrap();
        fs::write(src.join("nested/Deep.ba2"), b"x").unwrap();
        fs::write(src.join("__MACOSX/Deep.ba2"), b"x").unwrap();
        fs::write(src.join("notes.md"), b"x").unwrap();

        let game = dir.path().join("game");
        let report = import_files(&targets(&game), &[src]);
        assert_eq!(report.imported, vec![game.join("Data/Deep.ba2")]);
        assert!(report.unrecognized.is_empty());
        assert!(report.failures.is_empty());
    }

    #[test]
    fn missing_folder_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let report = import_folder(&targets(dir.path()), &dir.path().join("nope"));
        assert_eq!(report.failures.len(), 1);
        assert!(report.imported.is_empty());
    }
}
