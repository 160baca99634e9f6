use crate::{
    archive,
    library::{Category, ScannedFile},
    status::ManagerError,
    walk::{normalize_virtual_path, DirectoryWalker},
};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Normalized virtual path to the sources providing it, in precedence order.
pub type VirtualFileMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub path: String,
    pub contributors: Vec<String>,
    pub winner: String,
}

/// One overlay input: the name reported as a contributor and the file or
/// folder it is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySource {
    pub label: String,
    pub location: PathBuf,
}

impl OverlaySource {
    /// `name` taken relative to `data_root`, labelled by its file name.
    pub fn under(data_root: &Path, name: &str) -> Self {
        let location = data_root.join(name);
        let label = location
            .file_name()
            .map(|file| file.to_string_lossy().to_string())
            .unwrap_or_else(|| name.to_string());
        Self { label, location }
    }
}

/// Maps each name of a load order onto the file the registry found for it,
/// wherever it sits under the data root. A candidate whose relative path
/// equals the name is preferred; names with no candidate (loose folders,
/// missing files) fall back to `data_root/name`.
pub fn sources_for(
    names: &[String],
    files: &[ScannedFile],
    data_root: &Path,
) -> Vec<OverlaySource> {
    names
        .iter()
        .map(|name| {
            let exact = files
                .iter()
                .find(|file| file.relative.to_string_lossy().eq_ignore_ascii_case(name));
            let by_name = || {
                files
                    .iter()
                    .find(|file| file.class.canonical.eq_ignore_ascii_case(name))
            };
            match exact.or_else(by_name) {
                Some(file) => OverlaySource {
                    label: file.class.canonical.clone(),
                    location: file.path.clone(),
                },
                None => OverlaySource::under(data_root, name),
            }
        })
        .collect()
}

/// The resolved overlay plus the archives that could only be read in part.
#[derive(Debug, Default)]
pub struct Overlay {
    pub files: VirtualFileMap,
    pub problems: Vec<ManagerError>,
}

impl Overlay {
    pub fn conflicts(&self) -> Vec<Conflict> {
        conflicts(&self.files)
    }
}

/// Builds the virtual file map for `sources`. Later sources win; the order
/// given is never changed.
pub fn resolve(sources: &[OverlaySource]) -> Overlay {
    let mut overlay = Overlay::default();
    for source in sources {
        let (mut provided, problem) = source_paths(source);
        overlay.problems.extend(problem);
        provided.sort();
        provided.dedup();
        for path in provided {
            overlay
                .files
                .entry(path)
                .or_default()
                .push(source.label.clone());
        }
    }
    overlay
}

fn source_paths(source: &OverlaySource) -> (Vec<String>, Option<ManagerError>) {
    let location = &source.location;
    if location.is_dir() {
        let paths = DirectoryWalker::new(location)
            .files()
            .map(|entry| entry.virtual_path())
            .collect();
        return (paths, None);
    }
    if !location.is_file() {
        debug!(source = %location.display(), "overlay source missing, skipped");
        return (Vec::new(), None);
    }
    // The label carries the canonical name, so a soft-disabled file still
    // classifies by its real extension.
    match Category::from_file_name(&source.label) {
        Some(Category::Archive) => {
            let (paths, problem) = archive::index(location);
            let paths = paths.iter().map(|path| normalize_virtual_path(path)).collect();
            (paths, problem)
        }
        Some(Category::Plugin) | Some(Category::Strings) => {
            (vec![normalize_virtual_path(&source.label)], None)
        }
        _ => (Vec::new(), None),
    }
}

/// Entries with more than one contributor, sorted by path. The winner is the
/// last contributor.
pub fn conflicts(map: &VirtualFileMap) -> Vec<Conflict> {
    map.iter()
        .filter(|(_, contributors)| contributors.len() > 1)
        .filter_map(|(path, contributors)| {
            contributors.last().map(|winner| Conflict {
                path: path.clone(),
                contributors: contributors.clone(),
                winner: winner.clone(),
            })
        })
        .collect()
}

/// Sources that lose at least one path to a later source.
pub fn overridden_sources(found: &[Conflict]) -> Vec<String> {
    let mut out: Vec<String> = found
        .iter()
        .flat_map(|conflict| {
            conflict
                .contributors
                .iter()
                .filter(|name| **name != conflict.winner)
                .cloned()
        })
        .collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{archive::build_archive, library::ModRegistry};
    use std::fs;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn under(data: &Path, values: &[&str]) -> Vec<OverlaySource> {
        values
            .iter()
            .map(|value| OverlaySource::under(data, value))
            .collect()
    }

    fn detect(data: &Path, values: &[&str]) -> Vec<Conflict> {
        resolve(&under(data, values)).conflicts()
    }

    fn data_with_archives(dir: &Path) -> PathBuf {
        let data = dir.join("Data");
        fs::create_dir_all(&data).unwrap();
        fs::write(
            data.join("foo.ba2"),
            build_archive(&["Textures\\Bar.txt", "meshes/only_foo.nif"]),
        )
        .unwrap();
        fs::write(data.join("baz.ba2"), build_archive(&["textures/bar.txt"])).unwrap();
        fs::write(data.join("solo.ba2"), build_archive(&["sound/solo.xwm"])).unwrap();
        data
    }

    #[test]
    fn later_source_wins() {
        let dir = tempfile::tempdir().unwrap();
        let data = data_with_archives(dir.path());
        let found = detect(&data, &["foo.ba2", "baz.ba2"]);
        assert_eq!(
            found,
            vec![Conflict {
                path: "textures/bar.txt".into(),
                contributors: names(&["foo.ba2", "baz.ba2"]),
                winner: "baz.ba2".into(),
            }]
        );
        assert_eq!(overridden_sources(&found), names(&["foo.ba2"]));
    }

    #[test]
    fn reordering_changes_only_the_winner() {
        let dir = tempfile::tempdir().unwrap();
        let data = data_with_archives(dir.path());
        let forward = detect(&data, &["foo.ba2", "baz.ba2"]);
        let reverse = detect(&data, &["baz.ba2", "foo.ba2"]);
        assert_eq!(forward.len(), reverse.len());
        assert_eq!(forward[0].path, reverse[0].path);
        assert_eq!(reverse[0].winner, "foo.ba2");
    }

    #[test]
    fn disjoint_sources_do_not_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let data = data_with_archives(dir.path());
        let overlay = resolve(&under(&data, &["foo.ba2", "solo.ba2"]));
        assert_eq!(overlay.files.len(), 3);
        assert!(overlay.conflicts().is_empty());
        assert!(overlay.problems.is_empty());
    }

    #[test]
    fn directories_plugins_and_missing_sources() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("Data");
        fs::create_dir_all(data.join("LooseMod/Interface")).unwrap();
        fs::write(data.join("LooseMod/Interface/HUD.swf"), b"x").unwrap();
        fs::write(data.join("a.esp"), b"x").unwrap();
        fs::write(data.join("readme.txt"), b"x").unwrap();
        let hud = build_archive(&["interface/hud.swf", "Interface/HUD.swf"]);
        fs::write(data.join("hud.ba2"), hud).unwrap();

        let overlay = resolve(&under(
            &data,
            &["hud.ba2", "LooseMod", "a.esp", "readme.txt", "gone.ba2"],
        ));
        assert_eq!(overlay.files["interface/hud.swf"], names(&["hud.ba2", "LooseMod"]));
        assert_eq!(overlay.files["a.esp"], names(&["a.esp"]));
        assert_eq!(overlay.files.len(), 2);
    }

    #[test]
    fn contributors_are_named_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("Data");
        fs::create_dir_all(data.join("patch")).unwrap();
        fs::write(data.join("a.esp"), b"x").unwrap();
        fs::write(data.join("patch/A.esp"), b"x").unwrap();
        let found = detect(&data, &["a.esp", "patch/A.esp"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].contributors, names(&["a.esp", "A.esp"]));
        assert_eq!(found[0].winner, "A.esp");
    }

    #[test]
    fn registry_files_in_subfolders_are_found_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("Data");
        fs::create_dir_all(data.join("sub")).unwrap();
        fs::write(data.join("foo.ba2"), build_archive(&["bar.txt"])).unwrap();
        fs::write(data.join("sub/baz.ba2"), build_archive(&["bar.txt"])).unwrap();
        fs::write(data.join("off.ba2.disabled"), build_archive(&["bar.txt"])).unwrap();

        let files = ModRegistry::new(&data, None).scan().unwrap();
        let sources = sources_for(&names(&["foo.ba2", "baz.ba2", "off.ba2"]), &files, &data);
        assert_eq!(sources[1].location, data.join("sub/baz.ba2"));
        let found = resolve(&sources).conflicts();
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].contributors,
            names(&["foo.ba2", "baz.ba2", "off.ba2"])
        );
        assert_eq!(found[0].winner, "off.ba2");
    }

    #[test]
    fn truncated_archive_contributes_partial_listing_and_a_problem() {
        let dir = tempfile::tempdir().unwrap();
        let data = data_with_archives(dir.path());
        let mut cut = build_archive(&["textures/bar.txt"]);
        cut[12..16].copy_from_slice(&4u32.to_le_bytes());
        fs::write(data.join("cut.ba2"), cut).unwrap();

        let overlay = resolve(&under(&data, &["baz.ba2", "cut.ba2"]));
        assert_eq!(overlay.conflicts()[0].winner, "cut.ba2");
        assert_eq!(overlay.problems.len(), 1);
        assert!(matches!(overlay.problems[0], ManagerError::Format { .. }));
    }
}
