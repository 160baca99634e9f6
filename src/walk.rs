use std::path::PathBuf;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// A regular file found under a walk root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub relative: PathBuf,
    pub len: u64,
}

impl FileEntry {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn virtual_path(&self) -> String {
        normalize_virtual_path(&self.relative.to_string_lossy())
    }
}

/// Recursive file listing shared by the registry, the overlay resolver, the
/// importer and deployment. Every call to [`DirectoryWalker::files`] starts a
/// fresh walk, sorted by file name so results do not depend on the order the
/// filesystem hands entries back.
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    root: PathBuf,
    skip_junk: bool,
}

impl DirectoryWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            skip_junk: false,
        }
    }

    /// Skip OS and VCS clutter (`__MACOSX`, `.git`, `Thumbs.db`, ...).
    pub fn skip_junk(mut self) -> Self {
        self.skip_junk = true;
        self
    }

    pub fn files(&self) -> impl Iterator<Item = FileEntry> + '_ {
        let skip_junk = self.skip_junk;
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !(skip_junk && entry.depth() > 0 && is_junk(entry)))
            .filter_map(move |entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!(root = %self.root.display(), "walk error: {err}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(move |entry| self.to_file_entry(&entry))
    }

    fn to_file_entry(&self, entry: &DirEntry) -> Option<FileEntry> {
        let relative = entry.path().strip_prefix(&self.root).ok()?.to_path_buf();
        let len = entry.metadata().map(|meta| meta.len()).unwrap_or(0);
        Some(FileEntry {
            path: entry.path().to_path_buf(),
            relative,
            len,
        })
    }
}

/// Lower-cased, forward-slash form of an in-game path.
pub fn normalize_virtual_path(path: &str) -> String {
    path.replace('\\', "/")
        .trim_start_matches('/')
        .to_lowercase()
}

fn is_junk(entry: &DirEntry) -> bool {
    let part = entry.file_name().to_string_lossy();
    part.eq_ignore_ascii_case("__MACOSX")
        || part.eq_ignore_ascii_case(".ds_store")
        || part.eq_ignore_ascii_case("thumbs.db")
        || part == ".git"
        || part == ".svn"
        || part == ".vscode"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn lists_nested_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/inner")).unwrap();
        fs::write(dir.path().join("c.txt"), b"c").unwrap();
        fs::write(dir.path().join("a.txt"), b"aa").unwrap();
        fs::write(dir.path().join("b/inner/z.dds"), b"z").unwrap();

        let walker = DirectoryWalker::new(dir.path());
        let rel: Vec<String> = walker
            .files()
            .map(|entry| entry.relative.to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, vec!["a.txt", "b/inner/z.dds", "c.txt"]);

        let first = walker.files().next().unwrap();
        assert_eq!(first.len, 2);
        assert_eq!(first.file_name(), "a.txt");
    }

    #[test]
    fn walk_is_restartable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.esp"), b"").unwrap();
        let walker = DirectoryWalker::new(dir.path());
        assert_eq!(walker.files().count(), 1);
        fs::write(dir.path().join("two.esp"), b"").unwrap();
        assert_eq!(walker.files().count(), 2);
    }

    #[test]
    fn missing_root_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let walker = DirectoryWalker::new(dir.path().join("absent"));
        assert_eq!(walker.files().count(), 0);
    }

    #[test]
    fn junk_is_skipped_on_request() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), b"ref").unwrap();
        fs::write(dir.path().join("Thumbs.db"), b"").unwrap();
        fs::write(dir.path().join("mesh.nif"), b"").unwrap();

        assert_eq!(DirectoryWalker::new(dir.path()).files().count(), 3);
        let kept: Vec<String> = DirectoryWalker::new(dir.path())
            .skip_junk()
            .files()
            .map(|entry| entry.file_name())
            .collect();
        assert_eq!(kept, vec!["mesh.nif"]);
    }

    #[test]
    fn virtual_paths_are_case_and_separator_folded() {
        assert_eq!(
            normalize_virtual_path("\\Textures\\Armor\\Helmet.DDS"),
            "textures/armor/helmet.dds"
        );
        assert_eq!(normalize_virtual_path("Meshes/A.nif"), "meshes/a.nif");
    }
}
