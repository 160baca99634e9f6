use crate::{
    fallout76, ini,
    metadata::{MetadataStore, ModMetadata},
    plugins,
    status::ManagerError,
    walk::DirectoryWalker,
};
use serde::Serialize;
use std::{
    cmp::Ordering,
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

pub const DISABLED_SUFFIX: &str = ".disabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Archive,
    Plugin,
    Strings,
    Unknown,
}

impl Category {
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())?;
        match ext.as_str() {
            "ba2" => Some(Category::Archive),
            "esm" | "esp" => Some(Category::Plugin),
            "strings" | "dlstrings" | "ilstrings" => Some(Category::Strings),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Archive => "archive",
            Category::Plugin => "plugin",
            Category::Strings => "strings",
            Category::Unknown => "unknown",
        }
    }
}

/// What a file name says about a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub category: Category,
    pub canonical: String,
    pub soft_disabled: bool,
}

/// The single classifier: strips the soft-disabled suffix, then looks at the
/// remaining extension. Plain files with an unrecognized extension are not
/// candidates at all.
pub fn classify(file_name: &str) -> Option<Classified> {
    if let Some(canonical) = strip_disabled_suffix(file_name) {
        let category = Category::from_file_name(canonical).unwrap_or(Category::Unknown);
        return Some(Classified {
            category,
            canonical: canonical.to_string(),
            soft_disabled: true,
        });
    }
    Category::from_file_name(file_name).map(|category| Classified {
        category,
        canonical: file_name.to_string(),
        soft_disabled: false,
    })
}

fn strip_disabled_suffix(file_name: &str) -> Option<&str> {
    let split = file_name.len().checked_sub(DISABLED_SUFFIX.len())?;
    if !file_name.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = file_name.split_at(split);
    if tail.eq_ignore_ascii_case(DISABLED_SUFFIX) && !head.is_empty() {
        Some(head)
    } else {
        None
    }
}

/// A candidate file as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub relative: PathBuf,
    pub class: Classified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModCandidate {
    pub original_name: String,
    pub display_name: String,
    pub category: Category,
    pub enabled: bool,
    pub relative_path: PathBuf,
    #[serde(skip)]
    pub path: PathBuf,
    pub metadata: ModMetadata,
}

/// Enumerates mod candidates under a data root, plus a strings root when it
/// lives elsewhere.
#[derive(Debug, Clone)]
pub struct ModRegistry {
    data_root: PathBuf,
    strings_root: Option<PathBuf>,
}

impl ModRegistry {
    pub fn new(data_root: impl Into<PathBuf>, strings_root: Option<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            strings_root,
        }
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    fn extra_strings_root(&self) -> Option<&Path> {
        let root = self.strings_root.as_deref()?;
        if root.as_os_str().is_empty() || root.starts_with(&self.data_root) || !root.is_dir() {
            return None;
        }
        Some(root)
    }

    /// Every candidate file on disk in walk order, base-game files excluded.
    pub fn scan(&self) -> Result<Vec<ScannedFile>, ManagerError> {
        if !self.data_root.is_dir() {
            return Err(ManagerError::MissingRoot(self.data_root.clone()));
        }
        let mut roots = vec![self.data_root.as_path()];
        roots.extend(self.extra_strings_root());

        let mut out = Vec::new();
        for root in roots {
            for entry in DirectoryWalker::new(root).files() {
                let name = entry.file_name();
                let Some(class) = classify(&name) else {
                    continue;
                };
                if fallout76::is_base_game_file(&class.canonical) {
                    continue;
                }
                out.push(ScannedFile {
                    path: entry.path,
                    relative: entry.relative,
                    class,
                });
            }
        }
        Ok(out)
    }

    pub fn list(
        &self,
        enabled_archives: &[String],
        enabled_plugins: &[String],
        metadata: &MetadataStore,
    ) -> Result<Vec<ModCandidate>, ManagerError> {
        let archives = lowercase_set(enabled_archives);
        let plugins = lowercase_set(enabled_plugins);

        let mut candidates: Vec<ModCandidate> = self
            .scan()?
            .into_iter()
            .map(|file| {
                let key = file.class.canonical.to_lowercase();
                let enabled = !file.class.soft_disabled
                    && match file.class.category {
                        Category::Archive => archives.contains(&key),
                        Category::Plugin => plugins.contains(&key),
                        Category::Strings => true,
                        Category::Unknown => false,
                    };
                let metadata = metadata.resolve(&file.class.canonical);
                let display_name = metadata
                    .alias
                    .clone()
                    .unwrap_or_else(|| file.class.canonical.clone());
                ModCandidate {
                    original_name: file.class.canonical,
                    display_name,
                    category: file.class.category,
                    enabled,
                    relative_path: file.relative,
                    path: file.path,
                    metadata,
                }
            })
            .collect();
        candidates.sort_by(presentation_order);
        debug!(count = candidates.len(), "listed mod candidates");
        Ok(candidates)
    }

    /// Canonical plugin names in disk-discovery order, disabled ones included.
    pub fn discovered_plugins(&self) -> Vec<String> {
        let Ok(files) = self.scan() else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        files
            .into_iter()
            .filter(|file| file.class.category == Category::Plugin)
            .map(|file| file.class.canonical)
            .filter(|name| seen.insert(name.to_lowercase()))
            .collect()
    }

    pub fn find(&self, name: &str) -> Result<Vec<ScannedFile>, ManagerError> {
        Ok(self
            .scan()?
            .into_iter()
            .filter(|file| file.class.canonical.eq_ignore_ascii_case(name))
            .collect())
    }

    /// Renames every file of the named candidate into the requested state and
    /// returns the new paths. Files already in that state are left alone.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<Vec<PathBuf>, ManagerError> {
        let files = self.find(name)?;
        if files.is_empty() {
            return Err(ManagerError::NotFound(name.to_string()));
        }
        let mut renamed = Vec::new();
        for file in files {
            if let Some(target) = rename_for_state(&file, enabled)? {
                renamed.push(target);
            }
        }
        Ok(renamed)
    }

    /// Removes every file of the named candidate, enabled or soft-disabled.
    pub fn delete(&self, name: &str) -> Result<Vec<PathBuf>, ManagerError> {
        let files = self.find(name)?;
        if files.is_empty() {
            return Err(ManagerError::NotFound(name.to_string()));
        }
        let mut removed = Vec::new();
        for file in files {
            fs::remove_file(&file.path)
                .map_err(|err| ManagerError::io("delete", &file.path, err))?;
            info!(file = %file.path.display(), "deleted mod file");
            removed.push(file.path);
        }
        Ok(removed)
    }
}

/// Renames `file` so its soft-disabled state matches `enabled`. Returns the
/// new path, or `None` when nothing had to change.
pub fn rename_for_state(file: &ScannedFile, enabled: bool) -> Result<Option<PathBuf>, ManagerError> {
    if enabled != file.class.soft_disabled {
        return Ok(None);
    }
    let target = if enabled {
        file.path.with_file_name(&file.class.canonical)
    } else {
        file.path
            .with_file_name(format!("{}{DISABLED_SUFFIX}", file.class.canonical))
    };
    if target.exists() {
        warn!(
            from = %file.path.display(),
            to = %target.display(),
            "rename target exists, skipped"
        );
        return Err(ManagerError::io(
            "rename",
            &target,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "target exists"),
        ));
    }
    fs::rename(&file.path, &target).map_err(|err| ManagerError::io("rename", &file.path, err))?;
    debug!(from = %file.path.display(), to = %target.display(), "renamed");
    Ok(Some(target))
}

/// Archive names listed in the custom configuration document.
pub fn enabled_archives(custom_ini: &Path) -> Vec<String> {
    ini::read_key(
        custom_ini,
        fallout76::ARCHIVE_SECTION,
        fallout76::ARCHIVE_LIST_KEY,
    )
    .map(|value| split_archive_list(&value))
    .unwrap_or_default()
}

pub fn split_archive_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn enabled_plugins(manifest: &Path) -> Vec<String> {
    plugins::read_active(manifest)
}

fn presentation_order(a: &ModCandidate, b: &ModCandidate) -> Ordering {
    b.enabled
        .cmp(&a.enabled)
        .then_with(|| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
        })
        .then_with(|| a.relative_path.cmp(&b.relative_path))
}

fn lowercase_set(names: &[String]) -> HashSet<String> {
    names.iter().map(|name| name.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataEdit;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn classifier_strips_suffix_first() {
        let class = classify("Nuka.esp.disabled").unwrap();
        assert_eq!(class.category, Category::Plugin);
        assert_eq!(class.canonical, "Nuka.esp");
        assert!(class.soft_disabled);

        let class = classify("Text_en.DLSTRINGS").unwrap();
        assert_eq!(class.category, Category::Strings);
        assert!(!class.soft_disabled);

        assert_eq!(classify("mystery.dat.disabled").unwrap().category, Category::Unknown);
        assert!(classify("readme.txt").is_none());
        assert!(classify(".disabled").is_none());
    }

    #[test]
    fn lists_candidates_with_enabled_state_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("Data");
        touch(&data.join("SeventySix - Textures01.ba2"));
        touch(&data.join("SeventySix.esm"));
        touch(&data.join("zeta.ba2"));
        touch(&data.join("Alpha.ba2"));
        touch(&data.join("beta.ba2.disabled"));
        touch(&data.join("a.esp"));
        touch(&data.join("b.esp"));
        touch(&data.join("Strings/Mod_en.strings"));
        touch(&data.join("notes.txt"));

        let registry = ModRegistry::new(&data, Some(data.join("Strings")));
        let metadata = MetadataStore::default();
        let list = registry
            .list(&names(&["ZETA.ba2", "beta.ba2"]), &names(&["b.esp"]), &metadata)
            .unwrap();

        let summary: Vec<(&str, bool)> = list
            .iter()
            .map(|c| (c.original_name.as_str(), c.enabled))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("b.esp", true),
                ("Mod_en.strings", true),
                ("zeta.ba2", true),
                ("a.esp", false),
                ("Alpha.ba2", false),
                ("beta.ba2", false),
            ]
        );
        assert_eq!(list[1].relative_path, PathBuf::from("Strings/Mod_en.strings"));
        assert_eq!(list[0].metadata.author, "Unknown");
    }

    #[test]
    fn alias_becomes_display_name() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("Data");
        touch(&data.join("bi.ba2"));
        let mut metadata = MetadataStore::load(&dir.path().join("meta.json"));
        metadata
            .update(
                "bi.ba2",
                MetadataEdit {
                    alias: Some("Better Inventory".into()),
                    ..MetadataEdit::default()
                },
            )
            .unwrap();

        let list = ModRegistry::new(&data, None)
            .list(&[], &[], &metadata)
            .unwrap();
        assert_eq!(list[0].display_name, "Better Inventory");
        assert_eq!(list[0].original_name, "bi.ba2");
    }

    #[test]
    fn missing_data_root_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModRegistry::new(dir.path().join("nope"), None);
        assert!(matches!(
            registry.list(&[], &[], &MetadataStore::default()),
            Err(ManagerError::MissingRoot(_))
        ));
        assert!(registry.discovered_plugins().is_empty());
    }

    #[test]
    fn toggle_round_trip_restores_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("Data");
        touch(&data.join("Strings/Mod_en.strings"));
        let registry = ModRegistry::new(&data, None);

        let renamed = registry.set_enabled("Mod_en.strings", false).unwrap();
        assert_eq!(renamed, vec![data.join("Strings/Mod_en.strings.disabled")]);
        let list = registry.list(&[], &[], &MetadataStore::default()).unwrap();
        assert!(!list[0].enabled);

        registry.set_enabled("mod_en.strings", true).unwrap();
        assert!(data.join("Strings/Mod_en.strings").exists());
        assert!(!data.join("Strings/Mod_en.strings.disabled").exists());
        let list = registry.list(&[], &[], &MetadataStore::default()).unwrap();
        assert!(list[0].enabled);
        assert_eq!(list[0].original_name, "Mod_en.strings");

        assert!(registry.set_enabled("Mod_en.strings", true).unwrap().is_empty());
    }

    #[test]
    fn external_strings_root_is_scanned() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("Data");
        let strings = dir.path().join("Strings");
        fs::create_dir_all(&data).unwrap();
        touch(&strings.join("Patch_en.ilstrings"));
        let registry = ModRegistry::new(&data, Some(strings));
        let list = registry.list(&[], &[], &MetadataStore::default()).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].category, Category::Strings);
    }

    #[test]
    fn discovered_plugins_keep_disk_order_and_include_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("Data");
        touch(&data.join("a.esp"));
        touch(&data.join("b.esm.disabled"));
        touch(&data.join("NW.esm"));
        touch(&data.join("c.ba2"));
        let registry = ModRegistry::new(&data, None);
        assert_eq!(registry.discovered_plugins(), names(&["a.esp", "b.esm"]));
    }

    #[test]
    fn delete_removes_both_states() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("Data");
        touch(&data.join("dup.ba2"));
        touch(&data.join("sub/dup.ba2.disabled"));
        let registry = ModRegistry::new(&data, None);
        let removed = registry.delete("dup.ba2").unwrap();
        assert_eq!(removed.len(), 2);
        assert!(matches!(
            registry.delete("dup.ba2"),
            Err(ManagerError::NotFound(_))
        ));
    }

    #[test]
    fn archive_list_is_read_from_custom_ini() {
        let dir = tempfile::tempdir().unwrap();
        let ini = dir.path().join("Fallout76Custom.ini");
        fs::write(&ini, "[Archive]\nsResourceArchive2List=a.ba2, ,b.ba2\n").unwrap();
        assert_eq!(enabled_archives(&ini), names(&["a.ba2", "b.ba2"]));
        assert!(enabled_archives(&dir.path().join("missing.ini")).is_empty());
    }
}
