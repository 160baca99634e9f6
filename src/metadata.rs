use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

pub const DEFAULT_AUTHOR: &str = "Unknown";
pub const DEFAULT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Default for ModMetadata {
    fn default() -> Self {
        Self {
            alias: None,
            author: default_author(),
            version: default_version(),
            tags: BTreeSet::new(),
            color: None,
        }
    }
}

/// A partial edit. `Some("")` clears an optional field back to its default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataEdit {
    pub alias: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    pub tags: Option<Vec<String>>,
    pub color: Option<String>,
}

impl MetadataEdit {
    pub fn is_empty(&self) -> bool {
        self.alias.is_none()
            && self.author.is_none()
            && self.version.is_none()
            && self.tags.is_none()
            && self.color.is_none()
    }

    fn apply(self, meta: &mut ModMetadata) {
        if let Some(alias) = self.alias {
            meta.alias = non_empty(alias);
        }
        if let Some(author) = self.author {
            meta.author = non_empty(author).unwrap_or_else(default_author);
        }
        if let Some(version) = self.version {
            meta.version = non_empty(version).unwrap_or_else(default_version);
        }
        if let Some(tags) = self.tags {
            meta.tags = tags
                .into_iter()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect();
        }
        if let Some(color) = self.color {
            meta.color = non_empty(color);
        }
    }
}

/// User-supplied annotations keyed by a mod's canonical file name. Entries
/// outlive the files they describe.
#[derive(Debug, Default)]
pub struct MetadataStore {
    path: PathBuf,
    entries: BTreeMap<String, ModMetadata>,
}

impl MetadataStore {
    /// A missing or unreadable document loads as empty; the next edit
    /// rewrites it.
    pub fn load(path: &Path) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(file = %path.display(), "metadata unreadable, starting empty: {err}");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("create metadata dir")?;
        }
        let raw = serde_json::to_string_pretty(&self.entries).context("serialize metadata")?;
        fs::write(&self.path, raw).context("write metadata")?;
        Ok(())
    }

    pub fn get(&self, original_name: &str) -> Option<&ModMetadata> {
        self.entries.get(original_name)
    }

    /// The stored record, or the defaults when the mod was never annotated.
    pub fn resolve(&self, original_name: &str) -> ModMetadata {
        self.get(original_name).cloned().unwrap_or_default()
    }

    /// Merges `edit` into the record and saves. An empty edit changes
    /// nothing and creates no record.
    pub fn update(&mut self, original_name: &str, edit: MetadataEdit) -> Result<ModMetadata> {
        if edit.is_empty() {
            return Ok(self.resolve(original_name));
        }
        let entry = self.entries.entry(original_name.to_string()).or_default();
        edit.apply(entry);
        let updated = entry.clone();
        self.save()?;
        Ok(updated)
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn default_author() -> String {
    DEFAULT_AUTHOR.to_string()
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unannotated_mods_get_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::load(&dir.path().join("mods_metadata.json"));
        let meta = store.resolve("Better Inventory.ba2");
        assert_eq!(meta.author, "Unknown");
        assert_eq!(meta.version, "1.0");
        assert!(meta.tags.is_empty());
        assert!(meta.alias.is_none());
        assert!(store.entries.is_empty());
    }

    #[test]
    fn first_edit_creates_document_and_later_edits_merge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg/mods_metadata.json");
        let mut store = MetadataStore::load(&path);
        store
            .update(
                "BetterInventory.ba2",
                MetadataEdit {
                    alias: Some("Better Inventory".into()),
                    tags: Some(vec!["ui".into(), " qol ".into(), "ui".into()]),
                    ..MetadataEdit::default()
                },
            )
            .unwrap();
        store
            .update(
                "BetterInventory.ba2",
                MetadataEdit {
                    author: Some("Keretus".into()),
                    ..MetadataEdit::default()
                },
            )
            .unwrap();

        let reloaded = MetadataStore::load(&path);
        let meta = reloaded.get("BetterInventory.ba2").unwrap();
        assert_eq!(meta.alias.as_deref(), Some("Better Inventory"));
        assert_eq!(meta.author, "Keretus");
        assert_eq!(meta.version, "1.0");
        assert_eq!(
            meta.tags.iter().cloned().collect::<Vec<_>>(),
            vec!["qol".to_string(), "ui".to_string()]
        );
    }

    #[test]
    fn empty_values_reset_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MetadataStore::load(&dir.path().join("m.json"));
        store
            .update(
                "a.esp",
                MetadataEdit {
                    alias: Some("A".into()),
                    version: Some("2.1".into()),
                    ..MetadataEdit::default()
                },
            )
            .unwrap();
        let meta = store
            .update(
                "a.esp",
                MetadataEdit {
                    alias: Some(String::new()),
                    version: Some("  ".into()),
                    ..MetadataEdit::default()
                },
            )
            .unwrap();
        assert!(meta.alias.is_none());
        assert_eq!(meta.version, "1.0");
    }

    #[test]
    fn empty_edit_creates_no_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");
        let mut store = MetadataStore::load(&path);
        let meta = store.update("a.esp", MetadataEdit::default()).unwrap();
        assert_eq!(meta, ModMetadata::default());
        assert!(store.get("a.esp").is_none());
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_document_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");
        fs::write(&path, "{not json").unwrap();
        assert!(MetadataStore::load(&path).entries.is_empty());
    }

    #[test]
    fn records_with_missing_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");
        fs::write(&path, r#"{"x.ba2":{"alias":"X"}}"#).unwrap();
        let store = MetadataStore::load(&path);
        let meta = store.resolve("x.ba2");
        assert_eq!(meta.alias.as_deref(), Some("X"));
        assert_eq!(meta.author, "Unknown");
        assert_eq!(store.entries.len(), 1);
    }
}
