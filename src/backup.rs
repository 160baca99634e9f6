use crate::config::{DerivedPaths, ProfileId};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMeta {
    pub timestamp: i64,
    pub created: String,
    pub reason: Option<String>,
    pub profile: ProfileId,
    pub files: Vec<BackedUpFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackedUpFile {
    pub name: String,
    pub original: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct LastBackup {
    path: PathBuf,
    timestamp: i64,
}

/// Copies the profile's configuration documents and plugin manifest into a
/// fresh `backup-<unix>` folder. Files that do not exist yet are skipped.
pub fn create_backup(
    backups_root: &Path,
    profile: ProfileId,
    paths: &DerivedPaths,
    reason: Option<&str>,
) -> Result<PathBuf> {
    let now = OffsetDateTime::now_utc();
    let stamp = now.unix_timestamp();
    fs::create_dir_all(backups_root).context("create backups dir")?;
    let backup_dir = unique_dir(backups_root, stamp);
    fs::create_dir_all(&backup_dir).context("create backup dir")?;

    let mut files = Vec::new();
    for source in [&paths.custom_ini, &paths.prefs_ini, &paths.plugins_file] {
        if !source.is_file() {
            continue;
        }
        let Some(name) = source.file_name() else {
            continue;
        };
        fs::copy(source, backup_dir.join(name))
            .with_context(|| format!("back up {}", source.display()))?;
        files.push(BackedUpFile {
            name: name.to_string_lossy().to_string(),
            original: source.clone(),
        });
    }

    let meta = BackupMeta {
        timestamp: stamp,
        created: now.format(&Rfc3339).context("format backup time")?,
        reason: reason.map(|value| value.to_string()),
        profile,
        files,
    };
    let meta_json = serde_json::to_string_pretty(&meta).context("serialize backup meta")?;
    fs::write(backup_dir.join("meta.json"), meta_json).context("write backup meta")?;

    let last = LastBackup {
        path: backup_dir.clone(),
        timestamp: stamp,
    };
    let last_json = serde_json::to_string_pretty(&last).context("serialize last backup")?;
    fs::write(backups_root.join("last.json"), last_json).context("write last backup")?;

    info!(backup = %backup_dir.display(), files = meta.files.len(), "backup created");
    Ok(backup_dir)
}

fn unique_dir(root: &Path, stamp: i64) -> PathBuf {
    let base = root.join(format!("backup-{stamp}"));
    if !base.exists() {
        return base;
    }
    (1..)
        .map(|n| root.join(format!("backup-{stamp}-{n}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(base)
}

pub fn load_last_backup(backups_root: &Path) -> Result<Option<PathBuf>> {
    let path = backups_root.join("last.json");
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path).context("read last backup")?;
    let last: LastBackup = serde_json::from_str(&raw).context("parse last backup")?;
    if last.path.exists() {
        Ok(Some(last.path))
    } else {
        Ok(None)
    }
}

pub fn load_meta(backup_dir: &Path) -> Result<BackupMeta> {
    let raw = fs::read_to_string(backup_dir.join("meta.json")).context("read backup meta")?;
    serde_json::from_str(&raw).context("parse backup meta")
}

/// Copies the most recent backup's files back to where they came from.
/// Returns the backup's metadata, or `None` when there is nothing to restore.
pub fn restore_last(backups_root: &Path) -> Result<Option<BackupMeta>> {
    let Some(backup_dir) = load_last_backup(backups_root)? else {
        return Ok(None);
    };
    let meta = load_meta(&backup_dir)?;
    for file in &meta.files {
        if let Some(parent) = file.original.parent() {
            fs::create_dir_all(parent).context("create restore dir")?;
        }
        fs::copy(backup_dir.join(&file.name), &file.original)
            .with_context(|| format!("restore {}", file.original.display()))?;
    }
    info!(backup = %backup_dir.display(), files = meta.files.len(), "backup restored");
    Ok(Some(meta))
}
