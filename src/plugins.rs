use anyhow::{Context, Result};
use std::{collections::HashSet, fs, path::Path};

pub const ACTIVE_MARKER: char = '*';

/// Plugin names marked active in a `plugins.txt` manifest.
pub fn read_active(path: &Path) -> Vec<String> {
    let Ok(raw) = fs::read_to_string(path) else {
        return Vec::new();
    };
    raw.lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(ACTIVE_MARKER))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// One line per discovered plugin, in the given order, marked when active.
/// Duplicate names keep their first position.
pub fn render_manifest(discovered: &[String], active: &[String]) -> String {
    let active: HashSet<String> = active.iter().map(|name| name.to_lowercase()).collect();
    let mut seen = HashSet::new();
    let mut lines = Vec::new();
    for name in discovered {
        if !seen.insert(name.to_lowercase()) {
            continue;
        }
        if active.contains(&name.to_lowercase()) {
            lines.push(format!("{ACTIVE_MARKER}{name}"));
        } else {
            lines.push(name.clone());
        }
    }
    lines.join("\n")
}

pub fn write_manifest(path: &Path, discovered: &[String], active: &[String]) -> Result<()> {
    let parent = path.parent().context("plugins.txt parent")?;
    fs::create_dir_all(parent).context("create plugins.txt dir")?;
    fs::write(path, render_manifest(discovered, active)).context("write plugins.txt")?;
    Ok(())
}

/// Drops every line naming `plugin`, marked or not. Returns whether the
/// manifest changed.
pub fn remove_entry(path: &Path, plugin: &str) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    let raw = fs::read_to_string(path).context("read plugins.txt")?;
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let kept: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| {
            let name = line.strip_prefix(ACTIVE_MARKER).unwrap_or(line).trim();
            !name.eq_ignore_ascii_case(plugin)
        })
        .collect();
    if kept.len() == lines.len() {
        return Ok(false);
    }
    fs::write(path, kept.join("\n")).context("write plugins.txt")?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn manifest_follows_discovery_order() {
        let discovered = names(&["a.esp", "b.esp"]);
        assert_eq!(
            render_manifest(&discovered, &names(&["b.esp"])),
            "a.esp\n*b.esp"
        );
        assert_eq!(
            render_manifest(&discovered, &names(&["b.esp", "a.esp"])),
            "*a.esp\n*b.esp"
        );
    }

    #[test]
    fn manifest_drops_duplicate_discoveries() {
        let discovered = names(&["Nuka.esm", "nuka.esm", "Z.esp"]);
        assert_eq!(render_manifest(&discovered, &[]), "Nuka.esm\nZ.esp");
    }

    #[test]
    fn reads_only_marked_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugins.txt");
        fs::write(&path, "a.esp\r\n*b.esp\n * c.esm \n\n*").unwrap();
        assert_eq!(read_active(&path), names(&["b.esp", "c.esm"]));
        assert!(read_active(&dir.path().join("missing.txt")).is_empty());
    }

    #[test]
    fn write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AppData/Local/Fallout76/plugins.txt");
        write_manifest(&path, &names(&["a.esp"]), &names(&["a.esp"])).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "*a.esp");
    }

    #[test]
    fn remove_entry_strips_marked_and_unmarked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugins.txt");
        fs::write(&path, "*Gone.esp\nkeep.esp\ngone.esp\n").unwrap();
        assert!(remove_entry(&path, "gone.esp").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep.esp");
        assert!(!remove_entry(&path, "gone.esp").unwrap());
    }
}
