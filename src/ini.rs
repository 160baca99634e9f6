use crate::{config::DerivedPaths, status::ManagerError};
use std::{fs, io, path::Path};
use tracing::debug;

/// Sets `key=value` inside `[section]` of the file at `path`, creating the
/// file, the section or the key as needed. Line endings are rewritten as LF.
pub fn set_key(path: &Path, section: &str, key: &str, value: &str) -> Result<(), ManagerError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(ManagerError::io("read config", path, err)),
    };
    let updated = apply_key(&content, section, key, value);
    fs::write(path, updated).map_err(|err| ManagerError::io("write config", path, err))?;
    debug!(file = %path.display(), "[{section}] {key}={value}");
    Ok(())
}

/// Writes one key into both configuration documents of a profile and returns
/// the per-file failures. A profile whose documents folder does not exist on
/// disk is skipped without error.
pub fn set_profile_key(
    paths: &DerivedPaths,
    section: &str,
    key: &str,
    value: &str,
) -> Vec<ManagerError> {
    if !paths.documents_root.is_dir() {
        debug!(
            documents = %paths.documents_root.display(),
            "documents folder missing, skipped [{section}] {key}"
        );
        return Vec::new();
    }
    [&paths.custom_ini, &paths.prefs_ini]
        .into_iter()
        .filter_map(|file| set_key(file, section, key, value).err())
        .collect()
}

pub fn apply_key(content: &str, section: &str, key: &str, value: &str) -> String {
    let normalized = content.replace("\r\n", "\n");
    let mut lines: Vec<String> = if normalized.is_empty() {
        Vec::new()
    } else {
        normalized.split('\n').map(str::to_string).collect()
    };
    update_lines(&mut lines, section, key, value);
    lines.join("\n")
}

fn update_lines(lines: &mut Vec<String>, section: &str, key: &str, value: &str) {
    let header = format!("[{section}]");
    let entry = format!("{key}={value}");

    let Some(start) = lines
        .iter()
        .position(|line| line.trim().eq_ignore_ascii_case(&header))
    else {
        if lines.last().is_some_and(|line| !line.trim().is_empty()) {
            lines.push(String::new());
        }
        lines.push(header);
        lines.push(entry);
        return;
    };

    let end = section_end(lines, start);
    if let Some(existing) = lines[start + 1..end]
        .iter_mut()
        .find(|line| line_key(line).is_some_and(|found| found.eq_ignore_ascii_case(key)))
    {
        *existing = entry;
        return;
    }

    // New keys go after the last non-blank line of the section so the blank
    // separator before the next header stays in place.
    let insert_at = (start + 1..end)
        .rev()
        .find(|&index| !lines[index].trim().is_empty())
        .map(|index| index + 1)
        .unwrap_or(start + 1);
    lines.insert(insert_at, entry);
}

pub fn read_key(path: &Path, section: &str, key: &str) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    read_key_in(&content, section, key)
}

pub fn read_key_in(content: &str, section: &str, key: &str) -> Option<String> {
    let header = format!("[{section}]");
    let mut in_section = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if is_header(trimmed) {
            in_section = trimmed.eq_ignore_ascii_case(&header);
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((found, value)) = trimmed.split_once('=') {
            if found.trim().eq_ignore_ascii_case(key) {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

fn section_end(lines: &[String], start: usize) -> usize {
    lines[start + 1..]
        .iter()
        .position(|line| is_header(line.trim()))
        .map(|offset| start + 1 + offset)
        .unwrap_or(lines.len())
}

fn line_key(line: &str) -> Option<&str> {
    line.split_once('=').map(|(key, _)| key.trim())
}

fn is_header(trimmed: &str) -> bool {
    trimmed.starts_with('[') && trimmed.ends_with(']')
}
