use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const GAME_NAME: &str = "Fallout 76";
pub const STEAM_APP_ID: &str = "1151340";

pub const CUSTOM_INI: &str = "Fallout76Custom.ini";
pub const PREFS_INI: &str = "Fallout76Prefs.ini";
pub const PLUGINS_FILE: &str = "plugins.txt";

pub const ARCHIVE_SECTION: &str = "Archive";
pub const ARCHIVE_LIST_KEY: &str = "sResourceArchive2List";
pub const INVALIDATE_KEY: &str = "bInvalidateOlderFiles";
pub const DATA_DIRS_KEY: &str = "sResourceDataDirsFinal";

const BASE_GAME_PREFIX: &str = "seventysix - ";
const BASE_GAME_FILES: [&str; 3] = ["seventysix.ba2", "seventysix.esm", "nw.esm"];

/// Paths found by probing the usual Steam library locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedPaths {
    pub game_root: PathBuf,
    pub documents_root: PathBuf,
    pub local_app_data_root: PathBuf,
}

pub fn data_dir(game_root: &Path) -> PathBuf {
    game_root.join("Data")
}

pub fn default_strings_root(game_root: &Path) -> PathBuf {
    data_dir(game_root).join("Strings")
}

/// Files shipped with the unmodified game. They are never offered as mods.
pub fn is_base_game_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.starts_with(BASE_GAME_PREFIX) || BASE_GAME_FILES.contains(&lower.as_str())
}

pub fn detect_steam_paths(home: &Path) -> Option<DetectedPaths> {
    let mut libraries = vec![
        home.join(".local/share/Steam/steamapps"),
        home.join(".steam/steam/steamapps"),
        home.join(".var/app/com.valvesoftware.Steam/.local/share/Steam/steamapps"),
    ];

    let mut extra = Vec::new();
    for steamapps in &libraries {
        let vdf = steamapps.join("libraryfolders.vdf");
        if vdf.exists() {
            if let Ok(paths) = parse_steam_library_paths(&vdf) {
                extra.extend(paths.into_iter().map(|path| path.join("steamapps")));
            }
        }
    }
    libraries.extend(extra);
    libraries.extend(removable_libraries(home));

    libraries
        .into_iter()
        .find_map(|steamapps| detect_in_library(&steamapps))
}

fn detect_in_library(steamapps: &Path) -> Option<DetectedPaths> {
    let game_root = steamapps.join("common/Fallout76");
    if !game_root.exists() {
        return None;
    }
    let user = steamapps
        .join("compatdata")
        .join(STEAM_APP_ID)
        .join("pfx/drive_c/users/steamuser");
    Some(DetectedPaths {
        game_root,
        documents_root: user.join("Documents/My Games").join(GAME_NAME),
        local_app_data_root: user.join("AppData/Local/Fallout76"),
    })
}

// SteamOS and Bazzite mount extra drives under /run/media/<user>/<drive>.
fn removable_libraries(home: &Path) -> Vec<PathBuf> {
    let Some(user) = home.file_name() else {
        return Vec::new();
    };
    let media = Path::new("/run/media").join(user);
    let Ok(entries) = fs::read_dir(&media) else {
        return Vec::new();
    };
    entries
        .flatten()
        .map(|entry| entry.path().join("SteamLibrary/steamapps"))
        .collect()
}

fn parse_steam_library_paths(path: &Path) -> Result<Vec<PathBuf>> {
    let raw = fs::read_to_string(path).context("read libraryfolders.vdf")?;
    let mut paths = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if !line.contains("\"path\"") {
            continue;
        }

        let parts: Vec<&str> = line.split('"').collect();
        if parts.len() >= 4 {
            let path = parts[3].replace("\\\\", "\\");
            paths.push(PathBuf::from(path));
        }
    }

    Ok(paths)
}

pub fn looks_like_game_root(path: &Path) -> bool {
    data_dir(path).is_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_game_files_are_recognized() {
        assert!(is_base_game_file("SeventySix - Textures01.ba2"));
        assert!(is_base_game_file("SeventySix.esm"));
        assert!(is_base_game_file("NW.esm"));
        assert!(!is_base_game_file("BetterInventory.ba2"));
        assert!(!is_base_game_file("seventysix-fan.ba2"));
    }

    #[test]
    fn detects_game_in_steam_library() {
        let home = tempfile::tempdir().unwrap();
        let steamapps = home.path().join(".steam/steam/steamapps");
        fs::create_dir_all(steamapps.join("common/Fallout76/Data")).unwrap();

        let detected = detect_steam_paths(home.path()).unwrap();
        assert_eq!(detected.game_root, steamapps.join("common/Fallout76"));
        assert!(looks_like_game_root(&detected.game_root));
        assert!(detected
            .documents_root
            .ends_with("compatdata/1151340/pfx/drive_c/users/steamuser/Documents/My Games/Fallout 76"));
        assert!(detected
            .local_app_data_root
            .ends_with("AppData/Local/Fallout76"));
    }

    #[test]
    fn follows_library_folders_vdf() {
        let home = tempfile::tempdir().unwrap();
        let steamapps = home.path().join(".local/share/Steam/steamapps");
        fs::create_dir_all(&steamapps).unwrap();
        let library = home.path().join("games");
        fs::create_dir_all(library.join("steamapps/common/Fallout76")).unwrap();
        fs::write(
            steamapps.join("libraryfolders.vdf"),
            format!(
                "\"libraryfolders\"\n{{\n  \"1\"\n  {{\n    \"path\"    \"{}\"\n  }}\n}}\n",
                library.display()
            ),
        )
        .unwrap();

        let detected = detect_steam_paths(home.path()).unwrap();
        assert_eq!(detected.game_root, library.join("steamapps/common/Fallout76"));
    }

    #[test]
    fn nothing_detected_in_empty_home() {
        let home = tempfile::tempdir().unwrap();
        assert!(detect_steam_paths(home.path()).is_none());
    }
}
