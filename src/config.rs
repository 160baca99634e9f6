use crate::fallout76;
use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProfileId {
    #[default]
    Steam,
    Xbox,
}

impl ProfileId {
    pub const ALL: [ProfileId; 2] = [ProfileId::Steam, ProfileId::Xbox];

    pub fn other(self) -> Self {
        match self {
            ProfileId::Steam => ProfileId::Xbox,
            ProfileId::Xbox => ProfileId::Steam,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ProfileId::Steam => "Steam",
            ProfileId::Xbox => "Xbox",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "steam" => Some(ProfileId::Steam),
            "xbox" => Some(ProfileId::Xbox),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Game,
    Documents,
    LocalAppData,
    Strings,
}

impl PathKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "game" => Some(PathKind::Game),
            "docs" | "documents" => Some(PathKind::Documents),
            "appdata" | "localappdata" | "local" => Some(PathKind::LocalAppData),
            "strings" => Some(PathKind::Strings),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PathKind::Game => "game",
            PathKind::Documents => "documents",
            PathKind::LocalAppData => "local app data",
            PathKind::Strings => "strings",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePaths {
    #[serde(default)]
    pub game_root: PathBuf,
    #[serde(default)]
    pub documents_root: PathBuf,
    #[serde(default)]
    pub local_app_data_root: PathBuf,
    #[serde(default)]
    pub strings_root: PathBuf,
}

impl ProfilePaths {
    fn slot_mut(&mut self, kind: PathKind) -> &mut PathBuf {
        match kind {
            PathKind::Game => &mut self.game_root,
            PathKind::Documents => &mut self.documents_root,
            PathKind::LocalAppData => &mut self.local_app_data_root,
            PathKind::Strings => &mut self.strings_root,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformProfile {
    #[serde(default)]
    pub paths: ProfilePaths,
    #[serde(default = "default_settings")]
    pub settings: BTreeMap<String, Value>,
}

impl Default for PlatformProfile {
    fn default() -> Self {
        Self {
            paths: ProfilePaths::default(),
            settings: default_settings(),
        }
    }
}

impl PlatformProfile {
    /// Configuration file locations derived from the stored roots. `None`
    /// when no documents folder is set: such a profile is never written to.
    pub fn derived_paths(&self) -> Option<DerivedPaths> {
        let paths = &self.paths;
        if paths.documents_root.as_os_str().is_empty() {
            return None;
        }
        let documents_root = paths.documents_root.clone();
        let manifest_root = if paths.local_app_data_root.as_os_str().is_empty() {
            &paths.documents_root
        } else {
            &paths.local_app_data_root
        };
        Some(DerivedPaths {
            custom_ini: documents_root.join(fallout76::CUSTOM_INI),
            prefs_ini: documents_root.join(fallout76::PREFS_INI),
            plugins_file: manifest_root.join(fallout76::PLUGINS_FILE),
            strings_root: self.strings_root().unwrap_or_default(),
            documents_root,
        })
    }

    pub fn data_root(&self) -> Option<PathBuf> {
        if self.paths.game_root.as_os_str().is_empty() {
            return None;
        }
        Some(fallout76::data_dir(&self.paths.game_root))
    }

    pub fn strings_root(&self) -> Option<PathBuf> {
        if !self.paths.strings_root.as_os_str().is_empty() {
            return Some(self.paths.strings_root.clone());
        }
        if self.paths.game_root.as_os_str().is_empty() {
            return None;
        }
        Some(fallout76::default_strings_root(&self.paths.game_root))
    }

    fn fill_default_settings(&mut self) {
        for (key, value) in default_settings() {
            self.settings.entry(key).or_insert(value);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedPaths {
    pub documents_root: PathBuf,
    pub custom_ini: PathBuf,
    pub prefs_ini: PathBuf,
    pub plugins_file: PathBuf,
    pub strings_root: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profiles {
    #[serde(default)]
    pub steam: PlatformProfile,
    #[serde(default)]
    pub xbox: PlatformProfile,
}

impl Profiles {
    pub fn get(&self, id: ProfileId) -> &PlatformProfile {
        match id {
            ProfileId::Steam => &self.steam,
            ProfileId::Xbox => &self.xbox,
        }
    }

    pub fn get_mut(&mut self, id: ProfileId) -> &mut PlatformProfile {
        match id {
            ProfileId::Steam => &mut self.steam,
            ProfileId::Xbox => &mut self.xbox,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerSettings {
    #[serde(default = "default_true")]
    pub auto_updates: bool,
    #[serde(default)]
    pub minimize_to_tray: bool,
    #[serde(default = "default_true")]
    pub ui_animations: bool,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            auto_updates: true,
            minimize_to_tray: false,
            ui_animations: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagerState {
    #[serde(default)]
    pub current_profile: ProfileId,
    #[serde(default)]
    pub sync_enabled: bool,
    #[serde(default)]
    pub profiles: Profiles,
    #[serde(default)]
    pub manager_settings: ManagerSettings,
}

/// Owns the [`ManagerState`] document. Every mutator saves the whole
/// document before returning.
#[derive(Debug)]
pub struct ProfileStore {
    state: ManagerState,
    path: PathBuf,
    home: PathBuf,
}

impl ProfileStore {
    pub fn load_or_create(path: &Path, home: &Path) -> Result<Self> {
        let (mut state, mut rewrite) = if path.exists() {
            let raw = fs::read_to_string(path).context("read settings")?;
            match serde_json::from_str::<ManagerState>(&raw) {
                Ok(state) => (state, false),
                Err(err) => {
                    warn!(path = %path.display(), "settings unreadable, starting from defaults: {err}");
                    (ManagerState::default(), true)
                }
            }
        } else {
            (ManagerState::default(), false)
        };
        for id in ProfileId::ALL {
            state.profiles.get_mut(id).fill_default_settings();
        }

        let mut store = Self {
            state,
            path: path.to_path_buf(),
            home: home.to_path_buf(),
        };

        let steam = &store.state.profiles.steam.paths;
        if steam.game_root.as_os_str().is_empty() {
            if let Some(detected) = fallout76::detect_steam_paths(home) {
                info!(game_root = %detected.game_root.display(), "auto-detected Steam install");
                let paths = &mut store.state.profiles.steam.paths;
                paths.game_root = detected.game_root;
                paths.documents_root = detected.documents_root;
                paths.local_app_data_root = detected.local_app_data_root;
            }
            rewrite = true;
        }
        if rewrite {
            store.save()?;
        }
        Ok(store)
    }

    pub fn save(&self) -> Result<()> {
        let parent = self.path.parent().context("settings parent")?;
        fs::create_dir_all(parent).context("create settings dir")?;
        let raw = serde_json::to_string_pretty(&self.state).context("serialize settings")?;
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, raw).context("write settings temp")?;
        fs::rename(&temp, &self.path).context("finalize settings")?;
        Ok(())
    }

    pub fn state(&self) -> &ManagerState {
        &self.state
    }

    pub fn current(&self) -> ProfileId {
        self.state.current_profile
    }

    pub fn sync_enabled(&self) -> bool {
        self.state.sync_enabled
    }

    pub fn profile(&self, id: ProfileId) -> &PlatformProfile {
        self.state.profiles.get(id)
    }

    pub fn active(&self) -> &PlatformProfile {
        self.profile(self.current())
    }

    pub fn derived_paths(&self, id: ProfileId) -> Option<DerivedPaths> {
        self.profile(id).derived_paths()
    }

    /// The counterpart profile's derived paths when sync is on and that
    /// profile is configured.
    pub fn sync_target(&self) -> Option<(ProfileId, DerivedPaths)> {
        if !self.state.sync_enabled {
            return None;
        }
        let other = self.current().other();
        self.derived_paths(other).map(|paths| (other, paths))
    }

    pub fn set_path(&mut self, id: ProfileId, kind: PathKind, value: &str) -> Result<PathBuf> {
        let resolved = self.expand_home(value);
        *self.state.profiles.get_mut(id).paths.slot_mut(kind) = resolved.clone();
        debug!(profile = id.display_name(), kind = kind.label(), path = %resolved.display(), "path updated");
        self.save()?;
        Ok(resolved)
    }

    pub fn set_setting(&mut self, id: ProfileId, key: &str, value: Value) -> Result<()> {
        if self.state.sync_enabled {
            self.state
                .profiles
                .get_mut(id.other())
                .settings
                .insert(key.to_string(), value.clone());
        }
        self.state
            .profiles
            .get_mut(id)
            .settings
            .insert(key.to_string(), value);
        self.save()
    }

    pub fn switch_profile(&mut self, id: ProfileId) -> Result<()> {
        self.state.current_profile = id;
        self.save()
    }

    pub fn toggle_profile(&mut self) -> Result<ProfileId> {
        let next = self.current().other();
        self.switch_profile(next)?;
        Ok(next)
    }

    pub fn set_sync(&mut self, enabled: bool) -> Result<()> {
        self.state.sync_enabled = enabled;
        self.save()
    }

    pub fn set_manager_settings(&mut self, settings: ManagerSettings) -> Result<()> {
        self.state.manager_settings = settings;
        self.save()
    }

    /// Expands a leading `~` against the home directory. An empty value
    /// clears the path.
    pub fn expand_home(&self, value: &str) -> PathBuf {
        let value = value.trim();
        match value.strip_prefix('~') {
            Some(rest) => self.home.join(rest.trim_start_matches(['/', '\\'])),
            None => PathBuf::from(value),
        }
    }
}

/// Locations of the manager's own files, kept apart from the game's.
#[derive(Debug, Clone)]
pub struct ManagerDirs {
    pub config_dir: PathBuf,
    pub home: PathBuf,
}

impl ManagerDirs {
    pub fn locate() -> Result<Self> {
        let base = BaseDirs::new().context("resolve home dir")?;
        Ok(Self {
            config_dir: base.config_dir().join("holotape"),
            home: base.home_dir().to_path_buf(),
        })
    }

    #[cfg(test)]
    pub fn at(config_dir: &Path, home: &Path) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
            home: home.to_path_buf(),
        }
    }

    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.config_dir).context("create config dir")?;
        fs::create_dir_all(self.log_dir()).context("create log dir")?;
        Ok(())
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    pub fn metadata_file(&self) -> PathBuf {
        self.config_dir.join("mods_metadata.json")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.config_dir.join("logs")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.config_dir.join("backups")
    }
}

pub fn default_settings() -> BTreeMap<String, Value> {
    BTreeMap::from([
        ("fov".to_string(), Value::from(90)),
        ("godrays".to_string(), Value::from(true)),
        ("grass".to_string(), Value::from(true)),
        ("shadows".to_string(), Value::from(2048)),
        ("dof".to_string(), Value::from(true)),
        ("taa".to_string(), Value::from("TAA")),
        ("ping".to_string(), Value::from(false)),
        ("bandwidth".to_string(), Value::from(false)),
    ])
}

fn default_true() -> bool {
    true
}
