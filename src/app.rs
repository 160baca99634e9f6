use crate::{
    backup::{self, BackupMeta},
    config::{
        DerivedPaths, ManagerDirs, ManagerSettings, PathKind, ProfileId, ProfilePaths,
        ProfileStore,
    },
    conflicts::Conflict,
    deploy::{self, DeployOptions, DeployPlan, DeployReport, ProfileTarget},
    fallout76, ini,
    importer::{self, ImportReport, ImportTargets},
    library::{self, Category, ModCandidate, ModRegistry},
    metadata::{MetadataEdit, MetadataStore, ModMetadata},
    plugins,
    status::{ManagerError, StatusEvent},
    tweaks,
};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashSet},
    path::PathBuf,
};
use tracing::{info, warn};

/// Everything a front end needs to render the manager.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub current_profile: ProfileId,
    pub sync_enabled: bool,
    pub paths: ProfilePaths,
    pub derived: Option<DerivedPaths>,
    pub settings: BTreeMap<String, Value>,
    pub manager_settings: ManagerSettings,
    pub mods: Vec<ModCandidate>,
    pub conflicts: Vec<Conflict>,
    pub events: Vec<StatusEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathCheck {
    pub label: &'static str,
    pub path: PathBuf,
    pub ok: bool,
}

/// The manager core: one profile store, one metadata store, and the
/// operations front ends call. Mutations are serialized by `&mut self`.
pub struct App {
    dirs: ManagerDirs,
    store: ProfileStore,
    metadata: MetadataStore,
}

impl App {
    pub fn with_dirs(dirs: ManagerDirs) -> Result<Self> {
        dirs.ensure()?;
        let store = ProfileStore::load_or_create(&dirs.settings_file(), &dirs.home)
            .context("load settings")?;
        let metadata = MetadataStore::load(&dirs.metadata_file());
        info!(
            profile = store.current().display_name(),
            config = %dirs.config_dir.display(),
            "manager ready"
        );
        Ok(Self {
            dirs,
            store,
            metadata,
        })
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    fn target(&self, id: ProfileId) -> ProfileTarget {
        ProfileTarget::from_profile(id, self.store.profile(id))
    }

    fn counterpart(&self) -> Option<ProfileTarget> {
        self.store
            .sync_enabled()
            .then(|| self.target(self.store.current().other()))
    }

    pub fn registry(&self) -> Result<ModRegistry, ManagerError> {
        let profile = self.store.active();
        let data_root = profile
            .data_root()
            .ok_or(ManagerError::GameRootUnset(self.store.current()))?;
        Ok(ModRegistry::new(data_root, profile.strings_root()))
    }

    fn active_paths(&self) -> Result<DerivedPaths, ManagerError> {
        self.store
            .derived_paths(self.store.current())
            .ok_or(ManagerError::ConfigUnavailable(self.store.current()))
    }

    fn enabled_lists(&self) -> (Vec<String>, Vec<String>) {
        match self.store.derived_paths(self.store.current()) {
            Some(paths) => (
                library::enabled_archives(&paths.custom_ini),
                library::enabled_plugins(&paths.plugins_file),
            ),
            None => (Vec::new(), Vec::new()),
        }
    }

    pub fn list_mods(&self) -> Result<Vec<ModCandidate>, ManagerError> {
        let registry = self.registry()?;
        let (archives, plugins) = self.enabled_lists();
        registry.list(&archives, &plugins, &self.metadata)
    }

    /// The enabled candidates in the order they currently load: archives as
    /// listed in the configuration, plugins as listed in the manifest, then
    /// strings files.
    pub fn current_load_order(&self) -> Result<Vec<String>, ManagerError> {
        let mods = self.list_mods()?;
        let (archives, plugins) = self.enabled_lists();
        let enabled: Vec<&ModCandidate> = mods.iter().filter(|m| m.enabled).collect();

        let mut order = Vec::new();
        let mut seen = HashSet::new();
        for listed in archives.iter().chain(plugins.iter()) {
            if let Some(candidate) = enabled
                .iter()
                .find(|m| m.original_name.eq_ignore_ascii_case(listed))
            {
                if seen.insert(candidate.original_name.to_lowercase()) {
                    order.push(candidate.original_name.clone());
                }
            }
        }
        for candidate in &enabled {
            if seen.insert(candidate.original_name.to_lowercase()) {
                order.push(candidate.original_name.clone());
            }
        }
        Ok(order)
    }

    /// Conflicts of the current load order, plus notices for archives that
    /// could only be read in part.
    pub fn conflicts(&self) -> Result<(Vec<Conflict>, Vec<StatusEvent>), ManagerError> {
        let plan = self.plan_deploy(&self.current_load_order()?)?;
        Ok((plan.conflicts, plan.notices))
    }

    pub fn plan_deploy(&self, activation_list: &[String]) -> Result<DeployPlan, ManagerError> {
        let registry = self.registry()?;
        Ok(deploy::plan(activation_list, &registry))
    }

    pub fn apply_plan(&self, plan: &DeployPlan, options: &DeployOptions) -> DeployReport {
        let active = self.target(self.store.current());
        let counterpart = self.counterpart();
        deploy::apply(
            &active,
            counterpart.as_ref(),
            &self.dirs.backups_dir(),
            plan,
            options,
        )
    }

    pub fn deploy(&self, activation_list: &[String], options: &DeployOptions) -> DeployReport {
        let plan = match self.plan_deploy(activation_list) {
            Ok(plan) => plan,
            Err(err) => {
                // Let apply report the unconfigured profile the usual way.
                warn!("{err}");
                DeployPlan {
                    activation: deploy::Activation::partition(activation_list),
                    conflicts: Vec::new(),
                    notices: Vec::new(),
                }
            }
        };
        self.apply_plan(&plan, options)
    }

    pub fn deploy_all(&self, options: &DeployOptions) -> Result<DeployReport, ManagerError> {
        let order = self.current_load_order()?;
        Ok(self.deploy(&order, options))
    }

    /// Enables or disables one candidate by renaming its files, then
    /// redeploys so the configuration agrees with the files on disk. An
    /// enabled candidate goes to the end of its category's load order.
    pub fn set_enabled(
        &self,
        name: &str,
        enabled: bool,
        options: &DeployOptions,
    ) -> Result<DeployReport, ManagerError> {
        let registry = self.registry()?;
        let files = registry.find(name)?;
        let Some(first) = files.first() else {
            return Err(ManagerError::NotFound(name.to_string()));
        };
        let canonical = first.class.canonical.clone();
        if first.class.category == Category::Unknown {
            warn!(name = %canonical, "unknown file type, only renaming");
        }

        let mut order = self.current_load_order()?;
        order.retain(|entry| !entry.eq_ignore_ascii_case(&canonical));
        registry.set_enabled(&canonical, enabled)?;
        if enabled {
            order.push(canonical);
        }
        Ok(self.deploy(&order, options))
    }

    pub fn update_metadata(&mut self, name: &str, edit: MetadataEdit) -> Result<ModMetadata> {
        let canonical = self
            .registry()
            .ok()
            .and_then(|registry| registry.find(name).ok())
            .and_then(|files| files.into_iter().next())
            .map(|file| file.class.canonical)
            .unwrap_or_else(|| name.to_string());
        self.metadata.update(&canonical, edit)
    }

    pub fn set_path(&mut self, profile: ProfileId, kind: PathKind, value: &str) -> Result<PathBuf> {
        self.store.set_path(profile, kind, value)
    }

    pub fn switch_profile(&mut self, profile: ProfileId) -> Result<()> {
        self.store.switch_profile(profile)
    }

    pub fn toggle_profile(&mut self) -> Result<ProfileId> {
        self.store.toggle_profile()
    }

    pub fn set_sync(&mut self, enabled: bool) -> Result<()> {
        self.store.set_sync(enabled)
    }

    pub fn set_manager_settings(&mut self, settings: ManagerSettings) -> Result<()> {
        self.store.set_manager_settings(settings)
    }

    fn tweak_targets(&self) -> Vec<DerivedPaths> {
        let mut targets: Vec<DerivedPaths> = self
            .store
            .derived_paths(self.store.current())
            .into_iter()
            .collect();
        if let Some((_, paths)) = self.store.sync_target() {
            targets.push(paths);
        }
        targets
    }

    /// Stores a tweak setting on the current profile (mirrored when syncing)
    /// and writes it into every configured profile's documents.
    pub fn set_tweak(&mut self, id: &str, value: Value) -> Result<Vec<StatusEvent>> {
        self.store
            .set_setting(self.store.current(), id, value.clone())?;
        let errors = tweaks::write_tweak(&self.tweak_targets(), id, &value);
        let mut events: Vec<StatusEvent> = errors.iter().map(StatusEvent::from).collect();
        if tweaks::mapping(id).is_none() {
            events.push(StatusEvent::warn(format!(
                "{id} has no configuration key; stored only."
            )));
        } else if errors.is_empty() {
            events.push(StatusEvent::success(format!("{id} updated.")));
        }
        Ok(events)
    }

    pub fn apply_tweaks(&self) -> Vec<StatusEvent> {
        let errors = tweaks::write_all(&self.tweak_targets(), &self.store.active().settings);
        let mut events: Vec<StatusEvent> = errors.iter().map(StatusEvent::from).collect();
        if errors.is_empty() {
            events.push(StatusEvent::success("INI changes applied and synced."));
        }
        events
    }

    /// Effective value of every known tweak in the current profile's
    /// documents.
    pub fn read_tweaks(&self) -> BTreeMap<String, Option<String>> {
        let paths = self.store.derived_paths(self.store.current());
        tweaks::TWEAK_IDS
            .iter()
            .map(|id| {
                let value = paths.as_ref().and_then(|paths| tweaks::read_tweak(paths, id));
                (id.to_string(), value)
            })
            .collect()
    }

    pub fn import(&self, sources: &[PathBuf]) -> Result<ImportReport, ManagerError> {
        let registry = self.registry()?;
        let strings_root = self
            .store
            .active()
            .strings_root()
            .unwrap_or_else(|| registry.data_root().join("Strings"));
        let targets = ImportTargets {
            data_root: registry.data_root().to_path_buf(),
            strings_root,
        };
        Ok(importer::import_files(&targets, sources))
    }

    /// Deletes a candidate's files and drops it from the archive list and
    /// the plugin manifest.
    pub fn delete_mod(&self, name: &str) -> Result<Vec<StatusEvent>, ManagerError> {
        let registry = self.registry()?;
        let removed = registry.delete(name)?;
        let canonical = removed
            .first()
            .and_then(|path| path.file_name())
            .and_then(|file| library::classify(&file.to_string_lossy()))
            .map(|class| class.canonical)
            .unwrap_or_else(|| name.to_string());

        let mut events = vec![StatusEvent::success(format!(
            "Deleted {} file(s) for {canonical}.",
            removed.len()
        ))];
        let Ok(paths) = self.active_paths() else {
            return Ok(events);
        };

        let archives = library::enabled_archives(&paths.custom_ini);
        let kept: Vec<String> = archives
            .iter()
            .filter(|entry| !entry.eq_ignore_ascii_case(&canonical))
            .cloned()
            .collect();
        if kept.len() != archives.len() {
            let errors = ini::set_profile_key(
                &paths,
                fallout76::ARCHIVE_SECTION,
                fallout76::ARCHIVE_LIST_KEY,
                &kept.join(", "),
            );
            events.extend(errors.iter().map(StatusEvent::from));
            info!(name = %canonical, "removed from archive list");
        }
        match plugins::remove_entry(&paths.plugins_file, &canonical) {
            Ok(true) => info!(name = %canonical, "removed from plugin manifest"),
            Ok(false) => {}
            Err(err) => events.push(StatusEvent::error(format!("{err:#}"))),
        }
        Ok(events)
    }

    pub fn restore_backup(&self) -> Result<Option<BackupMeta>> {
        backup::restore_last(&self.dirs.backups_dir())
    }

    /// Whether the current profile's folders exist.
    pub fn check(&self) -> Vec<PathCheck> {
        let paths = &self.store.active().paths;
        let mut checks = vec![
            PathCheck {
                label: "game",
                ok: fallout76::looks_like_game_root(&paths.game_root),
                path: paths.game_root.clone(),
            },
            PathCheck {
                label: "documents",
                ok: paths.documents_root.is_dir(),
                path: paths.documents_root.clone(),
            },
        ];
        if !paths.local_app_data_root.as_os_str().is_empty() {
            checks.push(PathCheck {
                label: "local app data",
                ok: paths.local_app_data_root.is_dir(),
                path: paths.local_app_data_root.clone(),
            });
        }
        checks
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut events = Vec::new();
        let mods = self.list_mods().unwrap_or_else(|err| {
            events.push(StatusEvent::from(&err));
            Vec::new()
        });
        let conflicts = if mods.is_empty() {
            Vec::new()
        } else {
            let (conflicts, notices) = self.conflicts().unwrap_or_default();
            events.extend(notices);
            conflicts
        };
        let profile = self.store.active();
        Snapshot {
            current_profile: self.store.current(),
            sync_enabled: self.store.sync_enabled(),
            paths: profile.paths.clone(),
            derived: profile.derived_paths(),
            settings: profile.settings.clone(),
            manager_settings: self.store.state().manager_settings.clone(),
            mods,
            conflicts,
            events,
        }
    }
}
