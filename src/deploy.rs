use crate::{
    backup,
    config::{DerivedPaths, PlatformProfile, ProfileId},
    conflicts::{self, Conflict},
    fallout76, ini,
    library::{self, Category, ModRegistry},
    plugins,
    status::{ManagerError, StatusEvent},
};
use serde::Serialize;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployOutcome {
    Applied,
    AppliedWithConflicts,
    Failed,
}

impl DeployOutcome {
    pub fn label(self) -> &'static str {
        match self {
            DeployOutcome::Applied => "applied",
            DeployOutcome::AppliedWithConflicts => "applied with conflicts",
            DeployOutcome::Failed => "failed",
        }
    }
}

/// An activation list split by category, each keeping the caller's order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Activation {
    pub archives: Vec<String>,
    pub plugins: Vec<String>,
    pub strings: Vec<String>,
}

impl Activation {
    pub fn partition(list: &[String]) -> Self {
        let mut activation = Activation::default();
        for name in list {
            match Category::from_file_name(name) {
                Some(Category::Archive) => activation.archives.push(name.clone()),
                Some(Category::Plugin) => activation.plugins.push(name.clone()),
                Some(Category::Strings) => activation.strings.push(name.clone()),
                _ => debug!(name = %name, "not a deployable file, dropped"),
            }
        }
        activation
    }

    /// The order the game loads archives and plugins in.
    pub fn load_order(&self) -> Vec<String> {
        self.archives
            .iter()
            .chain(self.plugins.iter())
            .cloned()
            .collect()
    }

    pub fn archive_list(&self) -> String {
        self.archives.join(", ")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployPlan {
    pub activation: Activation,
    pub conflicts: Vec<Conflict>,
    /// Archives the preview could only read in part.
    pub notices: Vec<StatusEvent>,
}

/// Partitions the activation list and previews the conflicts its load order
/// would produce, reading each source where the registry found it. Nothing is
/// written.
pub fn plan(activation_list: &[String], registry: &ModRegistry) -> DeployPlan {
    let activation = Activation::partition(activation_list);
    let files = registry.scan().unwrap_or_default();
    let sources = conflicts::sources_for(&activation.load_order(), &files, registry.data_root());
    let overlay = conflicts::resolve(&sources);
    DeployPlan {
        conflicts: overlay.conflicts(),
        notices: overlay.problems.iter().map(StatusEvent::from).collect(),
        activation,
    }
}

/// What a deployment needs to know about one profile.
#[derive(Debug, Clone)]
pub struct ProfileTarget {
    pub id: ProfileId,
    pub data_root: Option<PathBuf>,
    pub strings_root: Option<PathBuf>,
    pub paths: Option<DerivedPaths>,
}

impl ProfileTarget {
    pub fn from_profile(id: ProfileId, profile: &PlatformProfile) -> Self {
        Self {
            id,
            data_root: profile.data_root(),
            strings_root: profile.strings_root(),
            paths: profile.derived_paths(),
        }
    }

    fn registry(&self) -> Option<ModRegistry> {
        self.data_root
            .as_ref()
            .map(|root| ModRegistry::new(root, self.strings_root.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub backup: bool,
    pub reason: Option<String>,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            backup: true,
            reason: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub outcome: DeployOutcome,
    pub conflicts: Vec<Conflict>,
    pub events: Vec<StatusEvent>,
    pub backup: Option<PathBuf>,
    pub synced: Option<ProfileId>,
    pub renamed: usize,
}

impl DeployReport {
    fn failed(event: StatusEvent) -> Self {
        Self {
            outcome: DeployOutcome::Failed,
            conflicts: Vec::new(),
            events: vec![event],
            backup: None,
            synced: None,
            renamed: 0,
        }
    }
}

/// Writes a plan to disk for the active profile and, when given, mirrors the
/// archive keys and plugin manifest to the sync counterpart.
pub fn apply(
    active: &ProfileTarget,
    counterpart: Option<&ProfileTarget>,
    backups_root: &Path,
    plan: &DeployPlan,
    options: &DeployOptions,
) -> DeployReport {
    let Some(paths) = active.paths.as_ref() else {
        return DeployReport::failed(StatusEvent::from(&ManagerError::ConfigUnavailable(
            active.id,
        )));
    };
    let Some(registry) = active.registry() else {
        return DeployReport::failed(StatusEvent::from(&ManagerError::GameRootUnset(active.id)));
    };
    if !registry.data_root().is_dir() {
        return DeployReport::failed(StatusEvent::from(&ManagerError::MissingRoot(
            registry.data_root().to_path_buf(),
        )));
    }

    let mut events = plan.notices.clone();
    let mut backup_dir = None;
    if options.backup {
        match backup::create_backup(backups_root, active.id, paths, options.reason.as_deref()) {
            Ok(dir) => backup_dir = Some(dir),
            Err(err) => {
                warn!("backup failed: {err:#}");
                events.push(StatusEvent::warn(format!("Backup failed: {err:#}")));
            }
        }
    }

    let discovered = registry.discovered_plugins();
    let own_errors = write_profile(paths, &discovered, &plan.activation);
    let failed = !own_errors.is_empty();
    events.extend(own_errors.iter().map(StatusEvent::from));

    let (renamed, rename_errors) = sync_strings(&registry, &plan.activation.strings);
    events.extend(rename_errors.iter().map(StatusEvent::from));

    let mut synced = None;
    if let Some(other) = counterpart {
        if let Some(other_paths) = other.paths.as_ref() {
            let other_discovered = other
                .registry()
                .filter(|registry| registry.data_root().is_dir())
                .map(|registry| registry.discovered_plugins())
                .unwrap_or_else(|| discovered.clone());
            let errors = write_profile(other_paths, &other_discovered, &plan.activation);
            if errors.is_empty() {
                info!(profile = other.id.display_name(), "mirrored deployment");
                events.push(StatusEvent::info(format!(
                    "Mirrored to the {} profile.",
                    other.id.display_name()
                )));
                synced = Some(other.id);
            }
            events.extend(errors.iter().map(StatusEvent::from));
        }
    }

    let outcome = if failed {
        DeployOutcome::Failed
    } else if plan.conflicts.is_empty() {
        DeployOutcome::Applied
    } else {
        DeployOutcome::AppliedWithConflicts
    };
    info!(
        profile = active.id.display_name(),
        archives = plan.activation.archives.len(),
        plugins = plan.activation.plugins.len(),
        strings = plan.activation.strings.len(),
        conflicts = plan.conflicts.len(),
        outcome = outcome.label(),
        "deployment finished"
    );
    events.push(match outcome {
        DeployOutcome::Applied => StatusEvent::success("Load order deployed."),
        DeployOutcome::AppliedWithConflicts => StatusEvent::warn(format!(
            "Load order deployed with {} file conflict(s).",
            plan.conflicts.len()
        )),
        DeployOutcome::Failed => StatusEvent::error("Deployment failed."),
    });

    DeployReport {
        outcome,
        conflicts: plan.conflicts.clone(),
        events,
        backup: backup_dir,
        synced,
        renamed,
    }
}

/// The archive keys of both configuration documents, then the manifest.
fn write_profile(
    paths: &DerivedPaths,
    discovered: &[String],
    activation: &Activation,
) -> Vec<ManagerError> {
    let archive_list = activation.archive_list();
    let mut errors = Vec::new();
    for (key, value) in [
        (fallout76::ARCHIVE_LIST_KEY, archive_list.as_str()),
        (fallout76::INVALIDATE_KEY, "1"),
        (fallout76::DATA_DIRS_KEY, ""),
    ] {
        errors.extend(ini::set_profile_key(
            paths,
            fallout76::ARCHIVE_SECTION,
            key,
            value,
        ));
    }
    if let Err(err) = plugins::write_manifest(&paths.plugins_file, discovered, &activation.plugins)
    {
        errors.push(ManagerError::io(
            "write plugin manifest",
            &paths.plugins_file,
            std::io::Error::new(std::io::ErrorKind::Other, format!("{err:#}")),
        ));
    }
    errors
}

/// Renames strings files so exactly the requested ones are enabled.
fn sync_strings(registry: &ModRegistry, enabled: &[String]) -> (usize, Vec<ManagerError>) {
    let wanted: HashSet<String> = enabled.iter().map(|name| name.to_lowercase()).collect();
    let files = match registry.scan() {
        Ok(files) => files,
        Err(err) => return (0, vec![err]),
    };
    let mut renamed = 0;
    let mut errors = Vec::new();
    for file in files
        .iter()
        .filter(|file| file.class.category == Category::Strings)
    {
        let enable = wanted.contains(&file.class.canonical.to_lowercase());
        match library::rename_for_state(file, enable) {
            Ok(Some(_)) => renamed += 1,
            Ok(None) => {}
            Err(err) => errors.push(err),
        }
    }
    (renamed, errors)
}
