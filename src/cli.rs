use crate::{
    app::App,
    config::{ManagerDirs, PathKind, ProfileId},
    conflicts::{self, Conflict},
    deploy::{DeployOptions, DeployReport},
    library::ModCandidate,
    logging,
    metadata::MetadataEdit,
    status::StatusEvent,
    tweaks,
};
use anyhow::{anyhow, bail, Result};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct GlobalOptions {
    format: OutputFormat,
    profile: Option<ProfileId>,
    verbosity: i8,
}

#[derive(Debug, PartialEq)]
enum CliCommand {
    ModsList(ModsListOptions),
    Conflicts,
    Deploy {
        names: Vec<String>,
        options: DeployFlags,
    },
    DeployAll(DeployFlags),
    Enable(String),
    Disable(String),
    Meta {
        name: String,
        edit: MetadataEdit,
    },
    Paths,
    SetPath {
        kind: PathKind,
        value: String,
    },
    Profile(ProfileAction),
    Sync(bool),
    Tweak {
        id: String,
        value: String,
    },
    Tweaks,
    ApplyTweaks,
    Check,
    Status,
    ManagerSetting {
        key: String,
        enabled: bool,
    },
    Import(Vec<PathBuf>),
    Delete(String),
    Restore,
    Help,
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeployFlags {
    backup: bool,
    abort_on_conflict: bool,
}

impl Default for DeployFlags {
    fn default() -> Self {
        Self {
            backup: true,
            abort_on_conflict: false,
        }
    }
}

impl DeployFlags {
    fn options(self, reason: &str) -> DeployOptions {
        DeployOptions {
            backup: self.backup,
            reason: Some(reason.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProfileAction {
    Show,
    Switch,
    Select(ProfileId),
}

#[derive(Debug, Default, PartialEq)]
struct ModsListOptions {
    sort: ModSortKey,
    reverse: bool,
    filter: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum ModSortKey {
    #[default]
    Status,
    Name,
    Category,
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (global, command) = parse_args(&args)?;
    match command {
        CliCommand::Help => {
            print_help();
            Ok(())
        }
        CliCommand::Version => {
            println!("Holotape v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        command => {
            let dirs = ManagerDirs::locate()?;
            logging::init(&dirs.log_dir(), global.verbosity)?;
            let mut app = App::with_dirs(dirs)?;
            run_command(&mut app, command, &global)
        }
    }
}

fn parse_args(args: &[String]) -> Result<(GlobalOptions, CliCommand)> {
    let (global, tokens) = parse_global_options(args)?;
    let command = parse_subcommand(&tokens)?;
    Ok((global, command))
}

fn parse_global_options(args: &[String]) -> Result<(GlobalOptions, Vec<String>)> {
    let mut format = OutputFormat::Text;
    let mut profile = None;
    let mut verbosity = 0i8;
    let mut tokens = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(value) = arg.strip_prefix("--format=") {
            format = parse_format(value)?;
            continue;
        }
        if arg == "--format" {
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("--format requires a value"))?;
            format = parse_format(value)?;
            continue;
        }
        if let Some(value) = arg.strip_prefix("--profile=") {
            profile = Some(parse_profile(value)?);
            continue;
        }
        if arg == "--profile" {
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("--profile requires a value"))?;
            profile = Some(parse_profile(value)?);
            continue;
        }
        match arg.as_str() {
            "-q" | "--quiet" => verbosity = -1,
            "--verbose" => verbosity = verbosity.max(0) + 1,
            _ if arg.starts_with("-v") && arg[1..].chars().all(|ch| ch == 'v') => {
                verbosity = arg.chars().filter(|ch| *ch == 'v').count().min(3) as i8;
            }
            _ => tokens.push(arg.to_string()),
        }
    }

    Ok((
        GlobalOptions {
            format,
            profile,
            verbosity,
        },
        tokens,
    ))
}

fn parse_format(value: &str) -> Result<OutputFormat> {
    OutputFormat::parse(value).ok_or_else(|| anyhow!("Unknown format: {value} (use json or text)"))
}

fn parse_profile(value: &str) -> Result<ProfileId> {
    ProfileId::parse(value).ok_or_else(|| anyhow!("Unknown profile: {value} (use steam or xbox)"))
}

fn parse_subcommand(tokens: &[String]) -> Result<CliCommand> {
    let Some(head) = tokens.first() else {
        return Ok(CliCommand::Help);
    };
    let rest = tokens.get(1..).unwrap_or(&[]);
    let command = match head.as_str() {
        "help" | "--help" | "-h" => CliCommand::Help,
        "version" | "--version" | "-V" => CliCommand::Version,
        "mods" => CliCommand::ModsList(parse_mods_list(rest)?),
        "conflicts" => CliCommand::Conflicts,
        "deploy" => {
            let (options, names) = parse_deploy_flags(rest)?;
            if names.is_empty() {
                bail!("deploy requires one or more mod file names (or use deploy-all)");
            }
            CliCommand::Deploy { names, options }
        }
        "deploy-all" => {
            let (options, _) = parse_deploy_flags(rest)?;
            CliCommand::DeployAll(options)
        }
        "enable" => CliCommand::Enable(required(rest, 0, "enable requires a mod name")?),
        "disable" => CliCommand::Disable(required(rest, 0, "disable requires a mod name")?),
        "meta" => {
            let name = required(rest, 0, "meta requires a mod name")?;
            let edit = parse_meta_flags(rest.get(1..).unwrap_or(&[]))?;
            if edit.is_empty() {
                bail!("meta requires at least one of --alias --author --version --tags --color");
            }
            CliCommand::Meta { name, edit }
        }
        "paths" => CliCommand::Paths,
        "set-path" => {
            let raw = required(rest, 0, "set-path requires <game|docs|appdata|strings> <path>")?;
            let kind = PathKind::parse(&raw).ok_or_else(|| anyhow!("Unknown path kind: {raw}"))?;
            let value = rest.get(1..).unwrap_or(&[]).join(" ");
            CliCommand::SetPath { kind, value }
        }
        "profile" => match rest.first().map(|value| value.as_str()) {
            None => CliCommand::Profile(ProfileAction::Show),
            Some("switch" | "toggle") => CliCommand::Profile(ProfileAction::Switch),
            Some(value) => CliCommand::Profile(ProfileAction::Select(parse_profile(value)?)),
        },
        "sync" => CliCommand::Sync(parse_switch(rest.first(), "sync requires on or off")?),
        "status" => CliCommand::Status,
        "manager-setting" => {
            let key = required(rest, 0, "manager-setting requires <key> <on|off>")?;
            if !MANAGER_SETTING_KEYS.contains(&key.as_str()) {
                bail!("Unknown manager setting: {key}");
            }
            let enabled = parse_switch(rest.get(1), "manager-setting requires <key> <on|off>")?;
            CliCommand::ManagerSetting { key, enabled }
        }
        "tweak" => {
            let id = required(rest, 0, "tweak requires <id> <value>")?;
            let value = required(rest, 1, "tweak requires <id> <value>")?;
            CliCommand::Tweak { id, value }
        }
        "tweaks" => CliCommand::Tweaks,
        "apply-tweaks" => CliCommand::ApplyTweaks,
        "check" => CliCommand::Check,
        "import" => {
            if rest.is_empty() {
                bail!("import requires one or more paths");
            }
            CliCommand::Import(rest.iter().map(PathBuf::from).collect())
        }
        "delete" => CliCommand::Delete(required(rest, 0, "delete requires a mod name")?),
        "restore" => CliCommand::Restore,
        other => bail!("Unknown command: {other} (see holotape help)"),
    };
    Ok(command)
}

const MANAGER_SETTING_KEYS: [&str; 3] = ["auto-updates", "minimize-to-tray", "ui-animations"];

fn parse_switch(value: Option<&String>, message: &str) -> Result<bool> {
    match value.map(|value| value.as_str()) {
        Some("on" | "true" | "1") => Ok(true),
        Some("off" | "false" | "0") => Ok(false),
        _ => Err(anyhow!(message.to_string())),
    }
}

fn required(args: &[String], index: usize, message: &str) -> Result<String> {
    args.get(index)
        .cloned()
        .ok_or_else(|| anyhow!(message.to_string()))
}

fn parse_mods_list(args: &[String]) -> Result<ModsListOptions> {
    let mut options = ModsListOptions::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "list" => {}
            "--sort" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--sort requires a value"))?;
                options.sort = parse_sort_key(value)?;
            }
            value if value.starts_with("--sort=") => {
                options.sort = parse_sort_key(value.trim_start_matches("--sort="))?;
            }
            "--reverse" | "-r" => options.reverse = true,
            "--filter" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--filter requires a value"))?;
                options.filter = Some(value.to_string());
            }
            value if value.starts_with("--filter=") => {
                options.filter = Some(value.trim_start_matches("--filter=").to_string());
            }
            _ => {}
        }
    }
    Ok(options)
}

fn parse_sort_key(value: &str) -> Result<ModSortKey> {
    match value {
        "status" => Ok(ModSortKey::Status),
        "name" => Ok(ModSortKey::Name),
        "category" | "kind" => Ok(ModSortKey::Category),
        _ => bail!("Unknown sort key: {value}"),
    }
}

fn parse_deploy_flags(args: &[String]) -> Result<(DeployFlags, Vec<String>)> {
    let mut flags = DeployFlags::default();
    let mut names = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--no-backup" => flags.backup = false,
            "--abort-on-conflict" => flags.abort_on_conflict = true,
            value if value.starts_with("--") => bail!("Unknown deploy option: {value}"),
            value => names.push(value.to_string()),
        }
    }
    Ok((flags, names))
}

fn parse_meta_flags(args: &[String]) -> Result<MetadataEdit> {
    let mut flags = MetadataEdit::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let (key, inline) = match arg.split_once('=') {
            Some((key, value)) => (key, Some(value.to_string())),
            None => (arg.as_str(), None),
        };
        let mut value = || -> Result<String> {
            match inline.clone() {
                Some(value) => Ok(value),
                None => iter
                    .next()
                    .cloned()
                    .ok_or_else(|| anyhow!("{key} requires a value")),
            }
        };
        match key {
            "--alias" => flags.alias = Some(value()?),
            "--author" => flags.author = Some(value()?),
            "--version" => flags.version = Some(value()?),
            "--color" => flags.color = Some(value()?),
            "--tags" => {
                flags.tags = Some(
                    value()?
                        .split(',')
                        .map(|tag| tag.trim().to_string())
                        .filter(|tag| !tag.is_empty())
                        .collect(),
                )
            }
            other => bail!("Unknown meta option: {other}"),
        }
    }
    Ok(flags)
}

fn run_command(app: &mut App, command: CliCommand, global: &GlobalOptions) -> Result<()> {
    let format = global.format;
    match command {
        CliCommand::ModsList(options) => list_mods(app, options, format),
        CliCommand::Conflicts => {
            let (found, notices) = app.conflicts()?;
            print_conflicts(&found, format)?;
            if format == OutputFormat::Text {
                notices.iter().for_each(print_event);
            }
            Ok(())
        }
        CliCommand::Deploy { names, options } => deploy(app, &names, options, format),
        CliCommand::DeployAll(options) if options.abort_on_conflict => {
            let names = app.current_load_order()?;
            deploy(app, &names, options, format)
        }
        CliCommand::DeployAll(options) => {
            let report = app.deploy_all(&options.options("deploy-all"))?;
            print_report(&report, format)
        }
        CliCommand::Enable(name) => {
            let report = app.set_enabled(&name, true, &DeployFlags::default().options("enable"))?;
            print_report(&report, format)
        }
        CliCommand::Disable(name) => {
            let report =
                app.set_enabled(&name, false, &DeployFlags::default().options("disable"))?;
            print_report(&report, format)
        }
        CliCommand::Meta { name, edit } => {
            let meta = app.update_metadata(&name, edit)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&meta)?),
                OutputFormat::Text => {
                    println!("{name}");
                    if let Some(alias) = &meta.alias {
                        println!("  Alias: {alias}");
                    }
                    println!("  Author: {}", meta.author);
                    println!("  Version: {}", meta.version);
                    if !meta.tags.is_empty() {
                        let tags: Vec<&str> = meta.tags.iter().map(String::as_str).collect();
                        println!("  Tags: {}", tags.join(", "));
                    }
                    if let Some(color) = &meta.color {
                        println!("  Color: {color}");
                    }
                }
            }
            Ok(())
        }
        CliCommand::Paths => list_paths(app, global),
        CliCommand::SetPath { kind, value } => {
            let profile = global.profile.unwrap_or_else(|| app.store().current());
            let stored = app.set_path(profile, kind, &value)?;
            println!(
                "{} {} path: {}",
                profile.display_name(),
                kind.label(),
                stored.display()
            );
            Ok(())
        }
        CliCommand::Profile(action) => {
            match action {
                ProfileAction::Show => {}
                ProfileAction::Switch => {
                    app.toggle_profile()?;
                }
                ProfileAction::Select(id) => app.switch_profile(id)?,
            }
            let store = app.store();
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({
                        "current_profile": store.current(),
                        "sync_enabled": store.sync_enabled(),
                    })
                ),
                OutputFormat::Text => {
                    for id in ProfileId::ALL {
                        let marker = if id == store.current() { "*" } else { " " };
                        println!("{marker} {}", id.display_name());
                    }
                    let sync = if store.sync_enabled() { "on" } else { "off" };
                    println!("Sync: {sync}");
                }
            }
            Ok(())
        }
        CliCommand::Sync(enabled) => {
            app.set_sync(enabled)?;
            println!("Sync {}", if enabled { "on" } else { "off" });
            Ok(())
        }
        CliCommand::Tweak { id, value } => {
            let events = app.set_tweak(&id, tweaks::parse_value(&value))?;
            print_events(&events, format)
        }
        CliCommand::Tweaks => {
            let values = app.read_tweaks();
            let stored = &app.store().active().settings;
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "stored": stored,
                        "effective": values,
                    }))?
                ),
                OutputFormat::Text => {
                    for (id, value) in &values {
                        let stored = stored
                            .get(id)
                            .and_then(tweaks::render_value)
                            .unwrap_or_else(|| "-".to_string());
                        let effective = value.as_deref().unwrap_or("-");
                        println!("{id:<10} stored={stored:<8} ini={effective}");
                    }
                }
            }
            Ok(())
        }
        CliCommand::ApplyTweaks => print_events(&app.apply_tweaks(), format),
        CliCommand::Check => {
            let checks = app.check();
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&checks)?),
                OutputFormat::Text => {
                    for check in &checks {
                        let status = if check.ok { "ok" } else { "MISSING" };
                        println!("{:<15} {status:<8} {}", check.label, check.path.display());
                    }
                }
            }
            if checks.iter().all(|check| check.ok) {
                Ok(())
            } else {
                bail!("Integrity check failed")
            }
        }
        CliCommand::Status => {
            let snapshot = app.snapshot();
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
                OutputFormat::Text => {
                    let enabled = snapshot.mods.iter().filter(|item| item.enabled).count();
                    let sync = if snapshot.sync_enabled { "on" } else { "off" };
                    println!("Profile: {}", snapshot.current_profile.display_name());
                    println!("Sync: {sync}");
                    println!("Mods: {} ({enabled} enabled)", snapshot.mods.len());
                    println!("Conflicts: {}", snapshot.conflicts.len());
                    for event in &snapshot.events {
                        print_event(event);
                    }
                }
            }
            Ok(())
        }
        CliCommand::ManagerSetting { key, enabled } => {
            let mut settings = app.store().state().manager_settings.clone();
            match key.as_str() {
                "auto-updates" => settings.auto_updates = enabled,
                "minimize-to-tray" => settings.minimize_to_tray = enabled,
                _ => settings.ui_animations = enabled,
            }
            app.set_manager_settings(settings)?;
            println!("{key}: {}", if enabled { "on" } else { "off" });
            Ok(())
        }
        CliCommand::Import(paths) => {
            let report = app.import(&paths)?;
            print_events(&report.events(), format)
        }
        CliCommand::Delete(name) => {
            let events = app.delete_mod(&name)?;
            print_events(&events, format)
        }
        CliCommand::Restore => {
            match app.restore_backup()? {
                Some(meta) => println!(
                    "Restored {} file(s) from backup taken {} ({}).",
                    meta.files.len(),
                    meta.created,
                    meta.profile.display_name()
                ),
                None => println!("No backup to restore."),
            }
            Ok(())
        }
        CliCommand::Help | CliCommand::Version => Ok(()),
    }
}

fn deploy(app: &App, names: &[String], flags: DeployFlags, format: OutputFormat) -> Result<()> {
    let plan = app.plan_deploy(names)?;
    if flags.abort_on_conflict && !plan.conflicts.is_empty() {
        print_conflicts(&plan.conflicts, format)?;
        bail!(
            "Deployment aborted: {} file conflict(s) in the requested order",
            plan.conflicts.len()
        );
    }
    let report = app.apply_plan(&plan, &flags.options("deploy"));
    print_report(&report, format)
}

fn print_report(report: &DeployReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            if !report.conflicts.is_empty() {
                print_conflicts(&report.conflicts, OutputFormat::Text)?;
            }
            if let Some(backup) = &report.backup {
                println!("Backup: {}", backup.display());
            }
            for event in &report.events {
                print_event(event);
            }
        }
    }
    Ok(())
}

fn print_events(events: &[StatusEvent], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(events)?),
        OutputFormat::Text => events.iter().for_each(print_event),
    }
    Ok(())
}

fn print_event(event: &StatusEvent) {
    println!("[{}] {}", event.level.label(), event.message);
}

fn print_conflicts(found: &[Conflict], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(found)?),
        OutputFormat::Text => {
            if found.is_empty() {
                println!("No file conflicts detected.");
            }
            for conflict in found {
                println!(
                    "{}: {} -> {}",
                    conflict.path,
                    conflict.contributors.join(", "),
                    conflict.winner
                );
            }
            let overridden = conflicts::overridden_sources(found);
            if !overridden.is_empty() {
                println!("Overridden: {}", overridden.join(", "));
            }
        }
    }
    Ok(())
}

fn list_mods(app: &App, options: ModsListOptions, format: OutputFormat) -> Result<()> {
    let mut items = app.list_mods()?;
    filter_and_sort(&mut items, &options);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
        OutputFormat::Text => {
            for item in items {
                let enabled = if item.enabled { "x" } else { " " };
                println!(
                    "[{enabled}] {kind:<8} {version:<6} {name}",
                    kind = item.category.label(),
                    version = item.metadata.version,
                    name = item.display_name
                );
            }
        }
    }
    Ok(())
}

fn filter_and_sort(items: &mut Vec<ModCandidate>, options: &ModsListOptions) {
    if let Some(filter) = &options.filter {
        let needle = filter.to_lowercase();
        items.retain(|item| {
            item.display_name.to_lowercase().contains(&needle)
                || item.original_name.to_lowercase().contains(&needle)
                || item.metadata.tags.iter().any(|tag| tag.to_lowercase() == needle)
        });
    }
    match options.sort {
        ModSortKey::Status => {}
        ModSortKey::Name => {
            items.sort_by_key(|item| item.display_name.to_lowercase());
        }
        ModSortKey::Category => items.sort_by_key(|item| item.category.label()),
    }
    if options.reverse {
        items.reverse();
    }
}

#[derive(Serialize)]
struct PathsOutput {
    profile: ProfileId,
    game_root: String,
    documents_root: String,
    local_app_data_root: String,
    strings_root: String,
    custom_ini: Option<String>,
    prefs_ini: Option<String>,
    plugins_file: Option<String>,
}

fn list_paths(app: &App, global: &GlobalOptions) -> Result<()> {
    let id = global.profile.unwrap_or_else(|| app.store().current());
    let profile = app.store().profile(id);
    let derived = profile.derived_paths();
    let output = PathsOutput {
        profile: id,
        game_root: profile.paths.game_root.display().to_string(),
        documents_root: profile.paths.documents_root.display().to_string(),
        local_app_data_root: profile.paths.local_app_data_root.display().to_string(),
        strings_root: profile
            .strings_root()
            .map(|path| path.display().to_string())
            .unwrap_or_default(),
        custom_ini: derived
            .as_ref()
            .map(|paths| paths.custom_ini.display().to_string()),
        prefs_ini: derived
            .as_ref()
            .map(|paths| paths.prefs_ini.display().to_string()),
        plugins_file: derived
            .as_ref()
            .map(|paths| paths.plugins_file.display().to_string()),
    };

    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputFormat::Text => {
            let unset = |value: &str| {
                if value.is_empty() {
                    "(not set)".to_string()
                } else {
                    value.to_string()
                }
            };
            println!("Profile: {}", id.display_name());
            println!("Game root: {}", unset(&output.game_root));
            println!("Documents: {}", unset(&output.documents_root));
            println!("Local app data: {}", unset(&output.local_app_data_root));
            println!("Strings: {}", unset(&output.strings_root));
            match (&output.custom_ini, &output.prefs_ini, &output.plugins_file) {
                (Some(custom), Some(prefs), Some(plugins)) => {
                    println!("Custom INI: {custom}");
                    println!("Prefs INI: {prefs}");
                    println!("Plugins: {plugins}");
                }
                _ => println!("Warning: documents folder not set, configuration is not written"),
            }
        }
    }
    Ok(())
}

fn print_help() {
    println!("Holotape v{}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  holotape mods [list]                 List mod files");
    println!("      --filter <text>  --sort <status|name|category>  --reverse");
    println!("  holotape conflicts                   Show file conflicts in the current load order");
    println!("  holotape deploy <files...>           Deploy files in the given order");
    println!("      --no-backup  --abort-on-conflict");
    println!("  holotape deploy-all                  Redeploy everything currently enabled");
    println!("  holotape enable <file>               Enable one mod and redeploy");
    println!("  holotape disable <file>              Disable one mod and redeploy");
    println!("  holotape meta <file> [--alias --author --version --tags a,b --color]");
    println!("  holotape import <paths...>           Copy mod files or folders into the game");
    println!("  holotape delete <file>               Delete a mod and drop it from the config");
    println!("  holotape paths                       Show profile paths");
    println!("  holotape set-path <game|docs|appdata|strings> <path>");
    println!("  holotape profile [steam|xbox|switch] Show or change the current profile");
    println!("  holotape sync <on|off>               Mirror settings to the other profile");
    println!("  holotape tweak <id> <value>          Set a tweak ({})", tweaks::TWEAK_IDS.join(", "));
    println!("  holotape tweaks                      Show stored and effective tweak values");
    println!("  holotape apply-tweaks                Write every stored tweak");
    println!("  holotape check                       Verify profile folders exist");
    println!("  holotape status                      Summarize the current profile");
    println!("  holotape manager-setting <auto-updates|minimize-to-tray|ui-animations> <on|off>");
    println!("  holotape restore                     Restore the last configuration backup");
    println!();
    println!("Global options:");
    println!("  --format <json|text>                 Output format");
    println!("  --profile <steam|xbox>               Profile for paths and set-path");
    println!("  -q, --quiet                          Errors only");
    println!("  -v, -vv                              Increase log verbosity");
    println!("  -h, --help                           Show help");
    println!("  -V, --version                        Show version");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn no_arguments_show_help() {
        let (_, command) = parse_args(&[]).unwrap();
        assert_eq!(command, CliCommand::Help);
    }

    #[test]
    fn global_options_are_pulled_from_anywhere() {
        let (global, command) =
            parse_args(&args(&["mods", "--format", "json", "-vv", "--sort=name"])).unwrap();
        assert_eq!(global.format, OutputFormat::Json);
        assert_eq!(global.verbosity, 2);
        assert_eq!(
            command,
            CliCommand::ModsList(ModsListOptions {
                sort: ModSortKey::Name,
                reverse: false,
                filter: None,
            })
        );

        let (global, _) = parse_args(&args(&["-q", "--profile=xbox", "paths"])).unwrap();
        assert_eq!(global.verbosity, -1);
        assert_eq!(global.profile, Some(ProfileId::Xbox));
    }

    #[test]
    fn deploy_keeps_name_order_and_flags() {
        let (_, command) = parse_args(&args(&[
            "deploy",
            "b.ba2",
            "--no-backup",
            "a.ba2",
            "--abort-on-conflict",
        ]))
        .unwrap();
        assert_eq!(
            command,
            CliCommand::Deploy {
                names: args(&["b.ba2", "a.ba2"]),
                options: DeployFlags {
                    backup: false,
                    abort_on_conflict: true,
                },
            }
        );
        assert!(parse_args(&args(&["deploy"])).is_err());
    }

    #[test]
    fn meta_flags_accept_both_spellings() {
        let (_, command) = parse_args(&args(&[
            "meta",
            "a.ba2",
            "--alias",
            "Nice Name",
            "--tags=ui, qol",
        ]))
        .unwrap();
        let CliCommand::Meta { name, edit } = command else {
            panic!("expected meta");
        };
        assert_eq!(name, "a.ba2");
        assert_eq!(edit.alias.as_deref(), Some("Nice Name"));
        assert_eq!(edit.tags, Some(args(&["ui", "qol"])));
        assert!(parse_args(&args(&["meta", "a.ba2", "--alias"])).is_err());
        assert!(parse_args(&args(&["meta", "a.ba2"])).is_err());
    }

    #[test]
    fn set_path_joins_remaining_words() {
        let (_, command) = parse_args(&args(&["set-path", "docs", "~/My", "Games"])).unwrap();
        assert_eq!(
            command,
            CliCommand::SetPath {
                kind: PathKind::Documents,
                value: "~/My Games".into(),
            }
        );
        assert!(parse_args(&args(&["set-path", "saves", "x"])).is_err());
    }

    #[test]
    fn profile_and_sync_commands() {
        let (_, command) = parse_args(&args(&["profile", "switch"])).unwrap();
        assert_eq!(command, CliCommand::Profile(ProfileAction::Switch));
        let (_, command) = parse_args(&args(&["profile", "Xbox"])).unwrap();
        assert_eq!(command, CliCommand::Profile(ProfileAction::Select(ProfileId::Xbox)));
        let (_, command) = parse_args(&args(&["sync", "on"])).unwrap();
        assert_eq!(command, CliCommand::Sync(true));
        assert!(parse_args(&args(&["sync", "maybe"])).is_err());
        let (_, command) = parse_args(&args(&["manager-setting", "ui-animations", "off"])).unwrap();
        assert_eq!(
            command,
            CliCommand::ManagerSetting {
                key: "ui-animations".into(),
                enabled: false,
            }
        );
        assert!(parse_args(&args(&["manager-setting", "theme", "on"])).is_err());
        assert!(parse_args(&args(&["frobnicate"])).is_err());
    }
}
