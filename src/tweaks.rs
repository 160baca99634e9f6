use crate::{config::DerivedPaths, ini, status::ManagerError};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TweakTarget {
    pub section: &'static str,
    pub keys: &'static [&'static str],
}

pub const TWEAK_IDS: [&str; 8] = [
    "godrays",
    "grass",
    "shadows",
    "fov",
    "dof",
    "taa",
    "ping",
    "bandwidth",
];

pub fn mapping(id: &str) -> Option<TweakTarget> {
    let (section, keys): (&'static str, &'static [&'static str]) = match id {
        "godrays" => ("Display", &["bVolumetricLightingEnabled"]),
        "grass" => ("Grass", &["bAllowCreateGrass"]),
        "shadows" => ("Display", &["iShadowMapResolution"]),
        "fov" => ("Display", &["fDefaultWorldFOV", "fDefault1stPersonFOV"]),
        "dof" => ("Display", &["bDoDepthOfField"]),
        "taa" => ("Display", &["sAntiAliasing"]),
        "ping" => ("General", &["bNetworkOptimization"]),
        "bandwidth" => ("General", &["bUncapBandwidth"]),
        _ => return None,
    };
    Some(TweakTarget { section, keys })
}

/// INI text for a stored setting. Booleans become `1`/`0`.
pub fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Bool(flag) => Some(if *flag { "1" } else { "0" }.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) => Some(text.clone()),
        _ => None,
    }
}

/// Parses a value typed on the command line into the shape stored in
/// settings: booleans and numbers when they look like one, text otherwise.
pub fn parse_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" => return Value::Bool(true),
        "false" | "off" | "no" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        if float.is_finite() {
            return Value::from(float);
        }
    }
    Value::String(trimmed.to_string())
}

/// Writes one tweak into every target profile. Unknown ids and values that
/// cannot be rendered write nothing.
pub fn write_tweak(targets: &[DerivedPaths], id: &str, value: &Value) -> Vec<ManagerError> {
    let (Some(target), Some(rendered)) = (mapping(id), render_value(value)) else {
        debug!(tweak = id, "no ini mapping, stored only");
        return Vec::new();
    };
    let mut errors = Vec::new();
    for paths in targets {
        for key in target.keys {
            errors.extend(ini::set_profile_key(paths, target.section, key, &rendered));
        }
    }
    errors
}

pub fn write_all(targets: &[DerivedPaths], settings: &BTreeMap<String, Value>) -> Vec<ManagerError> {
    settings
        .iter()
        .flat_map(|(id, value)| write_tweak(targets, id, value))
        .collect()
}

/// The effective value in a profile's documents: the prefs document, with the
/// custom document taking precedence.
pub fn read_tweak(paths: &DerivedPaths, id: &str) -> Option<String> {
    let target = mapping(id)?;
    let key = target.keys.first()?;
    ini::read_key(&paths.custom_ini, target.section, key)
        .or_else(|| ini::read_key(&paths.prefs_ini, target.section, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, path::Path};

    fn derived(documents: &Path) -> DerivedPaths {
        DerivedPaths {
            documents_root: documents.to_path_buf(),
            custom_ini: documents.join("Fallout76Custom.ini"),
            prefs_ini: documents.join("Fallout76Prefs.ini"),
            plugins_file: documents.join("plugins.txt"),
            strings_root: documents.join("Strings"),
        }
    }

    #[test]
    fn every_id_has_a_mapping() {
        for id in TWEAK_IDS {
            assert!(mapping(id).is_some(), "{id}");
        }
        assert!(mapping("pipboy").is_none());
    }

    #[test]
    fn fov_writes_both_keys() {
        let dir = tempfile::tempdir().unwrap();
        let paths = derived(dir.path());
        assert!(write_tweak(&[paths.clone()], "fov", &Value::from(100)).is_empty());
        let content = fs::read_to_string(&paths.prefs_ini).unwrap();
        assert_eq!(
            content,
            "[Display]\nfDefaultWorldFOV=100\nfDefault1stPersonFOV=100"
        );
        assert_eq!(read_tweak(&paths, "fov").as_deref(), Some("100"));
    }

    #[test]
    fn booleans_render_as_digits() {
        assert_eq!(render_value(&Value::Bool(true)).as_deref(), Some("1"));
        assert_eq!(render_value(&Value::Bool(false)).as_deref(), Some("0"));
        assert_eq!(render_value(&Value::from("TAA")).as_deref(), Some("TAA"));
        assert_eq!(render_value(&Value::Null), None);
    }

    #[test]
    fn command_line_values_are_typed() {
        assert_eq!(parse_value("off"), Value::Bool(false));
        assert_eq!(parse_value("2048"), Value::from(2048));
        assert_eq!(parse_value("92.5"), Value::from(92.5));
        assert_eq!(parse_value("FXAA"), Value::from("FXAA"));
    }

    #[test]
    fn custom_document_overrides_prefs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = derived(dir.path());
        fs::write(&paths.prefs_ini, "[Grass]\nbAllowCreateGrass=1\n").unwrap();
        assert_eq!(read_tweak(&paths, "grass").as_deref(), Some("1"));
        fs::write(&paths.custom_ini, "[Grass]\nbAllowCreateGrass=0\n").unwrap();
        assert_eq!(read_tweak(&paths, "grass").as_deref(), Some("0"));
        assert_eq!(read_tweak(&paths, "unknown"), None);
    }

    #[test]
    fn unconfigured_target_is_skipped_silently() {
        let dir = tempfile::tempdir().unwrap();
        let written = derived(dir.path());
        let missing = derived(&dir.path().join("absent"));
        let errors = write_tweak(&[written.clone(), missing.clone()], "ping", &Value::Bool(true));
        assert!(errors.is_empty());
        assert_eq!(read_tweak(&written, "ping").as_deref(), Some("1"));
        assert!(!missing.documents_root.exists());
    }

    #[test]
    fn apply_all_replays_settings() {
        let dir = tempfile::tempdir().unwrap();
        let paths = derived(dir.path());
        let settings = crate::config::default_settings();
        assert!(write_all(&[paths.clone()], &settings).is_empty());
        assert_eq!(read_tweak(&paths, "shadows").as_deref(), Some("2048"));
        assert_eq!(read_tweak(&paths, "taa").as_deref(), Some("TAA"));
        assert_eq!(read_tweak(&paths, "bandwidth").as_deref(), Some("0"));
    }
}
