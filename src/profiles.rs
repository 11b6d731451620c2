//! Configuration profile persistence
//!
//! Save/load/list/delete named `Configuration`s as JSON files in a single
//! directory, by default the platform config dir (`~/.config/smc100/profiles`
//! on Linux).

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::domain::{Configuration, Smc100Error, Smc100Result};

/// Profile that always exists conceptually and may not be deleted.
pub const DEFAULT_PROFILE: &str = "Default";

/// Longest profile name accepted, in characters.
const MAX_NAME_LEN: usize = 64;

/// Turn a user-supplied profile name into the file stem it is stored under.
///
/// Names are trimmed and may hold letters, digits, spaces, `-`, `_` and
/// inner dots (`x-axis v1.2`). A leading or trailing dot is refused, which
/// also rules out `..` and hidden files.
fn profile_stem(name: &str) -> Smc100Result<&str> {
    let stem = name.trim();
    if stem.is_empty() {
        return Err(Smc100Error::Config("A profile needs a name".to_string()));
    }
    if stem.chars().count() > MAX_NAME_LEN {
        return Err(Smc100Error::Config(format!(
            "Profile name is longer than {MAX_NAME_LEN} characters"
        )));
    }
    if stem.starts_with('.') || stem.ends_with('.') || stem.contains("..") {
        return Err(Smc100Error::Config(format!(
            "Profile name '{stem}' may not begin or end with a dot"
        )));
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.');
    if let Some(bad) = stem.chars().find(|&c| !allowed(c)) {
        return Err(Smc100Error::Config(format!(
            "Profile name '{stem}' contains '{bad}'"
        )));
    }
    Ok(stem)
}

/// A directory of `<name>.json` profiles.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted in the user's platform config directory.
    pub fn default_location() -> Smc100Result<Self> {
        let base = dirs::config_dir()
            .ok_or_else(|| Smc100Error::Config("No config directory on this platform".to_string()))?;
        Ok(Self::new(base.join("smc100").join("profiles")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> Smc100Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            Smc100Error::Config(format!("Failed to create {}: {e}", self.dir.display()))
        })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Write `config` under its own name, replacing any existing profile.
    pub fn save(&self, config: &Configuration) -> Smc100Result<()> {
        let name = profile_stem(&config.name)?;
        config.validate()?;
        self.ensure_dir()?;
        let json = serde_json::to_string_pretty(config)
            .map_err(|e| Smc100Error::Config(format!("Serialization error: {e}")))?;
        std::fs::write(self.path_for(name), json)
            .map_err(|e| Smc100Error::Config(format!("Failed to write profile '{name}': {e}")))?;
        log::debug!("saved profile '{name}'");
        Ok(())
    }

    pub fn load(&self, name: &str) -> Smc100Result<Configuration> {
        let name = profile_stem(name)?;
        let json = std::fs::read_to_string(self.path_for(name))
            .map_err(|e| Smc100Error::Config(format!("Failed to read profile '{name}': {e}")))?;
        let config: Configuration = serde_json::from_str(&json)
            .map_err(|e| Smc100Error::Config(format!("Failed to parse profile '{name}': {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `name`, or fall back to built-in defaults when it is the
    /// default profile and has never been saved.
    pub fn load_or_default(&self, name: &str) -> Smc100Result<Configuration> {
        if name == DEFAULT_PROFILE && !self.path_for(DEFAULT_PROFILE).exists() {
            return Ok(Configuration::default());
        }
        self.load(name)
    }

    /// Names of all saved profiles, sorted. A store that was never written
    /// to is simply empty.
    pub fn list(&self) -> Smc100Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            Smc100Error::Config(format!("Failed to read {}: {e}", self.dir.display()))
        })?;

        let mut names = Vec::new();
        for path in entries.flatten().map(|entry| entry.path()) {
            if !path.is_file() || path.extension() != Some(OsStr::new("json")) {
                continue;
            }
            match path.file_stem().and_then(OsStr::to_str) {
                Some(stem) => names.push(stem.to_owned()),
                None => log::debug!("skipping non-UTF-8 profile {}", path.display()),
            }
        }
        names.sort_unstable();
        Ok(names)
    }

    pub fn delete(&self, name: &str) -> Smc100Result<()> {
        let name = profile_stem(name)?;
        if name == DEFAULT_PROFILE {
            return Err(Smc100Error::Config(
                "Cannot delete the Default profile".to_string(),
            ));
        }
        let path = self.path_for(name);
        if !path.exists() {
            return Err(Smc100Error::Config(format!("Profile '{name}' not found")));
        }
        std::fs::remove_file(&path)
            .map_err(|e| Smc100Error::Config(format!("Failed to delete profile '{name}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ProfileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profiles"));
        (dir, store)
    }

    fn bench_config() -> Configuration {
        Configuration {
            name: "Bench Stage".to_string(),
            serial_port: Some("/dev/ttyUSB0".to_string()),
            address: 3,
            ..Configuration::default()
        }
    }

    #[test]
    fn profile_names_are_trimmed_to_a_file_stem() {
        assert_eq!(profile_stem("  X-Axis Bench ").unwrap(), "X-Axis Bench");
        assert_eq!(profile_stem("rig_7 v1.2").unwrap(), "rig_7 v1.2");
        assert_eq!(profile_stem(&"z".repeat(MAX_NAME_LEN)).unwrap().len(), MAX_NAME_LEN);
    }

    #[test]
    fn unsafe_profile_names_are_refused() {
        for name in [
            "",
            "   ",
            "..",
            "../Default",
            ".hidden",
            "trailing.",
            "rig/x",
            "rig\\x",
            "stage:2",
            "axis*",
        ] {
            assert!(profile_stem(name).is_err(), "accepted {name:?}");
        }
        assert!(profile_stem(&"z".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn refusal_names_the_offending_character() {
        let err = profile_stem("stage#3").unwrap_err().to_string();
        assert!(err.contains("'#'"), "{err}");
    }

    #[test]
    fn traversal_name_never_reaches_the_filesystem() {
        let (tmp, store) = store();
        std::fs::write(tmp.path().join("outside.json"), "{}").unwrap();
        assert!(store.load("../outside").is_err());
        assert!(store.delete("../outside").is_err());
        assert!(tmp.path().join("outside.json").exists());
    }

    #[test]
    fn save_then_load_returns_same_profile() {
        let (_tmp, store) = store();
        store.save(&bench_config()).unwrap();
        let loaded = store.load("Bench Stage").unwrap();
        assert_eq!(loaded.address, 3);
        assert_eq!(loaded.serial_port.as_deref(), Some("/dev/ttyUSB0"));
    }

    #[test]
    fn list_is_sorted_and_skips_stray_entries() {
        let (_tmp, store) = store();
        assert!(store.list().unwrap().is_empty());

        store.save(&bench_config()).unwrap();
        store
            .save(&Configuration {
                name: "Z stage".to_string(),
                address: 2,
                ..Configuration::default()
            })
            .unwrap();
        store
            .save(&Configuration {
                name: "Lens focus".to_string(),
                address: 5,
                ..Configuration::default()
            })
            .unwrap();
        std::fs::write(store.dir().join("wiring.txt"), "RS-485 A/B").unwrap();
        std::fs::create_dir(store.dir().join("old.json")).unwrap();
        assert_eq!(
            store.list().unwrap(),
            vec!["Bench Stage", "Lens focus", "Z stage"]
        );
    }

    #[test]
    fn default_profile_cannot_be_deleted() {
        let (_tmp, store) = store();
        store.save(&Configuration::default()).unwrap();
        assert!(store.delete(DEFAULT_PROFILE).is_err());
        assert!(store.load(DEFAULT_PROFILE).is_ok());
    }

    #[test]
    fn delete_removes_profile_and_reports_missing() {
        let (_tmp, store) = store();
        store.save(&bench_config()).unwrap();
        store.delete("Bench Stage").unwrap();
        assert!(store.load("Bench Stage").is_err());
        assert!(store.delete("Bench Stage").is_err());
    }

    #[test]
    fn unsaved_default_falls_back_to_builtin() {
        let (_tmp, store) = store();
        let config = store.load_or_default(DEFAULT_PROFILE).unwrap();
        assert_eq!(config.address, 1);
        assert!(store.load_or_default("Missing").is_err());
    }

    #[test]
    fn invalid_profile_is_not_saved() {
        let (_tmp, store) = store();
        let config = Configuration {
            address: 0,
            ..bench_config()
        };
        assert!(store.save(&config).is_err());
        assert!(store.list().unwrap().is_empty());
    }
}
