use std::fs;
use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "yt2mpeg";
const PREFS_FILE: &str = "prefs.json";

/// The persisted preferences document. Keys this version does not know are
/// kept as-is so an older build never destroys a newer file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_output_folder: Option<PathBuf>,

    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// Plain read/write store for one preferences file. The path is explicit;
/// construct once at startup and pass it along, there are no module globals.
///
/// No atomic write, no locking: last writer wins, and any I/O problem
/// degrades to the empty document instead of surfacing.
#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<config dir>/yt2mpeg/prefs.json`, falling back to the home directory
    /// and then to the working directory.
    pub fn default_location() -> Self {
        let base = dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join(APP_DIR).join(PREFS_FILE))
    }

    /// Load the document; a missing, unreadable or malformed file yields the
    /// default document. Never fails.
    pub fn load(&self) -> Preferences {
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return Preferences::default();
        };
        match serde_json::from_str(&raw) {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!("ignoring malformed preferences at {}: {}", self.path.display(), e);
                Preferences::default()
            }
        }
    }

    /// Overwrite the document, creating the containing directory first.
    /// Failures are logged and swallowed.
    pub fn save(&self, prefs: &Preferences) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("cannot create {}: {}", parent.display(), e);
                return;
            }
        }
        match serde_json::to_string_pretty(prefs) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.path, json) {
                    warn!("cannot write {}: {}", self.path.display(), e);
                }
            }
            Err(e) => warn!("cannot encode preferences: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> PrefsStore {
        PrefsStore::new(dir.path().join("nested").join(PREFS_FILE))
    }

    #[test]
    fn missing_file_loads_as_the_default_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn malformed_file_loads_as_the_default_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PREFS_FILE);
        fs::write(&path, "{not json").unwrap();
        assert_eq!(PrefsStore::new(path).load(), Preferences::default());
    }

    #[test]
    fn saved_preferences_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut prefs = Preferences::default();
        prefs.last_output_folder = Some(PathBuf::from("/home/me/Music"));
        store.save(&prefs);

        let loaded = store.load();
        assert_eq!(loaded, prefs);

        // save(load()) must be a no-op on the next load
        store.save(&loaded);
        assert_eq!(store.load(), prefs);
    }

    #[test]
    fn unknown_keys_survive_a_load_save_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PREFS_FILE);
        fs::write(
            &path,
            r#"{"last_output_folder": "/tmp", "theme": "dark", "volume": 11}"#,
        )
        .unwrap();
        let store = PrefsStore::new(path.clone());

        store.save(&store.load());

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw["volume"], 11);
        assert_eq!(raw["last_output_folder"], "/tmp");
    }
}
