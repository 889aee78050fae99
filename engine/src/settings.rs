//! Persisted user preferences over an opaque key-value store.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::Result;

const THEME_KEY: &str = "theme";
const TOUR_DONE_KEY: &str = "tourDone";

/// String key-value persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store, for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object file, rewritten on every `set`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.values)?)?;
        debug!(key, path = %self.path.display(), "Saved setting");
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// Settings over whichever store [`open_or_default`] could provide.
pub type DynSettings = Settings<Box<dyn KeyValueStore + Send>>;

/// Open file-backed settings, falling back to in-memory defaults when the file is unusable.
pub fn open_or_default(path: impl Into<PathBuf>) -> DynSettings {
    let path = path.into();
    let loaded = JsonFileStore::open(&path).and_then(|store| {
        let store: Box<dyn KeyValueStore + Send> = Box::new(store);
        Settings::load(store)
    });
    match loaded {
        Ok(settings) => settings,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Settings unreadable, using defaults for this session");
            Settings {
                store: Box::new(MemoryStore::default()),
                theme: Theme::default(),
                tour_done: false,
            }
        }
    }
}

/// Colour theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    /// Anything but `"light"` is dark.
    pub fn parse(value: &str) -> Self {
        if value == "light" {
            Theme::Light
        } else {
            Theme::Dark
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Theme and tour flag, read once at startup and written through on change.
#[derive(Debug)]
pub struct Settings<S: KeyValueStore> {
    store: S,
    theme: Theme,
    tour_done: bool,
}

impl<S: KeyValueStore> Settings<S> {
    pub fn load(store: S) -> Result<Self> {
        let theme = store.get(THEME_KEY)?.map(|v| Theme::parse(&v)).unwrap_or_default();
        let tour_done = store.get(TOUR_DONE_KEY)?.as_deref() == Some("true");
        Ok(Self {
            store,
            theme,
            tour_done,
        })
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn tour_done(&self) -> bool {
        self.tour_done
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.store.set(THEME_KEY, theme.as_str())?;
        self.theme = theme;
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let next = match self.theme {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        };
        self.set_theme(next)?;
        Ok(next)
    }

    pub fn set_tour_done(&mut self, done: bool) -> Result<()> {
        self.store.set(TOUR_DONE_KEY, if done { "true" } else { "false" })?;
        self.tour_done = done;
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let settings = Settings::load(MemoryStore::default()).unwrap();
        assert_eq!(settings.theme(), Theme::Dark);
        assert!(!settings.tour_done());
    }

    #[test]
    fn test_unknown_theme_is_dark() {
        let mut store = MemoryStore::default();
        store.set("theme", "solarized").unwrap();
        store.set("tourDone", "yes").unwrap();
        let settings = Settings::load(store).unwrap();
        assert_eq!(settings.theme(), Theme::Dark);
        assert!(!settings.tour_done());
    }

    #[test]
    fn test_write_through() {
        let mut settings = Settings::load(MemoryStore::default()).unwrap();
        assert_eq!(settings.toggle_theme().unwrap(), Theme::Light);
        settings.set_tour_done(true).unwrap();
        assert_eq!(settings.store().get("theme").unwrap().as_deref(), Some("light"));
        assert_eq!(settings.store().get("tourDone").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn test_file_store_persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::load(JsonFileStore::open(&path).unwrap()).unwrap();
        settings.set_theme(Theme::Light).unwrap();
        settings.set_tour_done(true).unwrap();

        let reloaded = Settings::load(JsonFileStore::open(&path).unwrap()).unwrap();
        assert_eq!(reloaded.theme(), Theme::Light);
        assert!(reloaded.tour_done());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{\"theme\": ").unwrap();

        let mut settings = open_or_default(&path);
        assert_eq!(settings.theme(), Theme::Dark);
        assert!(!settings.tour_done());

        // Changes still apply for the session, and the file is left alone.
        assert_eq!(settings.toggle_theme().unwrap(), Theme::Light);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"theme\": ");
    }

    #[test]
    fn test_open_or_default_reads_good_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"theme":"light","tourDone":"true"}"#).unwrap();

        let settings = open_or_default(&path);
        assert_eq!(settings.theme(), Theme::Light);
        assert!(settings.tour_done());
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(JsonFileStore::open(&path).is_err());
    }
}
