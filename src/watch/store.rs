//! Persisted watch configuration
//!
//! The file is a single-section INI document:
//!
//! ```text
//! [DEFAULT]
//! coretemp.Package id 0 = 1, 1, 85
//! nct6798.fan2 = 3, 2, 300:2500
//! ```
//!
//! Broken lines are logged and skipped, so one typo never disables the rest
//! of the watch list.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::entry::{validate_key, WatchEntry};
use super::error::WatchError;

pub const WATCH_FILE_NAME: &str = "sensor_actions_config";

const DEFAULT_SECTION: &str = "DEFAULT";

/// Result of parsing a watch file
#[derive(Debug, Default)]
pub struct ParsedWatches {
    pub entries: BTreeMap<String, WatchEntry>,
    /// Sensor key (or raw line) and the reason it was rejected
    pub errors: Vec<(String, WatchError)>,
}

#[derive(Debug)]
pub struct WatchStore {
    path: PathBuf,
    entries: BTreeMap<String, WatchEntry>,
}

impl WatchStore {
    /// Empty store bound to `path`, nothing read or written
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load entries from `path`.
    ///
    /// A missing file is created empty. Read failures and malformed entries
    /// are logged; the store then holds whatever could be loaded.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let mut store = Self::empty(path);

        if !store.path.exists() {
            match create_empty(&store.path) {
                Ok(()) => tracing::info!(
                    "Created empty sensor watch config at {:?}, sensor watch inactive",
                    store.path
                ),
                Err(e) => tracing::error!(
                    "Failed to create sensor watch config at {:?}: {}",
                    store.path,
                    e
                ),
            }
            return store;
        }

        let contents = match fs::read_to_string(&store.path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::error!("Failed to read sensor watch config {:?}: {}", store.path, e);
                return store;
            }
        };

        let parsed = parse(&contents);
        for (key, err) in &parsed.errors {
            tracing::error!("Failed to load sensor watch entry {}: {}", key, err);
        }
        store.entries = parsed.entries;
        tracing::info!(
            "Loaded {} sensor watch entries from {:?}",
            store.entries.len(),
            store.path
        );
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&WatchEntry> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &WatchEntry> {
        self.entries.values()
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut WatchEntry> {
        self.entries.values_mut()
    }

    /// Insert or replace an entry and rewrite the file.
    ///
    /// Keys the file format cannot hold are rejected up front. Otherwise the
    /// in-memory map is updated even when the write fails.
    pub fn update(&mut self, entry: WatchEntry) -> Result<(), WatchError> {
        validate_key(entry.key())?;
        tracing::info!(
            "Sensor watch entry {} set: {} -> {}",
            entry.key(),
            entry.condition(),
            entry.actions()
        );
        self.entries.insert(entry.key().to_string(), entry);
        self.persist()
    }

    /// Delete an entry and rewrite the file. Returns the removed entry.
    pub fn remove(&mut self, key: &str) -> Result<Option<WatchEntry>, WatchError> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            tracing::info!("Sensor watch entry {} removed", key);
            self.persist()?;
        }
        Ok(removed)
    }

    /// Rewrite the whole file from the in-memory map
    pub fn persist(&self) -> Result<(), WatchError> {
        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.path, self.render())
        };

        write().map_err(|source| {
            let err = WatchError::Persist {
                path: self.path.clone(),
                source,
            };
            tracing::error!("{}", err);
            err
        })
    }

    /// Serialized file contents
    pub fn render(&self) -> String {
        let mut out = format!("[{}]\n", DEFAULT_SECTION);
        for entry in self.entries.values() {
            out.push_str(&format!("{} = {}\n", entry.key(), entry.persisted_value()));
        }
        out.push('\n');
        out
    }
}

/// Parse watch file contents without touching the filesystem
pub fn parse(contents: &str) -> ParsedWatches {
    let mut parsed = ParsedWatches::default();
    let mut in_default = true;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_default = section.trim() == DEFAULT_SECTION;
            if !in_default {
                tracing::warn!("Ignoring sensor watch section [{}]", section.trim());
            }
            continue;
        }
        if !in_default {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            parsed
                .errors
                .push((line.to_string(), WatchError::MissingSeparator));
            continue;
        };

        match WatchEntry::parse(key, value) {
            Ok(entry) => {
                if parsed.entries.contains_key(entry.key()) {
                    tracing::warn!(
                        "Duplicate sensor watch entry {}, keeping the last one",
                        entry.key()
                    );
                }
                parsed.entries.insert(entry.key().to_string(), entry);
            }
            Err(err) => parsed.errors.push((key.trim().to_string(), err)),
        }
    }

    parsed
}

fn create_empty(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::File::create(path).map(|_| ())
}
