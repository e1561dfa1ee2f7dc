use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use dcon_core::{lock_or_recover, write_text_atomic};
use dcon_platform::{PlatformClient, PlatformError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Location;

pub const BOOKMARK_FILE_SCHEMA_VERSION: u32 = 1;
pub const BOOKMARK_REMOVE_MARKER: char = '-';
const BOOKMARK_USAGE: &str = "usage: bookmark [-]<name>";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct BookmarkFile {
    schema_version: u32,
    bookmarks: BTreeMap<String, String>,
}

/// Storage backend for the name → channel id mapping.
pub trait BookmarkPersistence: Send + Sync {
    fn load(&self) -> Result<BTreeMap<String, String>>;

    fn save(&self, bookmarks: &BTreeMap<String, String>) -> Result<()>;
}

#[derive(Debug, Clone)]
/// Versioned JSON file written atomically.
pub struct JsonFileBookmarkPersistence {
    path: PathBuf,
}

impl JsonFileBookmarkPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BookmarkPersistence for JsonFileBookmarkPersistence {
    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read bookmark file {}", self.path.display()))?;
        let parsed = serde_json::from_str::<BookmarkFile>(&raw)
            .with_context(|| format!("failed to parse bookmark file {}", self.path.display()))?;
        if parsed.schema_version != BOOKMARK_FILE_SCHEMA_VERSION {
            bail!(
                "unsupported bookmark schema_version {} in {} (expected {})",
                parsed.schema_version,
                self.path.display(),
                BOOKMARK_FILE_SCHEMA_VERSION
            );
        }
        Ok(parsed.bookmarks)
    }

    fn save(&self, bookmarks: &BTreeMap<String, String>) -> Result<()> {
        let payload = BookmarkFile {
            schema_version: BOOKMARK_FILE_SCHEMA_VERSION,
            bookmarks: bookmarks.clone(),
        };
        let mut encoded =
            serde_json::to_string_pretty(&payload).context("failed to encode bookmarks")?;
        encoded.push('\n');
        write_text_atomic(&self.path, &encoded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Parsed argument of the `bookmark` command.
pub enum BookmarkCommand {
    Add(String),
    Remove(String),
}

impl BookmarkCommand {
    /// Lower-cases the name; a leading removal marker selects `Remove`.
    pub fn parse(args: &str) -> Result<Self> {
        let name = args.trim().to_lowercase();
        if let Some(stripped) = name.strip_prefix(BOOKMARK_REMOVE_MARKER) {
            let stripped = stripped.trim();
            if stripped.is_empty() {
                bail!("{BOOKMARK_USAGE}");
            }
            return Ok(Self::Remove(stripped.to_string()));
        }
        if name.is_empty() {
            bail!("{BOOKMARK_USAGE}");
        }
        Ok(Self::Add(name))
    }
}

#[derive(Debug, Error)]
/// Enumerates supported `BookmarkError` values.
pub enum BookmarkError {
    #[error("unknown bookmark '{0}'")]
    NotFound(String),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

#[derive(Debug, Default)]
struct BookmarkState {
    ids: BTreeMap<String, String>,
    resolved: HashMap<String, Location>,
}

/// Named shortcuts to channels plus a cache of already-resolved locations.
pub struct BookmarkStore {
    persistence: Box<dyn BookmarkPersistence>,
    state: Mutex<BookmarkState>,
}

impl BookmarkStore {
    pub fn new(persistence: Box<dyn BookmarkPersistence>) -> Self {
        Self {
            persistence,
            state: Mutex::new(BookmarkState::default()),
        }
    }

    /// Builds a store primed with whatever the backend currently holds.
    pub fn load(persistence: Box<dyn BookmarkPersistence>) -> Result<Self> {
        let ids = persistence.load()?;
        Ok(Self {
            persistence,
            state: Mutex::new(BookmarkState {
                ids,
                resolved: HashMap::new(),
            }),
        })
    }

    pub fn names(&self) -> Vec<String> {
        lock_or_recover(&self.state).ids.keys().cloned().collect()
    }

    pub fn channel_id(&self, name: &str) -> Option<String> {
        lock_or_recover(&self.state)
            .ids
            .get(&name.trim().to_lowercase())
            .cloned()
    }

    /// Records `location` under `name`. The in-memory entry stays even when
    /// persisting fails; the persist error is returned to the caller.
    pub fn add(&self, name: &str, location: &Location) -> Result<()> {
        let channel_id = location
            .channel_id()
            .ok_or_else(|| anyhow!("no channel selected; navigate to a channel first"))?
            .to_string();
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            bail!("{BOOKMARK_USAGE}");
        }

        let mut state = lock_or_recover(&self.state);
        state.ids.insert(name.clone(), channel_id);
        state.resolved.insert(name, location.clone());
        self.persistence.save(&state.ids)
    }

    /// Removes `name` from both maps; returns whether it existed.
    pub fn remove(&self, name: &str) -> Result<bool> {
        let name = name.trim().to_lowercase();
        let mut state = lock_or_recover(&self.state);
        let existed = state.ids.remove(&name).is_some();
        state.resolved.remove(&name);
        self.persistence.save(&state.ids)?;
        Ok(existed)
    }

    pub fn apply(&self, command: &BookmarkCommand, current: &Location) -> Result<()> {
        match command {
            BookmarkCommand::Add(name) => self.add(name, current),
            BookmarkCommand::Remove(name) => self.remove(name).map(|_| ()),
        }
    }

    /// Turns a bookmark name into a location, fetching from the platform only
    /// on the first use of the name.
    pub async fn resolve(
        &self,
        name: &str,
        client: &dyn PlatformClient,
    ) -> Result<Location, BookmarkError> {
        let name = name.trim().to_lowercase();
        let channel_id = {
            let state = lock_or_recover(&self.state);
            if let Some(location) = state.resolved.get(&name) {
                return Ok(location.clone());
            }
            state
                .ids
                .get(&name)
                .cloned()
                .ok_or_else(|| BookmarkError::NotFound(name.clone()))?
        };

        let channel = client.channel(&channel_id).await?;
        let community = match (&channel.community_id, channel.is_private()) {
            (Some(community_id), false) => Some(client.community(community_id).await?),
            _ => None,
        };
        let location = Location::new(community, channel);

        let mut state = lock_or_recover(&self.state);
        if state.ids.contains_key(&name) {
            state.resolved.insert(name, location.clone());
        }
        Ok(location)
    }
}
