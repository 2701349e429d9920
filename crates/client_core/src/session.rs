//! Persisted bearer token and the in-memory session built on top of it.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context, Result};
use shared::domain::AccessToken;
use tracing::{debug, warn};

/// Storage key the token is kept under.
pub const TOKEN_STORAGE_KEY: &str = "token";

pub trait TokenStore: Send {
    fn load(&self) -> Result<Option<AccessToken>>;
    fn save(&self, token: &AccessToken) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// A small JSON key/value file; the desktop stand-in for browser local storage.
/// Keys other than [`TOKEN_STORAGE_KEY`] are preserved on write.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read session file '{}'", self.path.display())
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("session file '{}' is not valid JSON", self.path.display()))
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to create session directory '{}'",
                    parent.display()
                )
            })?;
        }
        let serialized = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write session file '{}'", self.path.display()))
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<AccessToken>> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(TOKEN_STORAGE_KEY)
            .filter(|token| !token.is_empty())
            .map(|token| AccessToken::new(token.clone())))
    }

    fn save(&self, token: &AccessToken) -> Result<()> {
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %self.path.display(), "discarding unreadable session file: {err:#}");
                BTreeMap::new()
            }
        };
        entries.insert(TOKEN_STORAGE_KEY.to_string(), token.as_str().to_string());
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<()> {
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %self.path.display(), "removing unreadable session file: {err:#}");
                return match fs::remove_file(&self.path) {
                    Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err)
                        .with_context(|| {
                            format!("failed to remove session file '{}'", self.path.display())
                        }),
                    _ => Ok(()),
                };
            }
        };
        if entries.remove(TOKEN_STORAGE_KEY).is_none() {
            return Ok(());
        }
        self.write_entries(&entries)
    }
}

/// Process-local store. Clones share the same slot, so tests can keep a handle
/// and inspect what the controller persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    slot: Arc<Mutex<Option<AccessToken>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: AccessToken) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(token))),
        }
    }

    pub fn stored(&self) -> Option<AccessToken> {
        self.slot.lock().ok().and_then(|guard| guard.clone())
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<AccessToken>> {
        let guard = self
            .slot
            .lock()
            .map_err(|_| anyhow!("token store lock poisoned"))?;
        Ok(guard.clone())
    }

    fn save(&self, token: &AccessToken) -> Result<()> {
        let mut guard = self
            .slot
            .lock()
            .map_err(|_| anyhow!("token store lock poisoned"))?;
        *guard = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .slot
            .lock()
            .map_err(|_| anyhow!("token store lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}

/// Authentication state passed explicitly to the controller.
///
/// Starts empty. [`Session::establish`] records and persists a token,
/// [`Session::end`] forgets and erases it, and [`Session::restore`] picks up a
/// token persisted by an earlier run.
pub struct Session<S: TokenStore> {
    store: S,
    token: Option<AccessToken>,
}

impl<S: TokenStore> Session<S> {
    pub fn new(store: S) -> Self {
        Self { store, token: None }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn restore(&mut self) -> Result<bool> {
        self.token = self.store.load()?;
        debug!(restored = self.token.is_some(), "restored session from token store");
        Ok(self.token.is_some())
    }

    /// The in-memory session is authenticated even if persisting fails.
    pub fn establish(&mut self, token: AccessToken) -> Result<()> {
        let persisted = self.store.save(&token);
        self.token = Some(token);
        persisted
    }

    /// The in-memory token is dropped even if erasing the persisted copy fails.
    pub fn end(&mut self) -> Result<()> {
        self.token = None;
        self.store.clear()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
