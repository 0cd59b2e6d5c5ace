use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Persistent key/value storage for session credentials.
pub trait SessionStorage {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove_item(&mut self, key: &str) -> anyhow::Result<()>;
}

/// `session.json` under the data directory, rewritten atomically.
#[derive(Debug)]
pub struct FileSession {
    pub path: PathBuf,
}

impl FileSession {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let path = data_dir.join("session.json");
        if !path.exists() {
            fs::write(&path, "{}")
                .with_context(|| format!("failed to initialise {}", path.display()))?;
        }

        info!(session = %path.display(), "opened session store");
        Ok(Self { path })
    }

    fn load(&self) -> anyhow::Result<BTreeMap<String, String>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.path.display()))
    }

    fn save(&self, items: &BTreeMap<String, String>) -> anyhow::Result<()> {
        debug!(file = %self.path.display(), count = items.len(), "saving session");
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, items)?;
        writeln!(temp)?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;
        Ok(())
    }
}

impl SessionStorage for FileSession {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut items = self.load()?;
        items.insert(key.to_string(), value.to_string());
        self.save(&items)
    }

    fn remove_item(&mut self, key: &str) -> anyhow::Result<()> {
        let mut items = self.load()?;
        if items.remove(key).is_some() {
            self.save(&items)?;
        }
        Ok(())
    }
}

/// In-process storage, used where nothing should touch disk.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    items: BTreeMap<String, String>,
}

impl SessionStorage for MemorySession {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> anyhow::Result<()> {
        self.items.remove(key);
        Ok(())
    }
}

pub fn access_token<S: SessionStorage + ?Sized>(storage: &S) -> anyhow::Result<Option<String>> {
    storage.get_item(ACCESS_TOKEN_KEY)
}

#[tracing::instrument(skip_all)]
pub fn store_tokens<S: SessionStorage + ?Sized>(
    storage: &mut S,
    access: &str,
    refresh: &str,
) -> anyhow::Result<()> {
    storage.set_item(ACCESS_TOKEN_KEY, access)?;
    storage.set_item(REFRESH_TOKEN_KEY, refresh)?;
    info!("stored session tokens");
    Ok(())
}

#[tracing::instrument(skip_all)]
pub fn clear_tokens<S: SessionStorage + ?Sized>(storage: &mut S) -> anyhow::Result<()> {
    storage.remove_item(ACCESS_TOKEN_KEY)?;
    storage.remove_item(REFRESH_TOKEN_KEY)?;
    info!("cleared session tokens");
    Ok(())
}
