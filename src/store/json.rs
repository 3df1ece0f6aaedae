//! JSON-file stores
//!
//! Each store is one pretty-printed JSON document. Writes go to a sibling
//! temp file that is then renamed over the original.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::common::errors::Result;
use crate::common::traits::{StateStore, SubscriberStore};
use crate::common::types::SubscriberId;
use crate::paper::account::SubscriberAccount;
use crate::scheduler::state::SchedulerState;

type SubscriberDocument = BTreeMap<SubscriberId, SubscriberAccount>;

fn write_atomically(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Subscriber accounts kept in a single JSON document keyed by id
#[derive(Debug, Clone)]
pub struct JsonSubscriberStore {
    path: PathBuf,
}

impl JsonSubscriberStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<SubscriberDocument> {
        if !self.path.exists() {
            return Ok(SubscriberDocument::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(SubscriberDocument::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl SubscriberStore for JsonSubscriberStore {
    fn list_ids(&self) -> Result<Vec<SubscriberId>> {
        Ok(self.read_document()?.into_keys().collect())
    }

    fn load(&self, id: &SubscriberId) -> Result<Option<SubscriberAccount>> {
        Ok(self.read_document()?.remove(id))
    }

    fn save(&mut self, id: &SubscriberId, account: &SubscriberAccount) -> Result<()> {
        let mut document = self.read_document()?;
        document.insert(id.clone(), account.clone());
        write_atomically(&self.path, &serde_json::to_string_pretty(&document)?)?;
        debug!(subscriber = %id, path = %self.path.display(), "Saved subscriber");
        Ok(())
    }
}

/// Scheduler state kept in a JSON document
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Result<SchedulerState> {
        if !self.path.exists() {
            return Ok(SchedulerState::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&mut self, state: &SchedulerState) -> Result<()> {
        write_atomically(&self.path, &serde_json::to_string_pretty(state)?)
    }
}
