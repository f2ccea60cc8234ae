use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Most ids kept in the viewed list.
pub const VIEWED_IDS_CAP: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserPreferences {
    /// Most recent first.
    #[serde(default)]
    viewed_ids: Vec<String>,
}

/// Small JSON-backed preference file living next to the database.
pub struct Preferences {
    path: PathBuf,
    data: RwLock<UserPreferences>,
}

impl Preferences {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read preferences from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserPreferences::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn viewed_ids(&self) -> Result<Vec<String>> {
        let guard = self
            .data
            .read()
            .map_err(|_| anyhow!("preferences lock poisoned"))?;
        Ok(guard.viewed_ids.clone())
    }

    /// Moves `id` to the front of the viewed list and persists it.
    pub fn record_viewed(&self, id: &str) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("preferences lock poisoned"))?;
        guard.viewed_ids.retain(|existing| existing != id);
        guard.viewed_ids.insert(0, id.to_string());
        guard.viewed_ids.truncate(VIEWED_IDS_CAP);
        self.persist(&guard)
    }

    fn persist(&self, data: &UserPreferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write preferences to {}", self.path.display()))
    }
}
