//! Session-scoped view preferences.
//!
//! Preferences are an explicit value passed to whoever needs them and
//! persisted only through [`PreferenceStore::save`]. Nothing here is global.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Number of recent searches kept.
pub const MAX_RECENT_SEARCHES: usize = 10;

/// Result layout selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

/// Per-user catalog preferences.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewPreferences {
    #[serde(default)]
    pub view_mode: ViewMode,

    /// Most recent first, no duplicates.
    #[serde(default)]
    pub recent_searches: Vec<String>,

    /// Bookmarked record ids, in the order they were added.
    #[serde(default)]
    pub bookmarks: Vec<i64>,
}

impl ViewPreferences {
    /// Remember a search term. Blank terms are ignored.
    pub fn remember_search(&mut self, term: &str) {
        let term = term.trim();
        if term.is_empty() {
            return;
        }
        self.recent_searches.retain(|t| !t.eq_ignore_ascii_case(term));
        self.recent_searches.insert(0, term.to_string());
        self.recent_searches.truncate(MAX_RECENT_SEARCHES);
    }

    /// Toggle a bookmark. Returns whether the record is now bookmarked.
    pub fn toggle_bookmark(&mut self, id: i64) -> bool {
        if let Some(pos) = self.bookmarks.iter().position(|b| *b == id) {
            self.bookmarks.remove(pos);
            false
        } else {
            self.bookmarks.push(id);
            true
        }
    }

    pub fn is_bookmarked(&self, id: i64) -> bool {
        self.bookmarks.contains(&id)
    }
}

/// JSON file holding [`ViewPreferences`].
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load preferences. A missing file yields defaults.
    pub async fn load(&self) -> Result<ViewPreferences> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no saved preferences; using defaults");
                return Ok(ViewPreferences::default());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read preferences from {}", self.path.display())
                });
            }
        };

        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse preferences in {}", self.path.display()))
    }

    /// Persist preferences, creating parent directories as needed.
    pub async fn save(&self, prefs: &ViewPreferences) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(prefs).context("failed to serialize preferences")?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("failed to write preferences to {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), "preferences saved");
        Ok(())
    }
}
