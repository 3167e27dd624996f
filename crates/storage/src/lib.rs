use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Key under which the paused run state is kept.
pub const KEY_STATE: &str = "state";

/// String-keyed bundle that survives a teardown/recreate cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceState {
    values: BTreeMap<String, String>,
}

impl InstanceState {
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty bundle.
    pub fn load(&self) -> Result<InstanceState> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no saved instance state");
                return Ok(InstanceState::default());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read instance state '{}'", self.path.display())
                })
            }
        };

        serde_json::from_str(&raw).with_context(|| {
            format!("failed to parse instance state '{}'", self.path.display())
        })
    }

    pub fn save(&self, state: &InstanceState) -> Result<()> {
        ensure_parent_dir_exists(&self.path)?;

        let encoded =
            serde_json::to_string_pretty(state).context("failed to encode instance state")?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, encoded)
            .with_context(|| format!("failed to write '{}'", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "failed to move '{}' into place at '{}'",
                tmp_path.display(),
                self.path.display()
            )
        })?;

        debug!(path = %self.path.display(), "saved instance state");
        Ok(())
    }

    pub fn load_paused_state(&self) -> Result<Option<String>> {
        Ok(self.load()?.get_string(KEY_STATE).map(str::to_string))
    }

    /// Updates the state key and keeps any other keys already in the file.
    /// An unreadable file is replaced.
    pub fn save_paused_state(&self, token: &str) -> Result<()> {
        let mut state = self.load().unwrap_or_default();
        state.put_string(KEY_STATE, token);
        self.save(&state)
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove '{}'", self.path.display()))
            }
        }
    }
}

fn ensure_parent_dir_exists(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for instance state",
            parent.display()
        )
    })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
