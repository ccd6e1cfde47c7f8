use std::{path::PathBuf, sync::RwLock};

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::signals::EntityState;

/// Pull interface over the home-automation state snapshot. An empty vector
/// means "no data" and is not an error.
#[async_trait]
pub trait StateProvider: Send + Sync {
    async fn get_states(&self) -> Result<Vec<EntityState>>;
}

/// In-process snapshot that callers replace wholesale.
#[derive(Default)]
pub struct StaticStateProvider {
    states: RwLock<Vec<EntityState>>,
}

impl StaticStateProvider {
    pub fn new(states: Vec<EntityState>) -> Self {
        Self {
            states: RwLock::new(states),
        }
    }

    pub fn replace(&self, states: Vec<EntityState>) {
        let mut guard = match self.states.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = states;
    }

    /// Upserts a single entity by id.
    pub fn set(&self, state: EntityState) {
        let mut guard = match self.states.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match guard.iter_mut().find(|s| s.entity_id == state.entity_id) {
            Some(existing) => *existing = state,
            None => guard.push(state),
        }
    }

    pub fn len(&self) -> usize {
        match self.states.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StateProvider for StaticStateProvider {
    async fn get_states(&self) -> Result<Vec<EntityState>> {
        let guard = match self.states.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(guard.clone())
    }
}

/// Reads a JSON array of entity states from disk on every call. A missing
/// file is reported as an empty snapshot.
pub struct SnapshotFileProvider {
    path: PathBuf,
}

impl SnapshotFileProvider {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl StateProvider for SnapshotFileProvider {
    async fn get_states(&self) -> Result<Vec<EntityState>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read state snapshot {}", self.path.display())
                })
            }
        };

        serde_json::from_str(&contents)
            .with_context(|| format!("invalid state snapshot {}", self.path.display()))
    }
}
