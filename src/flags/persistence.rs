//! Durable storage seam for player violation records
//!
//! The engine treats storage as a collaborator: load on first touch, save
//! when dirty. A save failure never rolls back in-memory counters;
//! enforcement already happened and availability wins over exact historical
//! counts.

use crate::core::error::{Result, WardenError};
use crate::core::types::PlayerId;
use crate::flags::store::PlayerViolationRecord;
use ahash::AHashMap;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Fetch a player's record, `None` when the player has no history.
    async fn load(&self, player: PlayerId) -> Result<Option<PlayerViolationRecord>>;

    /// Write a player's record.
    async fn save(&self, player: PlayerId, record: &PlayerViolationRecord) -> Result<()>;
}

/// Keeps records as JSON blobs in memory. The demo backend and the test
/// suites use this; it round-trips through serialization so it exercises the
/// same encode/decode path a real substrate would.
#[derive(Default)]
pub struct MemoryStore {
    blobs: std::sync::Mutex<AHashMap<PlayerId, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().expect("memory store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn load(&self, player: PlayerId) -> Result<Option<PlayerViolationRecord>> {
        let blob = {
            let blobs = self.blobs.lock().expect("memory store lock poisoned");
            blobs.get(&player).cloned()
        };
        match blob {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, player: PlayerId, record: &PlayerViolationRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        let mut blobs = self.blobs.lock().expect("memory store lock poisoned");
        blobs.insert(player, json);
        Ok(())
    }
}

/// One JSON file per player under a data directory.
///
/// Missing files mean "no history". A corrupt file is logged and treated as
/// absent rather than wedging the player's session.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, player: PlayerId) -> PathBuf {
        self.dir.join(format!("{}.json", player))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl PersistenceStore for JsonFileStore {
    async fn load(&self, player: PlayerId) -> Result<Option<PlayerViolationRecord>> {
        let path = self.path_for(player);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(WardenError::Io(e)),
        };

        match serde_json::from_str(&json) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(
                    player = %player,
                    path = %path.display(),
                    error = %e,
                    "corrupt violation record on disk, treating as absent"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, player: PlayerId, record: &PlayerViolationRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string(record)?;
        tokio::fs::write(self.path_for(player), json).await?;
        Ok(())
    }
}
