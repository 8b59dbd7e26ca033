use crate::core::draft::{DRAFT_KEY, Draft, DraftStore};
use anyhow::{Context, Result};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const PARTITION: &str = "drafts";

/// Draft persisted in a `fjall` partition under the data directory.
pub struct DiskDraftStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskDraftStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;

        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open draft store at {}", path.display()))?;
        let partition = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .context("Failed to open draft partition")?;
        debug!(path = %path.display(), "Opened draft store");

        Ok(Self {
            keyspace,
            partition,
        })
    }
}

impl DraftStore for DiskDraftStore {
    fn load(&self) -> Result<Option<Draft>> {
        match self.partition.get(DRAFT_KEY)? {
            Some(bytes) => {
                let draft: Draft =
                    serde_json::from_slice(&bytes).context("Failed to parse stored draft")?;
                debug!(players = draft.players.len(), "Draft HIT");
                Ok(Some(draft))
            }
            None => {
                debug!("Draft MISS");
                Ok(None)
            }
        }
    }

    fn save(&self, draft: &Draft) -> Result<()> {
        self.partition
            .insert(DRAFT_KEY, serde_json::to_vec(draft)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(players = draft.players.len(), "Draft PUT");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.partition.remove(DRAFT_KEY)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Draft REMOVE");
        Ok(())
    }
}
