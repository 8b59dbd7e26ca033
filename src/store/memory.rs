use crate::core::draft::{Draft, DraftStore};
use anyhow::Result;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Keeps the draft in process memory. Used when no data directory is
/// available and in tests.
#[derive(Default)]
pub struct MemoryDraftStore {
    inner: Mutex<Option<Draft>>,
    writes: AtomicUsize,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_draft(draft: Draft) -> Self {
        Self {
            inner: Mutex::new(Some(draft)),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of successful `save` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl DraftStore for MemoryDraftStore {
    fn load(&self) -> Result<Option<Draft>> {
        let draft = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("Draft lock poisoned"))?;
        debug!(found = draft.is_some(), "Draft LOAD");
        Ok(draft.clone())
    }

    fn save(&self, draft: &Draft) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("Draft lock poisoned"))?;
        *inner = Some(draft.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!("Draft SAVE");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("Draft lock poisoned"))?;
        *inner = None;
        debug!("Draft CLEAR");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::squad::Squad;

    #[test]
    fn test_memory_draft_save_load() {
        let store = MemoryDraftStore::new();
        assert!(store.load().unwrap().is_none());

        let mut squad = Squad::default();
        squad.bank = 2.5;
        store.save(&Draft::capture(&squad)).unwrap();
        assert_eq!(store.writes(), 1);

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.bank, 2.5);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
