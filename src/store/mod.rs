pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use crate::core::draft::DraftStore;
use disk::DiskDraftStore;
use memory::MemoryDraftStore;
use std::sync::Arc;
use tracing::warn;

/// Opens the on-disk draft store under the configured data directory,
/// falling back to memory when the directory cannot be used.
pub fn open_draft_store(config: &AppConfig) -> Arc<dyn DraftStore> {
    let disk = config
        .default_data_path()
        .and_then(|path| DiskDraftStore::open(&path.join("draft")));

    match disk {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, "Draft store unavailable, changes will not persist");
            Arc::new(MemoryDraftStore::new())
        }
    }
}
