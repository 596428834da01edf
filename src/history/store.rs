use anyhow::Result;
use log::{debug, info};

use crate::db::{Database, HistoryEntry, NewHistoryEntry};

/// Ordered list of past captures, persisted after every change.
///
/// The backing table is created by the schema migration on first open, so a
/// store that was never written and one that was cleared both read back as
/// an empty list.
#[derive(Clone)]
pub struct HistoryStore {
    db: Database,
}

impl HistoryStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn load(&self) -> Result<Vec<HistoryEntry>> {
        let entries = self.db.get_history_entries().await?;
        debug!("Loaded {} history entries", entries.len());
        Ok(entries)
    }

    pub async fn len(&self) -> Result<usize> {
        self.db.count_history_entries().await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    pub async fn get(&self, index: usize) -> Result<Option<HistoryEntry>> {
        self.db.get_history_entry_at(index).await
    }

    /// Most recent capture; seeds the preview thumbnail on launch.
    pub async fn latest(&self) -> Result<Option<HistoryEntry>> {
        self.db.get_latest_history_entry().await
    }

    pub async fn append(&self, entry: NewHistoryEntry) -> Result<HistoryEntry> {
        let stored = self.db.insert_history_entry(&entry).await?;
        info!(
            "Stored history entry {} (label: {}, {} bytes)",
            stored.id,
            stored.label.as_deref().unwrap_or("<none>"),
            stored.image_jpeg.len()
        );
        Ok(stored)
    }

    /// Remove the entries at `indices` (0-based display positions). Order and
    /// duplicates in `indices` do not matter; positions past the end are
    /// ignored.
    pub async fn delete_selected(&self, indices: &[usize]) -> Result<usize> {
        if indices.is_empty() {
            return Ok(0);
        }
        let removed = self.db.delete_history_at(indices.to_vec()).await?;
        info!("Deleted {removed} history entries");
        Ok(removed)
    }

    /// Single-row swipe delete.
    pub async fn delete_at(&self, index: usize) -> Result<bool> {
        Ok(self.delete_selected(&[index]).await? == 1)
    }

    pub async fn delete_all(&self) -> Result<usize> {
        let removed = self.db.delete_all_history().await?;
        info!("Cleared history ({removed} entries)");
        Ok(removed)
    }
}
