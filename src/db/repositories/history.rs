use anyhow::{Context, Result};
use log::warn;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::parse_datetime,
    models::{HistoryEntry, NewHistoryEntry},
};
use crate::history::selection::partition_selected;

fn row_to_entry(row: &Row) -> Result<HistoryEntry> {
    let captured_at: String = row.get("captured_at")?;

    Ok(HistoryEntry {
        id: row.get("id")?,
        image_jpeg: row.get("image_jpeg")?,
        label: row.get("label")?,
        confidence: row.get("confidence")?,
        captured_at: parse_datetime(&captured_at, "captured_at")?,
    })
}

/// The rows the history list shows, keyed by `seq`, in capture order.
///
/// Rows that no longer decode are left out here and nowhere else, so counts,
/// positional reads and positional deletes all address the same list.
fn visible_rows(conn: &Connection) -> Result<Vec<(i64, HistoryEntry)>> {
    let mut stmt = conn.prepare(
        "SELECT seq, id, image_jpeg, label, confidence, captured_at
         FROM history_entries ORDER BY seq ASC",
    )?;

    let mut rows = stmt.query([])?;
    let mut visible = Vec::new();
    while let Some(row) = rows.next()? {
        let seq: i64 = row.get("seq")?;
        match row_to_entry(row) {
            Ok(entry) => visible.push((seq, entry)),
            Err(err) => warn!("Skipping unreadable history row {seq}: {err:#}"),
        }
    }

    Ok(visible)
}

impl Database {
    /// Insert one capture. Image and label are a single row, written in one
    /// statement.
    pub async fn insert_history_entry(&self, entry: &NewHistoryEntry) -> Result<HistoryEntry> {
        let record = HistoryEntry {
            id: Uuid::new_v4().to_string(),
            image_jpeg: entry.image_jpeg.clone(),
            label: entry.label.clone(),
            confidence: entry.confidence,
            captured_at: entry.captured_at,
        };

        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO history_entries (id, image_jpeg, label, confidence, captured_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.image_jpeg,
                    record.label,
                    record.confidence,
                    record.captured_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert history entry")?;
            Ok(record)
        })
        .await
    }

    /// All readable entries in capture order.
    pub async fn get_history_entries(&self) -> Result<Vec<HistoryEntry>> {
        self.execute(|conn| {
            Ok(visible_rows(conn)?
                .into_iter()
                .map(|(_, entry)| entry)
                .collect())
        })
        .await
    }

    pub async fn count_history_entries(&self) -> Result<usize> {
        self.execute(|conn| Ok(visible_rows(conn)?.len())).await
    }

    /// Entry at display position `index`, if any.
    pub async fn get_history_entry_at(&self, index: usize) -> Result<Option<HistoryEntry>> {
        self.execute(move |conn| {
            Ok(visible_rows(conn)?
                .into_iter()
                .nth(index)
                .map(|(_, entry)| entry))
        })
        .await
    }

    pub async fn get_latest_history_entry(&self) -> Result<Option<HistoryEntry>> {
        self.execute(|conn| Ok(visible_rows(conn)?.pop().map(|(_, entry)| entry)))
            .await
    }

    /// Delete the entries at the given display positions in one transaction.
    /// Returns how many rows were removed.
    pub async fn delete_history_at(&self, indices: Vec<usize>) -> Result<usize> {
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open history delete transaction")?;

            // Positions resolve inside the transaction, against the same rows
            // the list shows.
            let seqs: Vec<i64> = visible_rows(&tx)?.into_iter().map(|(seq, _)| seq).collect();

            let (_, doomed) = partition_selected(seqs, &indices);
            for seq in &doomed {
                tx.execute("DELETE FROM history_entries WHERE seq = ?1", params![seq])?;
            }

            tx.commit()
                .context("failed to commit history delete transaction")?;
            Ok(doomed.len())
        })
        .await
    }

    /// Clears every row, unreadable ones included.
    pub async fn delete_all_history(&self) -> Result<usize> {
        self.execute(|conn| {
            let removed = conn
                .execute("DELETE FROM history_entries", [])
                .with_context(|| "failed to clear history")?;
            Ok(removed)
        })
        .await
    }
}
