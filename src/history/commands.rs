//! Commands backing the history list: row count, row contents, and the
//! delete actions of the edit toolbar.

use crate::{db::HistoryEntry, AppState};

pub async fn get_history_count(state: &AppState) -> Result<usize, String> {
    state.history.len().await.map_err(|e| e.to_string())
}

pub async fn get_history_entry(
    state: &AppState,
    index: usize,
) -> Result<Option<HistoryEntry>, String> {
    state.history.get(index).await.map_err(|e| e.to_string())
}

pub async fn list_history(state: &AppState) -> Result<Vec<HistoryEntry>, String> {
    state.history.load().await.map_err(|e| e.to_string())
}

/// "Delete" with a multi-row selection.
pub async fn delete_history_rows(state: &AppState, indices: Vec<usize>) -> Result<usize, String> {
    state
        .history
        .delete_selected(&indices)
        .await
        .map_err(|e| e.to_string())
}

/// Swipe-to-delete on a single row.
pub async fn delete_history_row(state: &AppState, index: usize) -> Result<bool, String> {
    state
        .history
        .delete_at(index)
        .await
        .map_err(|e| e.to_string())
}

pub async fn delete_all_history(state: &AppState) -> Result<usize, String> {
    state.history.delete_all().await.map_err(|e| e.to_string())
}
