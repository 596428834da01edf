//! History entry data model.
//!
//! One captured frame: the resized image as JPEG plus whatever label the
//! classifier produced for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub image_jpeg: Vec<u8>,
    /// `None` when inference failed for this capture.
    pub label: Option<String>,
    pub confidence: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

/// Input for appending a capture; id and ordering are assigned on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryEntry {
    pub image_jpeg: Vec<u8>,
    pub label: Option<String>,
    pub confidence: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl NewHistoryEntry {
    pub fn new(image_jpeg: Vec<u8>, label: Option<String>) -> Self {
        Self {
            image_jpeg,
            label,
            confidence: None,
            captured_at: Utc::now(),
        }
    }
}
