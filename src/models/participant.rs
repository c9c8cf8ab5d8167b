//! Participant model

use serde::{Deserialize, Serialize};

/// A registered participant, snapshotted from the roster at run start.
///
/// Identity is the normalized identifier; the raw identifier is kept only
/// for display and error messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Identifier exactly as entered in the roster
    pub raw_id: String,
    /// Trimmed, case-folded identifier used as the evidence lookup key
    pub normalized_id: String,
    /// Human display name from the roster
    pub display_name: String,
    /// 1-based roster sheet row this participant came from
    pub row: u32,
}

impl Participant {
    /// Build a participant from a raw roster entry.
    ///
    /// Returns `None` when the identifier is empty or all whitespace.
    pub fn from_roster_entry(raw_id: &str, display_name: &str, row: u32) -> Option<Self> {
        let normalized = normalize_identifier(raw_id);
        if normalized.is_empty() {
            return None;
        }
        Some(Self {
            raw_id: raw_id.to_string(),
            normalized_id: normalized,
            display_name: display_name.trim().to_string(),
            row,
        })
    }
}

impl PartialEq for Participant {
    fn eq(&self, other: &Self) -> bool {
        self.normalized_id == other.normalized_id
    }
}

impl Eq for Participant {}

/// Normalize a raw identifier: trim surrounding whitespace and case-fold
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_lowercase()
}
