//! Roster resolver
//!
//! Snapshots the participant list at the moment evaluation begins. Later
//! roster edits are invisible to the running batch; the next trigger picks
//! them up.

use std::collections::HashSet;

use crate::error::AppResult;
use crate::models::Participant;
use crate::sources::RosterSource;

/// Snapshot the roster: skip blank identifiers, normalize, and collapse
/// rows whose identifiers normalize identically (first occurrence wins).
pub async fn snapshot(roster_source: &dyn RosterSource) -> AppResult<Vec<Participant>> {
    let rows = roster_source.read_rows().await?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut participants = Vec::with_capacity(rows.len());

    for entry in rows {
        let Some(participant) =
            Participant::from_roster_entry(&entry.raw_id, &entry.display_name, entry.row)
        else {
            tracing::warn!(
                row = entry.row,
                name = %entry.display_name,
                "Roster row has a blank identifier, skipping"
            );
            continue;
        };

        if !seen.insert(participant.normalized_id.clone()) {
            tracing::warn!(
                row = entry.row,
                raw_id = %participant.raw_id,
                "Duplicate identifier in roster, keeping first occurrence"
            );
            continue;
        }

        participants.push(participant);
    }

    tracing::info!(count = participants.len(), "Roster snapshot taken");
    Ok(participants)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::sources::{RosterRow, SheetError};

    struct FixedRoster(Vec<RosterRow>);

    #[async_trait]
    impl RosterSource for FixedRoster {
        async fn read_rows(&self) -> Result<Vec<RosterRow>, SheetError> {
            Ok(self.0.clone())
        }
    }

    fn row(raw_id: &str, name: &str, row: u32) -> RosterRow {
        RosterRow {
            raw_id: raw_id.to_string(),
            display_name: name.to_string(),
            row,
        }
    }

    #[tokio::test]
    async fn test_blank_identifiers_are_skipped() {
        let source = FixedRoster(vec![
            row("alice01", "Alice", 2),
            row("   ", "No Id", 3),
            row("", "Also No Id", 4),
            row("bob02", "Bob", 5),
        ]);

        let snapshot = snapshot(&source).await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].normalized_id, "alice01");
        assert_eq!(snapshot[1].normalized_id, "bob02");
    }

    #[tokio::test]
    async fn test_duplicates_collapse_to_first_occurrence() {
        let source = FixedRoster(vec![
            row("Abc", "First", 2),
            row(" abc ", "Second", 3),
            row("xyz", "Third", 4),
        ]);

        let snapshot = snapshot(&source).await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].raw_id, "Abc");
        assert_eq!(snapshot[0].display_name, "First");
        assert_eq!(snapshot[0].row, 2);
    }

    #[tokio::test]
    async fn test_roster_order_is_preserved() {
        let source = FixedRoster(vec![
            row("c", "C", 2),
            row("a", "A", 3),
            row("b", "B", 4),
        ]);

        let snapshot = snapshot(&source).await.unwrap();
        let ids: Vec<&str> = snapshot.iter().map(|p| p.normalized_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
