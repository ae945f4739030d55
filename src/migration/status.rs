//! Migration status reporting

use chrono::NaiveDateTime;
use serde::Serialize;

/// Status of one discovered artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatusEntry {
    pub filename: String,
    pub applied: bool,
    /// Batch the migration was applied in, if applied
    pub batch: Option<i64>,
    pub applied_at: Option<NaiveDateTime>,
}

impl MigrationStatusEntry {
    pub fn pending(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            applied: false,
            batch: None,
            applied_at: None,
        }
    }
}

/// Number of entries still pending
#[must_use]
pub fn pending_count(entries: &[MigrationStatusEntry]) -> usize {
    entries.iter().filter(|e| !e.applied).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_count() {
        let applied = MigrationStatusEntry {
            filename: "20240101000000_a.rs".into(),
            applied: true,
            batch: Some(1),
            applied_at: None,
        };
        let entries = vec![applied, MigrationStatusEntry::pending("20240102000000_b.rs")];
        assert_eq!(pending_count(&entries), 1);
    }
}
