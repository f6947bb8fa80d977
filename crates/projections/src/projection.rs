//! Projection trait and position tracking.

use async_trait::async_trait;
use journal::JournalEntry;
use saga::RebookEvent;

use crate::Result;

/// How many journal entries a projection has consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionPosition {
    pub entries_processed: u64,
}

impl ProjectionPosition {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn advance(&self) -> Self {
        Self {
            entries_processed: self.entries_processed + 1,
        }
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position({})", self.entries_processed)
    }
}

/// Folds journal entries into a read model.
///
/// Entries arrive in journal append order. A projection must advance its
/// position for every entry it is handed, including ones it ignores, so the
/// processor can resume a catch-up where it stopped.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, entry: &JournalEntry) -> Result<()>;

    async fn position(&self) -> ProjectionPosition;

    /// Drops everything projected so far.
    async fn reset(&self) -> Result<()>;
}

/// Decodes the rebook event carried by an entry.
pub(crate) fn decode(entry: &JournalEntry) -> Result<RebookEvent> {
    Ok(entry.decode::<RebookEvent>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_advances_from_zero() {
        let pos = ProjectionPosition::zero();
        assert_eq!(pos.entries_processed, 0);
        assert_eq!(pos.advance().advance().entries_processed, 2);
    }

    #[test]
    fn position_display() {
        let pos = ProjectionPosition {
            entries_processed: 42,
        };
        assert_eq!(pos.to_string(), "position(42)");
    }
}
