use chrono::{DateTime, Utc};

use crate::{OrderId, SagaId};

/// Filter over journal entries.
///
/// Results are always returned in append order.
#[derive(Debug, Clone, Default)]
pub struct JournalQuery {
    /// Only entries of this saga.
    pub saga_id: Option<SagaId>,

    /// Only entries about this order.
    pub order_id: Option<OrderId>,

    /// Only entries whose type is one of these.
    pub entry_types: Option<Vec<String>>,

    /// Only entries recorded at or after this instant.
    pub recorded_after: Option<DateTime<Utc>>,

    /// Only entries recorded at or before this instant.
    pub recorded_before: Option<DateTime<Utc>>,

    /// Maximum number of entries to return.
    pub limit: Option<usize>,
}

impl JournalQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry recorded about an order, across all of its sagas.
    pub fn for_order(order_id: OrderId) -> Self {
        Self {
            order_id: Some(order_id),
            ..Default::default()
        }
    }

    pub fn saga_id(mut self, id: SagaId) -> Self {
        self.saga_id = Some(id);
        self
    }

    pub fn order_id(mut self, id: OrderId) -> Self {
        self.order_id = Some(id);
        self
    }

    pub fn entry_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entry_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn recorded_after(mut self, at: DateTime<Utc>) -> Self {
        self.recorded_after = Some(at);
        self
    }

    pub fn recorded_before(mut self, at: DateTime<Utc>) -> Self {
        self.recorded_before = Some(at);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if the entry passes every filter except `limit`.
    pub fn matches(&self, entry: &crate::JournalEntry) -> bool {
        if let Some(id) = self.saga_id
            && entry.saga_id != id
        {
            return false;
        }
        if let Some(id) = self.order_id
            && entry.order_id != id
        {
            return false;
        }
        if let Some(ref types) = self.entry_types
            && !types.contains(&entry.entry_type)
        {
            return false;
        }
        if let Some(after) = self.recorded_after
            && entry.recorded_at < after
        {
            return false;
        }
        if let Some(before) = self.recorded_before
            && entry.recorded_at > before
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JournalEntry, Sequence};

    fn entry(order_id: OrderId, entry_type: &str) -> JournalEntry {
        JournalEntry::builder()
            .entry_type(entry_type)
            .saga_id(SagaId::for_key(&order_id.to_string()))
            .order_id(order_id)
            .sequence(Sequence::new(1))
            .build()
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(JournalQuery::new().matches(&entry(OrderId::new(), "RebookStarted")));
    }

    #[test]
    fn filters_by_order_and_type() {
        let order_id = OrderId::new();
        let query = JournalQuery::for_order(order_id).entry_types(["RelocationPrepared"]);

        assert!(query.matches(&entry(order_id, "RelocationPrepared")));
        assert!(!query.matches(&entry(order_id, "RebookStarted")));
        assert!(!query.matches(&entry(OrderId::new(), "RelocationPrepared")));
    }

    #[test]
    fn filters_by_time_window() {
        let e = entry(OrderId::new(), "RebookStarted");
        let later = e.recorded_at + chrono::Duration::seconds(5);
        assert!(!JournalQuery::new().recorded_after(later).matches(&e));
        assert!(JournalQuery::new().recorded_before(later).matches(&e));
    }
}
