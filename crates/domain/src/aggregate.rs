//! Core aggregate and domain event traits.

use common::SagaId;
use journal::Sequence;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for facts recorded in the saga journal.
///
/// Events are immutable and named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name, stored as the journal entry type.
    fn event_type(&self) -> &'static str;
}

/// Trait for state rebuilt by replaying journal entries.
///
/// Aggregates:
/// - Are rebuilt by replaying their events in sequence order
/// - Apply events purely and deterministically
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The events this aggregate consumes.
    type Event: DomainEvent;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Returns the stream identifier, or `None` before the first event.
    fn id(&self) -> Option<SagaId>;

    /// Returns the sequence of the last applied event.
    fn sequence(&self) -> Sequence;

    /// Sets the sequence after loading from the journal.
    fn set_sequence(&mut self, sequence: Sequence);

    /// Applies an event to the aggregate.
    ///
    /// Must not fail and must not have side effects.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in order.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
