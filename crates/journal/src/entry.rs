use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{OrderId, SagaId};

/// Unique identifier of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Creates a new random entry ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an entry ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of an entry inside its saga stream.
///
/// An empty stream is at sequence 0; the first entry is sequence 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Sequence(i64);

impl Sequence {
    /// Creates a sequence from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// The sequence of an empty stream.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the following sequence.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Sequence {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// One recorded step of a saga.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier for this entry.
    pub entry_id: EntryId,

    /// Kind of step recorded (e.g. "FareQuoted", "RelocationPrepared").
    pub entry_type: String,

    /// The saga stream this entry belongs to.
    pub saga_id: SagaId,

    /// The order the saga operates on.
    pub order_id: OrderId,

    /// Position in the saga stream.
    pub sequence: Sequence,

    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,

    /// The step payload as JSON.
    pub payload: serde_json::Value,
}

impl JournalEntry {
    /// Creates a new entry builder.
    pub fn builder() -> JournalEntryBuilder {
        JournalEntryBuilder::default()
    }

    /// Decodes the payload into a typed value.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Builder for journal entries.
#[derive(Debug, Default)]
pub struct JournalEntryBuilder {
    entry_id: Option<EntryId>,
    entry_type: Option<String>,
    saga_id: Option<SagaId>,
    order_id: Option<OrderId>,
    sequence: Option<Sequence>,
    recorded_at: Option<DateTime<Utc>>,
    payload: Option<serde_json::Value>,
}

impl JournalEntryBuilder {
    pub fn entry_id(mut self, id: EntryId) -> Self {
        self.entry_id = Some(id);
        self
    }

    pub fn entry_type(mut self, entry_type: impl Into<String>) -> Self {
        self.entry_type = Some(entry_type.into());
        self
    }

    pub fn saga_id(mut self, id: SagaId) -> Self {
        self.saga_id = Some(id);
        self
    }

    pub fn order_id(mut self, id: OrderId) -> Self {
        self.order_id = Some(id);
        self
    }

    pub fn sequence(mut self, sequence: Sequence) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Sets the timestamp. Defaults to now.
    pub fn recorded_at(mut self, at: DateTime<Utc>) -> Self {
        self.recorded_at = Some(at);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets an already-encoded payload.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Builds the entry.
    ///
    /// # Panics
    ///
    /// Panics if `entry_type`, `saga_id`, `order_id` or `sequence` is unset.
    pub fn build(self) -> JournalEntry {
        JournalEntry {
            entry_id: self.entry_id.unwrap_or_default(),
            entry_type: self.entry_type.expect("entry_type is required"),
            saga_id: self.saga_id.expect("saga_id is required"),
            order_id: self.order_id.expect("order_id is required"),
            sequence: self.sequence.expect("sequence is required"),
            recorded_at: self.recorded_at.unwrap_or_else(Utc::now),
            payload: self.payload.unwrap_or(serde_json::Value::Null),
        }
    }
}
