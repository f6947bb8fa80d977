//! Domain layer for train ticket rebooking.
//!
//! This crate holds the pure, I/O-free parts of the rebooking workflow:
//! - [`Aggregate`] and [`DomainEvent`] traits for journal-sourced state
//! - The order record kept by the order partitions, with its status and seat class
//! - [`Money`], an exact decimal amount carried as a string on the wire
//! - The shard resolver that picks an order partition from a trip id
//! - Fare delta and settlement planning
//! - Validation of incoming rebook requests

pub mod aggregate;
pub mod error;
pub mod fare;
pub mod money;
pub mod order;
pub mod rebook;
pub mod shard;
pub mod trip;

pub use aggregate::{Aggregate, DomainEvent};
pub use error::DomainError;
pub use fare::{PaymentMode, SettlementOutcome, SettlementPlan, fare_delta};
pub use money::Money;
pub use order::{Order, OrderChange, OrderStatus, SeatClass};
pub use rebook::{IdempotencyKey, RebookForm, RebookRequest};
pub use shard::{DEFAULT_PRIMARY_PREFIXES, Shard, ShardResolver, resolve_shard};
pub use trip::{PriceRate, TripId, TripQuote};
