//! Train ticket rebooking saga.
//!
//! A rebook moves a paid order onto another trip and settles the fare
//! difference. The coordinator runs these steps, journaling each one:
//! 1. Resolve the order in the partition derived from the source trip
//! 2. Quote the target trip's fare
//! 3. Decide and apply the ledger settlement
//! 4. Reserve a seat on the target trip
//! 5. Commit the order, relocating it between partitions if needed
//!
//! A failure after a ledger movement compensates it before the saga aborts.
//! Relocations interrupted between insert and delete are finished by the
//! [`RelocationReconciler`].

pub mod aggregate;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod lock;
pub mod reconcile;
pub mod recorder;
pub mod relocation;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::{PendingRelocation, RebookSaga};
pub use coordinator::{RebookCoordinator, RebookOutcome, RebookSettings};
pub use error::{RebookError, Result};
pub use events::RebookEvent;
pub use lock::{OrderGuard, OrderLocks};
pub use reconcile::{ReconcileReport, RelocationReconciler};
pub use recorder::{SagaRecorder, load_saga};
pub use relocation::{CommitOutcome, Relocator};
pub use services::{
    Gateways, HttpLedger, HttpOrderStore, HttpSeatAllocator, HttpTripFareGateway, InMemoryLedger,
    InMemoryOrderStore, InMemorySeatAllocator, InMemoryTripFareGateway, Ledger, OrderStore,
    SeatAllocator, TripFareGateway,
};
pub use state::RebookState;
