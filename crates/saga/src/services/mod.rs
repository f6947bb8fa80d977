//! Collaborator gateways: traits, in-memory doubles and HTTP clients.

pub mod http;
pub mod ledger;
pub mod order_store;
pub mod seat;
pub mod trip_fare;

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

pub use http::{Envelope, ServiceClient};
pub use ledger::{HttpLedger, InMemoryLedger, Ledger, LedgerOperation, LedgerRequest, Withdrawal};
pub use order_store::{HttpOrderStore, InMemoryOrderStore, OrderStore};
pub use seat::{HttpSeatAllocator, InMemorySeatAllocator, SeatAllocator, SeatAssignment, SeatRequest};
pub use trip_fare::{
    HttpTripFareGateway, InMemoryTripFareGateway, PriceRecord, TripDetail, TripDetailQuery,
    TripFareGateway,
};

use crate::error::{RebookError, Result};

/// The collaborators one rebook talks to.
#[derive(Clone)]
pub struct Gateways {
    pub orders: Arc<dyn OrderStore>,
    pub trips: Arc<dyn TripFareGateway>,
    pub seats: Arc<dyn SeatAllocator>,
    pub ledger: Arc<dyn Ledger>,
}

impl Gateways {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        trips: Arc<dyn TripFareGateway>,
        seats: Arc<dyn SeatAllocator>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        Self {
            orders,
            trips,
            seats,
            ledger,
        }
    }
}

/// Runs a gateway call under `timeout`. Expiry is `ServiceUnavailable`.
pub async fn within<T>(
    timeout: Duration,
    service: &'static str,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            metrics::counter!("gateway_timeouts_total", "service" => service).increment(1);
            tracing::warn!(service, ?timeout, "collaborator call timed out");
            Err(RebookError::unavailable(
                service,
                format!("timed out after {}ms", timeout.as_millis()),
            ))
        }
    }
}

// Lock poisoning is ignored by the in-memory doubles.
pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn within_maps_expiry_to_unavailable() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, RebookError>(1)
        };
        let err = within(Duration::from_secs(1), "seat", slow).await.unwrap_err();
        assert!(matches!(
            err,
            RebookError::ServiceUnavailable { service: "seat", .. }
        ));
    }

    #[tokio::test]
    async fn within_passes_results_through() {
        let value = within(Duration::from_secs(1), "seat", async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
