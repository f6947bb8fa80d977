//! Per-order serialization of rebooks inside one process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use common::OrderId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::{RebookError, Result};

type LockMap = HashMap<OrderId, Arc<AsyncMutex<()>>>;

/// Async locks keyed by order id.
///
/// Entries are created on demand and dropped with the last guard, so the
/// map only holds orders with a rebook in flight.
#[derive(Debug, Clone)]
pub struct OrderLocks {
    locks: Arc<Mutex<LockMap>>,
    wait: Duration,
}

impl OrderLocks {
    /// `wait` bounds how long `acquire` queues behind another rebook.
    pub fn new(wait: Duration) -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
            wait,
        }
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Waits for the order's lock. Fails with `RebookInProgress` after the
    /// configured wait.
    pub async fn acquire(&self, order_id: OrderId) -> Result<OrderGuard> {
        let lock = self.entry(order_id);
        match tokio::time::timeout(self.wait, lock.lock_owned()).await {
            Ok(guard) => Ok(self.guard(order_id, guard)),
            Err(_) => {
                self.release(order_id);
                tracing::warn!(%order_id, wait = ?self.wait, "rebook lock contended");
                Err(RebookError::RebookInProgress(order_id))
            }
        }
    }

    /// Takes the lock only if it is free.
    pub fn try_acquire(&self, order_id: OrderId) -> Option<OrderGuard> {
        let lock = self.entry(order_id);
        match lock.try_lock_owned() {
            Ok(guard) => Some(self.guard(order_id, guard)),
            Err(_) => {
                self.release(order_id);
                None
            }
        }
    }

    /// Number of orders with a live lock entry.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry(&self, order_id: OrderId) -> Arc<AsyncMutex<()>> {
        self.map()
            .entry(order_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn guard(&self, order_id: OrderId, guard: OwnedMutexGuard<()>) -> OrderGuard {
        OrderGuard {
            order_id,
            guard: Some(guard),
            locks: self.clone(),
        }
    }

    /// Drops the map entry once nobody holds or waits for it.
    fn release(&self, order_id: OrderId) {
        let mut map = self.map();
        if map
            .get(&order_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&order_id);
        }
    }
}

/// Held for the whole saga of one order.
#[derive(Debug)]
pub struct OrderGuard {
    order_id: OrderId,
    guard: Option<OwnedMutexGuard<()>>,
    locks: OrderLocks,
}

impl OrderGuard {
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }
}

impl Drop for OrderGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(self.order_id);
    }
}
