//! Order partitions: trait, in-memory double and HTTP client.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::OrderId;
use domain::{Order, Shard};

use super::http::{ServiceClient, accepted};
use super::{read, write};
use crate::error::{RebookError, Result};

/// Read and write access to both order partitions.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Looks the order up in one partition only.
    async fn find(&self, shard: Shard, order_id: OrderId) -> Result<Option<Order>>;

    /// Inserts a new record. Fails if the partition refuses it.
    async fn create(&self, shard: Shard, order: &Order) -> Result<()>;

    /// Replaces an existing record.
    async fn update(&self, shard: Shard, order: &Order) -> Result<()>;

    async fn delete(&self, shard: Shard, order_id: OrderId) -> Result<()>;
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    primary: HashMap<OrderId, Order>,
    secondary: HashMap<OrderId, Order>,
    find_calls: usize,
    write_calls: usize,
    fail_on_find: bool,
    fail_on_create: bool,
    fail_on_update: bool,
    fail_on_delete: bool,
}

impl InMemoryOrderState {
    fn partition(&mut self, shard: Shard) -> &mut HashMap<OrderId, Order> {
        match shard {
            Shard::Primary => &mut self.primary,
            Shard::Secondary => &mut self.secondary,
        }
    }
}

/// In-memory pair of order partitions for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an order directly, bypassing failure toggles and counters.
    pub fn insert(&self, shard: Shard, order: Order) {
        write(&self.state).partition(shard).insert(order.id, order);
    }

    /// Reads an order directly.
    pub fn get(&self, shard: Shard, order_id: OrderId) -> Option<Order> {
        write(&self.state).partition(shard).get(&order_id).cloned()
    }

    pub fn contains(&self, shard: Shard, order_id: OrderId) -> bool {
        self.get(shard, order_id).is_some()
    }

    pub fn count(&self, shard: Shard) -> usize {
        let state = read(&self.state);
        match shard {
            Shard::Primary => state.primary.len(),
            Shard::Secondary => state.secondary.len(),
        }
    }

    pub fn find_calls(&self) -> usize {
        read(&self.state).find_calls
    }

    /// Number of create, update and delete calls.
    pub fn write_calls(&self) -> usize {
        read(&self.state).write_calls
    }

    pub fn set_fail_on_find(&self, fail: bool) {
        write(&self.state).fail_on_find = fail;
    }

    pub fn set_fail_on_create(&self, fail: bool) {
        write(&self.state).fail_on_create = fail;
    }

    pub fn set_fail_on_update(&self, fail: bool) {
        write(&self.state).fail_on_update = fail;
    }

    pub fn set_fail_on_delete(&self, fail: bool) {
        write(&self.state).fail_on_delete = fail;
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn find(&self, shard: Shard, order_id: OrderId) -> Result<Option<Order>> {
        let mut state = write(&self.state);
        state.find_calls += 1;
        if state.fail_on_find {
            return Err(RebookError::unavailable("order", "partition unreachable"));
        }
        Ok(state.partition(shard).get(&order_id).cloned())
    }

    async fn create(&self, shard: Shard, order: &Order) -> Result<()> {
        let mut state = write(&self.state);
        state.write_calls += 1;
        if state.fail_on_create {
            return Err(RebookError::unavailable("order", "create refused"));
        }
        let partition = state.partition(shard);
        if partition.contains_key(&order.id) {
            return Err(RebookError::unavailable("order", "Order already exist"));
        }
        partition.insert(order.id, order.clone());
        Ok(())
    }

    async fn update(&self, shard: Shard, order: &Order) -> Result<()> {
        let mut state = write(&self.state);
        state.write_calls += 1;
        if state.fail_on_update {
            return Err(RebookError::unavailable("order", "update refused"));
        }
        match state.partition(shard).get_mut(&order.id) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(RebookError::unavailable("order", "Order Not Found")),
        }
    }

    async fn delete(&self, shard: Shard, order_id: OrderId) -> Result<()> {
        let mut state = write(&self.state);
        state.write_calls += 1;
        if state.fail_on_delete {
            return Err(RebookError::unavailable("order", "delete refused"));
        }
        match state.partition(shard).remove(&order_id) {
            Some(_) => Ok(()),
            None => Err(RebookError::unavailable("order", "Order Not Exist")),
        }
    }
}

/// HTTP client for the two order services.
///
/// The primary partition lives under `/order`, the secondary under
/// `/orderOther`, each on its own base URL.
#[derive(Debug, Clone)]
pub struct HttpOrderStore {
    primary: ServiceClient,
    secondary: ServiceClient,
}

impl HttpOrderStore {
    pub fn new(primary_url: &str, secondary_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            primary: ServiceClient::new("order", primary_url, timeout)?,
            secondary: ServiceClient::new("order-other", secondary_url, timeout)?,
        })
    }

    fn route(&self, shard: Shard) -> (&ServiceClient, &'static str) {
        match shard {
            Shard::Primary => (&self.primary, "/order"),
            Shard::Secondary => (&self.secondary, "/orderOther"),
        }
    }
}

#[async_trait]
impl OrderStore for HttpOrderStore {
    #[tracing::instrument(skip_all, fields(%shard, %order_id))]
    async fn find(&self, shard: Shard, order_id: OrderId) -> Result<Option<Order>> {
        let (client, base) = self.route(shard);
        let envelope = client.get::<Order>(&format!("{base}/{order_id}")).await?;
        Ok(envelope.into_data())
    }

    #[tracing::instrument(skip_all, fields(%shard, order_id = %order.id))]
    async fn create(&self, shard: Shard, order: &Order) -> Result<()> {
        let (client, base) = self.route(shard);
        let envelope = client.post::<_, serde_json::Value>(base, order).await?;
        accepted(client.service(), envelope)
    }

    #[tracing::instrument(skip_all, fields(%shard, order_id = %order.id))]
    async fn update(&self, shard: Shard, order: &Order) -> Result<()> {
        let (client, base) = self.route(shard);
        let envelope = client
            .put::<_, serde_json::Value>(&format!("{base}/{}", order.id), order)
            .await?;
        accepted(client.service(), envelope)
    }

    #[tracing::instrument(skip_all, fields(%shard, %order_id))]
    async fn delete(&self, shard: Shard, order_id: OrderId) -> Result<()> {
        let (client, base) = self.route(shard);
        let envelope = client
            .delete::<serde_json::Value>(&format!("{base}/{order_id}"))
            .await?;
        accepted(client.service(), envelope)
    }
}
