//! Settlement ledger: debits and credits on the actor's internal balance.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::{ActorId, OrderId};
use domain::Money;
use serde::{Deserialize, Serialize};

use super::http::{ServiceClient, accepted};
use super::{read, write};
use crate::error::{RebookError, Result};

/// Body of `POST /ledger/withdraw` and `POST /ledger/refund`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRequest {
    pub login_id: ActorId,
    pub order_id: OrderId,
    pub amount: Money,
}

impl LedgerRequest {
    pub fn new(login_id: ActorId, order_id: OrderId, amount: Money) -> Self {
        Self {
            login_id,
            order_id,
            amount,
        }
    }
}

/// Result of a withdrawal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Withdrawal {
    Debited,
    InsufficientFunds,
}

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn withdraw(&self, request: &LedgerRequest) -> Result<Withdrawal>;

    async fn refund(&self, request: &LedgerRequest) -> Result<()>;
}

/// One applied ledger movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOperation {
    Withdraw(LedgerRequest),
    Refund(LedgerRequest),
}

#[derive(Debug, Default)]
struct InMemoryLedgerState {
    balances: HashMap<ActorId, Money>,
    operations: Vec<LedgerOperation>,
    withdraw_calls: usize,
    refund_calls: usize,
    fail_on_refund: bool,
}

/// In-memory balances for testing. Unknown actors have a zero balance.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<InMemoryLedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, actor: ActorId, balance: Money) {
        write(&self.state).balances.insert(actor, balance);
    }

    pub fn balance(&self, actor: ActorId) -> Money {
        read(&self.state)
            .balances
            .get(&actor)
            .copied()
            .unwrap_or_default()
    }

    pub fn operations(&self) -> Vec<LedgerOperation> {
        read(&self.state).operations.clone()
    }

    /// Number of withdraw and refund calls, including refused ones.
    pub fn call_count(&self) -> usize {
        let state = read(&self.state);
        state.withdraw_calls + state.refund_calls
    }

    pub fn withdraw_calls(&self) -> usize {
        read(&self.state).withdraw_calls
    }

    pub fn refund_calls(&self) -> usize {
        read(&self.state).refund_calls
    }

    pub fn set_fail_on_refund(&self, fail: bool) {
        write(&self.state).fail_on_refund = fail;
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn withdraw(&self, request: &LedgerRequest) -> Result<Withdrawal> {
        let mut state = write(&self.state);
        state.withdraw_calls += 1;

        let balance = state
            .balances
            .get(&request.login_id)
            .copied()
            .unwrap_or_default();
        if balance < request.amount {
            return Ok(Withdrawal::InsufficientFunds);
        }

        state
            .balances
            .insert(request.login_id, balance - request.amount);
        state
            .operations
            .push(LedgerOperation::Withdraw(request.clone()));
        Ok(Withdrawal::Debited)
    }

    async fn refund(&self, request: &LedgerRequest) -> Result<()> {
        let mut state = write(&self.state);
        state.refund_calls += 1;
        if state.fail_on_refund {
            return Err(RebookError::unavailable("ledger", "refund refused"));
        }

        let balance = state
            .balances
            .get(&request.login_id)
            .copied()
            .unwrap_or_default();
        state
            .balances
            .insert(request.login_id, balance + request.amount);
        state.operations.push(LedgerOperation::Refund(request.clone()));
        Ok(())
    }
}

/// HTTP client for the ledger service.
#[derive(Debug, Clone)]
pub struct HttpLedger {
    client: ServiceClient,
}

impl HttpLedger {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: ServiceClient::new("ledger", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl Ledger for HttpLedger {
    #[tracing::instrument(skip_all, fields(order_id = %request.order_id, amount = %request.amount))]
    async fn withdraw(&self, request: &LedgerRequest) -> Result<Withdrawal> {
        let envelope = self
            .client
            .post::<_, serde_json::Value>("/ledger/withdraw", request)
            .await?;
        Ok(if envelope.is_success() {
            Withdrawal::Debited
        } else {
            Withdrawal::InsufficientFunds
        })
    }

    #[tracing::instrument(skip_all, fields(order_id = %request.order_id, amount = %request.amount))]
    async fn refund(&self, request: &LedgerRequest) -> Result<()> {
        let envelope = self
            .client
            .post::<_, serde_json::Value>("/ledger/refund", request)
            .await?;
        accepted(self.client.service(), envelope)
    }
}
