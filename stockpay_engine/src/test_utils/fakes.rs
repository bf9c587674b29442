//! In-memory stand-ins for the payment node and the price oracle.
//!
//! Both are cheap handles over shared state, so a test can keep one clone to script and inspect while the engine owns
//! another.
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use rust_decimal::Decimal;
use spg_common::CoinAmount;

use crate::traits::{PaymentNode, PaymentNodeError, PriceOracle, PriceOracleError};

#[derive(Debug, Default)]
struct NodeState {
    next_address: u64,
    received: HashMap<String, CoinAmount>,
    failing_addresses: HashSet<String>,
    sent: Vec<(String, CoinAmount)>,
    queries: usize,
    fail_new_address: bool,
    fail_sends: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeNode {
    state: Arc<Mutex<NodeState>>,
}

impl FakeNode {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().expect("fake node state poisoned")
    }

    /// Sets the total the ledger reports for `address`.
    pub fn set_received(&self, address: &str, amount: CoinAmount) {
        self.state().received.insert(address.to_string(), amount);
    }

    /// Makes balance queries for `address` fail until [`FakeNode::heal_address`] is called.
    pub fn fail_address(&self, address: &str) {
        self.state().failing_addresses.insert(address.to_string());
    }

    pub fn heal_address(&self, address: &str) {
        self.state().failing_addresses.remove(address);
    }

    pub fn fail_new_address(&self, fail: bool) {
        self.state().fail_new_address = fail;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.state().fail_sends = fail;
    }

    /// Every successful payout so far, in order.
    pub fn sent(&self) -> Vec<(String, CoinAmount)> {
        self.state().sent.clone()
    }

    /// How many balance queries have been made.
    pub fn queries(&self) -> usize {
        self.state().queries
    }
}

impl PaymentNode for FakeNode {
    async fn new_deposit_address(&self) -> Result<String, PaymentNodeError> {
        let mut state = self.state();
        if state.fail_new_address {
            return Err(PaymentNodeError::Transport("connection refused".into()));
        }
        state.next_address += 1;
        Ok(format!("XdepositAddress{:020}", state.next_address))
    }

    async fn received_at_address(
        &self,
        address: &str,
        _min_confirmations: u32,
    ) -> Result<CoinAmount, PaymentNodeError> {
        let mut state = self.state();
        state.queries += 1;
        if state.failing_addresses.contains(address) {
            return Err(PaymentNodeError::Rpc { code: -28, message: "Loading block index...".into() });
        }
        Ok(state.received.get(address).copied().unwrap_or_default())
    }

    async fn send_to(&self, address: &str, amount: CoinAmount) -> Result<String, PaymentNodeError> {
        let mut state = self.state();
        if state.fail_sends {
            return Err(PaymentNodeError::Rpc { code: -6, message: "Insufficient funds".into() });
        }
        state.sent.push((address.to_string(), amount));
        Ok(format!("tx{:08x}", state.sent.len()))
    }
}

#[derive(Debug, Clone)]
pub struct FakeOracle {
    rate: Arc<Mutex<Option<Decimal>>>,
}

impl FakeOracle {
    pub fn new(rate: Decimal) -> Self {
        Self { rate: Arc::new(Mutex::new(Some(rate))) }
    }

    /// An oracle that cannot be reached.
    pub fn offline() -> Self {
        Self { rate: Arc::new(Mutex::new(None)) }
    }

    pub fn set_rate(&self, rate: Option<Decimal>) {
        *self.rate.lock().expect("fake oracle state poisoned") = rate;
    }
}

impl PriceOracle for FakeOracle {
    async fn current_rate(&self, asset: &str) -> Result<Decimal, PriceOracleError> {
        let rate = *self.rate.lock().expect("fake oracle state poisoned");
        rate.ok_or_else(|| PriceOracleError::Unreachable(format!("no rate for {asset}")))
    }
}
