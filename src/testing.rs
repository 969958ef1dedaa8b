//! In-memory collaborators for unit tests.

use async_trait::async_trait;
use gas_sponsor_types::chain::{Address, ObjectRef, TransactionDigest};
use gas_sponsor_types::ledger::{
    FaucetClient, LedgerClient, LedgerError, SignerError, TransactionSigner, UserSignature,
};
use gas_sponsor_types::proto::{
    ExecutionState, ExecutionStatus, GasReservation, TransactionEffects,
};
use serde_json::Map;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn coin(seed: u8) -> ObjectRef {
    ObjectRef {
        object_id: Address::new([seed; 32]),
        version: u64::from(seed) + 1,
        digest: format!("coin-digest-{seed}"),
    }
}

pub fn reservation(sponsor: Address, reservation_id: u64) -> GasReservation {
    GasReservation {
        sponsor_address: sponsor,
        reservation_id,
        gas_coins: vec![coin(0x30), coin(0x31)],
    }
}

pub fn effects(digest: &str) -> TransactionEffects {
    TransactionEffects {
        transaction_digest: TransactionDigest::new(digest),
        status: Some(ExecutionStatus {
            status: ExecutionState::Success,
            error: None,
        }),
        extra: Map::new(),
    }
}

pub struct FakeLedger {
    gas_price: u64,
    gas_price_fails: bool,
    execution_fails: bool,
    balances: Mutex<VecDeque<u128>>,
    balance_queries: AtomicUsize,
    executed: Mutex<Vec<Vec<u8>>>,
}

impl FakeLedger {
    pub fn new(gas_price: u64) -> Self {
        Self {
            gas_price,
            gas_price_fails: false,
            execution_fails: false,
            balances: Mutex::new(VecDeque::from([u128::MAX])),
            balance_queries: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_gas_price(mut self) -> Self {
        self.gas_price_fails = true;
        self
    }

    pub fn rejecting_execution(mut self) -> Self {
        self.execution_fails = true;
        self
    }

    /// Successive balance answers; the last one repeats.
    pub fn with_balances(self, balances: impl IntoIterator<Item = u128>) -> Self {
        *self.balances.lock().unwrap() = balances.into_iter().collect();
        self
    }

    pub fn sender_coins(&self) -> Vec<ObjectRef> {
        vec![coin(0x40)]
    }

    pub fn balance_queries(&self) -> usize {
        self.balance_queries.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<Vec<u8>> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn get_balance(&self, _owner: &Address, _coin_type: &str) -> Result<u128, LedgerError> {
        self.balance_queries.fetch_add(1, Ordering::SeqCst);
        let mut balances = self.balances.lock().unwrap();
        let balance = if balances.len() > 1 {
            balances.pop_front()
        } else {
            balances.front().copied()
        };
        balance.ok_or_else(|| LedgerError::Rpc("no balance".to_string()))
    }

    async fn reference_gas_price(&self) -> Result<u64, LedgerError> {
        if self.gas_price_fails {
            return Err(LedgerError::Rpc("gas price unavailable".to_string()));
        }
        Ok(self.gas_price)
    }

    async fn select_gas_payment(
        &self,
        _owner: &Address,
        _budget: u64,
    ) -> Result<Vec<ObjectRef>, LedgerError> {
        Ok(self.sender_coins())
    }

    async fn execute_transaction(
        &self,
        tx_bytes: &[u8],
        _signatures: &[UserSignature],
    ) -> Result<TransactionDigest, LedgerError> {
        if self.execution_fails {
            return Err(LedgerError::Rejected("InsufficientCoinBalance".to_string()));
        }
        self.executed.lock().unwrap().push(tx_bytes.to_vec());
        Ok(TransactionDigest::new("direct-digest"))
    }

    async fn wait_for_transaction(
        &self,
        digest: &TransactionDigest,
    ) -> Result<TransactionEffects, LedgerError> {
        Ok(effects(digest.as_str()))
    }
}

pub struct FakeSigner {
    address: Address,
    fails: bool,
    signed: Mutex<Vec<Vec<u8>>>,
}

impl FakeSigner {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            fails: false,
            signed: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fails = true;
        self
    }

    pub fn signed_payloads(&self) -> Vec<Vec<u8>> {
        self.signed.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionSigner for FakeSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_transaction(&self, tx_bytes: &[u8]) -> Result<UserSignature, SignerError> {
        if self.fails {
            return Err(SignerError("key unavailable".to_string()));
        }
        let mut signed = self.signed.lock().unwrap();
        signed.push(tx_bytes.to_vec());
        Ok(UserSignature::new(format!("sig-{}", signed.len())))
    }
}

#[derive(Default)]
pub struct FakeFaucet {
    fails: bool,
    requests: AtomicUsize,
}

impl FakeFaucet {
    pub fn failing() -> Self {
        Self {
            fails: true,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaucetClient for FakeFaucet {
    async fn request_funds(&self, _recipient: &Address) -> Result<(), LedgerError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.fails {
            return Err(LedgerError::Faucet("rate limited".to_string()));
        }
        Ok(())
    }
}
