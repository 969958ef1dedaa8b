//! Collaborator interfaces.
//!
//! The ledger RPC client, the key holding the sender's signing key, and the test-network
//! faucet are provided by the caller's ledger SDK. This module only fixes the surface the
//! orchestrator needs from each of them.

use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::chain::{Address, ObjectRef, TransactionDigest};
use crate::proto::TransactionEffects;

/// Serialized sender signature (flag, signature and public key, base64-encoded) as
/// accepted by gas stations in `user_sig` and by the ledger on execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserSignature(String);

impl UserSignature {
    pub fn new(signature: impl Into<String>) -> Self {
        Self(signature.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors reported by a ledger client or faucet.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("Transaction rejected by the ledger: {0}")]
    Rejected(String),
    #[error("Faucet request failed: {0}")]
    Faucet(String),
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to sign transaction: {0}")]
pub struct SignerError(pub String);

/// Ledger RPC operations used by transaction assembly and direct submission.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Total balance of `coin_type` owned by `owner`, in the smallest unit.
    async fn get_balance(&self, owner: &Address, coin_type: &str) -> Result<u128, LedgerError>;

    /// Current reference gas price.
    async fn reference_gas_price(&self) -> Result<u64, LedgerError>;

    /// Picks coins owned by `owner` covering `budget`, for self-paid transactions.
    async fn select_gas_payment(
        &self,
        owner: &Address,
        budget: u64,
    ) -> Result<Vec<ObjectRef>, LedgerError>;

    /// Submits signed transaction bytes for execution.
    async fn execute_transaction(
        &self,
        tx_bytes: &[u8],
        signatures: &[UserSignature],
    ) -> Result<TransactionDigest, LedgerError>;

    /// Waits until `digest` is checkpointed and returns its effects.
    async fn wait_for_transaction(
        &self,
        digest: &TransactionDigest,
    ) -> Result<TransactionEffects, LedgerError>;
}

/// The sender's signing capability.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> Address;

    async fn sign_transaction(&self, tx_bytes: &[u8]) -> Result<UserSignature, SignerError>;
}

/// Test-network funding.
#[async_trait]
pub trait FaucetClient: Send + Sync {
    async fn request_funds(&self, recipient: &Address) -> Result<(), LedgerError>;
}

#[async_trait]
impl<T: LedgerClient + ?Sized> LedgerClient for Arc<T> {
    async fn get_balance(&self, owner: &Address, coin_type: &str) -> Result<u128, LedgerError> {
        self.as_ref().get_balance(owner, coin_type).await
    }

    async fn reference_gas_price(&self) -> Result<u64, LedgerError> {
        self.as_ref().reference_gas_price().await
    }

    async fn select_gas_payment(
        &self,
        owner: &Address,
        budget: u64,
    ) -> Result<Vec<ObjectRef>, LedgerError> {
        self.as_ref().select_gas_payment(owner, budget).await
    }

    async fn execute_transaction(
        &self,
        tx_bytes: &[u8],
        signatures: &[UserSignature],
    ) -> Result<TransactionDigest, LedgerError> {
        self.as_ref().execute_transaction(tx_bytes, signatures).await
    }

    async fn wait_for_transaction(
        &self,
        digest: &TransactionDigest,
    ) -> Result<TransactionEffects, LedgerError> {
        self.as_ref().wait_for_transaction(digest).await
    }
}

#[async_trait]
impl<T: TransactionSigner + ?Sized> TransactionSigner for Arc<T> {
    fn address(&self) -> Address {
        self.as_ref().address()
    }

    async fn sign_transaction(&self, tx_bytes: &[u8]) -> Result<UserSignature, SignerError> {
        self.as_ref().sign_transaction(tx_bytes).await
    }
}

#[async_trait]
impl<T: FaucetClient + ?Sized> FaucetClient for Arc<T> {
    async fn request_funds(&self, recipient: &Address) -> Result<(), LedgerError> {
        self.as_ref().request_funds(recipient).await
    }
}
