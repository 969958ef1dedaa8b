//! Transaction assembly.
//!
//! A [`TransactionTemplate`] carries the caller's programmable transaction (the commands,
//! built by the ledger SDK and opaque here) plus whatever gas parameters are already known.
//! Assembly completes the template for one specific payer, serializes it to deterministic
//! BCS bytes and has the sender sign them.
//!
//! Sponsored assembly is redone for every gas station attempt: the gas owner and gas
//! payment come from that station's reservation, so bytes and signature from one attempt
//! are meaningless for another.

use gas_sponsor_types::chain::{Address, ObjectRef};
use gas_sponsor_types::ledger::{
    LedgerClient, LedgerError, SignerError, TransactionSigner, UserSignature,
};
use gas_sponsor_types::proto::GasReservation;
use serde::{Deserialize, Serialize};

use crate::error::ErrorClass;

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("Transaction sender is not set")]
    MissingSender,
    #[error("Gas price is not set")]
    MissingGasPrice,
    #[error("Gas budget is not set or is zero")]
    MissingGasBudget,
    #[error("Template sender {template} does not match signer {signer}")]
    SenderMismatch { template: Address, signer: Address },
    #[error("Failed to fetch reference gas price: {0}")]
    GasPrice(#[source] LedgerError),
    #[error("Failed to select gas payment: {0}")]
    GasPayment(#[source] LedgerError),
    #[error("Failed to serialize transaction: {0}")]
    Serialization(#[from] bcs::Error),
    #[error(transparent)]
    Signer(#[from] SignerError),
}

impl AssemblyError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AssemblyError::GasPrice(_) | AssemblyError::GasPayment(_) => ErrorClass::Transient,
            _ => ErrorClass::Permanent,
        }
    }
}

/// Programmable transaction payload (inputs and commands) as produced by the ledger SDK.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionKind(pub Vec<u8>);

/// A transaction whose gas parameters may still be incomplete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionTemplate {
    kind: TransactionKind,
    sender: Option<Address>,
    gas_owner: Option<Address>,
    gas_payment: Vec<ObjectRef>,
    gas_budget: Option<u64>,
    gas_price: Option<u64>,
}

impl TransactionTemplate {
    pub fn new(kind: TransactionKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_gas_owner(mut self, owner: Address) -> Self {
        self.gas_owner = Some(owner);
        self
    }

    pub fn with_gas_payment(mut self, payment: Vec<ObjectRef>) -> Self {
        self.gas_payment = payment;
        self
    }

    pub fn with_gas_budget(mut self, budget: u64) -> Self {
        self.gas_budget = Some(budget);
        self
    }

    pub fn with_gas_price(mut self, price: u64) -> Self {
        self.gas_price = Some(price);
        self
    }

    pub fn kind(&self) -> &TransactionKind {
        &self.kind
    }

    pub fn sender(&self) -> Option<Address> {
        self.sender
    }

    pub fn gas_budget(&self) -> Option<u64> {
        self.gas_budget
    }

    pub fn gas_price(&self) -> Option<u64> {
        self.gas_price
    }

    /// Fixes all parameters. The gas owner defaults to the sender.
    pub fn build(&self) -> Result<TransactionData, AssemblyError> {
        let sender = self.sender.ok_or(AssemblyError::MissingSender)?;
        let price = self.gas_price.ok_or(AssemblyError::MissingGasPrice)?;
        let budget = self
            .gas_budget
            .filter(|budget| *budget > 0)
            .ok_or(AssemblyError::MissingGasBudget)?;
        Ok(TransactionData {
            kind: self.kind.clone(),
            sender,
            gas_data: GasData {
                payment: self.gas_payment.clone(),
                owner: self.gas_owner.unwrap_or(sender),
                price,
                budget,
            },
        })
    }
}

/// Fully parameterized transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionData {
    pub kind: TransactionKind,
    pub sender: Address,
    pub gas_data: GasData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasData {
    pub payment: Vec<ObjectRef>,
    pub owner: Address,
    pub price: u64,
    pub budget: u64,
}

impl TransactionData {
    /// Deterministic BCS encoding; identical data always yields identical bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AssemblyError> {
        Ok(bcs::to_bytes(self)?)
    }
}

/// Unsigned transaction bytes together with the sender's signature over them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub tx_bytes: Vec<u8>,
    pub signature: UserSignature,
    /// Who pays gas for these bytes; the sponsor for sponsored transactions.
    pub gas_owner: Address,
}

/// Completes `template` against a station's reservation and signs it as the sender.
pub async fn assemble_sponsored<L, S>(
    ledger: &L,
    signer: &S,
    template: &TransactionTemplate,
    reservation: &GasReservation,
    gas_budget: u64,
) -> Result<SignedTransaction, AssemblyError>
where
    L: LedgerClient + ?Sized,
    S: TransactionSigner + ?Sized,
{
    let sender = checked_sender(template, signer)?;
    let gas_price = resolve_gas_price(ledger, template).await?;
    let data = template
        .clone()
        .with_sender(sender)
        .with_gas_owner(reservation.sponsor_address)
        .with_gas_payment(reservation.gas_coins.clone())
        .with_gas_budget(gas_budget)
        .with_gas_price(gas_price)
        .build()?;
    sign(signer, &data).await
}

/// Completes `template` with the sender paying its own gas and signs it.
pub async fn assemble_self_paid<L, S>(
    ledger: &L,
    signer: &S,
    template: &TransactionTemplate,
    gas_budget: u64,
) -> Result<SignedTransaction, AssemblyError>
where
    L: LedgerClient + ?Sized,
    S: TransactionSigner + ?Sized,
{
    let sender = checked_sender(template, signer)?;
    let gas_price = resolve_gas_price(ledger, template).await?;
    let payment = ledger
        .select_gas_payment(&sender, gas_budget)
        .await
        .map_err(AssemblyError::GasPayment)?;
    let data = template
        .clone()
        .with_sender(sender)
        .with_gas_owner(sender)
        .with_gas_payment(payment)
        .with_gas_budget(gas_budget)
        .with_gas_price(gas_price)
        .build()?;
    sign(signer, &data).await
}

fn checked_sender<S>(template: &TransactionTemplate, signer: &S) -> Result<Address, AssemblyError>
where
    S: TransactionSigner + ?Sized,
{
    let signer_address = signer.address();
    match template.sender() {
        Some(sender) if sender != signer_address => Err(AssemblyError::SenderMismatch {
            template: sender,
            signer: signer_address,
        }),
        _ => Ok(signer_address),
    }
}

async fn resolve_gas_price<L>(
    ledger: &L,
    template: &TransactionTemplate,
) -> Result<u64, AssemblyError>
where
    L: LedgerClient + ?Sized,
{
    match template.gas_price() {
        Some(price) => Ok(price),
        None => ledger
            .reference_gas_price()
            .await
            .map_err(AssemblyError::GasPrice),
    }
}

async fn sign<S>(signer: &S, data: &TransactionData) -> Result<SignedTransaction, AssemblyError>
where
    S: TransactionSigner + ?Sized,
{
    let tx_bytes = data.to_bytes()?;
    let signature = signer.sign_transaction(&tx_bytes).await?;
    Ok(SignedTransaction {
        tx_bytes,
        signature,
        gas_owner: data.gas_data.owner,
    })
}
