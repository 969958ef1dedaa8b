#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for gas-station sponsored transactions.
//!
//! This crate holds the vocabulary shared by the gas-station HTTP client and the
//! sponsorship orchestrator. It is ledger-SDK agnostic: the ledger RPC client, the
//! signing capability and the test-network faucet are described as traits in
//! [`ledger`], to be implemented by whichever SDK the caller uses.
//!
//! # Modules
//!
//! - [`chain`] - Addresses, object references, digests and network identifiers
//! - [`config`] - Environment variable resolution for configuration values
//! - [`identity`] - DID document model consumed by domain-linkage validation
//! - [`ledger`] - Collaborator traits: ledger client, transaction signer, faucet
//! - [`proto`] - Gas station wire format and transaction effects
//! - [`timestamp`] - Unix timestamps (JWT numeric dates, cache-busting)
//! - [`util`] - Base64 helper

pub mod chain;
pub mod config;
pub mod identity;
pub mod ledger;
pub mod proto;
pub mod timestamp;
pub mod util;
