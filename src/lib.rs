//! Sponsored transaction execution through gas stations, with failover.
//!
//! A sender signs its own transaction while a gas station pays the fees:
//!
//! 1. reserve gas at a station (`POST /v1/reserve_gas`), which yields the sponsor address
//!    and the sponsor coins that will pay for gas,
//! 2. build the transaction with the sponsor as gas owner and sign it as the sender,
//! 3. hand bytes and signature back to the same station (`POST /v1/execute_tx`), which
//!    co-signs and broadcasts.
//!
//! When an attempt fails in a way another station could cure, the whole sequence is
//! repeated against the next configured station. Alternatively the sender can pay its own
//! gas ([`ExecutionMode::Direct`]), with a faucet top-up on test networks.
//!
//! The crate also verifies domain linkage: whether a DID document's `LinkedDomains` claim
//! is backed by a valid Domain Linkage Credential hosted at that domain. See [`linkage`].
//!
//! # Modules
//!
//! - [`assembly`]: transaction templates, deterministic serialization and signing.
//! - [`sponsor`]: the sponsored-execution state machine.
//! - [`direct`]: self-paid execution and the faucet wait.
//! - [`executor`]: [`Executor::sign_and_execute`] and outcome callbacks.
//! - [`config`]: JSON configuration with environment variable references.
//! - [`error`]: the execution error taxonomy and its failover classes.
//! - [`linkage`]: domain linkage verification.
//!
//! Ledger access, key custody and faucet access are collaborators supplied by the caller
//! through the traits in [`gas_sponsor_types::ledger`].
//!
//! # Example
//!
//! ```rust
//! use gas_sponsor::config::SponsorConfig;
//!
//! let config = SponsorConfig::from_json_str(r#"{
//!     "network": "testnet",
//!     "stations": [
//!         {"url": "https://gas-1.example.org", "token": "primary-token"},
//!         {"url": "", "token": ""}
//!     ]
//! }"#).unwrap();
//! let stations = config.station_clients().unwrap();
//! assert_eq!(stations.len(), 1);
//! assert_eq!(config.gas_budget().get(), 50_000_000);
//! ```
//!
//! # Features
//!
//! - `telemetry`: [`telemetry::Telemetry`] log subscriber and request spans in the station client

pub mod assembly;
pub mod config;
pub mod direct;
pub mod error;
pub mod executor;
pub mod linkage;
pub mod sponsor;
#[cfg(feature = "telemetry")]
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use assembly::{TransactionKind, TransactionTemplate};
pub use error::{ErrorClass, ExecutionError};
pub use executor::{Callbacks, ExecutionCallbacks, ExecutionMode, Executor};
