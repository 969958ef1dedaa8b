#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP clients for gas stations and test-network faucets.
//!
//! - [`GasStationClient`] talks to one gas station: `POST /v1/reserve_gas` and
//!   `POST /v1/execute_tx`, authenticated with the station's bearer token.
//! - [`HttpFaucetClient`] requests test-network funds for a sender that pays its own gas.
//!
//! Each [`GasStationClient`] owns its credential and attaches it to every request it sends;
//! no header state is shared between stations, so clients for different stations can be used
//! side by side.
//!
//! ## Example
//!
//! ```rust
//! use gas_station_client::GasStationClient;
//!
//! let station = GasStationClient::try_new("https://gas.example.org", "secret-token").unwrap();
//! assert_eq!(station.reserve_gas_url().as_str(), "https://gas.example.org/v1/reserve_gas");
//! ```
//!
//! ## Features
//!
//! - `telemetry`: `tracing` spans and error events around every request

mod client;
mod faucet;

pub use client::*;
pub use faucet::*;
