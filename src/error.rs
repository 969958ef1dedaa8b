//! Execution errors and their failover classification.

use gas_sponsor_types::chain::Address;
use gas_sponsor_types::ledger::LedgerError;
use gas_station_client::GasStationError;
use std::time::Duration;
use url::Url;

use crate::assembly::AssemblyError;

/// Whether an error may be cured by trying another gas station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Tied to one station or a passing ledger hiccup; the next station may succeed.
    Transient,
    /// Would fail the same way on every station (bad template, signer failure...).
    Permanent,
}

/// Failures of sponsored or direct transaction execution.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Gas station {station} is unreachable: {source}")]
    GasStationUnreachable {
        station: Url,
        #[source]
        source: GasStationError,
    },
    #[error("Gas station {station} rejected the reservation: {source}")]
    GasStationRejected {
        station: Url,
        #[source]
        source: GasStationError,
    },
    #[error("Transaction assembly failed: {0}")]
    Assembly(#[from] AssemblyError),
    #[error("Sponsored submission via {station} failed: {source}")]
    SponsorSubmissionFailed {
        station: Url,
        #[source]
        source: GasStationError,
    },
    #[error("No gas station is configured")]
    NoStationConfigured,
    #[error(
        "Faucet did not fund {address} within {timeout:?}: balance {balance} is below {threshold}"
    )]
    FaucetTimeout {
        address: Address,
        timeout: Duration,
        balance: u128,
        threshold: u64,
    },
    #[error("Balance query failed: {0}")]
    BalanceQuery(#[source] LedgerError),
    #[error("Ledger submission failed: {0}")]
    LedgerSubmission(#[source] LedgerError),
}

impl ExecutionError {
    /// Classifies a reservation failure: transport errors mean the station is
    /// unreachable, anything the station answered is a rejection.
    pub fn from_reservation(station: &Url, source: GasStationError) -> Self {
        let station = station.clone();
        if source.is_unreachable() {
            ExecutionError::GasStationUnreachable { station, source }
        } else {
            ExecutionError::GasStationRejected { station, source }
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ExecutionError::GasStationUnreachable { .. }
            | ExecutionError::GasStationRejected { .. }
            | ExecutionError::SponsorSubmissionFailed { .. } => ErrorClass::Transient,
            ExecutionError::Assembly(e) => e.class(),
            ExecutionError::NoStationConfigured
            | ExecutionError::FaucetTimeout { .. }
            | ExecutionError::BalanceQuery(_)
            | ExecutionError::LedgerSubmission(_) => ErrorClass::Permanent,
        }
    }

    /// The station involved, for station-level failures.
    pub fn station(&self) -> Option<&Url> {
        match self {
            ExecutionError::GasStationUnreachable { station, .. }
            | ExecutionError::GasStationRejected { station, .. }
            | ExecutionError::SponsorSubmissionFailed { station, .. } => Some(station),
            _ => None,
        }
    }
}
