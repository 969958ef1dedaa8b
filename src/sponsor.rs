//! Sponsored execution with failover across gas stations.
//!
//! Every station attempt runs the full sequence *reserve → assemble and sign → submit*
//! against that one station. A failed attempt either moves on to the next attempt (the same
//! station again while `attempts_per_station` allows, then the next station in the list)
//! or ends the execution:
//!
//! ```text
//! Idle ─► Reserving ─► Assembling(reservation) ─► Submitting(reservation, signed) ─► Done
//!             │                 │                             │
//!             └─────────────────┴──── transient error ────────┴─► Reserving(next) | Failed
//! ```
//!
//! The reservation and the signed bytes live inside the step that uses them, so when an
//! attempt fails they are dropped with it: the next attempt starts from a fresh reservation
//! and signs new bytes for its own sponsor.

use gas_sponsor_types::ledger::{LedgerClient, TransactionSigner};
use gas_sponsor_types::proto::{GasReservation, ReserveGasRequest, TransactionResponse};
use gas_station_client::GasStationClient;
use std::fmt::{Display, Formatter};
use tracing::instrument;

use crate::assembly::{SignedTransaction, TransactionTemplate, assemble_sponsored};
use crate::error::{ErrorClass, ExecutionError};
use crate::executor::Executor;

/// Position in the failover order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationCursor {
    /// Index into the station list; 0 is the primary.
    pub station: usize,
    /// Zero-based attempt number against that station.
    pub attempt: u32,
}

impl StationCursor {
    pub const PRIMARY: StationCursor = StationCursor {
        station: 0,
        attempt: 0,
    };

    /// The attempt after this one, or `None` once every station has used its attempts.
    pub fn next(self, station_count: usize, attempts_per_station: u32) -> Option<Self> {
        if self.attempt + 1 < attempts_per_station {
            return Some(StationCursor {
                station: self.station,
                attempt: self.attempt + 1,
            });
        }
        (self.station + 1 < station_count).then_some(StationCursor {
            station: self.station + 1,
            attempt: 0,
        })
    }
}

impl Display for StationCursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.station {
            0 => write!(f, "primary")?,
            1 => write!(f, "secondary")?,
            n => write!(f, "station #{n}")?,
        }
        if self.attempt > 0 {
            write!(f, " (retry {})", self.attempt)?;
        }
        Ok(())
    }
}

/// What an attempt is doing, together with the data it owns.
#[derive(Debug)]
pub enum SponsorStep {
    Reserving,
    Assembling(GasReservation),
    Submitting(GasReservation, SignedTransaction),
}

impl SponsorStep {
    fn name(&self) -> &'static str {
        match self {
            SponsorStep::Reserving => "reserving",
            SponsorStep::Assembling(_) => "assembling",
            SponsorStep::Submitting(..) => "submitting",
        }
    }
}

#[derive(Debug)]
pub enum SponsorState {
    Idle,
    Attempt {
        cursor: StationCursor,
        step: SponsorStep,
    },
    Done(TransactionResponse),
    Failed(ExecutionError),
}

impl<L, S> Executor<L, S>
where
    L: LedgerClient,
    S: TransactionSigner,
{
    /// Executes `template` with gas paid by the configured stations.
    ///
    /// Returns the effects from the first station that accepts the transaction. On
    /// exhaustion, the error of the last attempt is returned and earlier ones are logged.
    #[instrument(name = "sponsor.execute", skip_all, fields(sender = %self.signer.address()))]
    pub async fn execute_sponsored(
        &self,
        template: &TransactionTemplate,
    ) -> Result<TransactionResponse, ExecutionError> {
        let mut state = SponsorState::Idle;
        loop {
            state = match state {
                SponsorState::Idle => self.start(),
                SponsorState::Attempt { cursor, step } => {
                    self.advance(cursor, step, template).await
                }
                SponsorState::Done(response) => return Ok(response),
                SponsorState::Failed(error) => return Err(error),
            };
        }
    }

    fn start(&self) -> SponsorState {
        if self.stations.is_empty() {
            tracing::error!("No gas station is configured");
            return SponsorState::Failed(ExecutionError::NoStationConfigured);
        }
        SponsorState::Attempt {
            cursor: StationCursor::PRIMARY,
            step: SponsorStep::Reserving,
        }
    }

    async fn advance(
        &self,
        cursor: StationCursor,
        step: SponsorStep,
        template: &TransactionTemplate,
    ) -> SponsorState {
        let Some(station) = self.stations.get(cursor.station) else {
            return SponsorState::Failed(ExecutionError::NoStationConfigured);
        };
        tracing::debug!(
            station = %station.base_url(),
            %cursor,
            step = step.name(),
            "Sponsored execution step"
        );
        let outcome = match step {
            SponsorStep::Reserving => self.reserve(station).await.map(|reservation| {
                SponsorState::Attempt {
                    cursor,
                    step: SponsorStep::Assembling(reservation),
                }
            }),
            SponsorStep::Assembling(reservation) => assemble_sponsored(
                &self.ledger,
                &self.signer,
                template,
                &reservation,
                self.gas_budget.get(),
            )
            .await
            .map_err(ExecutionError::from)
            .map(|signed| SponsorState::Attempt {
                cursor,
                step: SponsorStep::Submitting(reservation, signed),
            }),
            SponsorStep::Submitting(reservation, signed) => self
                .submit(station, reservation, signed)
                .await
                .map(SponsorState::Done),
        };
        outcome.unwrap_or_else(|error| self.fail_over(cursor, error))
    }

    fn fail_over(&self, cursor: StationCursor, error: ExecutionError) -> SponsorState {
        if error.class() == ErrorClass::Permanent {
            tracing::error!(%cursor, error = %error, "Sponsored execution failed");
            return SponsorState::Failed(error);
        }
        match cursor.next(self.stations.len(), self.attempts_per_station.get()) {
            Some(next) => {
                tracing::warn!(
                    %cursor,
                    error = %error,
                    "Gas station attempt failed, trying {next}"
                );
                SponsorState::Attempt {
                    cursor: next,
                    step: SponsorStep::Reserving,
                }
            }
            None => {
                tracing::error!(%cursor, error = %error, "All gas station attempts failed");
                SponsorState::Failed(error)
            }
        }
    }

    async fn reserve(&self, station: &GasStationClient) -> Result<GasReservation, ExecutionError> {
        let request = ReserveGasRequest {
            gas_budget: self.gas_budget.get(),
            reserve_duration_secs: self.reserve_duration_secs,
        };
        let reservation = station
            .reserve_gas(&request)
            .await
            .map_err(|e| ExecutionError::from_reservation(station.base_url(), e))?;
        tracing::info!(
            station = %station.base_url(),
            reservation_id = reservation.reservation_id,
            sponsor = %reservation.sponsor_address,
            "Gas reserved"
        );
        Ok(reservation)
    }

    /// Consumes the reservation: it is never presented twice.
    async fn submit(
        &self,
        station: &GasStationClient,
        reservation: GasReservation,
        signed: SignedTransaction,
    ) -> Result<TransactionResponse, ExecutionError> {
        let effects = station
            .execute_tx(reservation.reservation_id, &signed.tx_bytes, &signed.signature)
            .await
            .map_err(|source| ExecutionError::SponsorSubmissionFailed {
                station: station.base_url().clone(),
                source,
            })?;
        let response = TransactionResponse::from(effects);
        tracing::info!(
            "Transaction issued via {}: {}",
            station.base_url(),
            response.digest
        );
        if !response.effects.is_success() {
            tracing::warn!(digest = %response.digest, "Transaction executed with a failure status");
        }
        Ok(response)
    }
}
