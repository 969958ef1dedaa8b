//! Top-level entry point: sponsored or direct execution with outcome callbacks.

use gas_sponsor_types::chain::Network;
use gas_sponsor_types::ledger::{FaucetClient, LedgerClient, TransactionSigner};
use gas_sponsor_types::proto::TransactionResponse;
use gas_station_client::GasStationClient;
use std::num::{NonZeroU32, NonZeroU64};
use std::sync::Arc;

use crate::assembly::TransactionTemplate;
use crate::config::{ConfigError, SponsorConfig, config_defaults};
use crate::direct::FaucetWait;
use crate::error::ExecutionError;

/// Who pays for gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Through the configured gas stations, in failover order.
    #[default]
    Sponsored,
    /// By the sender, from its own coins.
    Direct,
}

/// Outcome notifications for [`Executor::sign_and_execute`].
///
/// Exactly one of `on_success`/`on_error` runs for a completed execution, and
/// `on_settled` runs once afterwards in every case, including when the execution
/// future is dropped before completing.
pub trait ExecutionCallbacks {
    fn on_success(&mut self, response: &TransactionResponse);

    fn on_error(&mut self, error: &ExecutionError);

    fn on_settled(&mut self) {}
}

/// [`ExecutionCallbacks`] made of closures.
pub struct Callbacks<OnSuccess, OnError, OnSettled = fn()> {
    on_success: OnSuccess,
    on_error: OnError,
    on_settled: Option<OnSettled>,
}

impl<OnSuccess, OnError> Callbacks<OnSuccess, OnError>
where
    OnSuccess: FnMut(&TransactionResponse),
    OnError: FnMut(&ExecutionError),
{
    pub fn new(on_success: OnSuccess, on_error: OnError) -> Self {
        Self {
            on_success,
            on_error,
            on_settled: None,
        }
    }
}

impl<OnSuccess, OnError, OnSettled> Callbacks<OnSuccess, OnError, OnSettled> {
    pub fn on_settled<F: FnMut()>(self, on_settled: F) -> Callbacks<OnSuccess, OnError, F> {
        Callbacks {
            on_success: self.on_success,
            on_error: self.on_error,
            on_settled: Some(on_settled),
        }
    }
}

impl<OnSuccess, OnError, OnSettled> ExecutionCallbacks for Callbacks<OnSuccess, OnError, OnSettled>
where
    OnSuccess: FnMut(&TransactionResponse),
    OnError: FnMut(&ExecutionError),
    OnSettled: FnMut(),
{
    fn on_success(&mut self, response: &TransactionResponse) {
        (self.on_success)(response)
    }

    fn on_error(&mut self, error: &ExecutionError) {
        (self.on_error)(error)
    }

    fn on_settled(&mut self) {
        if let Some(on_settled) = self.on_settled.as_mut() {
            on_settled()
        }
    }
}

/// Fires `on_settled` when dropped.
struct SettleGuard<'a, C: ExecutionCallbacks + ?Sized>(&'a mut C);

impl<C: ExecutionCallbacks + ?Sized> Drop for SettleGuard<'_, C> {
    fn drop(&mut self) {
        self.0.on_settled();
    }
}

/// Signs and executes transactions for one sender.
pub struct Executor<L, S> {
    pub(crate) ledger: L,
    pub(crate) signer: S,
    pub(crate) network: Network,
    pub(crate) stations: Vec<GasStationClient>,
    pub(crate) faucet: Option<Arc<dyn FaucetClient>>,
    pub(crate) gas_budget: NonZeroU64,
    pub(crate) reserve_duration_secs: u64,
    pub(crate) attempts_per_station: NonZeroU32,
    pub(crate) faucet_wait: FaucetWait,
}

impl<L, S> Executor<L, S>
where
    L: LedgerClient,
    S: TransactionSigner,
{
    /// An executor with default settings and no gas stations or faucet.
    pub fn new(ledger: L, signer: S, network: Network) -> Self {
        Self {
            ledger,
            signer,
            network,
            stations: Vec::new(),
            faucet: None,
            gas_budget: config_defaults::default_gas_budget(),
            reserve_duration_secs: config_defaults::DEFAULT_RESERVE_DURATION_SECS,
            attempts_per_station: config_defaults::default_attempts_per_station(),
            faucet_wait: FaucetWait::default(),
        }
    }

    pub fn from_config(ledger: L, signer: S, config: &SponsorConfig) -> Result<Self, ConfigError> {
        let mut executor = Self::new(ledger, signer, config.network())
            .with_stations(config.station_clients()?)
            .with_gas_budget(config.gas_budget())
            .with_reserve_duration_secs(config.reserve_duration_secs())
            .with_attempts_per_station(config.attempts_per_station())
            .with_faucet_wait(config.faucet_wait());
        if let Some(faucet) = config.faucet_client()? {
            executor = executor.with_faucet(Arc::new(faucet));
        }
        Ok(executor)
    }

    /// Gas stations in failover order; the first is the primary.
    pub fn with_stations(mut self, stations: Vec<GasStationClient>) -> Self {
        self.stations = stations;
        self
    }

    pub fn with_faucet(mut self, faucet: Arc<dyn FaucetClient>) -> Self {
        self.faucet = Some(faucet);
        self
    }

    pub fn with_gas_budget(mut self, gas_budget: NonZeroU64) -> Self {
        self.gas_budget = gas_budget;
        self
    }

    pub fn with_reserve_duration_secs(mut self, secs: u64) -> Self {
        self.reserve_duration_secs = secs;
        self
    }

    pub fn with_attempts_per_station(mut self, attempts: NonZeroU32) -> Self {
        self.attempts_per_station = attempts;
        self
    }

    pub fn with_faucet_wait(mut self, faucet_wait: FaucetWait) -> Self {
        self.faucet_wait = faucet_wait;
        self
    }

    pub fn stations(&self) -> &[GasStationClient] {
        &self.stations
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// Executes `template` in `mode` and reports the outcome through `callbacks`.
    ///
    /// The outcome is also returned, so callers may use either style.
    pub async fn sign_and_execute<C>(
        &self,
        mode: ExecutionMode,
        template: &TransactionTemplate,
        callbacks: &mut C,
    ) -> Result<TransactionResponse, ExecutionError>
    where
        C: ExecutionCallbacks + ?Sized,
    {
        let mut guard = SettleGuard(callbacks);
        let result = match mode {
            ExecutionMode::Sponsored => self.execute_sponsored(template).await,
            ExecutionMode::Direct => self.execute_direct(template).await,
        };
        match &result {
            Ok(response) => guard.0.on_success(response),
            Err(error) => guard.0.on_error(error),
        }
        result
    }
}
