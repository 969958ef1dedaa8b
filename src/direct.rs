//! Direct execution: the sender pays its own gas.
//!
//! On test networks an unfunded sender is topped up from the faucet first. There is no
//! failover on this path; any ledger error ends the execution.

use gas_sponsor_types::chain::Address;
use gas_sponsor_types::ledger::{FaucetClient, LedgerClient, TransactionSigner};
use gas_sponsor_types::proto::TransactionResponse;
use std::time::Duration;
use tracing::instrument;

use crate::assembly::{TransactionTemplate, assemble_self_paid};
use crate::config::config_defaults;
use crate::error::ExecutionError;
use crate::executor::Executor;

/// How long and how often to poll for faucet funds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaucetWait {
    /// Balance at which the sender counts as funded.
    pub threshold: u64,
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub coin_type: String,
}

impl Default for FaucetWait {
    fn default() -> Self {
        Self {
            threshold: config_defaults::DEFAULT_FAUCET_THRESHOLD,
            poll_interval: Duration::from_millis(config_defaults::DEFAULT_FAUCET_POLL_INTERVAL_MS),
            timeout: Duration::from_millis(config_defaults::DEFAULT_FAUCET_TIMEOUT_MS),
            coin_type: config_defaults::default_coin_type(),
        }
    }
}

/// Waits until `address` holds at least `wait.threshold`.
///
/// Funds are requested once, and only if the first balance check comes up short. A failed
/// faucet request is logged and polling continues, since the faucet may still deliver;
/// only the timeout is fatal.
#[instrument(name = "direct.faucet_wait", skip_all, fields(address = %address))]
pub async fn wait_for_faucet_tokens<L, F>(
    ledger: &L,
    faucet: &F,
    address: &Address,
    wait: &FaucetWait,
) -> Result<(), ExecutionError>
where
    L: LedgerClient + ?Sized,
    F: FaucetClient + ?Sized,
{
    let threshold = u128::from(wait.threshold);
    let mut balance = ledger
        .get_balance(address, &wait.coin_type)
        .await
        .map_err(ExecutionError::BalanceQuery)?;
    if balance >= threshold {
        return Ok(());
    }

    tracing::info!(%balance, threshold = wait.threshold, "Requesting funds from faucet");
    if let Err(error) = faucet.request_funds(address).await {
        tracing::warn!(error = %error, "Faucet request failed");
    }

    let interval = wait.poll_interval.max(Duration::from_millis(1));
    let mut elapsed = Duration::ZERO;
    while elapsed < wait.timeout {
        tokio::time::sleep(interval).await;
        elapsed += interval;
        balance = ledger
            .get_balance(address, &wait.coin_type)
            .await
            .map_err(ExecutionError::BalanceQuery)?;
        if balance >= threshold {
            tracing::info!(%balance, ?elapsed, "Sender funded");
            return Ok(());
        }
    }

    Err(ExecutionError::FaucetTimeout {
        address: *address,
        timeout: wait.timeout,
        balance,
        threshold: wait.threshold,
    })
}

impl<L, S> Executor<L, S>
where
    L: LedgerClient,
    S: TransactionSigner,
{
    /// Executes `template` with the sender paying gas from its own coins.
    ///
    /// The template's gas budget is used when set, the configured budget otherwise.
    #[instrument(name = "direct.execute", skip_all, fields(sender = %self.signer.address()))]
    pub async fn execute_direct(
        &self,
        template: &TransactionTemplate,
    ) -> Result<TransactionResponse, ExecutionError> {
        let sender = self.signer.address();
        if self.network.is_test_network() {
            match &self.faucet {
                Some(faucet) => {
                    let faucet = faucet.as_ref();
                    wait_for_faucet_tokens(&self.ledger, faucet, &sender, &self.faucet_wait).await?
                }
                None => tracing::warn!(
                    network = %self.network,
                    "No faucet configured, skipping funding wait"
                ),
            }
        }

        let gas_budget = template
            .gas_budget()
            .filter(|budget| *budget > 0)
            .unwrap_or(self.gas_budget.get());
        let signed = assemble_self_paid(&self.ledger, &self.signer, template, gas_budget).await?;
        let digest = self
            .ledger
            .execute_transaction(&signed.tx_bytes, std::slice::from_ref(&signed.signature))
            .await
            .map_err(ExecutionError::LedgerSubmission)?;
        let effects = self
            .ledger
            .wait_for_transaction(&digest)
            .await
            .map_err(ExecutionError::LedgerSubmission)?;
        tracing::info!(%digest, "Transaction executed");
        if !effects.is_success() {
            tracing::warn!(%digest, "Transaction executed with a failure status");
        }
        Ok(TransactionResponse { digest, effects })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{TransactionData, TransactionKind};
    use crate::testing::{FakeFaucet, FakeLedger, FakeSigner};
    use gas_sponsor_types::chain::Network;
    use std::num::NonZeroU64;
    use std::sync::Arc;

    const SENDER: Address = Address::new([7; 32]);

    fn wait() -> FaucetWait {
        FaucetWait::default()
    }

    #[tokio::test(start_paused = true)]
    async fn test_funded_sender_skips_faucet() {
        let ledger = FakeLedger::new(1000).with_balances([5_000_000_000]);
        let faucet = FakeFaucet::default();
        wait_for_faucet_tokens(&ledger, &faucet, &SENDER, &wait())
            .await
            .unwrap();
        assert_eq!(faucet.requests(), 0);
        assert_eq!(ledger.balance_queries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_until_threshold_is_reached() {
        let ledger = FakeLedger::new(1000).with_balances([0, 0, 0, 1_000_000_000]);
        let faucet = FakeFaucet::default();
        let started = tokio::time::Instant::now();
        wait_for_faucet_tokens(&ledger, &faucet, &SENDER, &wait())
            .await
            .unwrap();
        assert_eq!(faucet.requests(), 1);
        assert_eq!(ledger.balance_queries(), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_faucet_failure_keeps_polling() {
        let ledger = FakeLedger::new(1000).with_balances([0, 2_000_000_000]);
        let faucet = FakeFaucet::failing();
        wait_for_faucet_tokens(&ledger, &faucet, &SENDER, &wait())
            .await
            .unwrap();
        assert_eq!(faucet.requests(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_faucet_timeout_submits_nothing() {
        let ledger = Arc::new(FakeLedger::new(1000).with_balances([10]));
        let faucet = Arc::new(FakeFaucet::default());
        let executor = Executor::new(ledger.clone(), FakeSigner::new(SENDER), Network::Testnet)
            .with_faucet(faucet.clone());

        let started = tokio::time::Instant::now();
        let err = executor
            .execute_direct(&TransactionTemplate::new(TransactionKind(vec![1])))
            .await
            .unwrap_err();
        match err {
            ExecutionError::FaucetTimeout {
                timeout, balance, ..
            } => {
                assert_eq!(timeout, Duration::from_secs(15));
                assert_eq!(balance, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(started.elapsed(), Duration::from_secs(15));
        assert_eq!(faucet.requests(), 1);
        assert!(ledger.executed().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_execution_on_testnet() {
        let ledger = Arc::new(FakeLedger::new(1000).with_balances([0, 1_500_000_000]));
        let faucet = Arc::new(FakeFaucet::default());
        let executor = Executor::new(ledger.clone(), FakeSigner::new(SENDER), Network::Testnet)
            .with_faucet(faucet.clone());

        let template =
            TransactionTemplate::new(TransactionKind(vec![1])).with_gas_budget(10_000_000);
        let response = executor.execute_direct(&template).await.unwrap();
        assert_eq!(response.digest.as_str(), "direct-digest");

        let executed = ledger.executed();
        assert_eq!(executed.len(), 1);
        let data: TransactionData = bcs::from_bytes(&executed[0]).unwrap();
        assert_eq!(data.sender, SENDER);
        assert_eq!(data.gas_data.owner, SENDER);
        assert_eq!(data.gas_data.budget, 10_000_000);
    }

    #[tokio::test]
    async fn test_mainnet_skips_faucet() {
        let ledger = Arc::new(FakeLedger::new(1000).with_balances([0]));
        let faucet = Arc::new(FakeFaucet::default());
        let executor = Executor::new(ledger.clone(), FakeSigner::new(SENDER), Network::Mainnet)
            .with_faucet(faucet.clone());

        let response = executor
            .execute_direct(&TransactionTemplate::new(TransactionKind(vec![1])))
            .await
            .unwrap();
        assert_eq!(response.digest.as_str(), "direct-digest");
        assert_eq!(faucet.requests(), 0);
        assert_eq!(ledger.balance_queries(), 0);
    }

    #[tokio::test]
    async fn test_zero_template_budget_uses_configured_budget() {
        let ledger = Arc::new(FakeLedger::new(1000));
        let executor = Executor::new(ledger.clone(), FakeSigner::new(SENDER), Network::Mainnet)
            .with_gas_budget(NonZeroU64::new(20_000_000).unwrap());

        let template = TransactionTemplate::new(TransactionKind(vec![1])).with_gas_budget(0);
        executor.execute_direct(&template).await.unwrap();

        let data: TransactionData = bcs::from_bytes(&ledger.executed()[0]).unwrap();
        assert_eq!(data.gas_data.budget, 20_000_000);
    }

    #[tokio::test]
    async fn test_ledger_rejection_is_terminal() {
        let ledger = FakeLedger::new(1000).rejecting_execution();
        let executor = Executor::new(ledger, FakeSigner::new(SENDER), Network::Mainnet);
        let err = executor
            .execute_direct(&TransactionTemplate::new(TransactionKind(vec![1])))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::LedgerSubmission(_)));
    }
}
