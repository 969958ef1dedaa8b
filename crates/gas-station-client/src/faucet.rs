//! Test-network faucet client.

use async_trait::async_trait;
use gas_sponsor_types::chain::{Address, Network};
use gas_sponsor_types::ledger::{FaucetClient, LedgerError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::instrument;

/// Public faucet host for networks that have one.
pub fn default_faucet_url(network: Network) -> Option<&'static str> {
    match network {
        Network::Testnet => Some("https://faucet.testnet.iota.cafe"),
        Network::Devnet => Some("https://faucet.devnet.iota.cafe"),
        Network::Localnet => Some("http://127.0.0.1:9123"),
        Network::Mainnet => None,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct FaucetRequest<'a> {
    fixed_amount_request: FixedAmountRequest<'a>,
}

#[derive(Debug, Serialize)]
struct FixedAmountRequest<'a> {
    recipient: &'a Address,
}

#[derive(Debug, Deserialize)]
struct FaucetResponse {
    #[serde(default)]
    error: Option<String>,
}

/// Requests a fixed amount of test coins through `POST {faucet}/v1/gas`.
#[derive(Clone, Debug)]
pub struct HttpFaucetClient {
    gas_url: Url,
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpFaucetClient {
    pub fn try_new(faucet_url: &str) -> Result<Self, url::ParseError> {
        let mut normalized = faucet_url.trim_end_matches('/').to_string();
        normalized.push('/');
        let gas_url = Url::parse(&normalized)?.join("./v1/gas")?;
        Ok(Self {
            gas_url,
            client: reqwest::Client::new(),
            timeout: None,
        })
    }

    /// Client for the network's public faucet, `None` on networks without one.
    pub fn for_network(network: Network) -> Option<Result<Self, url::ParseError>> {
        default_faucet_url(network).map(Self::try_new)
    }

    pub fn gas_url(&self) -> &Url {
        &self.gas_url
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut this = self.clone();
        this.timeout = Some(timeout);
        this
    }
}

#[async_trait]
impl FaucetClient for HttpFaucetClient {
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "faucet.request_funds", skip_all, fields(recipient = %recipient), err)
    )]
    async fn request_funds(&self, recipient: &Address) -> Result<(), LedgerError> {
        let body = FaucetRequest {
            fixed_amount_request: FixedAmountRequest { recipient },
        };
        let mut req = self.client.post(self.gas_url.clone()).json(&body);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let response = req
            .send()
            .await
            .map_err(|e| LedgerError::Faucet(format!("request to {} failed: {e}", self.gas_url)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Faucet(format!(
                "unexpected HTTP status {status}: {body}"
            )));
        }
        let parsed: FaucetResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Faucet(format!("failed to decode response: {e}")))?;
        match parsed.error {
            Some(reason) => Err(LedgerError::Faucet(reason)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_mainnet_has_no_faucet() {
        assert!(HttpFaucetClient::for_network(Network::Mainnet).is_none());
        let testnet = HttpFaucetClient::for_network(Network::Testnet)
            .unwrap()
            .unwrap();
        assert_eq!(
            testnet.gas_url().as_str(),
            "https://faucet.testnet.iota.cafe/v1/gas"
        );
    }

    #[tokio::test]
    async fn test_request_funds_posts_fixed_amount_request() {
        let mock_server = MockServer::start().await;
        let recipient = Address::new([0x11; 32]);
        Mock::given(method("POST"))
            .and(path("/v1/gas"))
            .and(body_json(json!({
                "FixedAmountRequest": {"recipient": recipient.to_string()}
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"task": "t-1", "error": null})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let faucet = HttpFaucetClient::try_new(&mock_server.uri()).unwrap();
        faucet.request_funds(&recipient).await.unwrap();
    }

    #[tokio::test]
    async fn test_request_funds_reports_faucet_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/gas"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"error": "rate limited"})),
            )
            .mount(&mock_server)
            .await;

        let faucet = HttpFaucetClient::try_new(&mock_server.uri()).unwrap();
        let err = faucet
            .request_funds(&Address::new([0x22; 32]))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Faucet(reason) if reason == "rate limited"));
    }
}
