//! Gas station client.
//!
//! Errors capture the failing endpoint (`context`) and distinguish transport failures
//! ([`GasStationError::is_unreachable`]) from answers the station gave but that cannot be
//! used: non-2xx statuses, undecodable bodies, or an `error` reported inside the body.

use gas_sponsor_types::ledger::UserSignature;
use gas_sponsor_types::proto::{
    ExecuteTxRequest, ExecuteTxResponse, GasReservation, ReserveGasRequest, ReserveGasResponse,
    TransactionEffects,
};
use gas_sponsor_types::util::Base64Bytes;
use http::header::{AUTHORIZATION, HeaderValue, InvalidHeaderValue};
use http::StatusCode;
use reqwest::Client;
use std::time::Duration;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::instrument;

/// A client bound to a single gas station and its bearer token.
#[derive(Clone, Debug)]
pub struct GasStationClient {
    /// Base URL of the station (e.g. `https://gas.example.org/`)
    base_url: Url,
    /// Full URL of `POST /v1/reserve_gas`
    reserve_gas_url: Url,
    /// Full URL of `POST /v1/execute_tx`
    execute_tx_url: Url,
    /// `Authorization: Bearer <token>`, marked sensitive so it never shows in logs
    authorization: HeaderValue,
    client: Client,
    timeout: Option<Duration>,
}

/// Errors that can occur while talking to a gas station.
#[derive(Debug, thiserror::Error)]
pub enum GasStationError {
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        context: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("Bearer token is empty")]
    MissingToken,
    #[error("Invalid bearer token: {0}")]
    InvalidToken(#[source] InvalidHeaderValue),
    #[error("HTTP error: {context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        context: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Gas station reported an error: {context}: {reason}")]
    Station {
        context: &'static str,
        reason: String,
    },
}

impl GasStationError {
    /// `true` when the station could not be reached at all (connect, TLS, timeout).
    pub fn is_unreachable(&self) -> bool {
        matches!(self, GasStationError::Http { .. })
    }

    /// HTTP status the station answered with, if the failure was a status error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GasStationError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl GasStationClient {
    pub const RESERVE_GAS_CONTEXT: &'static str = "POST /v1/reserve_gas";
    pub const EXECUTE_TX_CONTEXT: &'static str = "POST /v1/execute_tx";

    /// Constructs a client for the station at `base_url`, authenticating with `token`.
    ///
    /// A blank token is rejected. A trailing slash is added to the base URL so that endpoint
    /// paths are appended to it rather than replacing its last segment.
    pub fn try_new(base_url: &str, token: &str) -> Result<Self, GasStationError> {
        let mut normalized = base_url.trim_end_matches('/').to_string();
        normalized.push('/');
        let base_url = Url::parse(&normalized).map_err(|e| GasStationError::UrlParse {
            context: "Failed to parse gas station base URL",
            source: e,
        })?;
        let reserve_gas_url =
            base_url
                .join("./v1/reserve_gas")
                .map_err(|e| GasStationError::UrlParse {
                    context: "Failed to construct ./v1/reserve_gas URL",
                    source: e,
                })?;
        let execute_tx_url =
            base_url
                .join("./v1/execute_tx")
                .map_err(|e| GasStationError::UrlParse {
                    context: "Failed to construct ./v1/execute_tx URL",
                    source: e,
                })?;
        let token = token.trim();
        if token.is_empty() {
            return Err(GasStationError::MissingToken);
        }
        let mut authorization = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(GasStationError::InvalidToken)?;
        authorization.set_sensitive(true);
        Ok(Self {
            base_url,
            reserve_gas_url,
            execute_tx_url,
            authorization,
            client: Client::new(),
            timeout: None,
        })
    }

    /// Returns the base URL used by this client.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn reserve_gas_url(&self) -> &Url {
        &self.reserve_gas_url
    }

    pub fn execute_tx_url(&self) -> &Url {
        &self.execute_tx_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sets a timeout for all future requests.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut this = self.clone();
        this.timeout = Some(timeout);
        this
    }

    /// Uses a preconfigured reqwest client (proxies, TLS roots, connection pool).
    pub fn with_http_client(&self, client: Client) -> Self {
        let mut this = self.clone();
        this.client = client;
        this
    }

    /// Reserves sponsor gas for `request.gas_budget`, held for `request.reserve_duration_secs`.
    ///
    /// A reservation without gas coins is treated as a station error: it could never pay
    /// for the transaction.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "gas_station.reserve_gas",
            skip_all,
            fields(station = %self.base_url, gas_budget = request.gas_budget),
            err
        )
    )]
    pub async fn reserve_gas(
        &self,
        request: &ReserveGasRequest,
    ) -> Result<GasReservation, GasStationError> {
        let context = Self::RESERVE_GAS_CONTEXT;
        let response: ReserveGasResponse = self
            .post_json(&self.reserve_gas_url, context, request)
            .await?;
        match response {
            ReserveGasResponse {
                error: Some(reason),
                ..
            } => Err(GasStationError::Station { context, reason }),
            ReserveGasResponse {
                result: Some(reservation),
                ..
            } if reservation.gas_coins.is_empty() => Err(GasStationError::Station {
                context,
                reason: format!(
                    "reservation {} holds no gas coins",
                    reservation.reservation_id
                ),
            }),
            ReserveGasResponse {
                result: Some(reservation),
                ..
            } => Ok(reservation),
            ReserveGasResponse { result: None, .. } => Err(GasStationError::Station {
                context,
                reason: "response carries neither a result nor an error".to_string(),
            }),
        }
    }

    /// Hands sender-signed transaction bytes to the station for sponsor co-signing and
    /// broadcast under `reservation_id`.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "gas_station.execute_tx",
            skip_all,
            fields(station = %self.base_url, reservation_id = reservation_id),
            err
        )
    )]
    pub async fn execute_tx(
        &self,
        reservation_id: u64,
        tx_bytes: &[u8],
        user_sig: &UserSignature,
    ) -> Result<TransactionEffects, GasStationError> {
        let context = Self::EXECUTE_TX_CONTEXT;
        let request = ExecuteTxRequest {
            reservation_id,
            tx_bytes: Base64Bytes::encode(tx_bytes),
            user_sig: user_sig.as_str(),
        };
        let response: ExecuteTxResponse = self
            .post_json(&self.execute_tx_url, context, &request)
            .await?;
        match response {
            ExecuteTxResponse {
                error: Some(reason),
                ..
            } => Err(GasStationError::Station { context, reason }),
            ExecuteTxResponse {
                effects: Some(effects),
                ..
            } => Ok(effects),
            ExecuteTxResponse { effects: None, .. } => Err(GasStationError::Station {
                context,
                reason: "response carries no transaction effects".to_string(),
            }),
        }
    }

    /// Authenticated JSON POST. Any 2xx status is decoded as `R`; anything else becomes
    /// [`GasStationError::HttpStatus`] with the body preserved for diagnostics.
    async fn post_json<T, R>(
        &self,
        url: &Url,
        context: &'static str,
        payload: &T,
    ) -> Result<R, GasStationError>
    where
        T: serde::Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let mut req = self
            .client
            .post(url.clone())
            .header(AUTHORIZATION, self.authorization.clone())
            .json(payload);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req
            .send()
            .await
            .map_err(|e| GasStationError::Http { context, source: e })?;

        if http_response.status().is_success() {
            http_response
                .json::<R>()
                .await
                .map_err(|e| GasStationError::JsonDeserialization { context, source: e })
        } else {
            let status = http_response.status();
            let body = http_response
                .text()
                .await
                .map_err(|e| GasStationError::ResponseBodyRead { context, source: e })?;
            Err(GasStationError::HttpStatus {
                context,
                status,
                body,
            })
        }
    }
}
