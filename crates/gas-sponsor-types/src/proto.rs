//! Gas station wire format.
//!
//! A gas station exposes two authenticated JSON endpoints:
//!
//! - `POST /v1/reserve_gas` with [`ReserveGasRequest`], answered by [`ReserveGasResponse`].
//!   A successful reservation is a time-bounded, single-use hold on the sponsor's gas coins.
//! - `POST /v1/execute_tx` with [`ExecuteTxRequest`], answered by [`ExecuteTxResponse`].
//!   The station co-signs the sender-signed transaction with the sponsor key and broadcasts it.
//!
//! Both responses carry an optional `error` string; stations may report failures in the
//! body of a `200 OK`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chain::{Address, ObjectRef, TransactionDigest};
use crate::util::Base64Bytes;

/// Body of `POST /v1/reserve_gas`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveGasRequest {
    pub gas_budget: u64,
    pub reserve_duration_secs: u64,
}

/// Response of `POST /v1/reserve_gas`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveGasResponse {
    #[serde(default)]
    pub result: Option<GasReservation>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A gas reservation granted by a station.
///
/// Valid for one submission to the *same* station, until the hold expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasReservation {
    /// The sponsor's on-ledger address, which becomes the transaction's gas owner.
    pub sponsor_address: Address,
    /// Identifier to present back to the station on execution.
    pub reservation_id: u64,
    /// Sponsor coins that pay for gas.
    pub gas_coins: Vec<ObjectRef>,
}

/// Body of `POST /v1/execute_tx`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteTxRequest<'a> {
    pub reservation_id: u64,
    pub tx_bytes: Base64Bytes<'a>,
    pub user_sig: &'a str,
}

/// Response of `POST /v1/execute_tx`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteTxResponse {
    #[serde(default)]
    pub effects: Option<TransactionEffects>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The ledger's record of a transaction's execution.
///
/// Only the digest and status are interpreted; everything else (gas used, object
/// changes, events) is carried through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEffects {
    pub transaction_digest: TransactionDigest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransactionEffects {
    /// `true` unless the ledger explicitly reported a failed execution.
    pub fn is_success(&self) -> bool {
        self.status
            .as_ref()
            .is_none_or(|s| s.status == ExecutionState::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub status: ExecutionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Success,
    Failure,
}

/// Terminal artifact of a submission, handed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub digest: TransactionDigest,
    pub effects: TransactionEffects,
}

impl From<TransactionEffects> for TransactionResponse {
    fn from(effects: TransactionEffects) -> Self {
        Self {
            digest: effects.transaction_digest.clone(),
            effects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reserve_gas_response_parses_station_payload() {
        let payload = json!({
            "result": {
                "sponsor_address": format!("0x{}", "5a".repeat(32)),
                "reservation_id": 7,
                "gas_coins": [{
                    "objectId": format!("0x{}", "01".repeat(32)),
                    "version": 3,
                    "digest": "4jQ9rAbCkxz1UuSXnB8QGSzFqRUT8xgrxwwFtwGwRMwD"
                }]
            },
            "error": null
        });
        let response: ReserveGasResponse = serde_json::from_value(payload).unwrap();
        let reservation = response.result.unwrap();
        assert_eq!(reservation.reservation_id, 7);
        assert_eq!(reservation.gas_coins.len(), 1);
        assert_eq!(reservation.sponsor_address, Address::new([0x5a; 32]));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_execute_request_encodes_bytes_as_base64() {
        let request = ExecuteTxRequest {
            reservation_id: 9,
            tx_bytes: Base64Bytes::encode([1u8, 2, 3]),
            user_sig: "c2ln",
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"reservation_id": 9, "tx_bytes": "AQID", "user_sig": "c2ln"})
        );
    }

    #[test]
    fn test_effects_keep_unknown_fields_and_status() {
        let payload = json!({
            "transactionDigest": "Dg1",
            "status": {"status": "failure", "error": "InsufficientGas"},
            "gasUsed": {"computationCost": "1000"}
        });
        let effects: TransactionEffects = serde_json::from_value(payload).unwrap();
        assert_eq!(effects.transaction_digest.as_str(), "Dg1");
        assert!(!effects.is_success());
        assert!(effects.extra.contains_key("gasUsed"));

        let response = TransactionResponse::from(effects);
        assert_eq!(response.digest.as_str(), "Dg1");
    }

    #[test]
    fn test_effects_without_digest_are_rejected() {
        let result: Result<TransactionEffects, _> =
            serde_json::from_value(json!({"status": {"status": "success"}}));
        assert!(result.is_err());
    }
}
