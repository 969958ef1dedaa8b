//! Domain linkage verification.
//!
//! A DID document can claim a web domain through a `LinkedDomains` service. The claim holds
//! when the domain publishes `/.well-known/did-configuration.json` containing a Domain Linkage
//! Credential that the document's DID signed for that domain.
//!
//! [`LinkageValidator::validate_linkage`] answers `Ok(false)` for every way the claim can
//! fail to hold, including malformed or invalid credentials. Only failing to retrieve the
//! configuration resource is an error.

mod endpoint;
mod fetch;
mod jwt;

pub use endpoint::*;
pub use fetch::*;
pub use jwt::*;

use gas_sponsor_types::identity::DidDocument;
use serde_json::Value;
use tracing::instrument;

/// Checks a DID document's `LinkedDomains` claim against the claimed domain.
#[derive(Debug, Clone, Default)]
pub struct LinkageValidator<F = HttpConfigurationFetcher, V = JwtDomainLinkageValidator> {
    fetcher: F,
    validator: V,
}

impl LinkageValidator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F, V> LinkageValidator<F, V>
where
    F: ConfigurationFetcher,
    V: ConfigurationValidator,
{
    pub fn with_parts(fetcher: F, validator: V) -> Self {
        Self { fetcher, validator }
    }

    /// `true` when `document` has a verification method controlled by `declared_did` and
    /// one of its `LinkedDomains` services is backed by a valid configuration resource.
    ///
    /// Services are tried in document order. A service without a usable domain, or whose
    /// configuration does not lead with a JWT, is skipped. A configuration without
    /// `linked_dids` ends the check, as does the first credential set that gets validated.
    #[instrument(name = "linkage.validate", skip_all, fields(did = %declared_did))]
    pub async fn validate_linkage(
        &self,
        document: &DidDocument,
        declared_did: &str,
    ) -> Result<bool, LinkageFetchError> {
        if !document.methods().any(|m| m.controller == declared_did) {
            tracing::debug!("No verification method controlled by the declared DID");
            return Ok(false);
        }

        for service in document.services().filter(|s| s.is_linked_domains()) {
            let Some((endpoint, domain)) = linked_domain(&service.service_endpoint) else {
                tracing::debug!(
                    service = %service.id,
                    "LinkedDomains service has no usable domain"
                );
                continue;
            };

            let url = configuration_url(&domain)?;
            tracing::debug!(%url, "Fetching DID configuration");
            let body = self.fetcher.fetch(&url).await?;

            match linked_dids_head(&body) {
                None => {
                    tracing::debug!(%domain, "DID configuration has no linked_dids");
                    return Ok(false);
                }
                Some(head) if !head.is_some_and(is_compact_jws) => {
                    tracing::debug!(%domain, "DID configuration does not lead with a JWT");
                    continue;
                }
                Some(_) => {}
            }

            let configuration: DomainLinkageConfiguration = match serde_json::from_value(body) {
                Ok(configuration) => configuration,
                Err(error) => {
                    tracing::warn!(%domain, error = %error, "Malformed DID configuration");
                    return Ok(false);
                }
            };
            return match self.validator.validate(document, &configuration, endpoint) {
                Ok(()) => {
                    tracing::info!(%domain, "Domain linkage validated");
                    Ok(true)
                }
                Err(error) => {
                    tracing::warn!(%domain, error = %error, "Domain linkage validation failed");
                    Ok(false)
                }
            };
        }

        tracing::debug!("No LinkedDomains service could be validated");
        Ok(false)
    }
}

/// `None` when `linked_dids` is absent or not a list; otherwise its first entry, if that
/// entry is a string.
fn linked_dids_head(body: &Value) -> Option<Option<&str>> {
    let dids = body.get("linked_dids")?.as_array()?;
    Some(dids.first().and_then(Value::as_str))
}

fn is_compact_jws(token: &str) -> bool {
    token.split('.').count() == 3
}

#[cfg(test)]
mod tests {
    use super::jwt::tests::{DID, claims, configuration, document, sign, signing_key};
    use super::*;
    use async_trait::async_trait;
    use gas_sponsor_types::identity::{OneOrMany, Service, ServiceEndpoint};
    use gas_sponsor_types::timestamp::UnixTimestamp;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use url::Url;

    struct FakeFetcher {
        responses: Mutex<VecDeque<Result<Value, LinkageFetchError>>>,
        requested: Mutex<Vec<Url>>,
    }

    impl FakeFetcher {
        fn returning(body: Value) -> Arc<Self> {
            Self::answering(vec![Ok(body)])
        }

        fn answering(responses: Vec<Result<Value, LinkageFetchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requested: Mutex::new(Vec::new()),
            })
        }

        fn requested(&self) -> Vec<Url> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ConfigurationFetcher for FakeFetcher {
        async fn fetch(&self, url: &Url) -> Result<Value, LinkageFetchError> {
            self.requested.lock().unwrap().push(url.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected fetch of {url}"))
        }
    }

    fn linked_document(endpoint: ServiceEndpoint) -> DidDocument {
        linked_document_with(vec![endpoint])
    }

    fn linked_document_with(endpoints: Vec<ServiceEndpoint>) -> DidDocument {
        let mut document = document(&signing_key());
        for (i, endpoint) in endpoints.into_iter().enumerate() {
            document.service.push(Service {
                id: format!("{DID}#linked-domain-{i}"),
                service_type: OneOrMany::One("LinkedDomains".to_string()),
                service_endpoint: endpoint,
            });
        }
        document
    }

    fn valid_token(origin: &str) -> String {
        let exp = UnixTimestamp::now().as_secs() + 3600;
        sign(&signing_key(), "#key-1", &claims(origin, exp))
    }

    fn valid_configuration(origin: &str) -> Value {
        serde_json::to_value(configuration(vec![valid_token(origin)])).unwrap()
    }

    fn validator(fetcher: &Arc<FakeFetcher>) -> LinkageValidator<Arc<FakeFetcher>> {
        LinkageValidator::with_parts(fetcher.clone(), JwtDomainLinkageValidator::new())
    }

    #[tokio::test]
    async fn test_valid_linkage() {
        let fetcher = FakeFetcher::returning(
            serde_json::to_value(configuration(vec![valid_token("https://www.example.com")]))
                .unwrap(),
        );
        let document =
            linked_document(ServiceEndpoint::One("https://www.example.com/".to_string()));

        let linked = validator(&fetcher)
            .validate_linkage(&document, DID)
            .await
            .unwrap();
        assert!(linked);

        let requested = fetcher.requested();
        assert_eq!(requested.len(), 1);
        assert_eq!(requested[0].host_str(), Some("example.com"));
        assert_eq!(requested[0].path(), "/.well-known/did-configuration.json");
    }

    #[tokio::test]
    async fn test_empty_linked_dids_is_not_linked() {
        let fetcher = FakeFetcher::returning(json!({"linked_dids": []}));
        let document = linked_document(ServiceEndpoint::Set(vec![
            "https://example.com/".to_string(),
        ]));
        assert!(
            !validator(&fetcher)
                .validate_linkage(&document, DID)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_non_jwt_entry_is_not_linked() {
        let fetcher = FakeFetcher::returning(json!({"linked_dids": [{"proof": {}}]}));
        let document = linked_document(ServiceEndpoint::One("https://example.com/".to_string()));
        assert!(
            !validator(&fetcher)
                .validate_linkage(&document, DID)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_invalid_credential_is_not_linked() {
        let fetcher = FakeFetcher::returning(
            serde_json::to_value(configuration(vec![valid_token("https://other.example")]))
                .unwrap(),
        );
        let document = linked_document(ServiceEndpoint::Map(vec![(
            "origins".to_string(),
            vec!["https://example.com/".to_string()],
        )]));
        assert!(
            !validator(&fetcher)
                .validate_linkage(&document, DID)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_foreign_controller_skips_fetch() {
        let fetcher = FakeFetcher::returning(json!({}));
        let document = linked_document(ServiceEndpoint::One("https://example.com/".to_string()));
        assert!(
            !validator(&fetcher)
                .validate_linkage(&document, "did:iota:testnet:0xother")
                .await
                .unwrap()
        );
        assert!(fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_no_linked_domains_service() {
        let fetcher = FakeFetcher::returning(json!({}));
        let document = document(&signing_key());
        assert!(
            !validator(&fetcher)
                .validate_linkage(&document, DID)
                .await
                .unwrap()
        );
        assert!(fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_an_error() {
        let fetcher = FakeFetcher::answering(vec![Err(LinkageFetchError::HttpStatus {
            url: Url::parse("https://example.com/").unwrap(),
            status: reqwest::StatusCode::NOT_FOUND,
        })]);
        let document = linked_document(ServiceEndpoint::One("https://example.com/".to_string()));
        assert!(
            validator(&fetcher)
                .validate_linkage(&document, DID)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_non_jwt_configuration_moves_to_next_service() {
        let fetcher = FakeFetcher::answering(vec![
            Ok(json!({"linked_dids": [{"proof": {}}]})),
            Ok(valid_configuration("https://example.com")),
        ]);
        let document = linked_document_with(vec![
            ServiceEndpoint::One("https://legacy.example.org/".to_string()),
            ServiceEndpoint::One("https://example.com/".to_string()),
        ]);

        assert!(
            validator(&fetcher)
                .validate_linkage(&document, DID)
                .await
                .unwrap()
        );
        let hosts: Vec<_> = fetcher
            .requested()
            .iter()
            .map(|url| url.host_str().unwrap().to_string())
            .collect();
        assert_eq!(hosts, ["legacy.example.org", "example.com"]);
    }

    #[tokio::test]
    async fn test_missing_linked_dids_stops_the_search() {
        let fetcher = FakeFetcher::returning(json!({
            "@context": "https://identity.foundation/.well-known/did-configuration/v1"
        }));
        let document = linked_document_with(vec![
            ServiceEndpoint::One("https://example.com/".to_string()),
            ServiceEndpoint::One("https://example.org/".to_string()),
        ]);

        assert!(
            !validator(&fetcher)
                .validate_linkage(&document, DID)
                .await
                .unwrap()
        );
        assert_eq!(fetcher.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_endpoint_is_skipped() {
        let document: DidDocument = serde_json::from_value({
            let mut raw = serde_json::to_value(linked_document(ServiceEndpoint::One(
                "https://example.com/".to_string(),
            )))
            .unwrap();
            raw["service"].as_array_mut().unwrap().insert(
                0,
                json!({
                    "id": format!("{DID}#didcomm"),
                    "type": ["DIDCommMessaging", "LinkedDomains"],
                    "serviceEndpoint": {"uri": "https://m.example.com", "accept": ["didcomm/v2"]}
                }),
            );
            raw
        })
        .unwrap();
        let fetcher = FakeFetcher::returning(valid_configuration("https://example.com"));

        assert!(
            validator(&fetcher)
                .validate_linkage(&document, DID)
                .await
                .unwrap()
        );
        assert_eq!(fetcher.requested().len(), 1);
    }
}
