//! DID document model consumed by domain-linkage validation.
//!
//! Only the parts of a resolved DID document that linkage validation reads are modelled:
//! verification methods (controller and public JWK) and services (type and endpoint).
//! Documents are produced by the caller's identity SDK and arrive here as JSON.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Service type marking a domain-linkage service.
pub const LINKED_DOMAINS_SERVICE_TYPE: &str = "LinkedDomains";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verification_method: Vec<VerificationMethod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,
}

impl DidDocument {
    pub fn methods(&self) -> impl Iterator<Item = &VerificationMethod> {
        self.verification_method.iter()
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.service.iter()
    }

    /// Finds the verification method a JWS `kid` points at.
    ///
    /// Accepts absolute DID URLs (`did:example:123#key-1`) and relative fragments
    /// (`#key-1`) on either side, as long as the DID part, when present, is this document.
    pub fn resolve_method(&self, kid: &str) -> Option<&VerificationMethod> {
        let (did, fragment) = split_did_url(kid)?;
        if did.is_some_and(|did| did != self.id) {
            return None;
        }
        self.methods().find(|method| {
            split_did_url(&method.id).is_some_and(|(method_did, method_fragment)| {
                method_fragment == fragment && method_did.is_none_or(|d| d == self.id)
            })
        })
    }
}

/// Splits a DID URL into its (optional) DID and its fragment.
fn split_did_url(url: &str) -> Option<(Option<&str>, &str)> {
    let (did, fragment) = url.split_once('#')?;
    let did = (!did.is_empty()).then_some(did);
    Some((did, fragment))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,
    pub controller: String,
    #[serde(rename = "type")]
    pub method_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<Jwk>,
}

/// Public JSON Web Key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    #[serde(rename = "type")]
    pub service_type: OneOrMany<String>,
    pub service_endpoint: ServiceEndpoint,
}

impl Service {
    pub fn has_type(&self, service_type: &str) -> bool {
        self.service_type.iter().any(|t| t == service_type)
    }

    pub fn is_linked_domains(&self) -> bool {
        self.has_type(LINKED_DOMAINS_SERVICE_TYPE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value).iter(),
            OneOrMany::Many(values) => values.iter(),
        }
    }
}

/// A service endpoint.
///
/// The three shapes linkage understands are a URL, a set of URLs and a map of URL sets. Any
/// other shape DID Core permits (DIDComm objects, sets of maps...) is kept as `Unsupported`
/// so the rest of the document still parses; it has no URL. Map entries keep document order,
/// including when the document is first read into a [`serde_json::Value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEndpoint {
    One(String),
    Set(Vec<String>),
    Map(Vec<(String, Vec<String>)>),
    Unsupported(Value),
}

impl ServiceEndpoint {
    /// The first URL of the endpoint: the string itself, the first element of the set,
    /// or the first element of the first map value.
    pub fn first_url(&self) -> Option<&str> {
        match self {
            ServiceEndpoint::One(url) => Some(url.as_str()),
            ServiceEndpoint::Set(urls) => urls.first().map(String::as_str),
            ServiceEndpoint::Map(entries) => entries
                .first()
                .and_then(|(_, urls)| urls.first())
                .map(String::as_str),
            ServiceEndpoint::Unsupported(_) => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, ServiceEndpoint::Unsupported(_))
    }
}

/// `Some` only when every element is a string.
fn string_set(values: &[Value]) -> Option<Vec<String>> {
    values
        .iter()
        .map(|value| value.as_str().map(str::to_string))
        .collect()
}

impl From<Value> for ServiceEndpoint {
    fn from(value: Value) -> Self {
        let parsed = match &value {
            Value::String(url) => Some(ServiceEndpoint::One(url.clone())),
            Value::Array(values) => string_set(values).map(ServiceEndpoint::Set),
            Value::Object(map) => map
                .iter()
                .map(|(key, urls)| {
                    let urls = string_set(urls.as_array()?)?;
                    Some((key.clone(), urls))
                })
                .collect::<Option<Vec<_>>>()
                .map(ServiceEndpoint::Map),
            _ => None,
        };
        parsed.unwrap_or(ServiceEndpoint::Unsupported(value))
    }
}

impl Serialize for ServiceEndpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ServiceEndpoint::One(url) => serializer.serialize_str(url),
            ServiceEndpoint::Set(urls) => {
                let mut seq = serializer.serialize_seq(Some(urls.len()))?;
                for url in urls {
                    seq.serialize_element(url)?;
                }
                seq.end()
            }
            ServiceEndpoint::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, urls) in entries {
                    map.serialize_entry(key, urls)?;
                }
                map.end()
            }
            ServiceEndpoint::Unsupported(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ServiceEndpoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(ServiceEndpoint::from)
    }
}
