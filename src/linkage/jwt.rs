//! Domain Linkage Credentials in JWT form.
//!
//! A DID configuration resource lists compact JWS tokens in `linked_dids`. The credential
//! relevant for a DID document is the one it issued; that credential must be signed by one
//! of the document's verification methods, name the document's DID as both issuer and
//! subject, and claim the same origin the document's `LinkedDomains` service points to.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::{Signature, VerifyingKey};
use gas_sponsor_types::identity::{DidDocument, Jwk, OneOrMany};
use gas_sponsor_types::timestamp::UnixTimestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DOMAIN_LINKAGE_CREDENTIAL_TYPE: &str = "DomainLinkageCredential";

/// The well-known DID configuration resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainLinkageConfiguration {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<OneOrMany<String>>,
    pub linked_dids: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LinkageValidationError {
    #[error("Malformed JWT: {0}")]
    MalformedJwt(String),
    #[error("Invalid domain {0}")]
    InvalidDomain(String),
    #[error("No domain linkage credential issued by {0}")]
    CredentialNotFound(String),
    #[error("{count} domain linkage credentials issued by {did}, expected one")]
    MultipleCredentials { did: String, count: usize },
    #[error("JWS header has no kid")]
    MissingKid,
    #[error("kid {0} does not resolve to a verification method of the issuer")]
    UnknownMethod(String),
    #[error("Verification method {0} has no public JWK")]
    MissingPublicKey(String),
    #[error("Unsupported JWS algorithm {0}")]
    UnsupportedAlgorithm(String),
    #[error("Unusable public key: {0}")]
    InvalidPublicKey(String),
    #[error("Signature verification failed")]
    InvalidSignature,
    #[error("Credential subject {subject} does not match issuer {issuer}")]
    SubjectMismatch { issuer: String, subject: String },
    #[error("Credential is not a DomainLinkageCredential")]
    NotDomainLinkageCredential,
    #[error("Credential origin {found} does not match {expected}")]
    OriginMismatch { expected: String, found: String },
    #[error("Credential has no expiration date")]
    MissingExpiration,
    #[error("Credential expired at {0}")]
    Expired(UnixTimestamp),
    #[error("Credential is not valid before {0}")]
    NotYetValid(UnixTimestamp),
}

#[derive(Debug, Clone, Deserialize)]
struct JwsHeader {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LinkageClaims {
    iss: String,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    nbf: Option<UnixTimestamp>,
    #[serde(default)]
    exp: Option<UnixTimestamp>,
    vc: CredentialClaims,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialClaims {
    #[serde(rename = "type")]
    credential_type: OneOrMany<String>,
    credential_subject: OneOrMany<CredentialSubject>,
}

#[derive(Debug, Clone, Deserialize)]
struct CredentialSubject {
    #[serde(default)]
    id: Option<String>,
    origin: String,
}

/// A compact JWS split into its parts.
#[derive(Debug, Clone)]
struct DecodedJwt<'a> {
    header: JwsHeader,
    claims: LinkageClaims,
    /// `base64url(header) "." base64url(payload)`, the bytes the signature covers.
    signing_input: &'a str,
    signature: Vec<u8>,
}

impl<'a> DecodedJwt<'a> {
    fn decode(token: &'a str) -> Result<Self, LinkageValidationError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(LinkageValidationError::MalformedJwt(
                "expected three dot-separated parts".to_string(),
            ));
        };
        let signing_input = &token[..header.len() + 1 + payload.len()];
        Ok(Self {
            header: decode_json(header)?,
            claims: decode_json(payload)?,
            signing_input,
            signature: decode_part(signature)?,
        })
    }
}

fn decode_part(part: &str) -> Result<Vec<u8>, LinkageValidationError> {
    URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| LinkageValidationError::MalformedJwt(e.to_string()))
}

fn decode_json<T: DeserializeOwned>(part: &str) -> Result<T, LinkageValidationError> {
    serde_json::from_slice(&decode_part(part)?)
        .map_err(|e| LinkageValidationError::MalformedJwt(e.to_string()))
}

/// Checks a JWS signature against a public JWK.
pub trait JwsVerifier: Send + Sync {
    fn verify(
        &self,
        alg: &str,
        signing_input: &[u8],
        signature: &[u8],
        public_key: &Jwk,
    ) -> Result<(), LinkageValidationError>;
}

/// `EdDSA` over Ed25519 OKP keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdDsaJwsVerifier;

impl JwsVerifier for EdDsaJwsVerifier {
    fn verify(
        &self,
        alg: &str,
        signing_input: &[u8],
        signature: &[u8],
        public_key: &Jwk,
    ) -> Result<(), LinkageValidationError> {
        if alg != "EdDSA" {
            return Err(LinkageValidationError::UnsupportedAlgorithm(alg.to_string()));
        }
        if public_key.kty != "OKP" || public_key.crv.as_deref() != Some("Ed25519") {
            return Err(LinkageValidationError::InvalidPublicKey(format!(
                "expected an Ed25519 OKP key, got kty={} crv={:?}",
                public_key.kty, public_key.crv
            )));
        }
        let x = public_key
            .x
            .as_deref()
            .ok_or_else(|| LinkageValidationError::InvalidPublicKey("missing x".to_string()))?;
        let key_bytes: [u8; 32] = decode_part(x)?.try_into().map_err(|_| {
            LinkageValidationError::InvalidPublicKey("x is not 32 bytes".to_string())
        })?;
        let key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| LinkageValidationError::InvalidPublicKey(e.to_string()))?;
        let signature =
            Signature::from_slice(signature).map_err(|_| LinkageValidationError::InvalidSignature)?;
        key.verify_strict(signing_input, &signature)
            .map_err(|_| LinkageValidationError::InvalidSignature)
    }
}

/// Validates a DID configuration against the DID document that claims the domain.
pub trait ConfigurationValidator: Send + Sync {
    fn validate(
        &self,
        issuer: &DidDocument,
        configuration: &DomainLinkageConfiguration,
        domain: &str,
    ) -> Result<(), LinkageValidationError>;
}

#[derive(Debug, Clone, Default)]
pub struct JwtDomainLinkageValidator<V = EdDsaJwsVerifier> {
    verifier: V,
}

impl JwtDomainLinkageValidator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<V: JwsVerifier> JwtDomainLinkageValidator<V> {
    pub fn with_verifier(verifier: V) -> Self {
        Self { verifier }
    }

    /// Validates at the given time. `domain` is the service endpoint URL as published in
    /// the document; only its origin is compared.
    pub fn validate_at(
        &self,
        issuer: &DidDocument,
        configuration: &DomainLinkageConfiguration,
        domain: &str,
        now: UnixTimestamp,
    ) -> Result<(), LinkageValidationError> {
        let expected_origin = Url::parse(domain)
            .map_err(|_| LinkageValidationError::InvalidDomain(domain.to_string()))?
            .origin();

        let credentials = configuration
            .linked_dids
            .iter()
            .map(|token| DecodedJwt::decode(token))
            .collect::<Result<Vec<_>, _>>()?;
        let mut issued = credentials
            .into_iter()
            .filter(|jwt| jwt.claims.iss == issuer.id);
        let credential = match (issued.next(), issued.count()) {
            (None, _) => {
                return Err(LinkageValidationError::CredentialNotFound(
                    issuer.id.clone(),
                ));
            }
            (Some(credential), 0) => credential,
            (Some(_), rest) => {
                return Err(LinkageValidationError::MultipleCredentials {
                    did: issuer.id.clone(),
                    count: rest + 1,
                });
            }
        };

        self.verify_signature(issuer, &credential)?;

        let claims = &credential.claims;
        let subject = match &claims.vc.credential_subject {
            OneOrMany::One(subject) => subject,
            OneOrMany::Many(subjects) if subjects.len() == 1 => &subjects[0],
            OneOrMany::Many(_) => {
                return Err(LinkageValidationError::MalformedJwt(
                    "expected exactly one credential subject".to_string(),
                ));
            }
        };
        let subject_id = claims.sub.as_deref().or(subject.id.as_deref()).unwrap_or_default();
        if subject_id != claims.iss {
            return Err(LinkageValidationError::SubjectMismatch {
                issuer: claims.iss.clone(),
                subject: subject_id.to_string(),
            });
        }
        if !claims
            .vc
            .credential_type
            .iter()
            .any(|t| t == DOMAIN_LINKAGE_CREDENTIAL_TYPE)
        {
            return Err(LinkageValidationError::NotDomainLinkageCredential);
        }

        let found_origin = Url::parse(&subject.origin)
            .map(|url| url.origin())
            .map_err(|_| LinkageValidationError::OriginMismatch {
                expected: expected_origin.ascii_serialization(),
                found: subject.origin.clone(),
            })?;
        if found_origin != expected_origin {
            return Err(LinkageValidationError::OriginMismatch {
                expected: expected_origin.ascii_serialization(),
                found: found_origin.ascii_serialization(),
            });
        }

        let expires = claims.exp.ok_or(LinkageValidationError::MissingExpiration)?;
        if expires <= now {
            return Err(LinkageValidationError::Expired(expires));
        }
        if let Some(not_before) = claims.nbf
            && not_before > now
        {
            return Err(LinkageValidationError::NotYetValid(not_before));
        }
        Ok(())
    }

    fn verify_signature(
        &self,
        issuer: &DidDocument,
        credential: &DecodedJwt<'_>,
    ) -> Result<(), LinkageValidationError> {
        let kid = credential
            .header
            .kid
            .as_deref()
            .ok_or(LinkageValidationError::MissingKid)?;
        let method = issuer
            .resolve_method(kid)
            .ok_or_else(|| LinkageValidationError::UnknownMethod(kid.to_string()))?;
        let public_key = method
            .public_key_jwk
            .as_ref()
            .ok_or_else(|| LinkageValidationError::MissingPublicKey(method.id.clone()))?;
        self.verifier.verify(
            &credential.header.alg,
            credential.signing_input.as_bytes(),
            &credential.signature,
            public_key,
        )
    }
}

impl<V: JwsVerifier> ConfigurationValidator for JwtDomainLinkageValidator<V> {
    fn validate(
        &self,
        issuer: &DidDocument,
        configuration: &DomainLinkageConfiguration,
        domain: &str,
    ) -> Result<(), LinkageValidationError> {
        self.validate_at(issuer, configuration, domain, UnixTimestamp::now())
    }
}
