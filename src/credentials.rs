//! Authentication material for provider requests
//!
//! A [`CredentialProvider`] is asked for a fresh [`Credential`] before every
//! outbound request, including each status query of a poll loop. Nothing is
//! cached: a signed token obtained for submission is never reused for polling.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Not-before backdating that tolerates clock skew between us and the provider
pub const CLOCK_SKEW_ALLOWANCE: TimeDelta = TimeDelta::seconds(5);

/// Authentication material for one request
#[derive(Clone)]
pub struct Credential {
    /// Bearer token value
    pub token: String,
    /// When the credential was produced
    pub issued_at: DateTime<Utc>,
    /// When the token stops being accepted (signed tokens only)
    pub expires_at: Option<DateTime<Utc>>,
    /// When the token starts being accepted (signed tokens only)
    pub not_before: Option<DateTime<Utc>>,
    /// Extra headers sent with the token
    pub headers: Vec<(&'static str, String)>,
}

impl Credential {
    /// Attach the bearer token and extra headers to a request
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        self.headers
            .iter()
            .fold(request.bearer_auth(&self.token), |request, (name, value)| {
                request.header(*name, value)
            })
    }

    /// Whether a provider would accept the token at `at`
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.not_before.is_none_or(|nbf| at >= nbf) && self.expires_at.is_none_or(|exp| at < exp)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("not_before", &self.not_before)
            .field(
                "headers",
                &self.headers.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Source of credentials for one provider
pub trait CredentialProvider: Send + Sync {
    /// Produce a credential that is valid right now
    fn obtain(&self) -> Result<Credential>;
}

/// Pre-configured bearer token, optionally with organization/version headers
#[derive(Clone)]
pub struct StaticCredentials {
    token: String,
    headers: Vec<(&'static str, String)>,
}

impl StaticCredentials {
    /// Wrap a secret token
    ///
    /// Fails when the token is empty.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::config("api_key is required", "api_key"));
        }
        Ok(Self {
            token,
            headers: Vec::new(),
        })
    }

    /// Send `value` under `name` with every request, when configured
    pub fn with_header(mut self, name: &'static str, value: Option<&str>) -> Self {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.headers.push((name, value.to_string()));
        }
        self
    }
}

impl CredentialProvider for StaticCredentials {
    fn obtain(&self) -> Result<Credential> {
        Ok(Credential {
            token: self.token.clone(),
            issued_at: Utc::now(),
            expires_at: None,
            not_before: None,
            headers: self.headers.clone(),
        })
    }
}

/// JWT claims of a signed provider token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer: the configured access key
    pub iss: String,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    /// Not-before, seconds since the epoch
    pub nbf: i64,
}

/// Short-lived HS256 token signed with a shared secret
///
/// Every call to [`obtain`](CredentialProvider::obtain) signs a new token.
#[derive(Clone)]
pub struct SignedCredentials {
    access_key: String,
    key: EncodingKey,
    lifetime: TimeDelta,
}

impl SignedCredentials {
    /// Build a signer for `access_key` using `secret_key`
    ///
    /// Fails when either key is empty or the lifetime is zero.
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl AsRef<[u8]>,
        lifetime: Duration,
    ) -> Result<Self> {
        let access_key = access_key.into();
        let secret_key = secret_key.as_ref();

        if access_key.trim().is_empty() {
            return Err(Error::config("access_key is required", "access_key"));
        }
        if secret_key.is_empty() {
            return Err(Error::config("secret_key is required", "secret_key"));
        }
        let lifetime = TimeDelta::from_std(lifetime)
            .ok()
            .filter(|l| *l > TimeDelta::zero())
            .ok_or_else(|| Error::config("token lifetime out of range", "token_lifetime"))?;

        Ok(Self {
            access_key,
            key: EncodingKey::from_secret(secret_key),
            lifetime,
        })
    }

    /// Token lifetime
    pub fn lifetime(&self) -> TimeDelta {
        self.lifetime
    }
}

impl std::fmt::Debug for SignedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedCredentials")
            .field("access_key", &self.access_key)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl CredentialProvider for SignedCredentials {
    fn obtain(&self) -> Result<Credential> {
        let issued_at = Utc::now();
        let expires_at = issued_at + self.lifetime;
        let not_before = issued_at - CLOCK_SKEW_ALLOWANCE;

        let claims = TokenClaims {
            iss: self.access_key.clone(),
            exp: expires_at.timestamp(),
            nbf: not_before.timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)?;

        tracing::trace!(issuer = %self.access_key, expires_at = %expires_at, "signed provider token");

        Ok(Credential {
            token,
            issued_at,
            expires_at: Some(expires_at),
            not_before: Some(not_before),
            headers: Vec::new(),
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation};

    const LIFETIME: Duration = Duration::from_secs(1800);

    fn signer() -> SignedCredentials {
        SignedCredentials::new("access-123", "shh", LIFETIME).unwrap()
    }

    #[test]
    fn signed_token_carries_issuer_expiry_and_not_before() {
        let credential = signer().obtain().unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&["access-123"]);
        validation.validate_nbf = true;
        let decoded = jsonwebtoken::decode::<TokenClaims>(
            &credential.token,
            &DecodingKey::from_secret(b"shh"),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.header.alg, Algorithm::HS256);
        assert_eq!(decoded.claims.iss, "access-123");
        assert_eq!(
            decoded.claims.exp,
            credential.expires_at.unwrap().timestamp()
        );
        assert_eq!(
            decoded.claims.nbf,
            credential.not_before.unwrap().timestamp()
        );
    }

    #[test]
    fn consecutive_tokens_each_have_their_own_window() {
        let signer = signer();
        let first = signer.obtain().unwrap();
        let second = signer.obtain().unwrap();

        for credential in [&first, &second] {
            let expires_at = credential.expires_at.unwrap();
            let not_before = credential.not_before.unwrap();
            assert_eq!(expires_at - credential.issued_at, TimeDelta::seconds(1800));
            assert!(expires_at > credential.issued_at);
            assert!(not_before < credential.issued_at);
            assert_eq!(credential.issued_at - not_before, CLOCK_SKEW_ALLOWANCE);
            assert!(credential.is_valid_at(credential.issued_at));
        }
        assert!(second.issued_at >= first.issued_at);
    }

    #[test]
    fn signed_token_is_invalid_outside_its_window() {
        let credential = signer().obtain().unwrap();
        let issued = credential.issued_at;
        assert!(!credential.is_valid_at(issued - TimeDelta::seconds(6)));
        assert!(!credential.is_valid_at(issued + TimeDelta::seconds(1800)));
        assert!(credential.is_valid_at(issued + TimeDelta::seconds(1799)));
    }

    #[test]
    fn signer_rejects_missing_keys() {
        assert!(matches!(
            SignedCredentials::new("", "shh", LIFETIME),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            SignedCredentials::new("ak", "", LIFETIME),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            SignedCredentials::new("ak", "shh", Duration::ZERO),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn static_credentials_attach_optional_headers() {
        let credential = StaticCredentials::new("tok")
            .unwrap()
            .with_header("X-Organization", Some("acme"))
            .with_header("X-Api-Version", None)
            .with_header("X-Empty", Some(""))
            .obtain()
            .unwrap();

        assert_eq!(credential.token, "tok");
        assert_eq!(credential.headers, vec![("X-Organization", "acme".to_string())]);
        assert!(credential.expires_at.is_none());
        assert!(credential.is_valid_at(Utc::now()));
    }

    #[test]
    fn static_credentials_reject_empty_token() {
        assert!(StaticCredentials::new("  ").is_err());
    }

    #[test]
    fn debug_output_redacts_token() {
        let credential = StaticCredentials::new("super-secret").unwrap().obtain().unwrap();
        let debug = format!("{credential:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn authorize_sets_bearer_and_extra_headers() {
        let credential = StaticCredentials::new("tok")
            .unwrap()
            .with_header("X-Runway-Version", Some("2024-11-06"))
            .obtain()
            .unwrap();
        let request = credential
            .authorize(reqwest::Client::new().get("http://localhost/"))
            .build()
            .unwrap();

        assert_eq!(request.headers()["authorization"], "Bearer tok");
        assert_eq!(request.headers()["x-runway-version"], "2024-11-06");
    }
}
