use std::collections::HashSet;
use std::time::Duration;

use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::ValidatorConfig;
use crate::jwks::{Jwks, JwksError};

/// The verified payload of a token, keyed by claim name.
pub type ClaimSet = Map<String, Value>;

/// Verifies tokens against the key set and issuer named by a
/// [`ValidatorConfig`].
///
/// The key set is fetched on the first call to [`validate`][Self::validate]
/// and reused for the lifetime of the validator. There is no refresh: a key
/// rotated in after the first fetch is reported as an unknown key id.
///
/// The `aud` claim is not checked. Callers that hand the claims to a service
/// expecting a particular audience must compare it themselves.
pub struct TokenValidator {
    client: reqwest::Client,
    config: ValidatorConfig,
    jwks: OnceCell<Jwks>,
}

impl TokenValidator {
    /// Builds a validator whose key-set fetch gives up after
    /// `config.timeout_secs`.
    pub fn new(config: ValidatorConfig) -> Result<Self, JwksError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(JwksError::ClientError)?;
        Ok(Self::with_client(client, config))
    }

    /// A version of [`new`][Self::new] that allows for passing in a custom
    /// [`Client`][reqwest::Client]. The client's own timeout applies and
    /// `config.timeout_secs` is ignored.
    pub fn with_client(client: reqwest::Client, config: ValidatorConfig) -> Self {
        Self {
            client,
            config,
            jwks: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Checks the token's signature, issuer and time claims and returns its
    /// payload.
    ///
    /// The header is parsed before the key set is fetched, so a malformed
    /// token never causes a network request.
    pub async fn validate(&self, token: &str) -> Result<ClaimSet, ValidationError> {
        let header = decode_header(token).map_err(ValidationError::Malformed)?;
        let kid = header.kid.as_deref().ok_or(ValidationError::MissingKeyId)?;

        let jwks = self.jwks().await?;
        let jwk = jwks
            .get(kid)
            .ok_or_else(|| ValidationError::UnknownKeyId(kid.to_string()))?;

        if let Some(key_alg) = jwk.algorithm() {
            if key_alg != header.alg {
                return Err(ValidationError::AlgorithmMismatch {
                    key_id: kid.to_string(),
                    token: header.alg,
                    key: key_alg,
                });
            }
        }

        let validation = self.validation(header.alg);
        let token_data = decode::<ClaimSet>(token, jwk.decoding_key(), &validation)
            .map_err(ValidationError::Rejected)?;

        check_issuer(&token_data.claims, &self.config.expected_issuer)?;
        check_time_claims(
            &token_data.claims,
            jsonwebtoken::get_current_timestamp(),
            self.config.leeway(),
        )?;

        debug!(%kid, alg = ?header.alg, "Token verified.");
        Ok(token_data.claims)
    }

    async fn jwks(&self) -> Result<&Jwks, JwksError> {
        self.jwks
            .get_or_try_init(|| {
                Jwks::from_jwks_url_with_client(&self.client, &self.config.jwks_url)
            })
            .await
    }

    /// Signature, algorithm and claim presence are left to `jsonwebtoken`;
    /// the claim values are checked by [`check_issuer`] and
    /// [`check_time_claims`].
    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        // audience is deliberately left unchecked
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "iss".to_string()]);
        validation.set_issuer(&[&self.config.expected_issuer]);
        validation
    }
}

/// `jsonwebtoken` accepts an `iss` array when any element matches; only a
/// single string equal to the expected issuer is trusted here.
fn check_issuer(claims: &ClaimSet, expected_issuer: &str) -> Result<(), ValidationError> {
    match claims.get("iss") {
        Some(Value::String(iss)) if iss == expected_issuer => Ok(()),
        _ => Err(ValidationError::IssuerMismatch),
    }
}

/// `exp` must lie after `now`, `nbf` and `iat` must not lie after it, each
/// within `leeway_secs`. Every one of them that is present must be a
/// non-negative number.
fn check_time_claims(
    claims: &ClaimSet,
    now: u64,
    leeway_secs: u64,
) -> Result<(), ValidationError> {
    let exp = time_claim(claims, "exp")?.ok_or(ValidationError::InvalidTimeClaim("exp"))?;
    if exp <= now.saturating_sub(leeway_secs) as f64 {
        return Err(ValidationError::Expired);
    }

    let latest = now.saturating_add(leeway_secs) as f64;
    if let Some(nbf) = time_claim(claims, "nbf")? {
        if nbf > latest {
            return Err(ValidationError::NotYetValid);
        }
    }
    if let Some(iat) = time_claim(claims, "iat")? {
        if iat > latest {
            return Err(ValidationError::IssuedInFuture);
        }
    }
    Ok(())
}

fn time_claim(claims: &ClaimSet, name: &'static str) -> Result<Option<f64>, ValidationError> {
    match claims.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .filter(|secs| *secs >= 0.0)
            .map(Some)
            .ok_or(ValidationError::InvalidTimeClaim(name)),
    }
}

/// Why a token was not accepted.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The token is not a compact JWT or its header cannot be decoded.
    #[error("malformed token: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),

    /// The token header has no `kid`, so no key can be selected.
    #[error("the token header is missing the `kid` attribute")]
    MissingKeyId,

    /// No key in the key set carries the token's `kid`.
    #[error("no key in the key set matches key id {0:?}")]
    UnknownKeyId(String),

    /// The token's `alg` differs from the algorithm the key was published for.
    #[error("token algorithm {token:?} does not match algorithm {key:?} of key {key_id:?}")]
    AlgorithmMismatch {
        key_id: String,
        token: Algorithm,
        key: Algorithm,
    },

    /// Signature verification failed, or `exp`/`iss` is missing or
    /// unparseable.
    #[error("token rejected: {0}")]
    Rejected(#[source] jsonwebtoken::errors::Error),

    /// The `iss` claim is not a string equal to the expected issuer.
    #[error("the `iss` claim does not match the expected issuer")]
    IssuerMismatch,

    /// A time claim is not a non-negative number.
    #[error("the `{0}` claim is not a valid timestamp")]
    InvalidTimeClaim(&'static str),

    /// The `exp` claim is not in the future.
    #[error("the token has expired")]
    Expired,

    /// The `nbf` claim lies in the future.
    #[error("the token is not valid yet")]
    NotYetValid,

    /// The `iat` claim lies in the future.
    #[error("the token was issued in the future")]
    IssuedInFuture,

    /// The key set could not be obtained.
    #[error(transparent)]
    KeySet(#[from] JwksError),
}
