use std::collections::HashMap;

use jsonwebtoken::{jwk, Algorithm, DecodingKey};
use thiserror::Error;
use tracing::debug;

/// A container for the signing keys published by a token issuer.
///
/// The container can be used to validate any JWT that identifies a known key
/// through the `kid` attribute in the token's header.
#[derive(Clone)]
pub struct Jwks {
    keys: HashMap<String, Jwk>,
}

impl Jwks {
    /// # Arguments
    /// * `jwks_url` - The url which JWKS info is pulled from, e.g. https://token.actions.githubusercontent.com/.well-known/jwks
    pub async fn from_jwks_url(jwks_url: &str) -> Result<Self, JwksError> {
        Self::from_jwks_url_with_client(&reqwest::Client::default(), jwks_url).await
    }

    /// A version of [`from_jwks_url`][Self::from_jwks_url] that allows for
    /// passing in a custom [`Client`][reqwest::Client].
    pub async fn from_jwks_url_with_client(
        client: &reqwest::Client,
        jwks_url: &str,
    ) -> Result<Self, JwksError> {
        debug!(%jwks_url, "Fetching JSON Web Key Set.");
        let jwks: jwk::JwkSet = client
            .get(jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(Self::from_jwk_set(jwks)?)
    }

    /// Builds the container from an already parsed key set.
    ///
    /// Keys that can never verify a token signature are left out: keys
    /// without a `kid`, keys published for encryption, and symmetric keys.
    pub fn from_jwk_set(jwks: jwk::JwkSet) -> Result<Self, JwkError> {
        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                debug!("Skipping key without `kid`.");
                continue;
            };

            if let Some(key_use) = &jwk.common.public_key_use {
                if !matches!(key_use, jwk::PublicKeyUse::Signature) {
                    debug!(%kid, ?key_use, "Skipping key not meant for signatures.");
                    continue;
                }
            }

            let algorithm = match &jwk.common.key_algorithm {
                Some(key_algorithm) => match signing_algorithm(key_algorithm) {
                    Some(algorithm) => Some(algorithm),
                    None => {
                        debug!(%kid, ?key_algorithm, "Skipping key with a non-signing algorithm.");
                        continue;
                    }
                },
                None => None,
            };

            let decoding_key = match &jwk.algorithm {
                jwk::AlgorithmParameters::RSA(params) => {
                    DecodingKey::from_rsa_components(&params.n, &params.e)
                }
                jwk::AlgorithmParameters::EllipticCurve(params) => {
                    DecodingKey::from_ec_components(&params.x, &params.y)
                }
                jwk::AlgorithmParameters::OctetKeyPair(params) => {
                    DecodingKey::from_ed_components(&params.x)
                }
                jwk::AlgorithmParameters::OctetKey(_) => {
                    debug!(%kid, "Skipping symmetric key.");
                    continue;
                }
            }
            .map_err(|err| JwkError::DecodingError {
                key_id: kid.clone(),
                error: err,
            })?;

            keys.insert(
                kid,
                Jwk {
                    decoding_key,
                    algorithm,
                },
            );
        }

        Ok(Self { keys })
    }

    /// Looks up the key identified by `kid`.
    pub fn get(&self, kid: &str) -> Option<&Jwk> {
        self.keys.get(kid)
    }

    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// A single verification key taken from a [`Jwks`].
#[derive(Clone)]
pub struct Jwk {
    decoding_key: DecodingKey,
    algorithm: Option<Algorithm>,
}

impl Jwk {
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// The algorithm the key was published for, if the issuer declared one.
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }
}

fn signing_algorithm(key_algorithm: &jwk::KeyAlgorithm) -> Option<Algorithm> {
    match key_algorithm {
        jwk::KeyAlgorithm::HS256 => Some(Algorithm::HS256),
        jwk::KeyAlgorithm::HS384 => Some(Algorithm::HS384),
        jwk::KeyAlgorithm::HS512 => Some(Algorithm::HS512),
        jwk::KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        jwk::KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        jwk::KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        jwk::KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        jwk::KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        jwk::KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        jwk::KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        jwk::KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        jwk::KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        // RSA1_5, RSA-OAEP and friends are key-wrapping algorithms.
        _ => None,
    }
}

/// An error with the overall set of JSON Web Keys.
#[derive(Debug, Error)]
pub enum JwksError {
    /// There was an error fetching the JWKS from the specified url, or the
    /// endpoint answered with a non-success status.
    #[error("could not fetch key set from authority: {0}")]
    FetchError(#[from] reqwest::Error),

    /// The HTTP client used for fetching could not be built.
    #[error("could not build the http client: {0}")]
    ClientError(#[source] reqwest::Error),

    /// An error with an individual key caused the processing of the JWKS to
    /// fail.
    #[error("there was an error with an individual key: {0}")]
    KeyError(#[from] JwkError),
}

/// An error with a specific key from a JWKS.
#[derive(Debug, Error)]
pub enum JwkError {
    /// There was an error constructing the decoding key from the components
    /// provided by the key.
    #[error("could not construct a decoding key for {key_id:?}: {error:?}")]
    DecodingError {
        key_id: String,
        error: jsonwebtoken::errors::Error,
    },
}
