//! Verification of GitHub Actions OIDC tokens.
//!
//! A [`TokenValidator`] fetches the issuer's JSON Web Key Set, picks the key
//! named by the token's `kid`, and checks the signature, the `iss` claim and
//! the time claims before handing back the payload.

mod config;
mod jwks;
mod validator;

pub use config::{
    ValidatorConfig, DEFAULT_TIMEOUT_SECS, GITHUB_ACTIONS_ISSUER, GITHUB_ACTIONS_JWKS_URL,
    MAX_LEEWAY_SECS,
};
pub use jwks::{Jwk, JwkError, Jwks, JwksError};
pub use validator::{ClaimSet, TokenValidator, ValidationError};
