#![allow(dead_code)]

use actions_oidc_verify::{TokenValidator, ValidatorConfig, GITHUB_ACTIONS_ISSUER};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use mockito::{Mock, ServerGuard};
use serde_json::{json, Value};

pub const JWKS_PATH: &str = "/.well-known/jwks";
pub const RSA_KID: &str = "rsa-test-key";
pub const EC_KID: &str = "ec-test-key";

const JWKS: &str = include_str!("../fixtures/jwks.json");
const RSA_PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/rsa_private.pem");
const RSA_OTHER_PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/rsa_other.pem");
const EC_PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/ec_private.pem");

pub fn now() -> u64 {
    jsonwebtoken::get_current_timestamp()
}

/// Claims shaped like the ones the GitHub Actions token service mints.
pub fn github_claims() -> Value {
    let now = now();
    json!({
        "jti": "6f4762ed-0758-4ccb-808d-ee3af5d723a8",
        "sub": "repo:octo-org/octo-repo:ref:refs/heads/main",
        "aud": "https://github.com/octo-org",
        "ref": "refs/heads/main",
        "sha": "example-sha",
        "repository": "octo-org/octo-repo",
        "repository_owner": "octo-org",
        "run_id": "2342",
        "run_attempt": "1",
        "actor": "octocat",
        "workflow": "ci",
        "event_name": "push",
        "ref_protected": true,
        "runner_environment": "github-hosted",
        "iss": GITHUB_ACTIONS_ISSUER,
        "nbf": now - 5,
        "iat": now - 5,
        "exp": now + 300
    })
}

pub fn sign_rs256(kid: Option<&str>, claims: &Value) -> String {
    let key = EncodingKey::from_rsa_pem(RSA_PRIVATE_KEY).expect("rsa key");
    sign(Algorithm::RS256, kid, claims, &key)
}

/// Signs with an RSA key that is not part of the published key set.
pub fn sign_rs256_with_other_key(kid: Option<&str>, claims: &Value) -> String {
    let key = EncodingKey::from_rsa_pem(RSA_OTHER_PRIVATE_KEY).expect("rsa key");
    sign(Algorithm::RS256, kid, claims, &key)
}

pub fn sign_es256(kid: Option<&str>, claims: &Value) -> String {
    let key = EncodingKey::from_ec_pem(EC_PRIVATE_KEY).expect("ec key");
    sign(Algorithm::ES256, kid, claims, &key)
}

fn sign(alg: Algorithm, kid: Option<&str>, claims: &Value, key: &EncodingKey) -> String {
    let mut header = Header::new(alg);
    header.kid = kid.map(str::to_string);
    encode(&header, claims, key).expect("token")
}

/// Starts a server publishing the fixture key set, expecting `hits` requests.
pub async fn jwks_server(hits: usize) -> (ServerGuard, Mock) {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", JWKS_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(JWKS)
        .expect(hits)
        .create_async()
        .await;
    (server, mock)
}

pub fn validator_for(server: &ServerGuard) -> TokenValidator {
    TokenValidator::new(config_for(server)).expect("validator")
}

pub fn config_for(server: &ServerGuard) -> ValidatorConfig {
    ValidatorConfig::default().with_jwks_url(format!("{}{}", server.url(), JWKS_PATH))
}
