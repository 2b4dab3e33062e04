use serde::{de, Deserialize, Deserializer};

/// Where the GitHub Actions token service publishes its signing keys.
pub const GITHUB_ACTIONS_JWKS_URL: &str =
    "https://token.actions.githubusercontent.com/.well-known/jwks";

/// The `iss` claim carried by every GitHub Actions OIDC token.
pub const GITHUB_ACTIONS_ISSUER: &str = "https://token.actions.githubusercontent.com";

/// Largest clock skew a validator will tolerate, in seconds.
pub const MAX_LEEWAY_SECS: u64 = 300;

/// How long the key-set fetch may take before it is abandoned, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// The trust anchor a [`TokenValidator`](crate::TokenValidator) checks tokens
/// against.
///
/// The default points at the GitHub Actions token service.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorConfig {
    /// Endpoint the JSON Web Key Set is fetched from.
    pub jwks_url: String,

    /// Value the `iss` claim must equal exactly.
    pub expected_issuer: String,

    /// Clock skew tolerated on `exp`, `nbf` and `iat`, in seconds. At most
    /// [`MAX_LEEWAY_SECS`].
    #[serde(deserialize_with = "deserialize_leeway")]
    pub leeway_secs: u64,

    /// Timeout for fetching the key set, in seconds.
    pub timeout_secs: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            jwks_url: GITHUB_ACTIONS_JWKS_URL.to_string(),
            expected_issuer: GITHUB_ACTIONS_ISSUER.to_string(),
            leeway_secs: 0,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ValidatorConfig {
    pub fn with_jwks_url(mut self, jwks_url: impl Into<String>) -> Self {
        self.jwks_url = jwks_url.into();
        self
    }

    pub fn with_expected_issuer(mut self, expected_issuer: impl Into<String>) -> Self {
        self.expected_issuer = expected_issuer.into();
        self
    }

    /// Values above [`MAX_LEEWAY_SECS`] are clamped.
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs.min(MAX_LEEWAY_SECS);
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// The leeway actually applied, clamped for configs built field by field.
    pub(crate) fn leeway(&self) -> u64 {
        self.leeway_secs.min(MAX_LEEWAY_SECS)
    }
}

fn deserialize_leeway<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let leeway_secs = u64::deserialize(deserializer)?;
    if leeway_secs > MAX_LEEWAY_SECS {
        return Err(de::Error::custom(format!(
            "leewaySecs must be at most {MAX_LEEWAY_SECS}, got {leeway_secs}"
        )));
    }
    Ok(leeway_secs)
}
