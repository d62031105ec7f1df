use thiserror::Error;

/// Errors surfaced by the upstream faction API and its rate-limited client.
///
/// The client recovers from most of these internally (credential rotation,
/// cooldowns); only the terminal shapes escape a fetch call.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The API rejected the credential used for this call (bad, expired, or
    /// banned key). Recovered by quarantining the key and rotating to another.
    #[error("API key rejected (code {code}): {message}")]
    CredentialRejected { code: u16, message: String },

    /// Every credential in the pool was tried and rejected.
    #[error("All API keys failed. Last error: {last_error}")]
    AllCredentialsFailed { last_error: String },

    /// The credential pool is empty or fully excluded; the call cannot proceed.
    #[error("No API keys available. All keys may have failed.")]
    NoCredentialAvailable,

    /// The upstream provider banned this IP. Fatal and non-retryable; must
    /// propagate to the caller untouched.
    #[error("IP is banned from the upstream API. Contact the provider's support.")]
    IpBanned,

    /// Provider-wide rate limit (not this credential's fault). The client
    /// sleeps a fixed cooldown and retries the same credential.
    #[error("Upstream rate limit hit")]
    UpstreamRateLimit,

    /// Any other application-level error code from the provider.
    #[error("Upstream API error (code {code}): {message}")]
    Upstream { code: u16, message: String },

    /// Non-success HTTP status before the application payload could be read.
    #[error("HTTP {status}")]
    HttpStatus { status: u16 },

    /// Transport-level failure (timeout, connection refused, DNS).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the expected payload shape.
    #[error("Failed to decode API response: {0}")]
    Decode(#[from] serde_json::Error),
}
