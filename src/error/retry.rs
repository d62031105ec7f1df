use super::api::ApiError;

/// Strategy for handling an API error inside the client's retry loop.
pub enum ErrorRetryStrategy {
    /// Quarantine the credential that made the call and retry on another.
    RotateCredential,
    /// Sleep the provider cooldown and retry the same credential.
    CooldownSameCredential,
    /// Failed permanently; propagate to the caller.
    Fail,
}

impl ApiError {
    /// Determine the retry strategy for an error observed mid-fetch.
    pub fn to_retry_strategy(&self) -> ErrorRetryStrategy {
        match self {
            // Key-level rejections - the credential is at fault, rotate away
            // from it.
            Self::CredentialRejected { .. } => ErrorRetryStrategy::RotateCredential,

            // Transport failures and bad HTTP statuses - could be a stale key
            // routing issue or a flaky path, treat like a key failure and
            // rotate.
            Self::Transport(_) => ErrorRetryStrategy::RotateCredential,
            Self::HttpStatus { .. } => ErrorRetryStrategy::RotateCredential,

            // Provider-wide throttle - no credential is at fault.
            Self::UpstreamRateLimit => ErrorRetryStrategy::CooldownSameCredential,

            // IP bans are terminal for every credential behind this address.
            Self::IpBanned => ErrorRetryStrategy::Fail,

            // Unknown application errors indicate a request flaw, not a
            // transient condition.
            Self::Upstream { .. } => ErrorRetryStrategy::Fail,
            Self::Decode(_) => ErrorRetryStrategy::Fail,

            // Terminal summaries produced by the retry loop itself.
            Self::AllCredentialsFailed { .. } => ErrorRetryStrategy::Fail,
            Self::NoCredentialAvailable => ErrorRetryStrategy::Fail,
        }
    }
}
