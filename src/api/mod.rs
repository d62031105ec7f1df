//! Rate-limited client for the upstream faction API.
//!
//! [`ApiClient`] turns logical requests ("faction N's membership", "ranking
//! page at offset O") into parsed payloads, hiding credential rotation,
//! rate-limit waits, and transient-failure retry behind one fetch loop.

pub mod model;
pub mod ratelimit;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::error::api::ApiError;
use crate::error::retry::ErrorRetryStrategy;

use self::model::{ApiErrorBody, FactionPayload, RankingPage};
use self::ratelimit::RateLimiter;

/// Application error codes signaling a bad, expired, or otherwise rejected
/// key. The credential is quarantined and another is tried.
const KEY_ERROR_CODES: [u16; 4] = [1, 2, 10, 13];
/// Provider-wide rate limit; the credential is not at fault.
const RATE_LIMIT_ERROR_CODE: u16 = 5;
/// The calling IP is banned. Fatal and non-retryable.
const IP_BAN_ERROR_CODE: u16 = 8;

/// Client tunables. Tests shrink the delays and point `base_url` at a mock
/// server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Retry ceiling across credential rotations for one logical request.
    pub retry_attempts: u32,
    /// Fixed backoff between rotation retries.
    pub retry_delay: Duration,
    /// Cooldown after a provider-wide rate-limit response.
    pub rate_limit_cooldown: Duration,
    /// Delay between consecutive ranking pages.
    pub page_fetch_delay: Duration,
    pub ranking_page_size: u32,
    /// Safety cap on total ranking entries fetched in one sweep.
    pub max_ranking_entries: usize,
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.torn.com".to_string(),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
            rate_limit_cooldown: Duration::from_secs(30),
            page_fetch_delay: Duration::from_millis(500),
            ranking_page_size: 100,
            max_ranking_entries: 5_000,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP client for the faction API, sharing one [`RateLimiter`] across all
/// logical callers.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    limiter: Arc<RateLimiter>,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig, limiter: Arc<RateLimiter>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();

        Self {
            http,
            limiter,
            config,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Fetches one faction's membership payload.
    pub async fn fetch_faction(&self, faction_id: i64) -> Result<FactionPayload, ApiError> {
        let url = format!(
            "{}/faction/{}?selections=basic",
            self.config.base_url, faction_id
        );
        let value = self.fetch_with_retry(&url, &format!("faction {faction_id}")).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetches one page of the global faction ranking listing.
    pub async fn fetch_ranking_page(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<RankingPage, ApiError> {
        let url = format!(
            "{}/v2/torn/factionhof?cat=rank&limit={}&offset={}",
            self.config.base_url, limit, offset
        );
        let value = self
            .fetch_with_retry(&url, &format!("ranking offset={offset}"))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// The fetch loop: select a credential, wait out its rate-limit slot,
    /// issue the call, and recover per the error's retry strategy.
    ///
    /// Credential rejections and transport failures quarantine the key and
    /// rotate to another, bounded by the attempt ceiling (and, for rejections,
    /// by pool size so an exhausted pool does not loop). A provider-wide rate
    /// limit sleeps the cooldown and retries the same key without penalty. IP
    /// bans and unknown application errors propagate immediately.
    async fn fetch_with_retry(
        &self,
        url: &str,
        context: &str,
    ) -> Result<serde_json::Value, ApiError> {
        let mut used: HashSet<String> = HashSet::new();
        let mut attempt: u32 = 1;
        let mut last_error: Option<String> = None;

        loop {
            let Some((credential, wait)) = self.limiter.select_credential(&used) else {
                return Err(match last_error {
                    Some(last_error) => ApiError::AllCredentialsFailed { last_error },
                    None => ApiError::NoCredentialAvailable,
                });
            };

            if !wait.is_zero() {
                tracing::debug!(
                    wait_ms = wait.as_millis() as u64,
                    key = %credential.hint(),
                    context,
                    "Waiting for rate limit"
                );
                tokio::time::sleep(wait).await;
            }

            match self.attempt_call(&credential.key, url).await {
                Ok(value) => {
                    self.limiter.clear_quarantine(&credential.key);
                    return Ok(value);
                }
                Err(err) => match err.to_retry_strategy() {
                    ErrorRetryStrategy::RotateCredential => {
                        tracing::warn!(
                            key = %credential.hint(),
                            error = %err,
                            context,
                            "Credential failed, trying next key"
                        );
                        self.limiter.quarantine(&credential.key);
                        used.insert(credential.key.clone());
                        let message = err.to_string();

                        let within_ceiling = attempt < self.config.retry_attempts;
                        let pool_remaining = match err {
                            ApiError::CredentialRejected { .. } => {
                                used.len() < self.limiter.credential_count()
                            }
                            _ => true,
                        };

                        if within_ceiling && pool_remaining {
                            last_error = Some(message);
                            attempt += 1;
                            tokio::time::sleep(self.config.retry_delay).await;
                            continue;
                        }

                        return Err(ApiError::AllCredentialsFailed {
                            last_error: message,
                        });
                    }
                    ErrorRetryStrategy::CooldownSameCredential => {
                        tracing::warn!(
                            cooldown_ms = self.config.rate_limit_cooldown.as_millis() as u64,
                            context,
                            "Upstream rate limit hit, cooling down"
                        );
                        tokio::time::sleep(self.config.rate_limit_cooldown).await;
                        continue;
                    }
                    ErrorRetryStrategy::Fail => return Err(err),
                },
            }
        }
    }

    /// One raw call with one credential: record it against the window, issue
    /// the request, and surface application error envelopes as typed errors.
    async fn attempt_call(&self, key: &str, url: &str) -> Result<serde_json::Value, ApiError> {
        let separator = if url.contains('?') { '&' } else { '?' };
        let full_url = format!("{url}{separator}key={key}");

        self.limiter.record_call(key);

        let response = self.http.get(&full_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let value: serde_json::Value = response.json().await?;

        if let Some(error) = value.get("error") {
            let body: ApiErrorBody = serde_json::from_value(error.clone())?;
            return Err(classify_error_code(body));
        }

        Ok(value)
    }
}

fn classify_error_code(body: ApiErrorBody) -> ApiError {
    if KEY_ERROR_CODES.contains(&body.code) {
        ApiError::CredentialRejected {
            code: body.code,
            message: body.message,
        }
    } else if body.code == RATE_LIMIT_ERROR_CODE {
        ApiError::UpstreamRateLimit
    } else if body.code == IP_BAN_ERROR_CODE {
        ApiError::IpBanned
    } else {
        ApiError::Upstream {
            code: body.code,
            message: body.message,
        }
    }
}
