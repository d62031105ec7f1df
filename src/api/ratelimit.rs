//! Multi-credential adaptive rate limiting.
//!
//! Each API key carries its own calls-per-minute budget, accounted with a
//! sliding 60-second window. Selection always prefers the key with the lowest
//! usage relative to its own limit; keys the upstream API rejected are
//! quarantined for a fixed timeout. All state is owned by the
//! [`RateLimiter`] instance so independent instances can coexist in tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Hard ceiling on any single key's configured calls-per-minute budget.
pub const MAX_CALLS_PER_KEY_PER_MINUTE: u32 = 100;

/// One API key plus its configured per-minute call limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub key: String,
    pub rate_limit: u32,
}

impl Credential {
    /// Last four characters of the key, safe for logs and status output.
    pub fn hint(&self) -> String {
        let tail: String = self
            .key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("...{tail}")
    }
}

/// Per-credential usage snapshot for status reporting. Keys are masked.
#[derive(Debug, Clone)]
pub struct CredentialUsage {
    pub key_hint: String,
    pub calls: u32,
    pub limit: u32,
    pub available: u32,
    pub quarantined: bool,
}

/// Tunables for the limiter. Tests shrink the durations.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Sliding accounting window.
    pub window: Duration,
    /// How long a failed credential stays out of selection.
    pub quarantine_timeout: Duration,
    /// Safety margin added to computed waits so the oldest call has really
    /// left the window by the time the caller retries.
    pub wait_margin: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            quarantine_timeout: Duration::from_secs(5 * 60),
            wait_margin: Duration::from_millis(100),
        }
    }
}

struct RateLimiterState {
    credentials: Vec<Credential>,
    /// Call timestamps per key; entries older than the window are purged on
    /// read, which keeps the log bounded without a sweep task.
    calls: HashMap<String, Vec<Instant>>,
    /// Quarantine timestamps per key.
    failed: HashMap<String, Instant>,
}

/// Sliding-window call accounting and best-credential selection across a pool
/// of independently throttled API keys.
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<RateLimiterState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, credentials: Vec<Credential>) -> Self {
        Self {
            config,
            state: Mutex::new(RateLimiterState {
                credentials,
                calls: HashMap::new(),
                failed: HashMap::new(),
            }),
        }
    }

    /// Appends the current time to the key's call log.
    pub fn record_call(&self, key: &str) {
        let mut state = self.state.lock().unwrap();
        state.calls.entry(key.to_string()).or_default().push(Instant::now());
    }

    /// Purges expired entries and returns the number of calls still inside
    /// the window.
    pub fn call_count_in_window(&self, key: &str) -> u32 {
        let mut state = self.state.lock().unwrap();
        Self::purge_old_calls(&mut state, &self.config, key) as u32
    }

    /// Picks the best credential not in `excluding`, together with how long
    /// the caller must wait before using it.
    ///
    /// Preference order: among non-quarantined, non-excluded keys with a free
    /// slot, the one with the lowest `calls / own_limit` ratio; otherwise the
    /// key whose oldest in-window call expires soonest, with that wait. If
    /// quarantine has removed every candidate, the quarantine map is cleared
    /// wholesale and the first non-excluded key is returned with zero wait -
    /// risking one more failure beats deadlocking the collector. Returns
    /// `None` only when the pool is empty or fully excluded.
    pub fn select_credential(&self, excluding: &HashSet<String>) -> Option<(Credential, Duration)> {
        let mut state = self.state.lock().unwrap();

        if state.credentials.is_empty() {
            return None;
        }

        // Expired quarantines clear on read.
        let now = Instant::now();
        let quarantine_timeout = self.config.quarantine_timeout;
        state
            .failed
            .retain(|_, failed_at| now.duration_since(*failed_at) < quarantine_timeout);

        let available: Vec<Credential> = state
            .credentials
            .iter()
            .filter(|c| !excluding.contains(&c.key) && !state.failed.contains_key(&c.key))
            .cloned()
            .collect();

        if available.is_empty() {
            if !state.failed.is_empty() {
                state.failed.clear();
                let first = state
                    .credentials
                    .iter()
                    .find(|c| !excluding.contains(&c.key))
                    .cloned();
                return first.map(|c| (c, Duration::ZERO));
            }
            return None;
        }

        let mut best: Option<(Credential, Duration)> = None;
        let mut lowest_usage = f64::INFINITY;
        let mut lowest_wait = Duration::MAX;

        for credential in available {
            let count = Self::purge_old_calls(&mut state, &self.config, &credential.key);
            let usage_ratio = count as f64 / credential.rate_limit.max(1) as f64;
            let wait = Self::wait_for_slot(&state, &self.config, &credential, count);

            if wait.is_zero() && usage_ratio < lowest_usage {
                lowest_usage = usage_ratio;
                lowest_wait = Duration::ZERO;
                best = Some((credential, Duration::ZERO));
            } else if lowest_wait > Duration::ZERO && wait < lowest_wait {
                lowest_wait = wait;
                best = Some((credential, wait));
            }
        }

        best
    }

    /// Marks a credential failed; it re-enters selection after the quarantine
    /// timeout elapses.
    pub fn quarantine(&self, key: &str) {
        let mut state = self.state.lock().unwrap();
        state.failed.insert(key.to_string(), Instant::now());
    }

    /// Removes a credential from quarantine after an observed success.
    pub fn clear_quarantine(&self, key: &str) {
        let mut state = self.state.lock().unwrap();
        state.failed.remove(key);
    }

    pub fn is_quarantined(&self, key: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();
        let quarantine_timeout = self.config.quarantine_timeout;
        state
            .failed
            .retain(|_, failed_at| now.duration_since(*failed_at) < quarantine_timeout);
        state.failed.contains_key(key)
    }

    pub fn add_credential(&self, mut credential: Credential) {
        credential.rate_limit = credential.rate_limit.min(MAX_CALLS_PER_KEY_PER_MINUTE);
        let mut state = self.state.lock().unwrap();
        if !state.credentials.iter().any(|c| c.key == credential.key) {
            state.credentials.push(credential);
        }
    }

    /// Removes a credential and its transient state. Returns whether the key
    /// was present.
    pub fn remove_credential(&self, key: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        let before = state.credentials.len();
        state.credentials.retain(|c| c.key != key);
        state.calls.remove(key);
        state.failed.remove(key);
        state.credentials.len() != before
    }

    pub fn credential_count(&self) -> usize {
        self.state.lock().unwrap().credentials.len()
    }

    /// Masked per-credential usage for status output.
    pub fn usage_status(&self) -> Vec<CredentialUsage> {
        let mut state = self.state.lock().unwrap();
        let credentials: Vec<Credential> = state.credentials.clone();

        credentials
            .iter()
            .map(|credential| {
                let calls = Self::purge_old_calls(&mut state, &self.config, &credential.key) as u32;
                CredentialUsage {
                    key_hint: credential.hint(),
                    calls,
                    limit: credential.rate_limit,
                    available: credential.rate_limit.saturating_sub(calls),
                    quarantined: state.failed.contains_key(&credential.key),
                }
            })
            .collect()
    }

    /// Rough full-cycle duration estimate in seconds, from the pool's summed
    /// per-minute budgets. `None` when the pool is empty.
    pub fn estimate_collection_time(&self, faction_count: usize) -> Option<u64> {
        let state = self.state.lock().unwrap();
        let total_calls_per_minute: u32 = state.credentials.iter().map(|c| c.rate_limit).sum();
        if total_calls_per_minute == 0 {
            return None;
        }
        let minutes = faction_count as f64 / total_calls_per_minute as f64;
        Some((minutes * 60.0).ceil() as u64)
    }

    fn purge_old_calls(
        state: &mut RateLimiterState,
        config: &RateLimitConfig,
        key: &str,
    ) -> usize {
        let now = Instant::now();
        match state.calls.get_mut(key) {
            Some(calls) => {
                calls.retain(|t| now.duration_since(*t) < config.window);
                calls.len()
            }
            None => 0,
        }
    }

    /// Time until the key's oldest in-window call leaves the window, or zero
    /// when a slot is free right now.
    fn wait_for_slot(
        state: &RateLimiterState,
        config: &RateLimitConfig,
        credential: &Credential,
        in_window: usize,
    ) -> Duration {
        if (in_window as u32) < credential.rate_limit {
            return Duration::ZERO;
        }

        let oldest = state
            .calls
            .get(&credential.key)
            .and_then(|calls| calls.iter().min())
            .copied();

        match oldest {
            Some(oldest) => {
                let age = Instant::now().duration_since(oldest);
                config.window.saturating_sub(age) + config.wait_margin
            }
            None => Duration::ZERO,
        }
    }
}
