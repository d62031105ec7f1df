//! Status and result types surfaced by the collector.

use serde::Serialize;

use crate::api::ratelimit::CredentialUsage;

/// Outcome of one collection cycle. A failed faction never aborts the cycle;
/// its error lands here instead.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionResult {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<FactionError>,
    /// Unix seconds.
    pub started_at: i64,
    pub finished_at: i64,
}

impl CollectionResult {
    pub fn attempted(&self) -> usize {
        self.success + self.failed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FactionError {
    pub faction_id: i64,
    pub error: String,
}

/// Point-in-time view of the collector, safe to serialize outward. Credential
/// keys are masked.
#[derive(Debug, Clone, Serialize)]
pub struct CollectorStatus {
    pub running: bool,
    pub collecting: bool,
    pub faction_count: usize,
    pub credential_count: usize,
    /// Projected seconds for a full cycle at current pool capacity; absent
    /// when no credentials are loaded.
    pub estimated_collection_seconds: Option<u64>,
    /// Seconds until the next slot boundary fires.
    pub next_slot_eta_seconds: i64,
    pub last_collection: Option<CollectionResult>,
    pub credentials: Vec<CredentialStatus>,
}

/// Masked per-credential usage for the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialStatus {
    /// Last four characters only.
    pub key_hint: String,
    pub calls_in_window: u32,
    pub rate_limit: u32,
    pub available: u32,
    pub quarantined: bool,
}

impl From<CredentialUsage> for CredentialStatus {
    fn from(usage: CredentialUsage) -> Self {
        Self {
            key_hint: usage.key_hint,
            calls_in_window: usage.calls,
            rate_limit: usage.limit,
            available: usage.available,
            quarantined: usage.quarantined,
        }
    }
}
