//! Wire payloads for the upstream faction API.
//!
//! Only the fields the engine needs are modeled: member ids with last-action
//! timestamps from the faction endpoint, and id/name/members/position/rank
//! plus a pagination indicator from the ranking endpoint.

use std::collections::HashMap;

use serde::Deserialize;

use crate::collector::slot;

/// Application-level error envelope: `{ "error": { "code": .., "error": .. } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: u16,
    #[serde(rename = "error")]
    pub message: String,
}

/// Faction payload from `/faction/{id}?selections=basic`.
#[derive(Debug, Clone, Deserialize)]
pub struct FactionPayload {
    pub name: String,
    #[serde(default)]
    pub members: HashMap<String, FactionMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FactionMember {
    pub name: String,
    #[serde(default)]
    pub last_action: Option<LastAction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LastAction {
    pub timestamp: i64,
}

/// Active member set derived from one faction payload at one poll time.
#[derive(Debug, Clone)]
pub struct ActivitySnapshot {
    /// Members whose last action falls inside the poll's 15-minute slot.
    pub active: Vec<i64>,
    /// Total member count at poll time.
    pub total: i32,
}

impl FactionPayload {
    /// Judges which members are active for the slot containing
    /// `poll_timestamp`: a member counts as active when their last observed
    /// action is at or after the slot start.
    ///
    /// Member ids that fail to parse as integers are skipped.
    pub fn activity_snapshot(&self, poll_timestamp: i64) -> ActivitySnapshot {
        let slot_start = slot::slot_start(poll_timestamp);
        let mut active = Vec::new();

        for (member_id, member) in &self.members {
            let Ok(id) = member_id.parse::<i64>() else {
                continue;
            };

            let last_action = member.last_action.as_ref().map(|a| a.timestamp).unwrap_or(0);
            if last_action >= slot_start {
                active.push(id);
            }
        }

        ActivitySnapshot {
            active,
            total: self.members.len() as i32,
        }
    }

    /// All (member id, display name) pairs in the payload, for opportunistic
    /// identity upserts.
    pub fn member_names(&self) -> Vec<(i64, String)> {
        self.members
            .iter()
            .filter_map(|(id, member)| {
                id.parse::<i64>().ok().map(|id| (id, member.name.clone()))
            })
            .collect()
    }
}

/// One page of the global faction ranking listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RankingPage {
    #[serde(rename = "factionhof", default)]
    pub entries: Vec<RankingEntry>,
    #[serde(rename = "_metadata", default)]
    pub metadata: Option<RankingMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingEntry {
    pub id: i64,
    pub name: String,
    pub members: i32,
    pub position: i32,
    pub rank: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingMetadata {
    #[serde(default)]
    pub links: Option<RankingLinks>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingLinks {
    #[serde(default)]
    pub next: Option<String>,
}

impl RankingPage {
    /// Whether the provider advertises a further page.
    pub fn has_next(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.links.as_ref())
            .and_then(|l| l.next.as_ref())
            .is_some()
    }
}
