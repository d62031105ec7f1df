//! Faction activity collection and aggregation engine.
//!
//! Polls a third-party game API for faction member activity on a fixed
//! 15-minute cadence through a pool of rate-limited API keys, persists
//! per-slot snapshots with incremental aggregates, and answers heatmap and
//! leaderboard queries from the stored data.

pub mod api;
pub mod collector;
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod query;
pub mod ranking;
