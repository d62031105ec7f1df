//! Error types for the factionpulse engine.
//!
//! Domain-specific error types (API, configuration) are aggregated into a
//! single unified [`Error`] using `thiserror`'s `#[from]` conversions so `?`
//! works across layer boundaries.

pub mod api;
pub mod config;
pub mod retry;

use thiserror::Error;

use crate::error::{api::ApiError, config::ConfigError};

/// Main error type for the factionpulse engine.
///
/// # Error Categories
/// - Upstream API errors (credential failures, rate limiting, IP bans)
/// - Configuration errors (missing or invalid environment variables)
/// - Database errors (query failures, constraint violations)
/// - Cron scheduler errors (job registration, scheduler startup)
#[derive(Error, Debug)]
pub enum Error {
    /// Upstream API error (credential rotation exhausted, IP ban, transport).
    #[error(transparent)]
    ApiError(#[from] ApiError),
    /// Configuration error (missing or invalid environment variables).
    #[error(transparent)]
    ConfigError(#[from] ConfigError),
    /// Database error (query failures, connection issues, constraint violations).
    #[error(transparent)]
    DbErr(#[from] sea_orm::DbErr),
    /// Cron scheduler error (job registration, scheduler startup).
    #[error(transparent)]
    SchedulerError(#[from] tokio_cron_scheduler::JobSchedulerError),
}
