//! Unified error types for the salary engine.
//!
//! Business-rule failures (validation, conflict, not found, archived period) are
//! surfaced verbatim to callers; infrastructure failures wrap their source error.

use thiserror::Error;

/// Every failure the crate can report.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more input values broke a business rule. All violations are listed.
    #[error("Validation failed: {}", violations.join("; "))]
    Validation {
        /// Human-readable description of every violation found
        violations: Vec<String>,
    },

    /// The operation would duplicate something that must be unique.
    #[error("Conflict: {message}")]
    Conflict {
        /// What collided
        message: String,
    },

    /// A record or period does not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// What was missing
        message: String,
    },

    /// A write was attempted against an archived period.
    #[error("Period {period} is archived and can no longer be modified")]
    ArchivedPeriod {
        /// The offending period
        period: String,
    },

    /// A period string did not match `YYYY-MM`.
    #[error("Invalid period '{period}', expected YYYY-MM")]
    InvalidPeriod {
        /// The rejected input
        period: String,
    },

    /// An optimistic-concurrency check failed.
    #[error("Salary record {id} was modified concurrently (expected version {expected})")]
    StaleVersion {
        /// Record id
        id: i64,
        /// Version the caller based its edit on
        expected: i32,
    },

    /// Process configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// Details
        message: String,
    },

    /// Database failure.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Stored JSON could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Environment variable missing or malformed.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Formatting into a `String` failed.
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Serenity/Poise framework error.
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl Error {
    /// HTTP-class status code for this error, so any outer surface can report it as-is.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::ArchivedPeriod { .. } | Self::InvalidPeriod { .. } => {
                400
            }
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } | Self::StaleVersion { .. } => 409,
            Self::Config { .. }
            | Self::Database(_)
            | Self::Json(_)
            | Self::EnvVar(_)
            | Self::Io(_)
            | Self::Fmt(_)
            | Self::Framework(_) => 500,
        }
    }

    /// Shorthand for a single-message validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            violations: vec![message.into()],
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
