//! Organisation-scoped short codes.
//!
//! Trips, payments and invoices carry a six digit code that is unique
//! within the organisation. Codes are drawn at random and re-drawn while
//! the target collection already holds one; the store's unique index is
//! the backstop for two concurrent draws landing on the same code.

use std::future::Future;

use haulage_shared::AppError;
use haulage_shared::config::IdentifierConfig;
use rand::Rng;
use rand::distr::Alphanumeric;
use thiserror::Error;

/// Length of invoice share tokens.
pub const SHARE_TOKEN_LEN: usize = 32;

/// Errors raised while drawing codes.
#[derive(Debug, Error)]
pub enum IdentifierError {
    /// Every draw collided.
    #[error("No free code found after {attempts} attempts")]
    Exhausted {
        /// Draws made.
        attempts: u32,
    },

    /// `min > max` or no attempts allowed.
    #[error("Invalid code range {min}..={max} with {attempts} attempts")]
    InvalidRange {
        /// Lower bound.
        min: u64,
        /// Upper bound.
        max: u64,
        /// Attempts allowed.
        attempts: u32,
    },
}

impl IdentifierError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        500
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Exhausted { .. } => "CODE_SPACE_EXHAUSTED",
            Self::InvalidRange { .. } => "INVALID_CODE_RANGE",
        }
    }
}

impl From<IdentifierError> for AppError {
    fn from(err: IdentifierError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Draws random numeric codes from an inclusive range.
#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator {
    min: u64,
    max: u64,
    max_attempts: u32,
}

impl CodeGenerator {
    /// Creates a generator, rejecting an empty range or zero attempts.
    pub fn new(min: u64, max: u64, max_attempts: u32) -> Result<Self, IdentifierError> {
        if min > max || max_attempts == 0 {
            return Err(IdentifierError::InvalidRange {
                min,
                max,
                attempts: max_attempts,
            });
        }
        Ok(Self {
            min,
            max,
            max_attempts,
        })
    }

    /// Creates a generator from configuration.
    pub fn from_config(config: &IdentifierConfig) -> Result<Self, IdentifierError> {
        Self::new(config.min, config.max, config.max_attempts)
    }

    /// One random code.
    #[must_use]
    pub fn draw(&self) -> String {
        rand::rng().random_range(self.min..=self.max).to_string()
    }

    /// Draws until `exists` reports a free code.
    ///
    /// `exists` is awaited once per draw. Lookup errors are returned as-is;
    /// running out of attempts is an [`IdentifierError::Exhausted`].
    pub async fn generate<F, Fut, E>(&self, mut exists: F) -> Result<String, E>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<bool, E>>,
        E: From<IdentifierError>,
    {
        for _ in 0..self.max_attempts {
            let code = self.draw();
            if !exists(code.clone()).await? {
                return Ok(code);
            }
        }
        Err(IdentifierError::Exhausted {
            attempts: self.max_attempts,
        }
        .into())
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        let config = IdentifierConfig::default();
        Self {
            min: config.min,
            max: config.max,
            max_attempts: config.max_attempts,
        }
    }
}

/// Random alphanumeric token for invoice share links.
#[must_use]
pub fn share_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SHARE_TOKEN_LEN)
        .map(char::from)
        .collect()
}
