//! Error types for the cache core.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("invalid capacity: {message}")]
    InvalidCapacity { message: String },

    #[error("invalid ttl: {message}")]
    InvalidTtl { message: String },

    #[error("misconfigured policy: {message}")]
    MisconfiguredPolicy { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl CacheError {
    pub fn invalid_capacity(message: impl Into<String>) -> Self {
        Self::InvalidCapacity { message: message.into() }
    }

    pub fn invalid_ttl(message: impl Into<String>) -> Self {
        Self::InvalidTtl { message: message.into() }
    }

    pub fn misconfigured_policy(message: impl Into<String>) -> Self {
        Self::MisconfiguredPolicy { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}
