//! Error handling for the governance jobs
//!
//! This module defines all error types that can occur while running the
//! tagging and cleanup jobs and provides conversions from the underlying
//! transport, templating, and configuration errors.

use thiserror::Error;

/// Result type alias for governance operations
pub type Result<T> = std::result::Result<T, GovernanceError>;

/// Main error type for the governance jobs
#[derive(Error, Debug)]
pub enum GovernanceError {
    /// Authentication/token acquisition errors
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Management API errors (listing groups, writing tags, activity log)
    #[error("Provider error: {message}")]
    Provider { message: String },

    /// Email delivery errors
    #[error("Email error: {message}")]
    Email { message: String },

    /// Template fetch or render errors
    #[error("Template error: {message}")]
    Template { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    /// Network/connection errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Timeout errors
    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Unparseable date values found in tags or CLI input
    #[error("Date parse error: {value}")]
    DateParse { value: String },
}

impl GovernanceError {
    /// Create an authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a provider error
    pub fn provider<S: Into<String>>(message: S) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Create an email error
    pub fn email<S: Into<String>>(message: S) -> Self {
        Self::Email {
            message: message.into(),
        }
    }

    /// Create a template error
    pub fn template<S: Into<String>>(message: S) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation<S1: Into<String>, S2: Into<String>>(field: S1, message: S2) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a date parse error
    pub fn date_parse<S: Into<String>>(value: S) -> Self {
        Self::DateParse {
            value: value.into(),
        }
    }
}

// Conversion implementations for external error types

impl From<reqwest::Error> for GovernanceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GovernanceError::Timeout {
                operation: "HTTP request".to_string(),
            }
        } else if err.is_connect() {
            GovernanceError::Network {
                message: err.to_string(),
            }
        } else {
            GovernanceError::Provider {
                message: err.to_string(),
            }
        }
    }
}

impl From<lettre::error::Error> for GovernanceError {
    fn from(err: lettre::error::Error) -> Self {
        GovernanceError::Email {
            message: err.to_string(),
        }
    }
}

impl From<lettre::transport::smtp::Error> for GovernanceError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        GovernanceError::Email {
            message: err.to_string(),
        }
    }
}

impl From<lettre::address::AddressError> for GovernanceError {
    fn from(err: lettre::address::AddressError) -> Self {
        GovernanceError::Email {
            message: err.to_string(),
        }
    }
}

impl From<handlebars::RenderError> for GovernanceError {
    fn from(err: handlebars::RenderError) -> Self {
        GovernanceError::Template {
            message: err.to_string(),
        }
    }
}

impl From<handlebars::TemplateError> for GovernanceError {
    fn from(err: handlebars::TemplateError) -> Self {
        GovernanceError::Template {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for GovernanceError {
    fn from(err: config::ConfigError) -> Self {
        GovernanceError::Config {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for GovernanceError {
    fn from(err: serde_json::Error) -> Self {
        GovernanceError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<regex::Error> for GovernanceError {
    fn from(err: regex::Error) -> Self {
        GovernanceError::Config {
            message: format!("invalid ignore pattern: {}", err),
        }
    }
}
