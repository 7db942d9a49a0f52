//! Error taxonomy for EventHub operations.

use crate::authorization::DenyReason;
use crate::roster::Rejection;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for EventHub operations.
pub type Result<T> = std::result::Result<T, EventHubError>;

/// Every failure an EventHub operation can report.
///
/// Callers that only need the coarse category (for choosing a response
/// status, for example) use [`EventHubError::kind`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventHubError {
    // ═══════════════════════════════════════════════════════════
    // Authentication / Authorization
    // ═══════════════════════════════════════════════════════════
    /// The operation needs an authenticated principal.
    #[error("Login required")]
    Unauthorized,

    /// The Authorization Gate denied the action.
    #[error("Forbidden: {0}")]
    Forbidden(DenyReason),

    /// Login failed: unknown account or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Login refused for a deactivated account.
    #[error("Account is disabled")]
    AccountDisabled,

    // ═══════════════════════════════════════════════════════════
    // Domain
    // ═══════════════════════════════════════════════════════════
    /// Referenced entity does not exist.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of entity ("event", "identity", ...)
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The Registration Engine refused the transition.
    #[error("Rejected: {0}")]
    Rejected(Rejection),

    /// A uniqueness constraint would be violated.
    #[error("Conflict: {0}")]
    Conflict(ConflictReason),

    /// Input failed field validation.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    // ═══════════════════════════════════════════════════════════
    // System
    // ═══════════════════════════════════════════════════════════
    /// The backing store failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl EventHubError {
    /// Shorthand for a missing event.
    #[must_use]
    pub fn event_not_found(id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource: "event",
            id: id.to_string(),
        }
    }

    /// Shorthand for a missing identity.
    #[must_use]
    pub fn identity_not_found(id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource: "identity",
            id: id.to_string(),
        }
    }

    /// Coarse category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized | Self::InvalidCredentials | Self::AccountDisabled => {
                ErrorKind::Unauthorized
            }
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Rejected(_) | Self::Conflict(_) => ErrorKind::Conflict,
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// The engine rejection, if this is one.
    #[must_use]
    pub const fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Rejected(rejection) => Some(*rejection),
            _ => None,
        }
    }
}

impl From<DenyReason> for EventHubError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::LoginRequired => Self::Unauthorized,
            other => Self::Forbidden(other),
        }
    }
}

impl From<Rejection> for EventHubError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::LoginRequired => Self::Unauthorized,
            Rejection::InvalidSchedule => Self::ValidationFailed(
                "Registration deadline must be before the event date".to_string(),
            ),
            other => Self::Rejected(other),
        }
    }
}

/// Coarse error category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Not logged in or bad credentials
    Unauthorized,
    /// Logged in but not allowed
    Forbidden,
    /// Missing entity
    NotFound,
    /// State conflict (engine rejection or uniqueness)
    Conflict,
    /// Bad input
    ValidationFailed,
    /// Infrastructure failure
    Internal,
}

/// Which uniqueness constraint a write would violate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Username already taken
    UsernameTaken,
    /// Email already registered
    EmailTaken,
    /// A concurrent write produced a second active registration
    DuplicateRegistration,
}

impl ConflictReason {
    /// Stable snake_case code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UsernameTaken => "username_taken",
            Self::EmailTaken => "email_taken",
            Self::DuplicateRegistration => "duplicate_registration",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
