use service_core::error::AppError;
use std::fmt;
use thiserror::Error;

use crate::models::IdentifierError;
use crate::services::identity_provider::IdpError;
use crate::services::user_directory::DirectoryError;

/// The orchestrated operation an upstream failure happened in. The same
/// upstream signal means different things in different operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOperation {
    Signup,
    Verify,
    Login,
}

impl AuthOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthOperation::Signup => "signup",
            AuthOperation::Verify => "verify",
            AuthOperation::Login => "login",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            AuthOperation::Signup => "Unable to complete signup",
            AuthOperation::Verify => "Unable to complete verification",
            AuthOperation::Login => "Unable to complete login",
        }
    }
}

impl fmt::Display for AuthOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain error returned by every orchestrator.
///
/// Display strings are stable and caller-safe. Upstream details travel
/// only as the `source` chain.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("An account with this email or phone number already exists")]
    AccountAlreadyExists,

    #[error("Verification failed: the code is invalid or has expired")]
    VerificationFailed,

    #[error("Invalid email/phone number or password")]
    InvalidCredentials,

    #[error("Authentication service is temporarily unavailable, please try again later")]
    UpstreamUnavailable {
        #[source]
        source: anyhow::Error,
    },

    #[error("{}", .operation.failure_message())]
    Internal {
        operation: AuthOperation,
        #[source]
        source: anyhow::Error,
    },
}

impl AuthError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        AuthError::InvalidInput(message.into())
    }

    pub fn internal(operation: AuthOperation, source: anyhow::Error) -> Self {
        AuthError::Internal { operation, source }
    }

    /// Translate an identity provider failure for the given operation.
    pub fn from_idp(operation: AuthOperation, err: IdpError) -> Self {
        use AuthOperation::{Login, Signup, Verify};

        match (operation, err) {
            (Signup, IdpError::UsernameExists) => AuthError::AccountAlreadyExists,
            (Signup, IdpError::InvalidPassword(_)) => {
                AuthError::invalid_input("Password does not satisfy the password policy")
            }
            (Signup, IdpError::InvalidParameter(_)) => {
                AuthError::invalid_input("One or more signup attributes were rejected")
            }
            (
                Verify,
                IdpError::CodeMismatch
                | IdpError::ExpiredCode
                | IdpError::NotAuthorized(_)
                | IdpError::UserNotFound,
            ) => AuthError::VerificationFailed,
            (
                Login,
                IdpError::NotAuthorized(_) | IdpError::UserNotFound | IdpError::UserNotConfirmed,
            ) => AuthError::InvalidCredentials,
            (
                _,
                err @ (IdpError::InternalError
                | IdpError::Timeout
                | IdpError::Transport(_)
                | IdpError::TooManyRequests),
            ) => AuthError::UpstreamUnavailable {
                source: anyhow::Error::new(err),
            },
            (operation, err) => {
                tracing::warn!(
                    operation = %operation,
                    upstream_code = %err.code(),
                    "Unexpected identity provider error"
                );
                AuthError::internal(operation, anyhow::Error::new(err))
            }
        }
    }

    /// Translate a user directory failure for the given operation.
    pub fn from_directory(operation: AuthOperation, err: DirectoryError) -> Self {
        match err {
            DirectoryError::Unavailable(_) => AuthError::UpstreamUnavailable {
                source: anyhow::Error::new(err),
            },
            other => AuthError::internal(operation, anyhow::Error::new(other)),
        }
    }

    /// Label for the operation outcome metric.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidInput(_) => "invalid_input",
            AuthError::AccountAlreadyExists => "account_already_exists",
            AuthError::VerificationFailed => "verification_failed",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::UpstreamUnavailable { .. } => "upstream_unavailable",
            AuthError::Internal { .. } => "internal_error",
        }
    }
}

impl From<IdentifierError> for AuthError {
    fn from(err: IdentifierError) -> Self {
        AuthError::InvalidInput(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::InvalidInput(_) | AuthError::VerificationFailed => {
                AppError::BadRequest(message)
            }
            AuthError::AccountAlreadyExists => AppError::Conflict(message),
            AuthError::InvalidCredentials => AppError::Unauthorized(message),
            AuthError::UpstreamUnavailable { source } => {
                tracing::error!(error = ?source, "Upstream dependency unavailable");
                AppError::ServiceUnavailable(message)
            }
            AuthError::Internal { source, .. } => AppError::internal(message, source),
        }
    }
}
