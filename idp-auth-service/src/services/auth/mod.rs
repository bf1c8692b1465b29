//! Signup, verification and login orchestration.
//!
//! Each operation resolves the account identifier, derives the secret hash
//! for it and drives the identity provider (and, for login, the user
//! directory) through the trait seams in [`crate::services`].

mod login;
mod signup;
mod verification;

use std::sync::Arc;

use crate::models::Identifier;
use crate::services::error::{AuthError, AuthOperation};
use crate::services::identity_provider::IdentityProvider;
use crate::services::metrics;
use crate::services::user_directory::UserDirectory;
use crate::utils::SecretHasher;

pub use signup::{confirmation_message, signup_attributes};
pub use verification::VerificationOutcome;

#[derive(Clone)]
pub struct AuthService {
    idp: Arc<dyn IdentityProvider>,
    directory: Arc<dyn UserDirectory>,
    hasher: SecretHasher,
    register_on_verify: bool,
}

impl AuthService {
    pub fn new(
        idp: Arc<dyn IdentityProvider>,
        directory: Arc<dyn UserDirectory>,
        hasher: SecretHasher,
    ) -> Self {
        Self {
            idp,
            directory,
            hasher,
            register_on_verify: false,
        }
    }

    /// Register confirmed accounts with the user directory.
    pub fn with_directory_registration(mut self, enabled: bool) -> Self {
        self.register_on_verify = enabled;
        self
    }

    fn secret_hash(
        &self,
        operation: AuthOperation,
        identifier: &Identifier,
    ) -> Result<String, AuthError> {
        self.hasher
            .hash(identifier.username())
            .map_err(|e| AuthError::internal(operation, e))
    }
}

fn resolve_identifier(
    email: Option<&str>,
    phone_number: Option<&str>,
) -> Result<Identifier, AuthError> {
    let identifier = Identifier::resolve(email, phone_number)?;
    tracing::Span::current().record("identifier", tracing::field::display(&identifier));
    Ok(identifier)
}

fn record_outcome<T>(operation: AuthOperation, result: &Result<T, AuthError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(err) => err.kind(),
    };
    metrics::record_auth_outcome(operation.as_str(), outcome);
}
