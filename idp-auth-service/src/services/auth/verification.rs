use tracing::instrument;

use super::{record_outcome, resolve_identifier, AuthService};
use crate::dtos::auth::VerifyRequest;
use crate::models::{Identifier, IdpUser, NewDirectoryUser, Role};
use crate::services::error::{AuthError, AuthOperation};

/// Result of a successful confirmation.
///
/// Confirmation itself is final once the IdP accepts the code. The other
/// fields report the follow-up steps, which may fail without undoing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    /// `None` when the account could not be read back after confirmation.
    pub role: Option<Role>,
    pub group_assigned: bool,
    /// `None` when directory registration is disabled.
    pub directory_registered: Option<bool>,
}

impl AuthService {
    /// Confirm an account with its code, then place it in the group for
    /// its role.
    #[instrument(skip_all, fields(identifier))]
    pub async fn verify(&self, req: VerifyRequest) -> Result<VerificationOutcome, AuthError> {
        let result = self.run_verify(req).await;
        record_outcome(AuthOperation::Verify, &result);
        result
    }

    async fn run_verify(&self, req: VerifyRequest) -> Result<VerificationOutcome, AuthError> {
        let identifier = resolve_identifier(req.email.as_deref(), req.phone_number.as_deref())?;

        let code = req.code.trim();
        if code.is_empty() {
            return Err(AuthError::invalid_input("code is required"));
        }

        let secret_hash = self.secret_hash(AuthOperation::Verify, &identifier)?;

        self.idp
            .confirm_sign_up(identifier.username(), code, &secret_hash)
            .await
            .map_err(|e| AuthError::from_idp(AuthOperation::Verify, e))?;

        tracing::info!("Account confirmed");

        Ok(self.complete_verification(&identifier).await)
    }

    async fn complete_verification(&self, identifier: &Identifier) -> VerificationOutcome {
        let username = identifier.username();

        let user = match self.idp.admin_get_user(username).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Account confirmed but could not be read back, skipping group assignment"
                );
                return VerificationOutcome {
                    role: None,
                    group_assigned: false,
                    directory_registered: None,
                };
            }
        };

        let role = user.attributes.role();

        let group_assigned = match self
            .idp
            .admin_add_user_to_group(username, role.group_name())
            .await
        {
            Ok(()) => {
                tracing::info!(group = role.group_name(), "Account added to role group");
                true
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    group = role.group_name(),
                    "Failed to add confirmed account to role group"
                );
                false
            }
        };

        let directory_registered = if self.register_on_verify {
            Some(self.register_with_directory(&user, role).await)
        } else {
            None
        };

        VerificationOutcome {
            role: Some(role),
            group_assigned,
            directory_registered,
        }
    }

    async fn register_with_directory(&self, user: &IdpUser, role: Role) -> bool {
        let sub = user
            .attributes
            .get("sub")
            .unwrap_or(user.username.as_str())
            .to_string();

        let new_user = NewDirectoryUser {
            sub,
            email: user.attributes.email().map(str::to_string),
            phone_number: user.attributes.phone_number().map(str::to_string),
            username: user.attributes.name().map(str::to_string),
            role,
        };

        match self.directory.register_user(&new_user).await {
            Ok(()) => {
                tracing::info!(sub = %new_user.sub, "Account registered with user directory");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to register account with user directory");
                false
            }
        }
    }
}
