use secrecy::ExposeSecret;
use tracing::instrument;

use super::{record_outcome, resolve_identifier, AuthService};
use crate::dtos::auth::SignupRequest;
use crate::models::{
    normalize_phone_number, DeliveryMedium, UserAttributes, EMAIL_ATTRIBUTE, NAME_ATTRIBUTE,
    PHONE_NUMBER_ATTRIBUTE, ROLE_ATTRIBUTE, SIGNUP_ATTRIBUTE_ALLOW_LIST,
};
use crate::services::error::{AuthError, AuthOperation};
use crate::services::identity_provider::SignUpInput;

impl AuthService {
    /// Create an unconfirmed account and have the IdP send a confirmation
    /// code. Returns the caller-facing confirmation message.
    #[instrument(skip_all, fields(identifier))]
    pub async fn signup(&self, req: SignupRequest) -> Result<String, AuthError> {
        let result = self.run_signup(req).await;
        record_outcome(AuthOperation::Signup, &result);
        result
    }

    async fn run_signup(&self, req: SignupRequest) -> Result<String, AuthError> {
        let identifier = resolve_identifier(req.email.as_deref(), req.phone_number.as_deref())?;

        let password = req
            .password
            .clone()
            .filter(|p| !p.expose_secret().is_empty())
            .ok_or_else(|| AuthError::invalid_input("password is required"))?;

        let attributes = signup_attributes(&req)?;

        // Advisory: a concurrent signup can pass this check too, in which
        // case the IdP rejects the second create with UsernameExists.
        let existing = self
            .idp
            .find_user(&identifier)
            .await
            .map_err(|e| AuthError::from_idp(AuthOperation::Signup, e))?;
        if existing.is_some() {
            tracing::info!("Signup rejected, account already exists");
            return Err(AuthError::AccountAlreadyExists);
        }

        let secret_hash = self.secret_hash(AuthOperation::Signup, &identifier)?;

        let medium = self
            .idp
            .sign_up(SignUpInput {
                username: identifier.username().to_string(),
                password,
                secret_hash,
                attributes,
            })
            .await
            .map_err(|e| AuthError::from_idp(AuthOperation::Signup, e))?;

        tracing::info!(delivery_medium = ?medium, "User signed up");
        Ok(confirmation_message(medium))
    }
}

/// Attributes written to the IdP at signup. Only names in
/// [`SIGNUP_ATTRIBUTE_ALLOW_LIST`] are ever produced.
pub fn signup_attributes(req: &SignupRequest) -> Result<UserAttributes, AuthError> {
    let first = req.first_name.as_deref().unwrap_or_default().trim();
    let last = req.last_name.as_deref().unwrap_or_default().trim();
    let name = format!("{} {}", first, last).trim().to_string();
    if name.is_empty() {
        return Err(AuthError::invalid_input(
            "first_name or last_name is required",
        ));
    }

    let mut attributes = UserAttributes::new();
    attributes.insert(NAME_ATTRIBUTE, name);

    if let Some(email) = req.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        attributes.insert(EMAIL_ATTRIBUTE, email);
    }

    if let Some(phone) = req
        .phone_number
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        let digits = normalize_phone_number(phone)?;
        attributes.insert(PHONE_NUMBER_ATTRIBUTE, format!("+{}", digits));
    }

    if let Some(role) = req.role {
        attributes.insert(ROLE_ATTRIBUTE, role.as_str());
    }

    debug_assert!(attributes
        .names()
        .all(|name| SIGNUP_ATTRIBUTE_ALLOW_LIST.contains(&name)));

    Ok(attributes)
}

pub fn confirmation_message(medium: Option<DeliveryMedium>) -> String {
    match medium {
        Some(medium) => format!(
            "User created successfully. Please check your {} for a verification code.",
            medium
        ),
        None => "User created successfully. A verification code has been sent.".to_string(),
    }
}
