use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidateEmail, ValidationError};

use crate::models::Role;

/// Blank means "not supplied"; anything else must look like an email.
fn optional_email(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || value.trim().validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email").with_message("Invalid email format".into()))
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(length(max = 128, message = "first_name is too long"))]
    #[schema(example = "Sokha")]
    pub first_name: Option<String>,

    #[validate(length(max = 128, message = "last_name is too long"))]
    #[schema(example = "Chan")]
    pub last_name: Option<String>,

    #[validate(custom(function = "optional_email"))]
    #[schema(example = "user@example.com")]
    pub email: Option<String>,

    #[validate(length(max = 32, message = "phone_number is too long"))]
    #[schema(example = "+85512345678")]
    pub phone_number: Option<String>,

    #[schema(value_type = Option<String>, format = Password, example = "Str0ng!Passw0rd")]
    pub password: Option<SecretString>,

    pub role: Option<Role>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignupResponse {
    #[schema(example = "User created successfully. Please check your email for a verification code.")]
    pub message: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct VerifyRequest {
    #[validate(custom(function = "optional_email"))]
    #[schema(example = "user@example.com")]
    pub email: Option<String>,

    #[validate(length(max = 32, message = "phone_number is too long"))]
    #[schema(example = "+85512345678")]
    pub phone_number: Option<String>,

    #[validate(length(min = 1, max = 64, message = "code is required"))]
    #[schema(example = "123456")]
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    #[schema(example = "User verified successfully")]
    pub message: String,
    /// Role read back from the account, when the lookup succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub group_assigned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_registered: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(custom(function = "optional_email"))]
    #[schema(example = "user@example.com")]
    pub email: Option<String>,

    #[validate(length(max = 32, message = "phone_number is too long"))]
    #[schema(example = "+85512345678")]
    pub phone_number: Option<String>,

    #[schema(value_type = Option<String>, format = Password, example = "Str0ng!Passw0rd")]
    pub password: Option<SecretString>,
}
