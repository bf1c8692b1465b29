use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Composite login result. Every field is required; a login that cannot
/// fill all of them fails instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: String,
    /// Durable IdP subject id.
    #[schema(example = "5f0c7a3e-9d2b-4c8e-a1f4-0b6d2e9c7a11")]
    pub username: String,
    /// User directory id.
    #[schema(example = "65f0c0ffee0ddba11ad5e1f0")]
    pub user_id: String,
}

/// Tokens handed back by the IdP after a password exchange. Any of them
/// may be missing (for example when the IdP answers with a challenge).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdpTokens {
    pub access_token: Option<String>,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub challenge: Option<String>,
}

/// Identity token payload fields this service reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default, rename = "cognito:username")]
    pub cognito_username: Option<String>,
}
