mod common;

use common::*;
use idp_auth_service::{
    models::UserAttributes,
    services::{AuthError, DirectoryError, IdpError, IdpOperation},
    utils::decode_claims,
};

fn email_attributes() -> UserAttributes {
    [("email", "a@x.com"), ("name", "Ann Lee")]
        .into_iter()
        .collect()
}

#[tokio::test]
async fn login_returns_tokens_and_directory_id() {
    // Arrange
    let app = TestApp::new();
    let sub = app.seed_confirmed_user("a@x.com", email_attributes());

    // Act
    let token = app
        .auth_service
        .login(login_email("a@x.com", TEST_PASSWORD))
        .await
        .expect("Login failed");

    // Assert
    assert_eq!(token.username, sub);
    assert_eq!(token.user_id, "profile-a@x.com");
    assert!(!token.access_token.is_empty());
    assert!(!token.refresh_token.is_empty());

    let claims = decode_claims(&token.id_token).expect("Invalid id token");
    assert_eq!(claims.sub, sub);
    assert_eq!(claims.email.as_deref(), Some("a@x.com"));
}

#[tokio::test]
async fn wrong_password_and_unknown_account_look_the_same() {
    let app = TestApp::new();
    app.seed_confirmed_user("a@x.com", email_attributes());

    let wrong_password = app
        .auth_service
        .login(login_email("a@x.com", "nope"))
        .await
        .unwrap_err();
    let unknown = app
        .auth_service
        .login(login_email("nobody@x.com", TEST_PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert!(matches!(unknown, AuthError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown.to_string());
}

#[tokio::test]
async fn unconfirmed_account_cannot_login() {
    let app = TestApp::new();
    app.auth_service
        .signup(email_signup("a@x.com"))
        .await
        .expect("Signup failed");

    let err = app
        .auth_service
        .login(login_email("a@x.com", TEST_PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn idp_internal_error_is_unavailable() {
    let app = TestApp::new();
    app.seed_confirmed_user("a@x.com", email_attributes());
    app.idp
        .fail_on(IdpOperation::InitiateAuth, IdpError::InternalError);

    let err = app
        .auth_service
        .login(login_email("a@x.com", TEST_PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::UpstreamUnavailable { .. }));
}

#[tokio::test]
async fn missing_profile_fails_login() {
    let app = TestApp::new();
    app.idp
        .insert_account("a@x.com", TEST_PASSWORD, email_attributes(), true);

    let err = app
        .auth_service
        .login(login_email("a@x.com", TEST_PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Internal { .. }));
    assert_eq!(err.to_string(), "Unable to complete login");
}

#[tokio::test]
async fn directory_outage_is_unavailable() {
    let app = TestApp::new();
    app.seed_confirmed_user("a@x.com", email_attributes());
    app.directory
        .fail_get_user(DirectoryError::Unavailable("request timed out".to_string()));

    let err = app
        .auth_service
        .login(login_email("a@x.com", TEST_PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::UpstreamUnavailable { .. }));
}

#[tokio::test]
async fn phone_login_matches_signup_normalization() {
    // Arrange
    let app = TestApp::new();
    app.auth_service
        .signup(phone_signup("+85512345678"))
        .await
        .expect("Signup failed");
    app.auth_service
        .verify(verify_phone("+85512345678", VALID_CODE))
        .await
        .expect("Verification failed");
    let sub = app.idp.sub_of("85512345678").expect("Account missing");
    app.directory.insert_profile(
        &sub,
        idp_auth_service::models::UserProfile {
            id: "profile-phone".to_string(),
            sub: Some(sub.clone()),
            email: None,
            phone_number: Some("+85512345678".to_string()),
            username: None,
            role: None,
        },
    );

    // Act
    let token = app
        .auth_service
        .login(login_phone("85512345678", TEST_PASSWORD))
        .await
        .expect("Login failed");

    // Assert
    assert_eq!(token.username, sub);
    assert_eq!(token.user_id, "profile-phone");
}

#[tokio::test]
async fn missing_password_is_invalid_input() {
    let app = TestApp::new();
    let mut req = login_email("a@x.com", TEST_PASSWORD);
    req.password = None;

    let err = app.auth_service.login(req).await.unwrap_err();

    assert!(matches!(err, AuthError::InvalidInput(_)));
    assert!(app.idp.calls().is_empty());
}

/// Answers every password exchange with an MFA challenge.
struct ChallengeIdp;

#[async_trait::async_trait]
impl idp_auth_service::services::IdentityProvider for ChallengeIdp {
    async fn sign_up(
        &self,
        _input: idp_auth_service::services::SignUpInput,
    ) -> Result<Option<idp_auth_service::models::DeliveryMedium>, IdpError> {
        Err(IdpError::InternalError)
    }

    async fn confirm_sign_up(&self, _: &str, _: &str, _: &str) -> Result<(), IdpError> {
        Err(IdpError::InternalError)
    }

    async fn initiate_auth(
        &self,
        _: &str,
        _: &secrecy::SecretString,
        _: &str,
    ) -> Result<idp_auth_service::models::IdpTokens, IdpError> {
        Ok(idp_auth_service::models::IdpTokens {
            challenge: Some("SOFTWARE_TOKEN_MFA".to_string()),
            ..Default::default()
        })
    }

    async fn admin_get_user(
        &self,
        _: &str,
    ) -> Result<idp_auth_service::models::IdpUser, IdpError> {
        Err(IdpError::UserNotFound)
    }

    async fn find_user(
        &self,
        _: &idp_auth_service::models::Identifier,
    ) -> Result<Option<idp_auth_service::models::IdpUser>, IdpError> {
        Ok(None)
    }

    async fn admin_add_user_to_group(&self, _: &str, _: &str) -> Result<(), IdpError> {
        Ok(())
    }
}

#[tokio::test]
async fn auth_challenge_is_internal_error() {
    let auth_service = idp_auth_service::services::AuthService::new(
        std::sync::Arc::new(ChallengeIdp),
        std::sync::Arc::new(idp_auth_service::services::MockUserDirectory::new()),
        idp_auth_service::utils::SecretHasher::new(
            TEST_CLIENT_ID,
            secrecy::SecretString::new(TEST_CLIENT_SECRET.to_string()),
        ),
    );

    let err = auth_service
        .login(login_email("a@x.com", TEST_PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Internal { .. }));
}
