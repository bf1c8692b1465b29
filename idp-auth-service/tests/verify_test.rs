mod common;

use common::*;
use idp_auth_service::{
    models::{Role, UserAttributes},
    services::{AuthError, DirectoryError, IdpCall, IdpError, IdpOperation},
};

fn unconfirmed(app: &TestApp, username: &str, role: Option<&str>) -> String {
    let mut attributes: UserAttributes = [("email", "a@x.com"), ("name", "Ann Lee")]
        .into_iter()
        .collect();
    if let Some(role) = role {
        attributes.insert("custom:role", role);
    }
    app.idp
        .insert_account(username, TEST_PASSWORD, attributes, false)
}

#[tokio::test]
async fn verified_account_joins_default_user_group() {
    // Arrange
    let app = TestApp::new();
    unconfirmed(&app, "a@x.com", None);

    // Act
    let outcome = app
        .auth_service
        .verify(verify_email("a@x.com", VALID_CODE))
        .await
        .expect("Verification failed");

    // Assert
    assert!(app.idp.is_confirmed("a@x.com"));
    assert_eq!(outcome.role, Some(Role::User));
    assert!(outcome.group_assigned);
    assert_eq!(outcome.directory_registered, None);
    assert_eq!(app.idp.groups_of("a@x.com"), vec!["user".to_string()]);
}

#[tokio::test]
async fn verified_admin_joins_admin_group() {
    let app = TestApp::new();
    unconfirmed(&app, "a@x.com", Some("admin"));

    let outcome = app
        .auth_service
        .verify(verify_email("a@x.com", VALID_CODE))
        .await
        .expect("Verification failed");

    assert_eq!(outcome.role, Some(Role::Admin));
    assert_eq!(app.idp.groups_of("a@x.com"), vec!["admin".to_string()]);
}

#[tokio::test]
async fn confirmation_uses_identifier_secret_hash() {
    let app = TestApp::new();
    unconfirmed(&app, "a@x.com", None);

    app.auth_service
        .verify(verify_email("a@x.com", VALID_CODE))
        .await
        .expect("Verification failed");

    assert_eq!(
        app.idp.calls_to(IdpOperation::ConfirmSignUp),
        vec![IdpCall::ConfirmSignUp {
            username: "a@x.com".to_string(),
            code: VALID_CODE.to_string(),
            secret_hash: SECRET_HASH_EMAIL.to_string(),
        }]
    );
}

#[tokio::test]
async fn wrong_code_fails_without_group_assignment() {
    // Arrange
    let app = TestApp::new();
    unconfirmed(&app, "a@x.com", None);

    // Act
    let err = app
        .auth_service
        .verify(verify_email("a@x.com", "000000"))
        .await
        .unwrap_err();

    // Assert
    assert!(matches!(err, AuthError::VerificationFailed));
    assert!(!app.idp.is_confirmed("a@x.com"));
    assert!(app.idp.calls_to(IdpOperation::AdminGetUser).is_empty());
    assert!(app
        .idp
        .calls_to(IdpOperation::AdminAddUserToGroup)
        .is_empty());
}

#[tokio::test]
async fn expired_code_and_unknown_account_fail_verification() {
    let app = TestApp::new();

    let err = app
        .auth_service
        .verify(verify_email("nobody@x.com", VALID_CODE))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::VerificationFailed));

    unconfirmed(&app, "a@x.com", None);
    app.idp
        .fail_on(IdpOperation::ConfirmSignUp, IdpError::ExpiredCode);
    let err = app
        .auth_service
        .verify(verify_email("a@x.com", VALID_CODE))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::VerificationFailed));
}

#[tokio::test]
async fn second_confirmation_is_rejected() {
    let app = TestApp::new();
    unconfirmed(&app, "a@x.com", None);
    app.auth_service
        .verify(verify_email("a@x.com", VALID_CODE))
        .await
        .expect("First verification failed");

    let err = app
        .auth_service
        .verify(verify_email("a@x.com", VALID_CODE))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::VerificationFailed));
    assert_eq!(app.idp.groups_of("a@x.com"), vec!["user".to_string()]);
}

#[tokio::test]
async fn group_failure_does_not_undo_confirmation() {
    // Arrange
    let app = TestApp::new();
    unconfirmed(&app, "a@x.com", None);
    app.idp
        .fail_on(IdpOperation::AdminAddUserToGroup, IdpError::InternalError);

    // Act
    let outcome = app
        .auth_service
        .verify(verify_email("a@x.com", VALID_CODE))
        .await
        .expect("Verification should still succeed");

    // Assert
    assert!(app.idp.is_confirmed("a@x.com"));
    assert!(!outcome.group_assigned);
    assert_eq!(outcome.role, Some(Role::User));
}

#[tokio::test]
async fn lookup_failure_skips_group_assignment() {
    let app = TestApp::new();
    unconfirmed(&app, "a@x.com", Some("admin"));
    app.idp
        .fail_on(IdpOperation::AdminGetUser, IdpError::Timeout);

    let outcome = app
        .auth_service
        .verify(verify_email("a@x.com", VALID_CODE))
        .await
        .expect("Verification should still succeed");

    assert!(app.idp.is_confirmed("a@x.com"));
    assert_eq!(outcome.role, None);
    assert!(!outcome.group_assigned);
    assert!(app
        .idp
        .calls_to(IdpOperation::AdminAddUserToGroup)
        .is_empty());
}

#[tokio::test]
async fn phone_verification_accepts_either_format() {
    let app = TestApp::new();
    app.auth_service
        .signup(phone_signup("+85512345678"))
        .await
        .expect("Signup failed");

    app.auth_service
        .verify(verify_phone("85512345678", VALID_CODE))
        .await
        .expect("Verification failed");

    assert!(app.idp.is_confirmed("85512345678"));
    match &app.idp.calls_to(IdpOperation::ConfirmSignUp)[0] {
        IdpCall::ConfirmSignUp { secret_hash, .. } => {
            assert_eq!(secret_hash, SECRET_HASH_PHONE);
        }
        other => panic!("unexpected call {:?}", other),
    }
}

#[tokio::test]
async fn blank_code_is_invalid_input() {
    let app = TestApp::new();

    let err = app
        .auth_service
        .verify(verify_email("a@x.com", "   "))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidInput(_)));
    assert!(app.idp.calls().is_empty());
}

#[tokio::test]
async fn confirmed_account_is_registered_with_directory_when_enabled() {
    // Arrange
    let app = TestApp::with_directory_registration(true);
    let sub = unconfirmed(&app, "a@x.com", Some("admin"));

    // Act
    let outcome = app
        .auth_service
        .verify(verify_email("a@x.com", VALID_CODE))
        .await
        .expect("Verification failed");

    // Assert
    assert_eq!(outcome.directory_registered, Some(true));
    let registered = app.directory.registered();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].sub, sub);
    assert_eq!(registered[0].email.as_deref(), Some("a@x.com"));
    assert_eq!(registered[0].username.as_deref(), Some("Ann Lee"));
    assert_eq!(registered[0].role, Role::Admin);
}

#[tokio::test]
async fn directory_failure_is_reported_not_raised() {
    let app = TestApp::with_directory_registration(true);
    unconfirmed(&app, "a@x.com", None);
    app.directory
        .fail_register_user(DirectoryError::Unavailable("connection refused".to_string()));

    let outcome = app
        .auth_service
        .verify(verify_email("a@x.com", VALID_CODE))
        .await
        .expect("Verification should still succeed");

    assert_eq!(outcome.directory_registered, Some(false));
    assert!(outcome.group_assigned);
}
