//! Shared setup for idp-auth-service integration tests.
//!
//! Wires the real orchestrators and router to the in-memory identity
//! provider and user directory.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request},
    response::Response,
    Router,
};
use idp_auth_service::{
    build_router,
    config::{AuthConfig, CognitoConfig, SecurityConfig, UserServiceConfig},
    dtos::auth::{LoginRequest, SignupRequest, VerifyRequest},
    models::{Role, UserAttributes, UserProfile},
    services::{AuthService, MockIdentityProvider, MockUserDirectory},
    utils::SecretHasher,
    AppState,
};
use secrecy::SecretString;
use service_core::config::{Config, Environment};
use std::sync::Arc;

pub const TEST_CLIENT_ID: &str = "client-id-abc";
pub const TEST_CLIENT_SECRET: &str = "client-secret-123";
pub const TEST_PASSWORD: &str = "Str0ng!Passw0rd";
pub const VALID_CODE: &str = MockIdentityProvider::DEFAULT_CONFIRMATION_CODE;

/// Secret hash of "a@x.com" for the test client.
pub const SECRET_HASH_EMAIL: &str = "WDTF3OVWaN7kh+n4Yb4kPIiyFQpZVJUMFdTzQAYE3kE=";
/// Secret hash of "85512345678" for the test client.
pub const SECRET_HASH_PHONE: &str = "Ng5ashrbwgRH+ndAmwS1mc8xfEcvCMGSWZPRnk82WIc=";

pub struct TestApp {
    pub idp: Arc<MockIdentityProvider>,
    pub directory: Arc<MockUserDirectory>,
    pub auth_service: AuthService,
    pub config: AuthConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_directory_registration(false)
    }

    pub fn with_directory_registration(enabled: bool) -> Self {
        let idp = Arc::new(MockIdentityProvider::new());
        let directory = Arc::new(MockUserDirectory::new());
        let mut config = test_config();
        config.user_service.register_on_verify = enabled;

        let auth_service = AuthService::new(
            idp.clone(),
            directory.clone(),
            SecretHasher::new(TEST_CLIENT_ID, SecretString::new(TEST_CLIENT_SECRET.to_string())),
        )
        .with_directory_registration(enabled);

        Self {
            idp,
            directory,
            auth_service,
            config,
        }
    }

    pub fn router(&self) -> Router {
        build_router(AppState {
            config: self.config.clone(),
            auth_service: self.auth_service.clone(),
        })
    }

    /// Seed a confirmed account and its directory profile. Returns the sub.
    pub fn seed_confirmed_user(&self, username: &str, attributes: UserAttributes) -> String {
        let sub = self
            .idp
            .insert_account(username, TEST_PASSWORD, attributes, true);
        self.directory.insert_profile(
            &sub,
            UserProfile {
                id: format!("profile-{}", username),
                sub: Some(sub.clone()),
                email: None,
                phone_number: None,
                username: None,
                role: Some(Role::User),
            },
        );
        sub
    }
}

pub fn test_config() -> AuthConfig {
    AuthConfig {
        common: Config { port: 8080 },
        environment: Environment::Dev,
        service_name: "idp-auth-service-test".to_string(),
        service_version: "0.0.0-test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        cognito: CognitoConfig {
            region: "us-east-1".to_string(),
            user_pool_id: "us-east-1_TEST".to_string(),
            client_id: TEST_CLIENT_ID.to_string(),
            client_secret: SecretString::new(TEST_CLIENT_SECRET.to_string()),
            timeout_seconds: 10,
        },
        user_service: UserServiceConfig {
            base_url: "http://localhost:4001".to_string(),
            timeout_seconds: 5,
            register_on_verify: false,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    }
}

pub fn email_signup(email: &str) -> SignupRequest {
    SignupRequest {
        first_name: Some("Ann".to_string()),
        last_name: Some("Lee".to_string()),
        email: Some(email.to_string()),
        password: Some(SecretString::new(TEST_PASSWORD.to_string())),
        ..Default::default()
    }
}

pub fn phone_signup(phone_number: &str) -> SignupRequest {
    SignupRequest {
        first_name: Some("Sokha".to_string()),
        phone_number: Some(phone_number.to_string()),
        password: Some(SecretString::new(TEST_PASSWORD.to_string())),
        ..Default::default()
    }
}

pub fn verify_email(email: &str, code: &str) -> VerifyRequest {
    VerifyRequest {
        email: Some(email.to_string()),
        code: code.to_string(),
        ..Default::default()
    }
}

pub fn verify_phone(phone_number: &str, code: &str) -> VerifyRequest {
    VerifyRequest {
        phone_number: Some(phone_number.to_string()),
        code: code.to_string(),
        ..Default::default()
    }
}

pub fn login_email(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: Some(email.to_string()),
        password: Some(SecretString::new(password.to_string())),
        ..Default::default()
    }
}

pub fn login_phone(phone_number: &str, password: &str) -> LoginRequest {
    LoginRequest {
        phone_number: Some(phone_number.to_string()),
        password: Some(SecretString::new(password.to_string())),
        ..Default::default()
    }
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

pub async fn read_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
