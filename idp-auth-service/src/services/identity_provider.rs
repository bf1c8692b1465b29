//! Contract with the external identity provider.
//!
//! The orchestrators only see this trait and [`IdpError`]; the Cognito
//! adapter and the in-memory mock both implement it.

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use crate::models::{DeliveryMedium, Identifier, IdpTokens, IdpUser, UserAttributes};

/// Closed set of identity provider failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdpError {
    #[error("username already exists")]
    UsernameExists,

    #[error("confirmation code mismatch")]
    CodeMismatch,

    #[error("confirmation code expired")]
    ExpiredCode,

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("user not found")]
    UserNotFound,

    #[error("user not confirmed")]
    UserNotConfirmed,

    #[error("invalid password: {0}")]
    InvalidPassword(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("too many requests")]
    TooManyRequests,

    #[error("identity provider internal error")]
    InternalError,

    #[error("identity provider request timed out")]
    Timeout,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("unmapped identity provider error {code}: {message}")]
    Unmapped { code: String, message: String },
}

impl IdpError {
    /// Interpret an upstream error code. This is the only place raw code
    /// strings are inspected.
    pub fn from_code(code: Option<&str>, message: Option<&str>) -> Self {
        let message = message.unwrap_or_default().to_string();

        match code.unwrap_or_default() {
            "UsernameExistsException" | "AliasExistsException" => IdpError::UsernameExists,
            "CodeMismatchException" => IdpError::CodeMismatch,
            "ExpiredCodeException" => IdpError::ExpiredCode,
            "NotAuthorizedException" => IdpError::NotAuthorized(message),
            "UserNotFoundException" => IdpError::UserNotFound,
            "UserNotConfirmedException" => IdpError::UserNotConfirmed,
            "InvalidPasswordException" => IdpError::InvalidPassword(message),
            "InvalidParameterException" => IdpError::InvalidParameter(message),
            "TooManyRequestsException"
            | "LimitExceededException"
            | "TooManyFailedAttemptsException" => IdpError::TooManyRequests,
            "InternalErrorException" => IdpError::InternalError,
            "" => IdpError::Unmapped {
                code: "Unknown".to_string(),
                message,
            },
            other => IdpError::Unmapped {
                code: other.to_string(),
                message,
            },
        }
    }

    /// Stable label for logs and metrics.
    pub fn code(&self) -> &str {
        match self {
            IdpError::UsernameExists => "username_exists",
            IdpError::CodeMismatch => "code_mismatch",
            IdpError::ExpiredCode => "expired_code",
            IdpError::NotAuthorized(_) => "not_authorized",
            IdpError::UserNotFound => "user_not_found",
            IdpError::UserNotConfirmed => "user_not_confirmed",
            IdpError::InvalidPassword(_) => "invalid_password",
            IdpError::InvalidParameter(_) => "invalid_parameter",
            IdpError::TooManyRequests => "too_many_requests",
            IdpError::InternalError => "internal_error",
            IdpError::Timeout => "timeout",
            IdpError::Transport(_) => "transport",
            IdpError::Unmapped { code, .. } => code,
        }
    }
}

/// SignUp request.
#[derive(Debug, Clone)]
pub struct SignUpInput {
    pub username: String,
    pub password: SecretString,
    pub secret_hash: String,
    pub attributes: UserAttributes,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an unconfirmed account. Returns where the code was sent.
    async fn sign_up(&self, input: SignUpInput) -> Result<Option<DeliveryMedium>, IdpError>;

    async fn confirm_sign_up(
        &self,
        username: &str,
        code: &str,
        secret_hash: &str,
    ) -> Result<(), IdpError>;

    /// Password flow token exchange.
    async fn initiate_auth(
        &self,
        username: &str,
        password: &SecretString,
        secret_hash: &str,
    ) -> Result<IdpTokens, IdpError>;

    async fn admin_get_user(&self, username: &str) -> Result<IdpUser, IdpError>;

    /// First account whose identifier attribute equals the given value.
    async fn find_user(&self, identifier: &Identifier) -> Result<Option<IdpUser>, IdpError>;

    async fn admin_add_user_to_group(&self, username: &str, group_name: &str)
        -> Result<(), IdpError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdpOperation {
    SignUp,
    ConfirmSignUp,
    InitiateAuth,
    AdminGetUser,
    ListUsers,
    AdminAddUserToGroup,
}

/// A call observed by [`MockIdentityProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdpCall {
    SignUp {
        username: String,
        secret_hash: String,
        attributes: UserAttributes,
    },
    ConfirmSignUp {
        username: String,
        code: String,
        secret_hash: String,
    },
    InitiateAuth {
        username: String,
        secret_hash: String,
    },
    AdminGetUser {
        username: String,
    },
    ListUsers {
        attribute: String,
        value: String,
    },
    AdminAddUserToGroup {
        username: String,
        group_name: String,
    },
}

impl IdpCall {
    pub fn operation(&self) -> IdpOperation {
        match self {
            IdpCall::SignUp { .. } => IdpOperation::SignUp,
            IdpCall::ConfirmSignUp { .. } => IdpOperation::ConfirmSignUp,
            IdpCall::InitiateAuth { .. } => IdpOperation::InitiateAuth,
            IdpCall::AdminGetUser { .. } => IdpOperation::AdminGetUser,
            IdpCall::ListUsers { .. } => IdpOperation::ListUsers,
            IdpCall::AdminAddUserToGroup { .. } => IdpOperation::AdminAddUserToGroup,
        }
    }
}

#[derive(Debug, Clone)]
struct MockAccount {
    sub: String,
    password: String,
    attributes: UserAttributes,
    confirmed: bool,
    groups: Vec<String>,
}

#[derive(Debug, Default)]
struct MockIdpState {
    accounts: HashMap<String, MockAccount>,
    failures: HashMap<IdpOperation, IdpError>,
    calls: Vec<IdpCall>,
    next_sub: u64,
}

/// In-memory identity provider for tests and local runs.
///
/// Accounts are keyed by username, every confirmation code other than the
/// configured one is a mismatch, and failures can be scripted per
/// operation.
#[derive(Debug)]
pub struct MockIdentityProvider {
    state: Mutex<MockIdpState>,
    confirmation_code: String,
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIdentityProvider {
    pub const DEFAULT_CONFIRMATION_CODE: &'static str = "123456";

    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockIdpState::default()),
            confirmation_code: Self::DEFAULT_CONFIRMATION_CODE.to_string(),
        }
    }

    pub fn with_confirmation_code(mut self, code: &str) -> Self {
        self.confirmation_code = code.to_string();
        self
    }

    /// Seed an account. Returns its subject id.
    pub fn insert_account(
        &self,
        username: &str,
        password: &str,
        attributes: UserAttributes,
        confirmed: bool,
    ) -> String {
        let mut state = self.lock();
        let sub = Self::create_account(&mut state, username, password, attributes);
        if let Some(account) = state.accounts.get_mut(username) {
            account.confirmed = confirmed;
        }
        sub
    }

    /// Make every subsequent call to `operation` fail with `error`.
    pub fn fail_on(&self, operation: IdpOperation, error: IdpError) {
        self.lock().failures.insert(operation, error);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn calls(&self) -> Vec<IdpCall> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, operation: IdpOperation) -> Vec<IdpCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .cloned()
            .collect()
    }

    pub fn groups_of(&self, username: &str) -> Vec<String> {
        self.lock()
            .accounts
            .get(username)
            .map(|a| a.groups.clone())
            .unwrap_or_default()
    }

    pub fn is_confirmed(&self, username: &str) -> bool {
        self.lock()
            .accounts
            .get(username)
            .map(|a| a.confirmed)
            .unwrap_or(false)
    }

    pub fn sub_of(&self, username: &str) -> Option<String> {
        self.lock().accounts.get(username).map(|a| a.sub.clone())
    }

    fn lock(&self) -> MutexGuard<'_, MockIdpState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call and return the scripted failure, if any.
    fn begin(&self, call: IdpCall) -> Result<MutexGuard<'_, MockIdpState>, IdpError> {
        let mut state = self.lock();
        let operation = call.operation();
        state.calls.push(call);
        if let Some(error) = state.failures.get(&operation).cloned() {
            return Err(error);
        }
        Ok(state)
    }

    fn create_account(
        state: &mut MockIdpState,
        username: &str,
        password: &str,
        mut attributes: UserAttributes,
    ) -> String {
        state.next_sub += 1;
        let sub = format!("00000000-0000-4000-8000-{:012}", state.next_sub);
        attributes.insert("sub", sub.clone());
        state.accounts.insert(
            username.to_string(),
            MockAccount {
                sub: sub.clone(),
                password: password.to_string(),
                attributes,
                confirmed: false,
                groups: Vec::new(),
            },
        );
        sub
    }

    fn id_token(account: &MockAccount) -> Result<String, IdpError> {
        let mut claims = serde_json::Map::new();
        claims.insert("sub".into(), account.sub.clone().into());
        claims.insert("cognito:username".into(), account.sub.clone().into());
        for (name, value) in account.attributes.iter() {
            if name == "email" || name == "phone_number" {
                claims.insert(name.into(), value.into());
            }
        }

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"mock-identity-provider"),
        )
        .map_err(|e| IdpError::Transport(format!("mock token encoding failed: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn sign_up(&self, input: SignUpInput) -> Result<Option<DeliveryMedium>, IdpError> {
        let mut state = self.begin(IdpCall::SignUp {
            username: input.username.clone(),
            secret_hash: input.secret_hash.clone(),
            attributes: input.attributes.clone(),
        })?;

        if state.accounts.contains_key(&input.username) {
            return Err(IdpError::UsernameExists);
        }

        let medium = if input.attributes.email().is_some() {
            DeliveryMedium::Email
        } else {
            DeliveryMedium::Sms
        };

        Self::create_account(
            &mut state,
            &input.username,
            input.password.expose_secret(),
            input.attributes,
        );
        Ok(Some(medium))
    }

    async fn confirm_sign_up(
        &self,
        username: &str,
        code: &str,
        secret_hash: &str,
    ) -> Result<(), IdpError> {
        let mut state = self.begin(IdpCall::ConfirmSignUp {
            username: username.to_string(),
            code: code.to_string(),
            secret_hash: secret_hash.to_string(),
        })?;

        let account = state
            .accounts
            .get_mut(username)
            .ok_or(IdpError::UserNotFound)?;

        if account.confirmed {
            return Err(IdpError::NotAuthorized(
                "User cannot be confirmed. Current status is CONFIRMED".to_string(),
            ));
        }
        if code != self.confirmation_code {
            return Err(IdpError::CodeMismatch);
        }

        account.confirmed = true;
        Ok(())
    }

    async fn initiate_auth(
        &self,
        username: &str,
        password: &SecretString,
        secret_hash: &str,
    ) -> Result<IdpTokens, IdpError> {
        let state = self.begin(IdpCall::InitiateAuth {
            username: username.to_string(),
            secret_hash: secret_hash.to_string(),
        })?;

        let account = state.accounts.get(username).ok_or(IdpError::UserNotFound)?;

        if account.password != *password.expose_secret() {
            return Err(IdpError::NotAuthorized(
                "Incorrect username or password.".to_string(),
            ));
        }
        if !account.confirmed {
            return Err(IdpError::UserNotConfirmed);
        }

        Ok(IdpTokens {
            access_token: Some(format!("access-{}", account.sub)),
            id_token: Some(Self::id_token(account)?),
            refresh_token: Some(format!("refresh-{}", account.sub)),
            challenge: None,
        })
    }

    async fn admin_get_user(&self, username: &str) -> Result<IdpUser, IdpError> {
        let state = self.begin(IdpCall::AdminGetUser {
            username: username.to_string(),
        })?;

        let account = state.accounts.get(username).ok_or(IdpError::UserNotFound)?;
        Ok(IdpUser {
            username: account.sub.clone(),
            attributes: account.attributes.clone(),
        })
    }

    async fn find_user(&self, identifier: &Identifier) -> Result<Option<IdpUser>, IdpError> {
        let attribute = identifier.attribute_name();
        let value = identifier.attribute_value();

        let state = self.begin(IdpCall::ListUsers {
            attribute: attribute.to_string(),
            value: value.clone(),
        })?;

        Ok(state
            .accounts
            .values()
            .find(|account| account.attributes.get(attribute) == Some(value.as_str()))
            .map(|account| IdpUser {
                username: account.sub.clone(),
                attributes: account.attributes.clone(),
            }))
    }

    async fn admin_add_user_to_group(
        &self,
        username: &str,
        group_name: &str,
    ) -> Result<(), IdpError> {
        let mut state = self.begin(IdpCall::AdminAddUserToGroup {
            username: username.to_string(),
            group_name: group_name.to_string(),
        })?;

        let account = state
            .accounts
            .get_mut(username)
            .ok_or(IdpError::UserNotFound)?;
        if !account.groups.iter().any(|g| g == group_name) {
            account.groups.push(group_name.to_string());
        }
        Ok(())
    }
}
