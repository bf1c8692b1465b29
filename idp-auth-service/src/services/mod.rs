//! Services layer for idp-auth-service.
//!
//! Orchestration lives in [`auth`]; the identity provider and the user
//! directory sit behind traits so tests can swap in the in-memory mocks.

pub mod auth;
mod cognito;
pub mod error;
pub mod identity_provider;
pub mod metrics;
pub mod user_directory;

pub use auth::{AuthService, VerificationOutcome};
pub use cognito::CognitoIdentityProvider;
pub use error::{AuthError, AuthOperation};
pub use identity_provider::{
    IdentityProvider, IdpCall, IdpError, IdpOperation, MockIdentityProvider, SignUpInput,
};
pub use user_directory::{DirectoryError, HttpUserDirectory, MockUserDirectory, UserDirectory};
