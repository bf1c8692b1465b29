//! Domain types shared by the orchestrators and the upstream clients.

mod identifier;
mod role;
mod token;
mod user;

pub use identifier::{normalize_phone_number, Identifier, IdentifierError};
pub use role::Role;
pub use token::{AuthToken, IdTokenClaims, IdpTokens};
pub use user::{
    DeliveryMedium, IdpUser, NewDirectoryUser, UserAttributes, UserProfile, EMAIL_ATTRIBUTE,
    NAME_ATTRIBUTE, PHONE_NUMBER_ATTRIBUTE, ROLE_ATTRIBUTE, SIGNUP_ATTRIBUTE_ALLOW_LIST,
};
