use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

use super::Role;

pub const NAME_ATTRIBUTE: &str = "name";
pub const EMAIL_ATTRIBUTE: &str = "email";
pub const PHONE_NUMBER_ATTRIBUTE: &str = "phone_number";
pub const ROLE_ATTRIBUTE: &str = "custom:role";

/// Attribute names a signup may write to the IdP.
pub const SIGNUP_ATTRIBUTE_ALLOW_LIST: [&str; 4] = [
    EMAIL_ATTRIBUTE,
    PHONE_NUMBER_ATTRIBUTE,
    NAME_ATTRIBUTE,
    ROLE_ATTRIBUTE,
];

/// IdP user attributes keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAttributes(BTreeMap<String, String>);

impl UserAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn name(&self) -> Option<&str> {
        self.get(NAME_ATTRIBUTE)
    }

    pub fn email(&self) -> Option<&str> {
        self.get(EMAIL_ATTRIBUTE)
    }

    pub fn phone_number(&self) -> Option<&str> {
        self.get(PHONE_NUMBER_ATTRIBUTE)
    }

    /// Role from `custom:role`; absent or unrecognised values mean `user`.
    pub fn role(&self) -> Role {
        match self.get(ROLE_ATTRIBUTE) {
            None => Role::User,
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(value = %raw, error = %e, "Unrecognised custom:role, using default");
                Role::User
            }),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for UserAttributes
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Account as returned by the administrative lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdpUser {
    /// Durable IdP username (the subject id for pools keyed by email/phone).
    pub username: String,
    pub attributes: UserAttributes,
}

/// Channel the IdP used to deliver the confirmation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMedium {
    Email,
    Sms,
}

impl fmt::Display for DeliveryMedium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryMedium::Email => f.write_str("email"),
            DeliveryMedium::Sms => f.write_str("sms"),
        }
    }
}

/// Profile record held by the user directory service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Registration payload sent to the user directory after confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDirectoryUser {
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub role: Role,
}
