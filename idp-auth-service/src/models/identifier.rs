use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("Either email or phone_number is required")]
    Missing,

    #[error("phone_number must contain only digits with an optional leading '+'")]
    InvalidPhoneNumber,
}

/// The account identifier a request refers to.
///
/// Email wins when both are supplied. Phone numbers are stored as bare
/// digits; the IdP account key never carries the leading `+`, while the
/// `phone_number` attribute always does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Email(String),
    PhoneNumber(String),
}

impl Identifier {
    pub fn resolve(
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<Self, IdentifierError> {
        if let Some(email) = non_blank(email) {
            return Ok(Identifier::Email(email.to_string()));
        }

        match non_blank(phone_number) {
            Some(phone) => normalize_phone_number(phone).map(Identifier::PhoneNumber),
            None => Err(IdentifierError::Missing),
        }
    }

    /// IdP account key (`Username` on every call).
    pub fn username(&self) -> &str {
        match self {
            Identifier::Email(email) => email,
            Identifier::PhoneNumber(digits) => digits,
        }
    }

    pub fn attribute_name(&self) -> &'static str {
        match self {
            Identifier::Email(_) => "email",
            Identifier::PhoneNumber(_) => "phone_number",
        }
    }

    /// Value as stored in the IdP attribute of the same name.
    pub fn attribute_value(&self) -> String {
        match self {
            Identifier::Email(email) => email.clone(),
            Identifier::PhoneNumber(digits) => format!("+{}", digits),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.attribute_name(), self.username())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Strip a single leading `+` and require 6-15 digits (E.164 length).
pub fn normalize_phone_number(raw: &str) -> Result<String, IdentifierError> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);

    if (6..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(digits.to_string())
    } else {
        Err(IdentifierError::InvalidPhoneNumber)
    }
}
