use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the per-username `SECRET_HASH` the IdP requires from
/// confidential app clients.
///
/// Format: base64(HMAC-SHA256(username || client_id, client_secret))
#[derive(Clone)]
pub struct SecretHasher {
    client_id: String,
    client_secret: SecretString,
}

impl SecretHasher {
    pub fn new(client_id: impl Into<String>, client_secret: SecretString) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn hash(&self, username: &str) -> Result<String, anyhow::Error> {
        let mut mac = HmacSha256::new_from_slice(self.client_secret.expose_secret().as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;

        mac.update(username.as_bytes());
        mac.update(self.client_id.as_bytes());

        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for SecretHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretHasher")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}
