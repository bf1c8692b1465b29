use secrecy::ExposeSecret;
use tracing::instrument;

use super::{record_outcome, resolve_identifier, AuthService};
use crate::dtos::auth::LoginRequest;
use crate::models::AuthToken;
use crate::services::error::{AuthError, AuthOperation};
use crate::utils::decode_claims;

fn present(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}

impl AuthService {
    /// Exchange a password for IdP tokens and attach the directory user id.
    #[instrument(skip_all, fields(identifier))]
    pub async fn login(&self, req: LoginRequest) -> Result<AuthToken, AuthError> {
        let result = self.run_login(req).await;
        record_outcome(AuthOperation::Login, &result);
        result
    }

    async fn run_login(&self, req: LoginRequest) -> Result<AuthToken, AuthError> {
        let identifier = resolve_identifier(req.email.as_deref(), req.phone_number.as_deref())?;

        let password = req
            .password
            .filter(|p| !p.expose_secret().is_empty())
            .ok_or_else(|| AuthError::invalid_input("password is required"))?;

        let secret_hash = self.secret_hash(AuthOperation::Login, &identifier)?;

        let tokens = self
            .idp
            .initiate_auth(identifier.username(), &password, &secret_hash)
            .await
            .map_err(|e| AuthError::from_idp(AuthOperation::Login, e))?;

        let challenge = tokens.challenge;
        let (access_token, id_token, refresh_token) = match (
            present(tokens.access_token),
            present(tokens.id_token),
            present(tokens.refresh_token),
        ) {
            (Some(access), Some(id), Some(refresh)) => (access, id, refresh),
            _ => {
                let reason = match challenge {
                    Some(name) => anyhow::anyhow!("Unsupported authentication challenge: {}", name),
                    None => anyhow::anyhow!("Identity provider returned an incomplete token set"),
                };
                return Err(AuthError::internal(AuthOperation::Login, reason));
            }
        };

        let claims =
            decode_claims(&id_token).map_err(|e| AuthError::internal(AuthOperation::Login, e))?;

        let profile = self
            .directory
            .get_user(&claims.sub)
            .await
            .map_err(|e| AuthError::from_directory(AuthOperation::Login, e))?;

        if profile.id.trim().is_empty() {
            return Err(AuthError::internal(
                AuthOperation::Login,
                anyhow::anyhow!("User directory returned a profile without an id"),
            ));
        }

        tracing::info!(sub = %claims.sub, "User logged in");

        Ok(AuthToken {
            access_token,
            id_token,
            refresh_token,
            username: claims.sub,
            user_id: profile.id,
        })
    }
}
