//! AWS Cognito user pool adapter.

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_cognitoidentityprovider::{
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    types::{AttributeType, AuthFlowType, DeliveryMediumType},
    Client,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use crate::config::CognitoConfig;
use crate::models::{DeliveryMedium, Identifier, IdpTokens, IdpUser, UserAttributes};
use crate::services::identity_provider::{IdentityProvider, IdpError, SignUpInput};

#[derive(Clone)]
pub struct CognitoIdentityProvider {
    client: Client,
    user_pool_id: String,
    client_id: String,
}

impl CognitoIdentityProvider {
    pub fn new(client: Client, user_pool_id: String, client_id: String) -> Self {
        Self {
            client,
            user_pool_id,
            client_id,
        }
    }

    /// Build a client from the ambient AWS credentials chain, pinned to the
    /// configured region. Every call is bounded by the configured timeout.
    pub async fn from_config(config: &CognitoConfig) -> Self {
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(config.timeout())
            .build();

        let mut sdk_config = aws_config::load_from_env().await;
        sdk_config = sdk_config
            .to_builder()
            .region(aws_config::Region::new(config.region.clone()))
            .timeout_config(timeouts)
            .build();

        Self::new(
            Client::new(&sdk_config),
            config.user_pool_id.clone(),
            config.client_id.clone(),
        )
    }
}

/// Collapse an SDK failure into the closed [`IdpError`] set.
fn classify<E, R>(err: SdkError<E, R>) -> IdpError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::TimeoutError(_) => IdpError::Timeout,
        SdkError::DispatchFailure(failure) if failure.is_timeout() => IdpError::Timeout,
        SdkError::ServiceError(context) => {
            IdpError::from_code(context.err().code(), context.err().message())
        }
        _ => IdpError::Transport(DisplayErrorContext(&err).to_string()),
    }
}

fn to_attribute_types(attributes: &UserAttributes) -> Result<Vec<AttributeType>, IdpError> {
    attributes
        .iter()
        .map(|(name, value)| AttributeType::builder().name(name).value(value).build())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| IdpError::InvalidParameter(e.to_string()))
}

fn from_attribute_types(attributes: &[AttributeType]) -> UserAttributes {
    attributes
        .iter()
        .filter_map(|attr| attr.value().map(|value| (attr.name(), value)))
        .collect()
}

/// ListUsers filter expression matching one attribute exactly.
fn equality_filter(attribute: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{} = \"{}\"", attribute, escaped)
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    #[instrument(skip_all, fields(username = %input.username))]
    async fn sign_up(&self, input: SignUpInput) -> Result<Option<DeliveryMedium>, IdpError> {
        let attributes = to_attribute_types(&input.attributes)?;

        let output = self
            .client
            .sign_up()
            .client_id(&self.client_id)
            .username(&input.username)
            .password(input.password.expose_secret())
            .secret_hash(&input.secret_hash)
            .set_user_attributes(Some(attributes))
            .send()
            .await
            .map_err(classify)?;

        let medium = output
            .code_delivery_details()
            .and_then(|details| details.delivery_medium())
            .and_then(|medium| match medium {
                DeliveryMediumType::Email => Some(DeliveryMedium::Email),
                DeliveryMediumType::Sms => Some(DeliveryMedium::Sms),
                _ => None,
            });

        Ok(medium)
    }

    #[instrument(skip(self, code, secret_hash))]
    async fn confirm_sign_up(
        &self,
        username: &str,
        code: &str,
        secret_hash: &str,
    ) -> Result<(), IdpError> {
        self.client
            .confirm_sign_up()
            .client_id(&self.client_id)
            .username(username)
            .confirmation_code(code)
            .secret_hash(secret_hash)
            .send()
            .await
            .map_err(classify)?;

        Ok(())
    }

    #[instrument(skip(self, password, secret_hash))]
    async fn initiate_auth(
        &self,
        username: &str,
        password: &SecretString,
        secret_hash: &str,
    ) -> Result<IdpTokens, IdpError> {
        let output = self
            .client
            .initiate_auth()
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .client_id(&self.client_id)
            .auth_parameters("USERNAME", username)
            .auth_parameters("PASSWORD", password.expose_secret())
            .auth_parameters("SECRET_HASH", secret_hash)
            .send()
            .await
            .map_err(classify)?;

        let result = output.authentication_result();

        Ok(IdpTokens {
            access_token: result.and_then(|r| r.access_token()).map(str::to_string),
            id_token: result.and_then(|r| r.id_token()).map(str::to_string),
            refresh_token: result.and_then(|r| r.refresh_token()).map(str::to_string),
            challenge: output.challenge_name().map(|c| c.as_str().to_string()),
        })
    }

    #[instrument(skip(self))]
    async fn admin_get_user(&self, username: &str) -> Result<IdpUser, IdpError> {
        let output = self
            .client
            .admin_get_user()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(classify)?;

        Ok(IdpUser {
            username: output.username().to_string(),
            attributes: from_attribute_types(output.user_attributes()),
        })
    }

    #[instrument(skip(self), fields(identifier = %identifier))]
    async fn find_user(&self, identifier: &Identifier) -> Result<Option<IdpUser>, IdpError> {
        let filter = equality_filter(identifier.attribute_name(), &identifier.attribute_value());

        let output = self
            .client
            .list_users()
            .user_pool_id(&self.user_pool_id)
            .filter(filter)
            .limit(1)
            .send()
            .await
            .map_err(classify)?;

        Ok(output.users().first().map(|user| IdpUser {
            username: user.username().unwrap_or_default().to_string(),
            attributes: from_attribute_types(user.attributes()),
        }))
    }

    #[instrument(skip(self))]
    async fn admin_add_user_to_group(
        &self,
        username: &str,
        group_name: &str,
    ) -> Result<(), IdpError> {
        self.client
            .admin_add_user_to_group()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .group_name(group_name)
            .send()
            .await
            .map_err(classify)?;

        Ok(())
    }
}
