use secrecy::SecretString;
use service_core::config::{self as core_config, Environment};
use service_core::error::AppError;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub cognito: CognitoConfig,
    pub user_service: UserServiceConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone)]
pub struct CognitoConfig {
    pub region: String,
    pub user_pool_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub timeout_seconds: u64,
}

impl CognitoConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone)]
pub struct UserServiceConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    /// Register newly confirmed accounts with the user directory.
    pub register_on_verify: bool,
}

impl UserServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let environment = Environment::from_env()?;
        let is_prod = environment.is_prod();

        let config = AuthConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("idp-auth-service"), false)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.trim().is_empty()),
            cognito: CognitoConfig {
                region: get_env("AWS_COGNITO_REGION", Some("us-east-1"), is_prod)?,
                user_pool_id: get_env("AWS_COGNITO_USER_POOL_ID", None, is_prod)?,
                client_id: get_env("AWS_COGNITO_CLIENT_ID", None, is_prod)?,
                client_secret: SecretString::new(get_env(
                    "AWS_COGNITO_CLIENT_SECRET",
                    None,
                    is_prod,
                )?),
                timeout_seconds: parse_env("IDP_TIMEOUT_SECONDS", "10")?,
            },
            user_service: UserServiceConfig {
                base_url: get_env("USER_SERVICE_URL", Some("http://localhost:4001"), is_prod)?
                    .trim_end_matches('/')
                    .to_string(),
                timeout_seconds: parse_env("USER_SERVICE_TIMEOUT_SECONDS", "5")?,
                register_on_verify: parse_env("USER_SERVICE_REGISTER_ON_VERIFY", "false")?,
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.cognito.timeout_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "IDP_TIMEOUT_SECONDS must be positive"
            )));
        }

        if self.user_service.timeout_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "USER_SERVICE_TIMEOUT_SECONDS must be positive"
            )));
        }

        if !self.user_service.base_url.starts_with("http://")
            && !self.user_service.base_url.starts_with("https://")
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "USER_SERVICE_URL must be an http(s) URL"
            )));
        }

        if self.environment.is_prod() && self.security.allowed_origins.iter().any(|o| o == "*") {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Wildcard CORS origin not allowed in production"
            )));
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

/// Tunables keep their defaults in every environment.
fn parse_env<T>(key: &str, default: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), false)?
        .trim()
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("Invalid {}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_env_falls_back_outside_prod() {
        let value = get_env("IDP_AUTH_TEST_UNSET", Some("fallback"), false).unwrap();
        assert_eq!(value, "fallback");
    }

    #[test]
    fn get_env_requires_value_in_prod() {
        let err = get_env("IDP_AUTH_TEST_UNSET", Some("fallback"), true).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn parse_env_uses_default() {
        let seconds: u64 = parse_env("IDP_AUTH_TEST_UNSET_SECONDS", "10").unwrap();
        assert_eq!(seconds, 10);
        let flag: bool = parse_env("IDP_AUTH_TEST_UNSET_FLAG", "false").unwrap();
        assert!(!flag);
    }
}
