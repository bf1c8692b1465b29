use idp_auth_service::{
    build_router,
    config::AuthConfig,
    services::{metrics, AuthService, CognitoIdentityProvider, HttpUserDirectory},
    utils::SecretHasher,
    AppState,
};
use service_core::error::AppError;
use service_core::observability::{init_tracing, shutdown_tracing};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = AuthConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    metrics::init_metrics().map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting identity provider auth service"
    );

    let idp = CognitoIdentityProvider::from_config(&config.cognito).await;
    tracing::info!(
        region = %config.cognito.region,
        user_pool_id = %config.cognito.user_pool_id,
        "Identity provider client initialized"
    );

    let directory = HttpUserDirectory::new(
        &config.user_service.base_url,
        config.user_service.timeout(),
    )
    .map_err(AppError::ConfigError)?;
    tracing::info!(base_url = %config.user_service.base_url, "User directory client initialized");

    let hasher = SecretHasher::new(
        config.cognito.client_id.clone(),
        config.cognito.client_secret.clone(),
    );

    let auth_service = AuthService::new(Arc::new(idp), Arc::new(directory), hasher)
        .with_directory_registration(config.user_service.register_on_verify);

    let state = AppState {
        config: config.clone(),
        auth_service,
    };
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    service_core::axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    shutdown_tracing();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
