//! Signup, verification and login endpoints.

use service_core::{
    axum::{extract::State, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::auth::{LoginRequest, SignupRequest, SignupResponse, VerifyRequest, VerifyResponse},
    utils::ValidatedJson,
    AppState,
};

/// Create an account and send a confirmation code
#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, confirmation code sent", body = SignupResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Account already exists", body = ErrorResponse),
        (status = 503, description = "Identity provider unavailable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = state.auth_service.signup(req).await?;
    Ok((StatusCode::CREATED, Json(SignupResponse { message })))
}

/// Confirm an account with the code it received
#[utoipa::path(
    post,
    path = "/v1/auth/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Account confirmed", body = VerifyResponse),
        (status = 400, description = "Invalid or expired code", body = ErrorResponse),
        (status = 503, description = "Identity provider unavailable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn verify(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<VerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.auth_service.verify(req).await?;
    Ok((
        StatusCode::OK,
        Json(VerifyResponse {
            message: "User verified successfully".to_string(),
            role: outcome.role,
            group_assigned: outcome.group_assigned,
            directory_registered: outcome.directory_registered,
        }),
    ))
}

/// Login with email or phone number and password
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthToken),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 503, description = "Upstream service unavailable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = state.auth_service.login(req).await?;
    Ok((StatusCode::OK, Json(token)))
}
