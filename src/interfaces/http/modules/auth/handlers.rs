//! Authentication API handlers
//!
//! Thin wrappers over [`AuthService`]; errors map to responses through
//! `IntoResponse for AuthError`.

use std::sync::Arc;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Json,
};

use super::dto::{LoginRequest, LoginResponse, MeResponse, RegisterRequest, RegisterResponse};
use crate::application::{AuthService, Registration};
use crate::interfaces::http::common::errors::INTERNAL_MESSAGE;
use crate::interfaces::http::common::{ApiResponse, ValidatedJson};
use crate::interfaces::http::middleware::{AuthState, Authenticated};
use crate::shared::AuthError;

/// Auth state
#[derive(Clone)]
pub struct AuthHandlerState {
    pub service: Arc<AuthService>,
    pub auth: AuthState,
}

impl FromRef<AuthHandlerState> for AuthState {
    fn from_ref(state: &AuthHandlerState) -> Self {
        state.auth.clone()
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<RegisterResponse>),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username or email already registered"),
        (status = 422, description = "Field bounds violated")
    )
)]
pub async fn register(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisterResponse>>), AuthError> {
    let registration = Registration {
        username: request.username,
        email: request.email,
        password: request.password,
        role: request.role.map(Into::into),
    };

    let id = state.service.register(registration).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(RegisterResponse { id: id.to_string() })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AuthError> {
    let session = state
        .service
        .login(&request.username, &request.password)
        .await?;

    Ok(Json(ApiResponse::success(LoginResponse {
        expires_in: session.token.expires_in(),
        token: session.token.token,
        token_type: "Bearer".to_string(),
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current account", body = ApiResponse<MeResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Account no longer exists")
    )
)]
pub async fn get_current_user(
    State(state): State<AuthHandlerState>,
    Authenticated(identity): Authenticated,
) -> Result<Json<ApiResponse<MeResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    let account = state
        .service
        .store()
        .find_by_id(&identity.account_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load account {}: {}", identity.account_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(INTERNAL_MESSAGE)),
            )
        })?;

    // Tokens stay valid after their account is gone.
    let Some(account) = account else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Account not found")),
        ));
    };

    Ok(Json(ApiResponse::success(MeResponse {
        id: account.id.to_string(),
        username: account.username,
        email: account.email,
        role: identity.role.into(),
        created_at: account.created_at,
        token_expires_at: identity.expires_at,
    })))
}
