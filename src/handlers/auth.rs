use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::extract_bearer_token,
    models::user::{Role, User, UserView},
    services::auth::{ChangePasswordOutcome, IssuedSession},
    state::AppState,
};

/// The request payload for user registration.
///
/// A `role` other than `employee` is honoured only for callers presenting an
/// admin bearer token.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// The request payload for user login.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The request payload for changing a user's password.
#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// The request payload for updating a profile.
#[derive(Deserialize, Debug)]
pub struct UpdateProfileRequest {
    pub name: String,
}

/// The request payload for an administrative role change.
#[derive(Deserialize, Debug)]
pub struct SetRoleRequest {
    pub role: Role,
}

/// The response payload for register and login.
#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserView,
}

impl From<IssuedSession> for SessionResponse {
    fn from(issued: IssuedSession) -> Self {
        Self {
            user: UserView::from(&issued.user),
            token: issued.token,
        }
    }
}

/// The response payload for actions without a resource to return.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

/// Handles user registration.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response> {
    tracing::info!("📝 Register attempt for: {}", payload.email);

    let role = match payload.role {
        None | Some(Role::Employee) => None,
        Some(role) => {
            let token = extract_bearer_token(&headers).ok_or(AppError::Forbidden)?;
            let caller = state.verifier.verify(token).await?;
            match caller {
                Some(admin) if admin.is_admin() => {
                    tracing::info!("👤 Admin {} registers a {:?} account", admin.id, role);
                    Some(role)
                }
                _ => {
                    tracing::warn!("❌ Elevated role requested without admin credentials");
                    return Err(AppError::Forbidden);
                }
            }
        }
    };

    let issued = state
        .issuer
        .register(&payload.name, &payload.email, &payload.password, role)
        .await?;

    Ok((StatusCode::CREATED, Json(SessionResponse::from(issued))).into_response())
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Login attempt for: {}", payload.email);

    let issued = state.issuer.login(&payload.email, &payload.password).await?;

    Ok((StatusCode::OK, Json(SessionResponse::from(issued))).into_response())
}

/// Returns the authenticated user.
pub async fn me(Extension(user): Extension<User>) -> Json<UserView> {
    Json(UserView::from(&user))
}

/// Handles changing the authenticated user's password.
#[axum::debug_handler]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Response> {
    let outcome = state
        .issuer
        .change_password(user.id, &payload.current_password, &payload.new_password)
        .await?;

    let (status, response) = match outcome {
        ChangePasswordOutcome::Changed => (
            StatusCode::OK,
            AuthResponse {
                success: true,
                message: "Password changed successfully".to_string(),
            },
        ),
        ChangePasswordOutcome::Rejected(rejection) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            AuthResponse {
                success: false,
                message: rejection.message().to_string(),
            },
        ),
    };

    Ok((status, Json(response)).into_response())
}

/// Handles updating the authenticated user's profile.
#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserView>> {
    let updated = state.issuer.update_profile(user.id, &payload.name).await?;
    Ok(Json(UserView::from(&updated)))
}

/// Ends every session of the authenticated user, including the current one.
#[axum::debug_handler]
pub async fn revoke_own_sessions(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<AuthResponse>> {
    state.issuer.revoke_sessions(user.id).await?;
    Ok(Json(AuthResponse {
        success: true,
        message: "All sessions revoked".to_string(),
    }))
}

/// Changes another user's role. Admin only.
#[axum::debug_handler]
pub async fn set_user_role(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<Json<UserView>> {
    tracing::info!("👤 Admin {} sets role of {} to {:?}", admin.id, user_id, payload.role);
    let updated = state.issuer.set_role(user_id, payload.role).await?;
    Ok(Json(UserView::from(&updated)))
}

/// Ends every session of another user. Admin only.
#[axum::debug_handler]
pub async fn revoke_user_sessions(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserView>> {
    tracing::info!("👤 Admin {} revokes sessions of {}", admin.id, user_id);
    let updated = state.issuer.revoke_sessions(user_id).await?;
    Ok(Json(UserView::from(&updated)))
}
