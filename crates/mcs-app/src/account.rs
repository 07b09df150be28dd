use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json,
};
use axum_valid::Garde;
use garde::Validate;
use http::StatusCode;
use mcs_dal::user::{CreateUser, User, UserRepository};
use mcs_types::{
    claim::{ApiClaim, Role},
    general::ValidEmail,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;

use crate::auth::token::RequiredRolesLayer;
use crate::error::{ApiError, ApiResult};
use crate::rest_api::{Page, Paging};
use crate::state::AppState;

crate::repository_from_request!(UserRepository);

#[derive(Debug, Deserialize, Validate)]
pub struct Credentials {
    #[garde(dive)]
    email: ValidEmail,
    #[garde(length(min = 8, max = 255))]
    password: String,
}

#[derive(Debug, Serialize)]
pub struct UserToken {
    token: String,
    valid_until: OffsetDateTime,
}

fn issue_token(state: &AppState, user: &User) -> ApiResult<UserToken> {
    let mut roles = Vec::new();
    for role in user.roles.iter().flatten() {
        match role.parse::<Role>() {
            Ok(role) => roles.push(role),
            Err(e) => warn!("Skipping unknown role: {e}"),
        }
    }
    let claim = ApiClaim::new_expired(user.id.to_string(), roles);
    let token = state.tokens().issue(claim)?;
    let valid_until = OffsetDateTime::now_utc() + state.tokens().default_validity();
    Ok(UserToken { token, valid_until })
}

/// Self-service registration - new accounts get the plain user role.
pub async fn create(
    State(state): State<AppState>,
    repository: UserRepository,
    Garde(Json(credentials)): Garde<Json<Credentials>>,
) -> ApiResult<impl IntoResponse> {
    let user = repository
        .create(CreateUser {
            email: credentials.email,
            name: None,
            password: Some(credentials.password),
            roles: Some(vec![Role::User.to_string()]),
        })
        .await?;

    Ok((StatusCode::OK, Json(issue_token(&state, &user)?)))
}

#[derive(Debug, Deserialize)]
pub struct LoginCredentials {
    email: String,
    password: String,
}

/// Bad credentials of any kind are one uniform 400.
pub async fn login(
    State(state): State<AppState>,
    repository: UserRepository,
    Json(credentials): Json<LoginCredentials>,
) -> ApiResult<impl IntoResponse> {
    let user = repository
        .check_password(&credentials.email, &credentials.password)
        .await?;

    Ok((StatusCode::OK, Json(issue_token(&state, &user)?)))
}

/// Fresh token for the calling user, roles re-read from the store.
pub async fn renew(
    State(state): State<AppState>,
    claim: ApiClaim,
    repository: UserRepository,
) -> ApiResult<impl IntoResponse> {
    let user_id = claim.user_id().ok_or(ApiError::Unauthorized)?;
    let user = repository.get(user_id).await?;

    Ok((StatusCode::OK, Json(issue_token(&state, &user)?)))
}

pub async fn list_users(
    repository: UserRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list(listing_params).await?;

    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

pub async fn list_roles() -> impl IntoResponse {
    let roles: Vec<&str> = Role::ALL.iter().map(Role::as_str).collect();
    (StatusCode::OK, Json(roles))
}

#[derive(Debug, Deserialize)]
pub struct EditRole {
    user_id: i64,
    role: Role,
}

pub async fn assign_role(
    repository: UserRepository,
    Json(edit): Json<EditRole>,
) -> ApiResult<impl IntoResponse> {
    repository.add_role(edit.user_id, edit.role).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

pub async fn remove_role(
    repository: UserRepository,
    Json(edit): Json<EditRole>,
) -> ApiResult<impl IntoResponse> {
    repository.remove_role(edit.user_id, edit.role).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/users", get(list_users))
        .route("/roles", get(list_roles))
        .route("/roles/assign", post(assign_role))
        .route("/roles/remove", post(remove_role))
        .layer(RequiredRolesLayer::new([Role::Admin]))
        .route("/create", post(create))
        .route("/login", post(login))
        .route("/renew", post(renew))
}
