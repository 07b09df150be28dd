use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use axum_valid::Garde;
use http::StatusCode;
use mcs_dal::movie::MovieRepository;
use mcs_dal::review::{CreateReview, ReviewRepository};
use mcs_types::claim::ApiClaim;

use crate::error::{ApiError, ApiResult};
use crate::rest_api::{Page, Paging};
use crate::state::AppState;

crate::repository_from_request!(ReviewRepository);

/// Every review operation is scoped to an existing movie.
async fn ensure_movie(state: &AppState, movie_id: i64) -> ApiResult<()> {
    let movies = MovieRepository::new(state.pool().clone());
    if movies.exists(movie_id).await? {
        Ok(())
    } else {
        Err(mcs_dal::Error::RecordNotFound(format!("Movie {movie_id}")).into())
    }
}

fn acting_user(claim: &ApiClaim) -> ApiResult<i64> {
    claim.user_id().ok_or(ApiError::Unauthorized)
}

pub async fn list(
    Path(movie_id): Path<i64>,
    State(state): State<AppState>,
    repository: ReviewRepository,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    ensure_movie(&state, movie_id).await?;
    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list_for_movie(movie_id, listing_params).await?;

    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

pub async fn create(
    Path(movie_id): Path<i64>,
    State(state): State<AppState>,
    claim: ApiClaim,
    repository: ReviewRepository,
    Garde(Json(payload)): Garde<Json<CreateReview>>,
) -> ApiResult<impl IntoResponse> {
    ensure_movie(&state, movie_id).await?;
    let user_id = acting_user(&claim)?;
    repository.create(movie_id, user_id, payload).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

pub async fn update(
    Path((movie_id, review_id)): Path<(i64, i64)>,
    State(state): State<AppState>,
    claim: ApiClaim,
    repository: ReviewRepository,
    Garde(Json(payload)): Garde<Json<CreateReview>>,
) -> ApiResult<impl IntoResponse> {
    ensure_movie(&state, movie_id).await?;
    let user_id = acting_user(&claim)?;
    repository.update(review_id, user_id, payload).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

pub async fn delete(
    Path((movie_id, review_id)): Path<(i64, i64)>,
    State(state): State<AppState>,
    claim: ApiClaim,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    ensure_movie(&state, movie_id).await?;
    let user_id = acting_user(&claim)?;
    repository.delete(review_id, user_id).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", axum::routing::get(list).post(create))
        .route("/{review_id}", axum::routing::put(update).delete(delete))
}
