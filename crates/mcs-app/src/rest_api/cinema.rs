use crate::crud_api;
use crate::error::ApiResult;
use axum::{extract::Query, response::IntoResponse, Json};
use axum_valid::Garde;
use garde::Validate;
use http::StatusCode;
use mcs_dal::cinema::{
    CinemaRepository, CreateCinema, PatchCinema, DEFAULT_NEARBY_DISTANCE_KM,
};
use serde::Deserialize;

crud_api!(Cinema, "/api/cinema");

#[derive(Debug, Clone, Validate, Deserialize)]
pub struct NearbyQuery {
    #[garde(range(min = -90.0, max = 90.0))]
    latitude: f64,
    #[garde(range(min = -180.0, max = 180.0))]
    longitude: f64,
    /// Kilometers; clamped to the server maximum, not rejected.
    #[garde(skip)]
    distance_km: Option<f64>,
}

pub async fn nearby(
    repository: CinemaRepository,
    Garde(Query(query)): Garde<Query<NearbyQuery>>,
) -> ApiResult<impl IntoResponse> {
    let distance_km = query.distance_km.unwrap_or(DEFAULT_NEARBY_DISTANCE_KM);
    let cinemas = repository
        .nearby(query.latitude, query.longitude, distance_km)
        .await?;
    Ok((StatusCode::OK, Json(cinemas)))
}

pub fn router() -> axum::Router<crate::state::AppState> {
    use crate::auth::token::RequiredRolesLayer;
    use axum::routing::{delete, get, post};
    use mcs_types::claim::Role;
    axum::Router::new()
        .route("/", post(crud_api::create))
        .route(
            "/{id}",
            delete(crud_api::delete)
                .put(crud_api::update)
                .patch(crud_api::patch),
        )
        .layer(RequiredRolesLayer::new([Role::Admin]))
        .route("/", get(crud_api::list))
        .route("/all", get(crud_api::list_all))
        .route("/count", get(crud_api::count))
        .route("/nearby", get(nearby))
        .route("/{id}", get(crud_api::get))
}
