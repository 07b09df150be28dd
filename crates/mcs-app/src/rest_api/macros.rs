#[macro_export]
macro_rules! api_read_only {
    ($entity:ty) => {
        pub async fn list(
            repository: EntityRepository,
            State(state): State<AppState>,
            Garde(Query(paging)): Garde<Query<Paging>>,
        ) -> ApiResult<impl IntoResponse> {
            let default_page_size: u32 = state.config().default_page_size;
            let page_size = paging.page_size(default_page_size);
            let listing_params = paging.into_listing_params(default_page_size)?;
            let batch = repository.list(listing_params).await?;
            Ok((
                StatusCode::OK,
                Json($crate::rest_api::Page::from_batch(batch, page_size)),
            ))
        }

        pub async fn list_all(repository: EntityRepository) -> ApiResult<impl IntoResponse> {
            let records = repository.list_all().await?;
            Ok((StatusCode::OK, Json(records)))
        }

        pub async fn count(repository: EntityRepository) -> ApiResult<impl IntoResponse> {
            let count = repository.count().await?;
            Ok((StatusCode::OK, Json(count)))
        }

        pub async fn get(
            Path(id): Path<i64>,
            repository: EntityRepository,
        ) -> ApiResult<impl IntoResponse> {
            let record = repository.get(id).await?;

            Ok((StatusCode::OK, Json(record)))
        }
    };
}

#[macro_export]
macro_rules! crud_api {
    ($entity:ty, $base_path:literal) => {
        type EntityRepository = paste::paste! {[<$entity Repository>]};
        $crate::repository_from_request!(EntityRepository);
        pub mod crud_api {
            use super::*;
            use $crate::error::ApiResult;
            use $crate::rest_api::Paging;
            use $crate::state::AppState;
            use axum::{
                extract::{Path, Query, State},
                response::IntoResponse,
                Json,
            };
            use axum_valid::Garde;
            use http::StatusCode;

            type CreateEntity = paste::paste! {[<Create $entity>]};
            type PatchEntity = paste::paste! {[<Patch $entity>]};

            $crate::api_read_only!($entity);

            pub async fn create(
                repository: EntityRepository,
                Garde(Json(payload)): Garde<Json<CreateEntity>>,
            ) -> ApiResult<impl IntoResponse> {
                let record = repository.create(payload).await?;
                let location = [(
                    http::header::LOCATION,
                    format!("{}/{}", $base_path, record.id),
                )];

                Ok((StatusCode::CREATED, location, Json(record)))
            }

            pub async fn update(
                Path(id): Path<i64>,
                repository: EntityRepository,
                Garde(Json(payload)): Garde<Json<CreateEntity>>,
            ) -> ApiResult<impl IntoResponse> {
                repository.update(id, payload).await?;

                Ok((StatusCode::NO_CONTENT, ()))
            }

            // merged-state validation happens in the repository
            pub async fn patch(
                Path(id): Path<i64>,
                repository: EntityRepository,
                Json(payload): Json<PatchEntity>,
            ) -> ApiResult<impl IntoResponse> {
                repository.patch(id, payload).await?;

                Ok((StatusCode::NO_CONTENT, ()))
            }

            pub async fn delete(
                Path(id): Path<i64>,
                repository: EntityRepository,
            ) -> ApiResult<impl IntoResponse> {
                repository.delete(id).await?;

                Ok((StatusCode::NO_CONTENT, ()))
            }
        }
    };
}

#[macro_export]
macro_rules! value_router {
    () => {
        pub fn router() -> axum::Router<$crate::state::AppState> {
            use $crate::auth::token::RequiredRolesLayer;
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
                .route("/{id}", get(crud_api::get))
        }
    };
}
