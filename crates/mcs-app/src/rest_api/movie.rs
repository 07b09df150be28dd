use mcs_dal::movie::{CreateMovie, MovieRepository, PatchMovie};

use crate::state::AppState;

type EntityRepository = MovieRepository;
crate::repository_from_request!(EntityRepository);

mod crud_api {
    use super::*;
    use crate::error::{ApiError, ApiResult};
    use crate::rest_api::upload::{parse_bool, parse_date, parse_json, read_image, ImageUpload};
    use crate::rest_api::Page;
    use axum::{
        extract::{Multipart, Path, Query, State},
        response::IntoResponse,
        Json,
    };
    use axum_valid::Garde;
    use garde::Validate;
    use http::StatusCode;
    use mcs_dal::movie::MovieFilter;
    use mcs_dal::MAX_PAGE_SIZE;
    use mcs_store::Container;
    use serde::Deserialize;
    use time::OffsetDateTime;
    use tracing::debug;

    /// Query shape of the dynamic filter endpoint; everything is optional
    /// and supplied filters combine with AND.
    #[derive(Debug, Clone, Validate, Deserialize)]
    #[garde(allow_unvalidated)]
    pub struct MovieFilterQuery {
        page: Option<u32>,
        records_per_page: Option<u32>,
        #[garde(length(max = 300))]
        title: Option<String>,
        genre_id: Option<i64>,
        #[serde(default)]
        just_released: bool,
        #[serde(default)]
        coming_release: bool,
        #[garde(length(max = 100))]
        order_field: Option<String>,
        #[serde(default)]
        descending: bool,
    }

    pub async fn filter(
        repository: EntityRepository,
        State(state): State<AppState>,
        Garde(Query(query)): Garde<Query<MovieFilterQuery>>,
    ) -> ApiResult<impl IntoResponse> {
        let page = query.page.unwrap_or(1).max(1);
        let page_size = query
            .records_per_page
            .unwrap_or(state.config().default_page_size)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = ((page - 1) * page_size) as i64;
        // one boundary for every row of this request
        let today = OffsetDateTime::now_utc().date();

        let filter = MovieFilter {
            title: query.title,
            genre_id: query.genre_id,
            just_released: query.just_released,
            coming_release: query.coming_release,
            order_field: query.order_field,
            descending: query.descending,
        };
        let batch = repository
            .filter(filter, today, offset, page_size as i64)
            .await?;

        Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
    }

    pub async fn latest(repository: EntityRepository) -> ApiResult<impl IntoResponse> {
        let today = OffsetDateTime::now_utc().date();
        let movies = repository.latest(today).await?;
        Ok((StatusCode::OK, Json(movies)))
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

    async fn parse_form(mut multipart: Multipart) -> ApiResult<(CreateMovie, Option<ImageUpload>)> {
        let mut title = None;
        let mut just_released = false;
        let mut release_date = None;
        let mut genre_ids = Vec::new();
        let mut actors = Vec::new();
        let mut cinema_ids = Vec::new();
        let mut poster = None;
        while let Some(field) = multipart.next_field().await? {
            let field_name = field.name().map(|n| n.to_string());
            match field_name.as_deref() {
                Some("title") => title = Some(field.text().await?),
                Some("just_released") => just_released = parse_bool(&field.text().await?)?,
                Some("release_date") => release_date = Some(parse_date(&field.text().await?)?),
                Some("genre_ids") => genre_ids = parse_json(&field.text().await?)?,
                Some("actors") => actors = parse_json(&field.text().await?)?,
                Some("cinema_ids") => cinema_ids = parse_json(&field.text().await?)?,
                Some("poster") => poster = Some(read_image(field).await?),
                other => debug!("Ignoring unexpected form field: {other:?}"),
            }
        }
        let payload = CreateMovie {
            title: title.ok_or_else(|| ApiError::InvalidRequest("Missing title field".into()))?,
            just_released,
            release_date: release_date
                .ok_or_else(|| ApiError::InvalidRequest("Missing release_date field".into()))?,
            genre_ids,
            actors,
            cinema_ids,
        };
        payload.validate().map_err(ApiError::Validation)?;
        Ok((payload, poster))
    }

    pub async fn create(
        State(state): State<AppState>,
        repository: EntityRepository,
        multipart: Multipart,
    ) -> ApiResult<impl IntoResponse> {
        let (payload, poster) = parse_form(multipart).await?;
        let poster_path = match poster {
            Some(image) => Some(
                state
                    .store()
                    .save(Container::Movies, image.ext, &image.data)
                    .await?,
            ),
            None => None,
        };
        let record = repository.create(payload, poster_path).await?;
        let location = [(http::header::LOCATION, format!("/api/movie/{}", record.id))];

        Ok((StatusCode::CREATED, location, Json(record)))
    }

    pub async fn update(
        Path(id): Path<i64>,
        State(state): State<AppState>,
        repository: EntityRepository,
        multipart: Multipart,
    ) -> ApiResult<impl IntoResponse> {
        let current = repository.get_brief(id).await?;
        let (payload, poster) = parse_form(multipart).await?;
        let poster_path = match poster {
            Some(image) => Some(
                state
                    .store()
                    .replace(
                        Container::Movies,
                        image.ext,
                        &image.data,
                        current.poster.as_deref(),
                    )
                    .await?,
            ),
            None => current.poster,
        };
        repository.update(id, payload, poster_path).await?;

        Ok((StatusCode::NO_CONTENT, ()))
    }

    pub async fn patch(
        Path(id): Path<i64>,
        repository: EntityRepository,
        Json(payload): Json<PatchMovie>,
    ) -> ApiResult<impl IntoResponse> {
        repository.patch(id, payload).await?;

        Ok((StatusCode::NO_CONTENT, ()))
    }

    pub async fn delete(
        Path(id): Path<i64>,
        State(state): State<AppState>,
        repository: EntityRepository,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.delete(id).await?;
        if let Some(poster) = record.poster {
            state.store().delete(&poster).await?;
        }

        Ok((StatusCode::NO_CONTENT, ()))
    }
}

pub fn router() -> axum::Router<AppState> {
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
        .route("/filter", get(crud_api::filter))
        .route("/latest", get(crud_api::latest))
        .route("/count", get(crud_api::count))
        .route("/{id}", get(crud_api::get))
        .nest("/{id}/review", super::review::router())
}
