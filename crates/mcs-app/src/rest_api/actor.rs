use mcs_dal::actor::{ActorRepository, CreateActor, PatchActor};

use crate::state::AppState;

type EntityRepository = ActorRepository;
crate::repository_from_request!(EntityRepository);

mod crud_api {
    use super::*;
    use crate::error::{ApiError, ApiResult};
    use crate::rest_api::upload::{parse_date, read_image, ImageUpload};
    use crate::rest_api::Paging;
    use axum::{
        extract::{Multipart, Path, Query, State},
        response::IntoResponse,
        Json,
    };
    use axum_valid::Garde;
    use garde::Validate as _;
    use http::StatusCode;
    use mcs_store::Container;
    use tracing::debug;

    crate::api_read_only!(Actor);

    async fn parse_form(mut multipart: Multipart) -> ApiResult<(CreateActor, Option<ImageUpload>)> {
        let mut name = None;
        let mut birth_date = None;
        let mut photo = None;
        while let Some(field) = multipart.next_field().await? {
            let field_name = field.name().map(|n| n.to_string());
            match field_name.as_deref() {
                Some("name") => name = Some(field.text().await?),
                Some("birth_date") => birth_date = Some(parse_date(&field.text().await?)?),
                Some("photo") => photo = Some(read_image(field).await?),
                other => debug!("Ignoring unexpected form field: {other:?}"),
            }
        }
        let payload = CreateActor {
            name: name.ok_or_else(|| ApiError::InvalidRequest("Missing name field".into()))?,
            birth_date: birth_date
                .ok_or_else(|| ApiError::InvalidRequest("Missing birth_date field".into()))?,
        };
        payload.validate().map_err(ApiError::Validation)?;
        Ok((payload, photo))
    }

    pub async fn create(
        State(state): State<AppState>,
        repository: EntityRepository,
        multipart: Multipart,
    ) -> ApiResult<impl IntoResponse> {
        let (payload, photo) = parse_form(multipart).await?;
        // file first, record second - an orphaned file is possible, a dangling
        // record path is not
        let photo_path = match photo {
            Some(image) => Some(
                state
                    .store()
                    .save(Container::Actors, image.ext, &image.data)
                    .await?,
            ),
            None => None,
        };
        let record = repository.create(payload, photo_path).await?;
        let location = [(http::header::LOCATION, format!("/api/actor/{}", record.id))];

        Ok((StatusCode::CREATED, location, Json(record)))
    }

    pub async fn update(
        Path(id): Path<i64>,
        State(state): State<AppState>,
        repository: EntityRepository,
        multipart: Multipart,
    ) -> ApiResult<impl IntoResponse> {
        // 404 before anything touches the store
        let current = repository.get(id).await?;
        let (payload, photo) = parse_form(multipart).await?;
        let photo_path = match photo {
            Some(image) => Some(
                state
                    .store()
                    .replace(
                        Container::Actors,
                        image.ext,
                        &image.data,
                        current.photo.as_deref(),
                    )
                    .await?,
            ),
            None => current.photo,
        };
        repository.update(id, payload, photo_path).await?;

        Ok((StatusCode::NO_CONTENT, ()))
    }

    pub async fn patch(
        Path(id): Path<i64>,
        repository: EntityRepository,
        Json(payload): Json<PatchActor>,
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
        if let Some(photo) = record.photo {
            state.store().delete(&photo).await?;
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
        .route("/", get(crud_api::list))
        .route("/all", get(crud_api::list_all))
        .route("/count", get(crud_api::count))
        .route("/{id}", get(crud_api::get))
}
