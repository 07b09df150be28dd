use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire as _, SqliteConnection};
use time::Date;
use tracing::warn;

use crate::{error::Result, genre::Genre, Batch, Error};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateMovie {
    #[garde(length(min = 1, max = 300))]
    pub title: String,
    #[serde(default)]
    #[garde(skip)]
    pub just_released: bool,
    #[garde(skip)]
    pub release_date: Date,
    #[serde(default)]
    #[garde(skip)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    #[garde(dive)]
    pub actors: Vec<MovieActorLink>,
    #[serde(default)]
    #[garde(skip)]
    pub cinema_ids: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct MovieActorLink {
    #[garde(skip)]
    pub actor_id: i64,
    #[garde(inner(length(max = 120)))]
    pub character: Option<String>,
}

/// Patch view - scalar fields only, relations are untouched by PATCH.
#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct PatchMovie {
    #[garde(inner(length(min = 1, max = 300)))]
    pub title: Option<String>,
    #[garde(skip)]
    pub just_released: Option<bool>,
    #[garde(skip)]
    pub release_date: Option<Date>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub just_released: bool,
    pub release_date: Date,
    pub poster: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    pub character: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MovieDetail {
    pub id: i64,
    pub title: String,
    pub just_released: bool,
    pub release_date: Date,
    pub poster: Option<String>,
    pub genres: Vec<Genre>,
    pub actors: Vec<CastMember>,
    pub cinemas: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LatestMovies {
    pub in_theaters: Vec<Movie>,
    pub coming_releases: Vec<Movie>,
}

/// All supplied filters are ANDed; unset ones are no-ops.
#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    pub title: Option<String>,
    pub genre_id: Option<i64>,
    pub just_released: bool,
    pub coming_release: bool,
    pub order_field: Option<String>,
    pub descending: bool,
}

const VALID_ORDER_FIELDS: &[&str] = &["id", "title", "release_date", "just_released"];
const MOVIE_COLUMNS: &str = "id, title, just_released, release_date, poster";
const LATEST_COUNT: i64 = 3;

pub type MovieRepository = MovieRepositoryImpl<crate::Pool>;

pub struct MovieRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> MovieRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>
        + sqlx::Acquire<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Inserts the movie and its join rows in one transaction.
    /// Poster is stored by the caller, only its relative path lands here.
    pub async fn create(&self, payload: CreateMovie, poster: Option<String>) -> Result<MovieDetail> {
        let mut tx = self.executor.begin().await?;
        let result = sqlx::query(
            "INSERT INTO movie (title, just_released, release_date, poster) VALUES (?, ?, ?, ?)",
        )
        .bind(&payload.title)
        .bind(payload.just_released)
        .bind(payload.release_date)
        .bind(&poster)
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();
        write_links(&mut tx, id, &payload).await?;
        let record = get_detail(id, &mut *tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Full replace: scalar fields and all join rows. Actor order follows
    /// the order of the submitted cast list.
    pub async fn update(
        &self,
        id: i64,
        payload: CreateMovie,
        poster: Option<String>,
    ) -> Result<MovieDetail> {
        let mut tx = self.executor.begin().await?;
        let result = sqlx::query(
            "UPDATE movie SET title = ?, just_released = ?, release_date = ?, poster = ? WHERE id = ?",
        )
        .bind(&payload.title)
        .bind(payload.just_released)
        .bind(payload.release_date)
        .bind(&poster)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound(format!("Movie {id}")));
        }
        write_links(&mut tx, id, &payload).await?;
        let record = get_detail(id, &mut *tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    pub async fn patch(&self, id: i64, payload: PatchMovie) -> Result<Movie> {
        let current = self.get_brief(id).await?;
        let merged = CreateMovie {
            title: payload.title.unwrap_or(current.title),
            just_released: payload.just_released.unwrap_or(current.just_released),
            release_date: payload.release_date.unwrap_or(current.release_date),
            genre_ids: Vec::new(),
            actors: Vec::new(),
            cinema_ids: Vec::new(),
        };
        merged.validate().map_err(Error::ValidationFailed)?;
        sqlx::query("UPDATE movie SET title = ?, just_released = ?, release_date = ? WHERE id = ?")
            .bind(&merged.title)
            .bind(merged.just_released)
            .bind(merged.release_date)
            .bind(id)
            .execute(&self.executor)
            .await?;
        self.get_brief(id).await
    }

    pub async fn get(&self, id: i64) -> Result<MovieDetail> {
        let mut conn = self.executor.acquire().await?;
        get_detail(id, &mut *conn).await
    }

    pub async fn get_brief(&self, id: i64) -> Result<Movie> {
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movie WHERE id = ?");
        let record = sqlx::query_as::<_, Movie>(&sql)
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound(format!("Movie {id}")))?;
        Ok(record)
    }

    pub async fn exists(&self, id: i64) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM movie WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?;
        Ok(found.is_some())
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM movie")
            .fetch_one(&self.executor)
            .await?;
        Ok(count as u64)
    }

    /// Join rows cascade in the store; the returned row lets the caller
    /// clean up an attached poster file.
    pub async fn delete(&self, id: i64) -> Result<Movie> {
        let record = self.get_brief(id).await?;
        sqlx::query("DELETE FROM movie WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;
        Ok(record)
    }

    /// Dynamic filter: predicates compose with AND in fixed order, the page
    /// count runs against the same WHERE clause as the page slice. `today`
    /// is evaluated once per request so every row shares one boundary.
    pub async fn filter(
        &self,
        filter: MovieFilter,
        today: Date,
        offset: i64,
        limit: i64,
    ) -> Result<Batch<Movie>> {
        let genre_id = filter.genre_id.filter(|&g| g != 0);

        let mut conditions: Vec<&str> = Vec::new();
        if filter.title.is_some() {
            conditions.push("title LIKE ?");
        }
        if filter.just_released {
            conditions.push("just_released = 1");
        }
        if filter.coming_release {
            conditions.push("release_date > ?");
        }
        if genre_id.is_some() {
            conditions.push(
                "EXISTS (SELECT 1 FROM movie_genres mg WHERE mg.movie_id = movie.id AND mg.genre_id = ?)",
            );
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let order_clause = match filter.order_field.as_deref() {
            Some(field) if VALID_ORDER_FIELDS.contains(&field) => {
                let direction = if filter.descending { " DESC" } else { "" };
                format!("ORDER BY {field}{direction}")
            }
            Some(field) => {
                warn!("Ignoring unknown movie sort field: {field}");
                String::new()
            }
            None => String::new(),
        };

        macro_rules! bind_filter {
            ($query:expr) => {{
                let mut query = $query;
                if let Some(title) = &filter.title {
                    query = query.bind(format!("%{title}%"));
                }
                if filter.coming_release {
                    query = query.bind(today);
                }
                if let Some(genre_id) = genre_id {
                    query = query.bind(genre_id);
                }
                query
            }};
        }

        let count_sql = format!("SELECT count(*) FROM movie {where_clause}");
        let total: i64 = bind_filter!(sqlx::query_scalar(&count_sql))
            .fetch_one(&self.executor)
            .await?;

        let page_sql = format!(
            "SELECT {MOVIE_COLUMNS} FROM movie {where_clause} {order_clause} LIMIT ? OFFSET ?"
        );
        let rows = bind_filter!(sqlx::query_as::<_, Movie>(&page_sql))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.executor)
            .await?;

        Ok(Batch {
            offset,
            total: total as u64,
            rows,
        })
    }

    /// Three newest titles in theaters and three closest coming releases.
    pub async fn latest(&self, today: Date) -> Result<LatestMovies> {
        let sql = format!(
            "SELECT {MOVIE_COLUMNS} FROM movie WHERE just_released = 1 \
             ORDER BY release_date DESC LIMIT ?"
        );
        let in_theaters = sqlx::query_as::<_, Movie>(&sql)
            .bind(LATEST_COUNT)
            .fetch_all(&self.executor)
            .await?;

        let sql = format!(
            "SELECT {MOVIE_COLUMNS} FROM movie WHERE release_date > ? \
             ORDER BY release_date LIMIT ?"
        );
        let coming_releases = sqlx::query_as::<_, Movie>(&sql)
            .bind(today)
            .bind(LATEST_COUNT)
            .fetch_all(&self.executor)
            .await?;

        Ok(LatestMovies {
            in_theaters,
            coming_releases,
        })
    }
}

async fn write_links(
    tx: &mut sqlx::Transaction<'_, crate::ChosenDB>,
    movie_id: i64,
    payload: &CreateMovie,
) -> Result<()> {
    for table in ["movie_genres", "movie_actors", "movie_cinemas"] {
        let sql = format!("DELETE FROM {table} WHERE movie_id = ?");
        sqlx::query(&sql).bind(movie_id).execute(&mut **tx).await?;
    }

    for genre_id in &payload.genre_ids {
        sqlx::query("INSERT INTO movie_genres (movie_id, genre_id) VALUES (?, ?)")
            .bind(movie_id)
            .bind(genre_id)
            .execute(&mut **tx)
            .await?;
    }
    for (ord, link) in payload.actors.iter().enumerate() {
        sqlx::query(
            "INSERT INTO movie_actors (movie_id, actor_id, character, ord) VALUES (?, ?, ?, ?)",
        )
        .bind(movie_id)
        .bind(link.actor_id)
        .bind(&link.character)
        .bind(ord as i64)
        .execute(&mut **tx)
        .await?;
    }
    for cinema_id in &payload.cinema_ids {
        sqlx::query("INSERT INTO movie_cinemas (movie_id, cinema_id) VALUES (?, ?)")
            .bind(movie_id)
            .bind(cinema_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn get_detail(id: i64, conn: &mut SqliteConnection) -> Result<MovieDetail> {
    let sql = format!("SELECT {MOVIE_COLUMNS} FROM movie WHERE id = ?");
    let movie = sqlx::query_as::<_, Movie>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::RecordNotFound(format!("Movie {id}")))?;

    let genres = sqlx::query_as::<_, Genre>(
        "SELECT g.id, g.name FROM genre g \
         JOIN movie_genres mg ON mg.genre_id = g.id WHERE mg.movie_id = ? ORDER BY g.name",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let actors = sqlx::query_as::<_, CastMember>(
        "SELECT a.id, a.name, ma.character FROM actor a \
         JOIN movie_actors ma ON ma.actor_id = a.id WHERE ma.movie_id = ? ORDER BY ma.ord",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let cinemas =
        sqlx::query_scalar::<_, i64>("SELECT cinema_id FROM movie_cinemas WHERE movie_id = ?")
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;

    Ok(MovieDetail {
        id: movie.id,
        title: movie.title,
        just_released: movie.just_released,
        release_date: movie.release_date,
        poster: movie.poster,
        genres,
        actors,
        cinemas,
    })
}
