use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{error::Result, Batch, Error, ListingParams};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateGenre {
    #[garde(length(min = 1, max = 40))]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct PatchGenre {
    #[garde(inner(length(min = 1, max = 40)))]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

const VALID_ORDER_FIELDS: &[&str] = &["id", "name"];

pub type GenreRepository = GenreRepositoryImpl<crate::Pool>;

pub struct GenreRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> GenreRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateGenre) -> Result<Genre> {
        let result = sqlx::query("INSERT INTO genre (name) VALUES (?)")
            .bind(&payload.name)
            .execute(&self.executor)
            .await?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    pub async fn update(&self, id: i64, payload: CreateGenre) -> Result<Genre> {
        let result = sqlx::query("UPDATE genre SET name = ? WHERE id = ?")
            .bind(&payload.name)
            .bind(id)
            .execute(&self.executor)
            .await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound(format!("Genre {id}")))
        } else {
            self.get(id).await
        }
    }

    /// Overlays present fields on the current record, validates the merged
    /// result and persists it only when valid.
    pub async fn patch(&self, id: i64, payload: PatchGenre) -> Result<Genre> {
        let current = self.get(id).await?;
        let merged = CreateGenre {
            name: payload.name.unwrap_or(current.name),
        };
        merged.validate().map_err(Error::ValidationFailed)?;
        self.update(id, merged).await
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM genre")
            .fetch_one(&self.executor)
            .await?;
        Ok(count as u64)
    }

    pub async fn list_all(&self) -> Result<Vec<Genre>> {
        let records = sqlx::query_as::<_, Genre>("SELECT id, name FROM genre")
            .fetch(&self.executor)
            .take(crate::MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(records)
    }

    pub async fn list(&self, params: ListingParams) -> Result<Batch<Genre>> {
        let order = params.order_clause(VALID_ORDER_FIELDS)?;
        let total = self.count().await?;
        let sql = format!("SELECT id, name FROM genre {order} LIMIT ? OFFSET ?");
        let rows = sqlx::query_as::<_, Genre>(&sql)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(&self.executor)
            .await?;
        Ok(Batch {
            offset: params.offset,
            total,
            rows,
        })
    }

    pub async fn delete(&self, id: i64) -> Result<Genre> {
        let record = self.get(id).await?;
        sqlx::query("DELETE FROM genre WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;
        Ok(record)
    }

    pub async fn get(&self, id: i64) -> Result<Genre> {
        let record = sqlx::query_as::<_, Genre>("SELECT id, name FROM genre WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound(format!("Genre {id}")))?;
        Ok(record)
    }
}
