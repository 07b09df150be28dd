use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{error::Result, Batch, Error, ListingParams};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateActor {
    #[garde(length(min = 1, max = 120))]
    pub name: String,
    #[garde(skip)]
    pub birth_date: Date,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct PatchActor {
    #[garde(inner(length(min = 1, max = 120)))]
    pub name: Option<String>,
    #[garde(skip)]
    pub birth_date: Option<Date>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub birth_date: Date,
    pub photo: Option<String>,
}

const VALID_ORDER_FIELDS: &[&str] = &["id", "name", "birth_date"];

pub type ActorRepository = ActorRepositoryImpl<crate::Pool>;

pub struct ActorRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> ActorRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Photo is stored by the caller, only its relative path lands here.
    pub async fn create(&self, payload: CreateActor, photo: Option<String>) -> Result<Actor> {
        let result = sqlx::query("INSERT INTO actor (name, birth_date, photo) VALUES (?, ?, ?)")
            .bind(&payload.name)
            .bind(payload.birth_date)
            .bind(&photo)
            .execute(&self.executor)
            .await?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    /// Full replace of scalar fields; `photo` is the final value to keep
    /// (caller passes the current one through when no new file came in).
    pub async fn update(
        &self,
        id: i64,
        payload: CreateActor,
        photo: Option<String>,
    ) -> Result<Actor> {
        let result = sqlx::query("UPDATE actor SET name = ?, birth_date = ?, photo = ? WHERE id = ?")
            .bind(&payload.name)
            .bind(payload.birth_date)
            .bind(&photo)
            .bind(id)
            .execute(&self.executor)
            .await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound(format!("Actor {id}")))
        } else {
            self.get(id).await
        }
    }

    pub async fn patch(&self, id: i64, payload: PatchActor) -> Result<Actor> {
        let current = self.get(id).await?;
        let merged = CreateActor {
            name: payload.name.unwrap_or(current.name),
            birth_date: payload.birth_date.unwrap_or(current.birth_date),
        };
        merged.validate().map_err(Error::ValidationFailed)?;
        self.update(id, merged, current.photo).await
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM actor")
            .fetch_one(&self.executor)
            .await?;
        Ok(count as u64)
    }

    pub async fn list_all(&self) -> Result<Vec<Actor>> {
        let records =
            sqlx::query_as::<_, Actor>("SELECT id, name, birth_date, photo FROM actor")
                .fetch(&self.executor)
                .take(crate::MAX_LIMIT)
                .try_collect::<Vec<_>>()
                .await?;
        Ok(records)
    }

    pub async fn list(&self, params: ListingParams) -> Result<Batch<Actor>> {
        let order = params.order_clause(VALID_ORDER_FIELDS)?;
        let total = self.count().await?;
        let sql =
            format!("SELECT id, name, birth_date, photo FROM actor {order} LIMIT ? OFFSET ?");
        let rows = sqlx::query_as::<_, Actor>(&sql)
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

    pub async fn delete(&self, id: i64) -> Result<Actor> {
        let record = self.get(id).await?;
        sqlx::query("DELETE FROM actor WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;
        Ok(record)
    }

    pub async fn get(&self, id: i64) -> Result<Actor> {
        let record = sqlx::query_as::<_, Actor>(
            "SELECT id, name, birth_date, photo FROM actor WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound(format!("Actor {id}")))?;
        Ok(record)
    }
}
