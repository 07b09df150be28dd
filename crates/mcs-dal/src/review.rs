use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{error::Result, Batch, Error, ListingParams};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateReview {
    #[garde(inner(length(max = 2000)))]
    pub comment: Option<String>,
    #[garde(range(min = 1, max = 5))]
    pub score: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub movie_id: i64,
    pub user_id: i64,
    pub comment: Option<String>,
    pub score: i64,
    pub user_name: Option<String>,
}

const VALID_ORDER_FIELDS: &[&str] = &["id", "score"];

const REVIEW_QUERY: &str = "SELECT r.id, r.movie_id, r.user_id, r.comment, r.score, \
    coalesce(u.name, u.email) AS user_name \
    FROM review r LEFT JOIN users u ON r.user_id = u.id";

pub type ReviewRepository = ReviewRepositoryImpl<crate::Pool>;

pub struct ReviewRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> ReviewRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn list_for_movie(
        &self,
        movie_id: i64,
        params: ListingParams,
    ) -> Result<Batch<Review>> {
        let order = params.order_clause(VALID_ORDER_FIELDS)?;
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM review WHERE movie_id = ?")
            .bind(movie_id)
            .fetch_one(&self.executor)
            .await?;
        let sql = format!("{REVIEW_QUERY} WHERE r.movie_id = ? {order} LIMIT ? OFFSET ?");
        let rows = sqlx::query_as::<_, Review>(&sql)
            .bind(movie_id)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(&self.executor)
            .await?;
        Ok(Batch {
            offset: params.offset,
            total: total as u64,
            rows,
        })
    }

    /// One review per (movie, user) pair - a second attempt is rejected.
    pub async fn create(
        &self,
        movie_id: i64,
        user_id: i64,
        payload: CreateReview,
    ) -> Result<Review> {
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM review WHERE movie_id = ? AND user_id = ?")
                .bind(movie_id)
                .bind(user_id)
                .fetch_optional(&self.executor)
                .await?;
        if existing.is_some() {
            return Err(Error::DuplicateReview { movie_id, user_id });
        }

        let result =
            sqlx::query("INSERT INTO review (movie_id, user_id, comment, score) VALUES (?, ?, ?, ?)")
                .bind(movie_id)
                .bind(user_id)
                .bind(&payload.comment)
                .bind(payload.score)
                .execute(&self.executor)
                .await?;

        self.get(result.last_insert_rowid()).await
    }

    /// Only the owning user may change a review.
    pub async fn update(
        &self,
        review_id: i64,
        user_id: i64,
        payload: CreateReview,
    ) -> Result<Review> {
        let current = self.get(review_id).await?;
        if current.user_id != user_id {
            return Err(Error::NotOwner);
        }
        sqlx::query("UPDATE review SET comment = ?, score = ? WHERE id = ?")
            .bind(&payload.comment)
            .bind(payload.score)
            .bind(review_id)
            .execute(&self.executor)
            .await?;
        self.get(review_id).await
    }

    pub async fn delete(&self, review_id: i64, user_id: i64) -> Result<()> {
        let current = self.get(review_id).await?;
        if current.user_id != user_id {
            return Err(Error::NotOwner);
        }
        sqlx::query("DELETE FROM review WHERE id = ?")
            .bind(review_id)
            .execute(&self.executor)
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Review> {
        let sql = format!("{REVIEW_QUERY} WHERE r.id = ?");
        let record = sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound(format!("Review {id}")))?;
        Ok(record)
    }
}
