use argon2::{
    password_hash::{rand_core::OsRng, Result as HashResult, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

use garde::Validate;
use mcs_types::{claim::Role, general::ValidEmail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::Result, Batch, Error, ListingParams};

fn hash_password(password: &str) -> HashResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();
    Ok(password_hash)
}

fn verify_password(password: &str, password_hash: &str) -> HashResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)?;
    let res = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);
    if let Err(e) = &res {
        debug!("Invalid password, error {e}");
    }
    Ok(res.is_ok())
}

fn is_valid_role(role: &str, _ctx: &()) -> garde::Result {
    role.parse::<Role>()
        .map_err(|e| garde::Error::new(e.to_string()))
        .map(|_| ())
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateUser {
    #[garde(dive)]
    pub email: ValidEmail,
    #[garde(length(min = 3, max = 255))]
    pub name: Option<String>,
    #[garde(length(min = 8, max = 255))]
    pub password: Option<String>,
    #[garde(inner(inner(custom(is_valid_role))))]
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserInt {
    id: i64,
    name: Option<String>,
    email: String,
    roles: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    pub roles: Option<Vec<String>>,
}

impl From<UserInt> for User {
    fn from(value: UserInt) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            roles: value.roles.map(|s| {
                s.split(',')
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect()
            }),
        }
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(e) if e.is_unique_violation())
}

const VALID_ORDER_FIELDS: &[&str] = &["id", "email", "name"];

pub type UserRepository = UserRepositoryImpl<crate::Pool>;

pub struct UserRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> UserRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateUser) -> Result<User> {
        let password = payload.password.map(|p| hash_password(&p)).transpose()?;
        let email = payload.email.as_ref();
        let roles = payload.roles.map(|roles| roles.join(","));
        let result = sqlx::query("INSERT INTO users (name, email, password, roles) VALUES (?, ?, ?, ?)")
            .bind(&payload.name)
            .bind(email)
            .bind(&password)
            .bind(&roles)
            .execute(&self.executor)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::EmailTaken
                } else {
                    e.into()
                }
            })?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    pub async fn list(&self, params: ListingParams) -> Result<Batch<User>> {
        let order = params.order_clause(VALID_ORDER_FIELDS)?;
        let order = if order.is_empty() {
            "ORDER BY email".to_string()
        } else {
            order
        };
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM users")
            .fetch_one(&self.executor)
            .await?;
        let sql = format!("SELECT id, name, email, roles FROM users {order} LIMIT ? OFFSET ?");
        let rows = sqlx::query_as::<_, UserInt>(&sql)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(&self.executor)
            .await?
            .into_iter()
            .map(User::from)
            .collect();
        Ok(Batch {
            offset: params.offset,
            total: total as u64,
            rows,
        })
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound(format!("User {id}")))
        } else {
            Ok(())
        }
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        let user = sqlx::query_as::<_, UserInt>(
            "SELECT id, name, email, roles FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound(format!("User {id}")))?;
        Ok(user.into())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<User> {
        let user = sqlx::query_as::<_, UserInt>(
            "SELECT id, name, email, roles FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound(format!("User {email}")))?;
        Ok(user.into())
    }

    pub async fn check_password(&self, email: &str, password: &str) -> Result<User> {
        let row: Option<(i64, Option<String>)> =
            sqlx::query_as("SELECT id, password FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.executor)
                .await?;
        let (id, hashed_password) = row.ok_or_else(|| {
            debug!("Unknown user: {email}");
            Error::InvalidCredentials
        })?;
        if let Some(hashed_password) = hashed_password {
            if verify_password(password, &hashed_password).unwrap_or(false) {
                return self.get(id).await;
            }
        }
        Err(Error::InvalidCredentials)
    }

    pub async fn add_role(&self, id: i64, role: Role) -> Result<User> {
        let user = self.get(id).await?;
        let mut roles = user.roles.unwrap_or_default();
        if !roles.iter().any(|r| r == role.as_str()) {
            roles.push(role.as_str().to_string());
        }
        self.set_roles(id, &roles).await
    }

    pub async fn remove_role(&self, id: i64, role: Role) -> Result<User> {
        let user = self.get(id).await?;
        let mut roles = user.roles.unwrap_or_default();
        roles.retain(|r| r != role.as_str());
        self.set_roles(id, &roles).await
    }

    async fn set_roles(&self, id: i64, roles: &[String]) -> Result<User> {
        let joined = roles.join(",");
        sqlx::query("UPDATE users SET roles = ? WHERE id = ?")
            .bind(&joined)
            .bind(id)
            .execute(&self.executor)
            .await?;
        self.get(id).await
    }
}
