use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::user::{NewUser, User, UserChanges},
};

/// The persistent user store the issuer and verifier depend on.
///
/// Emails are passed already normalised. `insert` must reject a duplicate
/// email with `AppError::DuplicateCredential` atomically, so that concurrent
/// registrations are serialised by the store rather than by the caller.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn insert(&self, user: NewUser) -> Result<User>;

    /// Applies `changes` and returns the updated user, or `None` if the id is
    /// unknown.
    async fn update_fields(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>>;
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, token_epoch, created_at, updated_at";

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    let missing = |column: &str| AppError::Internal(format!("Missing column: {}", column));
    Ok(User {
        id: row.try_get("id").map_err(|_| missing("id"))?,
        name: row.try_get("name").map_err(|_| missing("name"))?,
        email: row.try_get("email").map_err(|_| missing("email"))?,
        password_hash: row.try_get("password_hash").map_err(|_| missing("password_hash"))?,
        role: row.try_get("role").map_err(|_| missing("role"))?,
        token_epoch: row.try_get("token_epoch").map_err(|_| missing("token_epoch"))?,
        created_at: row.try_get("created_at").map_err(|_| missing("created_at"))?,
        updated_at: row.try_get("updated_at").map_err(|_| missing("updated_at"))?,
    })
}

/// Postgres-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: Pool,
}

impl PgUserStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS),
                &[&email],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS),
                &[&id],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        let client = self.pool.get().await?;
        // A unique violation converts to `DuplicateCredential`.
        let row = client
            .query_one(
                &format!(
                    r#"
                    INSERT INTO users (id, name, email, password_hash, role)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING {}
                    "#,
                    USER_COLUMNS
                ),
                &[&Uuid::new_v4(), &user.name, &user.email, &user.password_hash, &user.role],
            )
            .await?;
        row_to_user(&row)
    }

    async fn update_fields(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let epoch_increment: i32 = if changes.bump_token_epoch { 1 } else { 0 };
        let row = client
            .query_opt(
                &format!(
                    r#"
                    UPDATE users
                    SET
                        name = COALESCE($2, name),
                        password_hash = COALESCE($3, password_hash),
                        role = COALESCE($4, role),
                        token_epoch = token_epoch + $5,
                        updated_at = NOW()
                    WHERE id = $1
                    RETURNING {}
                    "#,
                    USER_COLUMNS
                ),
                &[
                    &id,
                    &changes.name,
                    &changes.password_hash,
                    &changes.role,
                    &epoch_increment,
                ],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }
}

/// A store whose backend is down: every call fails.
#[cfg(test)]
pub(crate) struct UnavailableStore;

#[cfg(test)]
#[async_trait]
impl UserStore for UnavailableStore {
    async fn find_by_email(&self, _email: &str) -> Result<Option<User>> {
        Err(AppError::StoreUnavailable("connection refused".to_string()))
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<User>> {
        Err(AppError::StoreUnavailable("connection refused".to_string()))
    }

    async fn insert(&self, _user: NewUser) -> Result<User> {
        Err(AppError::StoreUnavailable("connection refused".to_string()))
    }

    async fn update_fields(&self, _id: Uuid, _changes: UserChanges) -> Result<Option<User>> {
        Err(AppError::StoreUnavailable("connection refused".to_string()))
    }
}
