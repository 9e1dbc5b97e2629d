//! PostgreSQL store.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Provider, Session, User};

use super::AuthStore;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_insert_err(err: sqlx::Error, conflict_msg: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(conflict_msg.to_string())
        }
        _ => AppError::Database(anyhow::Error::new(err)),
    }
}

#[async_trait]
impl AuthStore for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, name, email, provider_code, provider_user_id, password_hash, banned, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.provider_code)
        .bind(&user.provider_user_id)
        .bind(&user.password_hash)
        .bind(user.banned)
        .bind(user.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_err(e, "user already exists"))?;
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), AppError> {
        // Sessions cascade via FK.
        sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, user_id, remote_ip, user_agent, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&session.session_id)
        .bind(session.user_id)
        .bind(&session.remote_ip)
        .bind(&session.user_agent)
        .bind(session.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        let session =
            sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE session_id = $1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(session)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_provider(&self, code: &str) -> Result<Option<Provider>, AppError> {
        let provider =
            sqlx::query_as::<_, Provider>("SELECT * FROM providers WHERE provider_code = $1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;
        Ok(provider)
    }

    async fn list_providers(&self) -> Result<Vec<Provider>, AppError> {
        let providers =
            sqlx::query_as::<_, Provider>("SELECT * FROM providers ORDER BY provider_code")
                .fetch_all(&self.pool)
                .await?;
        Ok(providers)
    }

    async fn insert_provider_if_absent(&self, provider: &Provider) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO providers (provider_code, provider_name, client_id, client_secret, callback_url, enabled)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (provider_code) DO NOTHING
            "#,
        )
        .bind(&provider.provider_code)
        .bind(&provider.provider_name)
        .bind(&provider.client_id)
        .bind(&provider.client_secret)
        .bind(&provider.callback_url)
        .bind(provider.enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_provider(&self, provider: &Provider) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO providers (provider_code, provider_name, client_id, client_secret, callback_url, enabled)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (provider_code) DO UPDATE SET
                provider_name = EXCLUDED.provider_name,
                client_id = EXCLUDED.client_id,
                client_secret = EXCLUDED.client_secret,
                callback_url = EXCLUDED.callback_url,
                enabled = EXCLUDED.enabled
            "#,
        )
        .bind(&provider.provider_code)
        .bind(&provider.provider_name)
        .bind(&provider.client_id)
        .bind(&provider.client_secret)
        .bind(&provider.callback_url)
        .bind(provider.enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
