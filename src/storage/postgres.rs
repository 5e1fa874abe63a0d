//! PostgreSQL backend built on `sqlx`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};

use super::{OwnedWrite, PostStore, StoreError, UserStore, VoteStore};
use crate::{
    config::{ConfigError, DatabaseConfig},
    models::{
        post::{Post, PostDraft, PostFilter, PostOut},
        user::{NewUser, User, UserOut},
    },
};

const CONNECT_ATTEMPTS: u32 = 5;

/// Joined post/owner/vote-count projection shared by every post query.
const SELECT_POST_OUT: &str = r#"
    SELECT
        p.id, p.title, p.content, p.published, p.created_at, p.owner_id,
        u.email AS owner_email, u.created_at AS owner_created_at,
        COUNT(v.post_id) AS votes
    FROM posts p
    JOIN users u ON u.id = p.owner_id
    LEFT JOIN votes v ON v.post_id = p.id
"#;

#[derive(Debug, FromRow)]
struct PostRow {
    id: i64,
    title: String,
    content: String,
    published: bool,
    created_at: DateTime<Utc>,
    owner_id: i64,
    owner_email: String,
    owner_created_at: DateTime<Utc>,
    votes: i64,
}

impl PostRow {
    fn into_post_out(self) -> PostOut {
        let votes = self.votes;
        PostOut {
            post: self.into_post(),
            votes,
        }
    }

    fn into_post(self) -> Post {
        Post {
            id: self.id,
            title: self.title,
            content: self.content,
            published: self.published,
            created_at: self.created_at,
            owner_id: self.owner_id,
            owner: UserOut {
                id: self.owner_id,
                email: self.owner_email,
                created_at: self.owner_created_at,
            },
        }
    }
}

fn db_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::UniqueViolation(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StoreError::ForeignKeyViolation(db.message().to_string())
        }
        _ => {
            tracing::error!("Database error: {:?}", err);
            StoreError::Backend(err.to_string())
        }
    }
}

#[derive(Debug)]
pub enum ConnectError {
    Config(ConfigError),
    Database(sqlx::Error),
    Migrate(sqlx::migrate::MigrateError),
}

impl std::fmt::Display for ConnectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectError::Config(e) => write!(f, "invalid database configuration: {e}"),
            ConnectError::Database(e) => {
                write!(f, "failed to connect to database after {CONNECT_ATTEMPTS} attempts: {e}")
            }
            ConnectError::Migrate(e) => write!(f, "failed to run database migrations: {e}"),
        }
    }
}

impl std::error::Error for ConnectError {}

/// Shared handle over a connection pool. Every call checks a connection out
/// and returns it when the call completes.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens the pool, retrying while the database comes up, then applies
    /// pending migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, ConnectError> {
        let url = config.connection_url().map_err(ConnectError::Config)?;

        let mut retry_count = 0;
        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
                .connect(&url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) => {
                    retry_count += 1;
                    if retry_count >= CONNECT_ATTEMPTS {
                        return Err(ConnectError::Database(e));
                    }
                    tracing::warn!(
                        "Database not ready, retrying in 2s... (Attempt {})",
                        retry_count
                    );
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        };
        tracing::info!("Database connected...");

        Self::migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(pool: &PgPool) -> Result<(), ConnectError> {
        tracing::info!("Running migrations...");
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(ConnectError::Migrate)?;
        tracing::info!("Migrations applied successfully.");
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password)
            VALUES ($1, $2)
            RETURNING id, email, password, created_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>("SELECT id, email, password, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<PostOut>, StoreError> {
        // strpos is a plain case-sensitive substring test; '' matches every title.
        let sql = format!(
            "{SELECT_POST_OUT}
            WHERE strpos(p.title, $1) > 0
            GROUP BY p.id, u.id
            ORDER BY p.id
            LIMIT $2 OFFSET $3"
        );

        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(&filter.search)
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(PostRow::into_post_out).collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostOut>, StoreError> {
        let sql = format!("{SELECT_POST_OUT} WHERE p.id = $1 GROUP BY p.id, u.id");

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(PostRow::into_post_out))
    }

    async fn find_post_owner(&self, id: i64) -> Result<Option<i64>, StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT owner_id FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn insert_post(&self, owner_id: i64, draft: &PostDraft) -> Result<Post, StoreError> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            WITH inserted AS (
                INSERT INTO posts (title, content, published, owner_id)
                VALUES ($1, $2, $3, $4)
                RETURNING id, title, content, published, created_at, owner_id
            )
            SELECT
                i.id, i.title, i.content, i.published, i.created_at, i.owner_id,
                u.email AS owner_email, u.created_at AS owner_created_at,
                0::BIGINT AS votes
            FROM inserted i
            JOIN users u ON u.id = i.owner_id
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(draft.published)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.into_post())
    }

    async fn update_post(
        &self,
        id: i64,
        owner_id: i64,
        draft: &PostDraft,
    ) -> Result<OwnedWrite<Post>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Row lock held until commit; dropping `tx` on an early return rolls back.
        let owner = sqlx::query_scalar::<_, i64>("SELECT owner_id FROM posts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;

        match owner {
            None => return Ok(OwnedWrite::Missing),
            Some(owner) if owner != owner_id => return Ok(OwnedWrite::NotOwner),
            Some(_) => {}
        }

        let row = sqlx::query_as::<_, PostRow>(
            r#"
            WITH updated AS (
                UPDATE posts
                SET title = $2, content = $3, published = $4
                WHERE id = $1
                RETURNING id, title, content, published, created_at, owner_id
            )
            SELECT
                p.id, p.title, p.content, p.published, p.created_at, p.owner_id,
                u.email AS owner_email, u.created_at AS owner_created_at,
                0::BIGINT AS votes
            FROM updated p
            JOIN users u ON u.id = p.owner_id
            "#,
        )
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(draft.published)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        Ok(OwnedWrite::Applied(row.into_post()))
    }

    async fn delete_post(&self, id: i64, owner_id: i64) -> Result<OwnedWrite<()>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let owner = sqlx::query_scalar::<_, i64>("SELECT owner_id FROM posts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;

        match owner {
            None => return Ok(OwnedWrite::Missing),
            Some(owner) if owner != owner_id => return Ok(OwnedWrite::NotOwner),
            Some(_) => {}
        }

        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        Ok(OwnedWrite::Applied(()))
    }
}

#[async_trait]
impl VoteStore for PgStore {
    async fn insert_vote(&self, post_id: i64, user_id: i64) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO votes (post_id, user_id) VALUES ($1, $2)")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn delete_vote(&self, post_id: i64, user_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM votes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}
