//! PostgreSQL implementation of [`Store`].
//!
//! Every round trip runs under the configured timeout; a call that exceeds
//! it is dropped (returning its connection to the pool) and reported as
//! [`StoreError::Timeout`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::pagination::{Metadata, Page, PageRequest};
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::FromRow;

use super::error::StoreError;
use super::store::Store;
use crate::models::{
    Author, NewPuzzle, NewUser, PermissionCode, PermissionSet, PublishedFilter, Puzzle,
    PuzzleData, PuzzleSort, Token, TokenScope, User,
};

const USER_COLUMNS: &str =
    "users.id, users.created_at, users.email, users.full_name, users.display_name, \
     users.password_hash, users.activated, users.version";

const PUZZLE_COLUMNS: &str =
    "p.id, p.created_at, p.updated_at, p.title, p.description, p.content, p.width, p.height, \
     p.published, p.version, u.id AS author_id, u.full_name AS author_full_name, \
     u.display_name AS author_display_name, u.email AS author_email";

#[derive(Debug, FromRow)]
struct PuzzleRow {
    id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    title: String,
    description: String,
    content: Json<PuzzleData>,
    width: i32,
    height: i32,
    published: bool,
    version: i32,
    author_id: i64,
    author_full_name: String,
    author_display_name: String,
    author_email: String,
}

impl From<PuzzleRow> for Puzzle {
    fn from(row: PuzzleRow) -> Self {
        Puzzle {
            id: row.id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            title: row.title,
            description: row.description,
            content: row.content.0,
            width: row.width,
            height: row.height,
            published: row.published,
            author: Author {
                id: row.author_id,
                full_name: row.author_full_name,
                display_name: row.author_display_name,
                email: row.author_email,
            },
            version: row.version,
        }
    }
}

#[derive(Debug, FromRow)]
struct PuzzleListRow {
    total_records: i64,
    #[sqlx(flatten)]
    puzzle: PuzzleRow,
}

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    timeout: Duration,
}

impl Database {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn timed<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => {
                tracing::warn!(operation, timeout = ?self.timeout, "store call timed out");
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }

    async fn count_puzzles(&self, filter: PublishedFilter) -> Result<i64, StoreError> {
        self.timed(
            "count_puzzles",
            sqlx::query_scalar::<_, i64>(
                "SELECT count(*) FROM puzzles WHERE ($1::boolean IS NULL OR published = $1)",
            )
            .bind(filter.as_condition())
            .fetch_one(&self.pool),
        )
        .await
    }
}

#[async_trait]
impl Store for Database {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.timed("health_check", sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Database health check failed");
                e
            })?;
        Ok(())
    }

    async fn insert_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (email, full_name, display_name, password_hash, activated) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );
        self.timed(
            "insert_user",
            sqlx::query_as::<_, User>(&sql)
                .bind(&user.email)
                .bind(&user.full_name)
                .bind(&user.display_name)
                .bind(&user.credential)
                .bind(user.activated)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn get_user(&self, id: i64) -> Result<User, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE users.id = $1", USER_COLUMNS);
        self.timed(
            "get_user",
            sqlx::query_as::<_, User>(&sql).bind(id).fetch_one(&self.pool),
        )
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE users.email = $1", USER_COLUMNS);
        self.timed(
            "get_user_by_email",
            sqlx::query_as::<_, User>(&sql).bind(email).fetch_one(&self.pool),
        )
        .await
    }

    async fn get_user_for_token(&self, scope: TokenScope, hash: &[u8]) -> Result<User, StoreError> {
        let sql = format!(
            "SELECT {} FROM users INNER JOIN tokens ON users.id = tokens.user_id \
             WHERE tokens.hash = $1 AND tokens.scope = $2 AND tokens.expiry > $3",
            USER_COLUMNS
        );
        self.timed(
            "get_user_for_token",
            sqlx::query_as::<_, User>(&sql)
                .bind(hash)
                .bind(scope.as_str())
                .bind(Utc::now())
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn update_user(&self, user: &mut User) -> Result<(), StoreError> {
        let version = self
            .timed(
                "update_user",
                sqlx::query_scalar::<_, i32>(
                    r#"
                    UPDATE users
                    SET email = $1, full_name = $2, display_name = $3, password_hash = $4,
                        activated = $5, version = version + 1
                    WHERE id = $6 AND version = $7
                    RETURNING version
                    "#,
                )
                .bind(&user.email)
                .bind(&user.full_name)
                .bind(&user.display_name)
                .bind(&user.credential)
                .bind(user.activated)
                .bind(user.id)
                .bind(user.version)
                .fetch_optional(&self.pool),
            )
            .await?
            .ok_or(StoreError::EditConflict)?;

        user.version = version;
        Ok(())
    }

    async fn get_permissions_for_user(&self, user_id: i64) -> Result<PermissionSet, StoreError> {
        let codes = self
            .timed(
                "get_permissions_for_user",
                sqlx::query_scalar::<_, String>(
                    r#"
                    SELECT permissions.code
                    FROM permissions
                    INNER JOIN users_permissions ON users_permissions.permission_id = permissions.id
                    WHERE users_permissions.user_id = $1
                    "#,
                )
                .bind(user_id)
                .fetch_all(&self.pool),
            )
            .await?;

        Ok(PermissionSet::from_codes(codes))
    }

    async fn add_permissions_for_user(
        &self,
        user_id: i64,
        codes: &[PermissionCode],
    ) -> Result<(), StoreError> {
        let codes: Vec<String> = codes.iter().map(|c| c.as_str().to_string()).collect();
        self.timed(
            "add_permissions_for_user",
            sqlx::query(
                r#"
                INSERT INTO users_permissions (user_id, permission_id)
                SELECT $1, permissions.id FROM permissions WHERE permissions.code = ANY($2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(&codes)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn insert_token(&self, token: &Token) -> Result<(), StoreError> {
        self.timed(
            "insert_token",
            sqlx::query("INSERT INTO tokens (hash, user_id, expiry, scope) VALUES ($1, $2, $3, $4)")
                .bind(&token.hash)
                .bind(token.user_id)
                .bind(token.expiry)
                .bind(token.scope.as_str())
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn delete_token(&self, scope: TokenScope, hash: &[u8]) -> Result<(), StoreError> {
        self.timed(
            "delete_token",
            sqlx::query("DELETE FROM tokens WHERE hash = $1 AND scope = $2")
                .bind(hash)
                .bind(scope.as_str())
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn delete_expired_tokens_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        let result = self
            .timed(
                "delete_expired_tokens_for_user",
                sqlx::query("DELETE FROM tokens WHERE user_id = $1 AND expiry <= $2")
                    .bind(user_id)
                    .bind(Utc::now())
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_puzzle(&self, puzzle: &NewPuzzle) -> Result<Puzzle, StoreError> {
        let (id, created_at, updated_at, version) = self
            .timed(
                "insert_puzzle",
                sqlx::query_as::<_, (i64, DateTime<Utc>, DateTime<Utc>, i32)>(
                    r#"
                    INSERT INTO puzzles (title, description, content, width, height, published, author_id)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING id, created_at, updated_at, version
                    "#,
                )
                .bind(&puzzle.title)
                .bind(&puzzle.description)
                .bind(Json(&puzzle.content))
                .bind(puzzle.width)
                .bind(puzzle.height)
                .bind(puzzle.published)
                .bind(puzzle.author.id)
                .fetch_one(&self.pool),
            )
            .await?;

        Ok(Puzzle {
            id,
            created_at,
            updated_at,
            title: puzzle.title.clone(),
            description: puzzle.description.clone(),
            content: puzzle.content.clone(),
            width: puzzle.width,
            height: puzzle.height,
            published: puzzle.published,
            author: puzzle.author.clone(),
            version,
        })
    }

    async fn get_puzzle(&self, id: i64) -> Result<Puzzle, StoreError> {
        let sql = format!(
            "SELECT {} FROM puzzles p INNER JOIN users u ON u.id = p.author_id WHERE p.id = $1",
            PUZZLE_COLUMNS
        );
        let row = self
            .timed(
                "get_puzzle",
                sqlx::query_as::<_, PuzzleRow>(&sql).bind(id).fetch_one(&self.pool),
            )
            .await?;
        Ok(row.into())
    }

    async fn update_puzzle(&self, puzzle: &mut Puzzle) -> Result<(), StoreError> {
        let (version, updated_at) = self
            .timed(
                "update_puzzle",
                sqlx::query_as::<_, (i32, DateTime<Utc>)>(
                    r#"
                    UPDATE puzzles
                    SET title = $1, description = $2, content = $3, width = $4, height = $5,
                        published = $6, version = version + 1, updated_at = NOW()
                    WHERE id = $7 AND version = $8
                    RETURNING version, updated_at
                    "#,
                )
                .bind(&puzzle.title)
                .bind(&puzzle.description)
                .bind(Json(&puzzle.content))
                .bind(puzzle.width)
                .bind(puzzle.height)
                .bind(puzzle.published)
                .bind(puzzle.id)
                .bind(puzzle.version)
                .fetch_optional(&self.pool),
            )
            .await?
            .ok_or(StoreError::EditConflict)?;

        puzzle.version = version;
        puzzle.updated_at = updated_at;
        Ok(())
    }

    async fn delete_puzzle(&self, id: i64) -> Result<(), StoreError> {
        let result = self
            .timed(
                "delete_puzzle",
                sqlx::query("DELETE FROM puzzles WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_puzzles(
        &self,
        filter: PublishedFilter,
        page: &PageRequest<PuzzleSort>,
    ) -> Result<Page<Puzzle>, StoreError> {
        // Sort columns come from a closed enum, never from the request text.
        let sql = format!(
            "SELECT count(*) OVER() AS total_records, {} \
             FROM puzzles p INNER JOIN users u ON u.id = p.author_id \
             WHERE ($1::boolean IS NULL OR p.published = $1) \
             ORDER BY p.{} {}, p.id ASC \
             LIMIT $2 OFFSET $3",
            PUZZLE_COLUMNS,
            page.sort.key.column(),
            if page.sort.descending { "DESC" } else { "ASC" },
        );

        let rows = self
            .timed(
                "list_puzzles",
                sqlx::query_as::<_, PuzzleListRow>(&sql)
                    .bind(filter.as_condition())
                    .bind(page.limit())
                    .bind(page.offset())
                    .fetch_all(&self.pool),
            )
            .await?;

        let total_records = match rows.first() {
            Some(row) => row.total_records,
            None => self.count_puzzles(filter).await?,
        };

        Ok(Page {
            items: rows.into_iter().map(|row| row.puzzle.into()).collect(),
            metadata: Metadata::calculate(
                u64::try_from(total_records).unwrap_or(0),
                page.page,
                page.page_size,
            ),
        })
    }
}
