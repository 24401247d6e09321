use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use tracing::info;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{missing_parent, AppError},
    models::comment::{validate_content, Comment, CommentFilter, CommentPatch, NewComment},
};

use super::{fold_search, matches_search};

const COMMENT_COLUMNS: &str =
    "id, trip_id, user_discord_id, user_name, content, created_at, updated_at";

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, new_comment: NewComment) -> Result<Comment, AppError>;
    async fn get(&self, id: &str) -> Result<Comment, AppError>;
    async fn list(&self, filter: &CommentFilter) -> Result<Vec<Comment>, AppError>;
    async fn update(&self, id: &str, patch: &CommentPatch) -> Result<Comment, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SqliteCommentRepository {
    pool: DbPool,
}

impl SqliteCommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for SqliteCommentRepository {
    async fn create(&self, new_comment: NewComment) -> Result<Comment, AppError> {
        new_comment.validate()?;

        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            trip_id: new_comment.trip_id,
            user_discord_id: new_comment.user_discord_id,
            user_name: new_comment.user_name,
            content: new_comment.content,
            created_at: now,
            updated_at: now,
        };

        // The foreign key rejects comments on unknown trips.
        sqlx::query(&format!(
            "INSERT INTO comments ({COMMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
        ))
        .bind(&comment.id)
        .bind(&comment.trip_id)
        .bind(&comment.user_discord_id)
        .bind(&comment.user_name)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(missing_parent)?;

        info!(comment_id = %comment.id, trip_id = %comment.trip_id, "comment added");
        Ok(comment)
    }

    async fn get(&self, id: &str) -> Result<Comment, AppError> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)
    }

    async fn list(&self, filter: &CommentFilter) -> Result<Vec<Comment>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE 1 = 1"
        ));
        if let Some(trip_id) = &filter.trip_id {
            query.push(" AND trip_id = ").push_bind(trip_id.clone());
        }
        query.push(" ORDER BY created_at ASC, rowid ASC");

        let comments = query
            .build_query_as::<Comment>()
            .fetch_all(&self.pool)
            .await?;

        let Some(term) = fold_search(filter.search.as_deref()) else {
            return Ok(comments);
        };
        Ok(comments
            .into_iter()
            .filter(|comment| {
                matches_search(
                    &term,
                    [
                        comment.content.as_str(),
                        comment.user_name.as_str(),
                        comment.user_discord_id.as_str(),
                    ],
                )
            })
            .collect())
    }

    async fn update(&self, id: &str, patch: &CommentPatch) -> Result<Comment, AppError> {
        let Some(content) = &patch.content else {
            return self.get(id).await;
        };
        validate_content(content)?;

        sqlx::query_as::<_, Comment>(&format!(
            "UPDATE comments SET content = ?1, updated_at = ?2 WHERE id = ?3 \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(content)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        info!(comment_id = id, "comment deleted");
        Ok(())
    }
}
