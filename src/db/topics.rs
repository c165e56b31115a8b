use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ForumResult;

use super::{Topic, like_pattern};

#[derive(Debug, Clone, FromRow)]
pub struct TopicSummary {
    #[sqlx(flatten)]
    pub topic: Topic,
    pub room_count: i64,
}

/// Exact, case-sensitive lookup by name; inserts the topic if it is missing.
/// Runs on the caller's connection so it joins the caller's transaction.
#[instrument(skip(conn))]
pub async fn resolve_or_create(conn: &mut SqliteConnection, name: &str) -> ForumResult<Topic> {
    let inserted = sqlx::query("INSERT INTO topics (id,name) VALUES (?,?) ON CONFLICT(name) DO NOTHING")
        .bind(Uuid::now_v7())
        .bind(name)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    if inserted > 0 {
        info!(topic = name, "created topic");
    }

    let topic = sqlx::query_as::<_, Topic>("SELECT id,name FROM topics WHERE name=?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(topic)
}

/// Topics whose name contains `query` (ASCII case-insensitive), with how many
/// rooms use each. `limit` of `None` returns all of them.
pub async fn list(db_pool: &SqlitePool, query: &str, limit: Option<i64>) -> ForumResult<Vec<TopicSummary>> {
    let topics = sqlx::query_as::<_, TopicSummary>(
        r"SELECT t.id, t.name, COUNT(r.id) AS room_count
        FROM topics t LEFT JOIN rooms r ON r.topic_id = t.id
        WHERE t.name LIKE ? ESCAPE '\'
        GROUP BY t.id, t.name
        ORDER BY t.name
        LIMIT ?",
    )
    .bind(like_pattern(query))
    .bind(limit.unwrap_or(-1))
    .fetch_all(db_pool)
    .await?;
    Ok(topics)
}
