use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    access,
    error::{ForumError, ForumResult},
    forms::FormErrors,
};

use super::{Message, begin_write, like_pattern, rooms, stamp};

/// A message with its author and room, as feeds display it.
#[derive(Debug, Clone, FromRow)]
pub struct MessageView {
    #[sqlx(flatten)]
    pub message: Message,
    pub username: String,
    pub avatar: Option<String>,
    pub room_name: String,
}

const MESSAGE_VIEW_SELECT: &str = "SELECT m.id, m.room_id, m.user_id, m.body, m.created, \
    u.username AS username, u.avatar AS avatar, r.name AS room_name \
    FROM messages m JOIN users u ON u.id = m.user_id JOIN rooms r ON r.id = m.room_id";

pub async fn find<'e>(executor: impl Executor<'e, Database = Sqlite>, id: Uuid) -> ForumResult<Message> {
    sqlx::query_as::<_, Message>("SELECT id,room_id,user_id,body,created FROM messages WHERE id=?")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or(ForumError::NotFound("message"))
}

/// Oldest first.
pub async fn in_room(db_pool: &SqlitePool, room_id: Uuid) -> ForumResult<Vec<MessageView>> {
    let messages = sqlx::query_as::<_, MessageView>(&format!(
        "{MESSAGE_VIEW_SELECT} WHERE m.room_id=? ORDER BY m.created, m.rowid"
    ))
    .bind(room_id)
    .fetch_all(db_pool)
    .await?;
    Ok(messages)
}

pub async fn by_user(db_pool: &SqlitePool, user_id: Uuid) -> ForumResult<Vec<MessageView>> {
    let messages = sqlx::query_as::<_, MessageView>(&format!(
        "{MESSAGE_VIEW_SELECT} WHERE m.user_id=? ORDER BY m.created DESC, m.rowid DESC"
    ))
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;
    Ok(messages)
}

/// Newest first, limited to rooms whose topic name contains `topic_query`.
pub async fn recent(db_pool: &SqlitePool, topic_query: &str, limit: Option<i64>) -> ForumResult<Vec<MessageView>> {
    let messages = sqlx::query_as::<_, MessageView>(&format!(
        r"{MESSAGE_VIEW_SELECT} JOIN topics t ON t.id = r.topic_id
        WHERE t.name LIKE ? ESCAPE '\'
        ORDER BY m.created DESC, m.rowid DESC
        LIMIT ?"
    ))
    .bind(like_pattern(topic_query))
    .bind(limit.unwrap_or(-1))
    .fetch_all(db_pool)
    .await?;
    Ok(messages)
}

/// Appends a message and makes the author a participant of the room.
#[instrument(skip(db_pool, body))]
pub async fn post(db_pool: &SqlitePool, room_id: Uuid, caller: Option<Uuid>, body: String) -> ForumResult<Message> {
    let user_id = caller.ok_or(ForumError::NotAuthenticated)?;
    if body.trim().is_empty() {
        return Err(FormErrors::single("body", "Message is required").into());
    }

    let mut tx = begin_write(db_pool).await?;
    let room = rooms::find(&mut *tx, room_id).await?;

    let message = Message {
        id: Uuid::now_v7(),
        room_id: room.id,
        user_id,
        body,
        created: OffsetDateTime::now_utc(),
    };
    sqlx::query("INSERT INTO messages (id,room_id,user_id,body,created) VALUES (?,?,?,?,?)")
        .bind(message.id)
        .bind(message.room_id)
        .bind(message.user_id)
        .bind(&message.body)
        .bind(stamp(message.created))
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT OR IGNORE INTO room_participants (room_id,user_id) VALUES (?,?)")
        .bind(message.room_id)
        .bind(message.user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(message_id = %message.id, "posted message");
    Ok(message)
}

#[instrument(skip(db_pool))]
pub async fn delete(db_pool: &SqlitePool, message_id: Uuid, caller: Uuid) -> ForumResult<Message> {
    let mut tx = begin_write(db_pool).await?;
    let message = find(&mut *tx, message_id).await?;
    if !access::can_delete_message(caller, &message) {
        return Err(ForumError::PermissionDenied);
    }

    sqlx::query("DELETE FROM messages WHERE id=?")
        .bind(message.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(message_id = %message.id, "deleted message");
    Ok(message)
}
