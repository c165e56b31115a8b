use std::collections::HashMap;

use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    access,
    error::{ForumError, ForumResult},
};

use super::{Room, User, begin_write, like_pattern, stamp, topics, users::USER_COLUMNS};

/// Validated room form input.
#[derive(Debug, Clone)]
pub struct RoomFields {
    pub topic: String,
    pub name: String,
    pub description: String,
}

/// A room joined with what listings show next to it.
#[derive(Debug, Clone, FromRow)]
pub struct RoomView {
    #[sqlx(flatten)]
    pub room: Room,
    pub host_username: String,
    pub host_avatar: Option<String>,
    pub topic_name: String,
    pub participant_count: i64,
}

const ROOM_VIEW_SELECT: &str = "SELECT r.id, r.host_id, r.topic_id, r.name, r.description, r.updated, r.created, \
    u.username AS host_username, u.avatar AS host_avatar, t.name AS topic_name, \
    (SELECT COUNT(*) FROM room_participants p WHERE p.room_id = r.id) AS participant_count \
    FROM rooms r JOIN users u ON u.id = r.host_id JOIN topics t ON t.id = r.topic_id";

const ROOM_ORDER: &str = "ORDER BY r.updated DESC, r.created DESC";

/// Rooms whose topic, name, description or host username contains `query`,
/// ignoring ASCII case. An empty query lists every room.
#[instrument(skip(db_pool))]
pub async fn list(db_pool: &SqlitePool, query: &str) -> ForumResult<Vec<RoomView>> {
    let sql = format!(
        r"{ROOM_VIEW_SELECT}
        WHERE t.name LIKE ?1 ESCAPE '\'
            OR r.name LIKE ?1 ESCAPE '\'
            OR r.description LIKE ?1 ESCAPE '\'
            OR u.username LIKE ?1 ESCAPE '\'
        {ROOM_ORDER}"
    );
    let rooms = sqlx::query_as::<_, RoomView>(&sql)
        .bind(like_pattern(query))
        .fetch_all(db_pool)
        .await?;
    Ok(rooms)
}

pub async fn count(db_pool: &SqlitePool) -> ForumResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM rooms")
        .fetch_one(db_pool)
        .await?;
    Ok(count)
}

pub async fn find<'e>(executor: impl Executor<'e, Database = Sqlite>, id: Uuid) -> ForumResult<Room> {
    sqlx::query_as::<_, Room>("SELECT id,host_id,topic_id,name,description,updated,created FROM rooms WHERE id=?")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or(ForumError::NotFound("room"))
}

pub async fn find_view(db_pool: &SqlitePool, id: Uuid) -> ForumResult<RoomView> {
    sqlx::query_as::<_, RoomView>(&format!("{ROOM_VIEW_SELECT} WHERE r.id=?"))
        .bind(id)
        .fetch_optional(db_pool)
        .await?
        .ok_or(ForumError::NotFound("room"))
}

pub async fn hosted_by(db_pool: &SqlitePool, user_id: Uuid) -> ForumResult<Vec<RoomView>> {
    let rooms = sqlx::query_as::<_, RoomView>(&format!("{ROOM_VIEW_SELECT} WHERE r.host_id=? {ROOM_ORDER}"))
        .bind(user_id)
        .fetch_all(db_pool)
        .await?;
    Ok(rooms)
}

pub async fn participants(db_pool: &SqlitePool, room_id: Uuid) -> ForumResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users u JOIN room_participants p ON p.user_id = u.id \
        WHERE p.room_id=? ORDER BY p.rowid"
    ))
    .bind(room_id)
    .fetch_all(db_pool)
    .await?;
    Ok(users)
}

/// Every room paired with its participants' ids.
pub async fn all_with_participants(db_pool: &SqlitePool) -> ForumResult<Vec<(Room, Vec<Uuid>)>> {
    let rooms = sqlx::query_as::<_, Room>(
        "SELECT id,host_id,topic_id,name,description,updated,created FROM rooms ORDER BY updated DESC, created DESC",
    )
    .fetch_all(db_pool)
    .await?;

    let pairs: Vec<(Uuid, Uuid)> = sqlx::query_as("SELECT room_id,user_id FROM room_participants ORDER BY rowid")
        .fetch_all(db_pool)
        .await?;
    let mut by_room: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (room_id, user_id) in pairs {
        by_room.entry(room_id).or_default().push(user_id);
    }

    Ok(rooms
        .into_iter()
        .map(|room| {
            let participants = by_room.remove(&room.id).unwrap_or_default();
            (room, participants)
        })
        .collect())
}

#[instrument(skip(db_pool, fields))]
pub async fn create(db_pool: &SqlitePool, caller: Option<Uuid>, fields: RoomFields) -> ForumResult<Room> {
    let host_id = caller.ok_or(ForumError::NotAuthenticated)?;

    let mut tx = begin_write(db_pool).await?;
    let topic = topics::resolve_or_create(&mut *tx, &fields.topic).await?;

    let now = OffsetDateTime::now_utc();
    let room = Room {
        id: Uuid::now_v7(),
        host_id,
        topic_id: topic.id,
        name: fields.name,
        description: fields.description,
        updated: now,
        created: now,
    };
    sqlx::query("INSERT INTO rooms (id,host_id,topic_id,name,description,updated,created) VALUES (?,?,?,?,?,?,?)")
        .bind(room.id)
        .bind(room.host_id)
        .bind(room.topic_id)
        .bind(&room.name)
        .bind(&room.description)
        .bind(stamp(room.updated))
        .bind(stamp(room.created))
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(room_id = %room.id, "created room");
    Ok(room)
}

#[instrument(skip(db_pool, fields))]
pub async fn update(db_pool: &SqlitePool, room_id: Uuid, caller: Uuid, fields: RoomFields) -> ForumResult<Room> {
    let mut tx = begin_write(db_pool).await?;
    let mut room = find(&mut *tx, room_id).await?;
    if !access::can_edit_room(caller, &room) {
        return Err(ForumError::PermissionDenied);
    }

    let topic = topics::resolve_or_create(&mut *tx, &fields.topic).await?;
    room.topic_id = topic.id;
    room.name = fields.name;
    room.description = fields.description;
    room.updated = OffsetDateTime::now_utc();

    sqlx::query("UPDATE rooms SET topic_id=?, name=?, description=?, updated=? WHERE id=?")
        .bind(room.topic_id)
        .bind(&room.name)
        .bind(&room.description)
        .bind(stamp(room.updated))
        .bind(room.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(room_id = %room.id, "updated room");
    Ok(room)
}

/// Deletes the room together with its messages and participant rows.
#[instrument(skip(db_pool))]
pub async fn delete(db_pool: &SqlitePool, room_id: Uuid, caller: Uuid) -> ForumResult<Room> {
    let mut tx = begin_write(db_pool).await?;
    let room = find(&mut *tx, room_id).await?;
    if !access::can_edit_room(caller, &room) {
        return Err(ForumError::PermissionDenied);
    }

    let messages = sqlx::query("DELETE FROM messages WHERE room_id=?")
        .bind(room.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    sqlx::query("DELETE FROM room_participants WHERE room_id=?")
        .bind(room.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM rooms WHERE id=?")
        .bind(room.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(room_id = %room.id, messages, "deleted room");
    Ok(room)
}
