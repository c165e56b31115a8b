use axum::{
    debug_handler,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppResult, access, db::{self, rooms}, error::ForumError, session};

use super::render_delete;

#[debug_handler]
pub(crate) async fn delete_room_page(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(room_id): Path<String>,
) -> AppResult<Response> {
    let room_id = db::parse_id(&room_id, "room")?;
    let viewer = session::require_viewer(&session, &db_pool).await?;
    let room = rooms::find(&db_pool, room_id).await?;
    if !access::can_edit_room(viewer.id, &room) {
        return Err(ForumError::PermissionDenied.into());
    }

    Ok(render_delete(&viewer, &room.name, &format!("/room/{room_id}/delete"), &format!("/room/{room_id}"))
        .into_response())
}

#[debug_handler]
pub(crate) async fn delete_room(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(room_id): Path<String>,
) -> AppResult<Response> {
    let room_id = db::parse_id(&room_id, "room")?;
    let viewer = session::require_viewer(&session, &db_pool).await?;
    rooms::delete(&db_pool, room_id, viewer.id).await?;
    Ok(Redirect::to("/").into_response())
}
