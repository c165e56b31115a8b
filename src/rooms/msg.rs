use axum::{
    debug_handler,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult,
    access,
    db::{self, User, messages::{self, MessageView}},
    error::ForumError,
    include_res,
    res::{self, avatar, escape, fill, timestamp},
    session,
};

use super::render_delete;

pub(crate) fn message_html(view: &MessageView, viewer: Option<&User>) -> String {
    let message = &view.message;
    fill(
        include_res!(str, "/pages/rooms/message.html"),
        &[
            ("id", &message.id.to_string()),
            ("user_id", &message.user_id.to_string()),
            ("username", &escape(&view.username)),
            ("avatar", &avatar(view.avatar.as_deref())),
            ("created", &timestamp(message.created)),
            ("actions", &res::message_delete_link(view, viewer)),
            ("body", &res::markdown(&message.body)),
        ],
    )
}

#[debug_handler]
pub(crate) async fn delete_message_page(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(message_id): Path<String>,
) -> AppResult<Response> {
    let message_id = db::parse_id(&message_id, "message")?;
    let viewer = session::require_viewer(&session, &db_pool).await?;
    let message = messages::find(&db_pool, message_id).await?;
    if !access::can_delete_message(viewer.id, &message) {
        return Err(ForumError::PermissionDenied.into());
    }

    Ok(render_delete(
        &viewer,
        &message.body,
        &format!("/message/{}/delete", message.id),
        &format!("/room/{}", message.room_id),
    )
    .into_response())
}

#[debug_handler]
pub(crate) async fn delete_message(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(message_id): Path<String>,
) -> AppResult<Response> {
    let message_id = db::parse_id(&message_id, "message")?;
    let viewer = session::require_viewer(&session, &db_pool).await?;
    let message = messages::delete(&db_pool, message_id, viewer.id).await?;
    Ok(Redirect::to(&format!("/room/{}", message.room_id)).into_response())
}
