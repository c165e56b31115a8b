use axum::{
    Form, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppResult,
    access,
    db::{self, User, messages, rooms},
    error::ForumError,
    forms::{FormErrors, MessageForm},
    include_res,
    res::{self, avatar, escape, fill, timestamp},
    session,
};

use super::msg;

async fn render_room(
    db_pool: &SqlitePool,
    room_id: Uuid,
    viewer: Option<&User>,
    errors: &FormErrors,
) -> AppResult<Html<String>> {
    let view = rooms::find_view(db_pool, room_id).await?;
    let room = &view.room;

    let messages: String = messages::in_room(db_pool, room_id)
        .await?
        .iter()
        .map(|message| msg::message_html(message, viewer))
        .collect();

    let participants = rooms::participants(db_pool, room_id).await?;
    let participant_items: String = participants
        .iter()
        .map(|user| {
            fill(
                include_res!(str, "/pages/rooms/participant.html"),
                &[
                    ("user_id", &user.id.to_string()),
                    ("username", &escape(&user.username)),
                    ("avatar", &avatar(user.avatar.as_deref())),
                ],
            )
        })
        .collect();

    let actions = match viewer {
        Some(user) if access::can_edit_room(user.id, room) => {
            fill(include_res!(str, "/pages/room_actions.html"), &[("id", &room.id.to_string())])
        }
        _ => String::new(),
    };

    let compose = match viewer {
        Some(_) => fill(
            include_res!(str, "/pages/rooms/compose.html"),
            &[("room_id", &room.id.to_string()), ("errors", &res::form_errors(errors))],
        ),
        None => fill(
            include_res!(str, "/pages/rooms/compose_guest.html"),
            &[("room_id", &room.id.to_string())],
        ),
    };

    let content = fill(
        include_res!(str, "/pages/rooms/room.html"),
        &[
            ("room_id", &room.id.to_string()),
            ("room_name", &escape(&room.name)),
            ("topic", &escape(&view.topic_name)),
            ("description", &escape(&room.description)),
            ("host_id", &room.host_id.to_string()),
            ("host_username", &escape(&view.host_username)),
            ("host_avatar", &avatar(view.host_avatar.as_deref())),
            ("created", &timestamp(room.created)),
            ("actions", &actions),
            ("messages", &messages),
            ("participant_count", &participants.len().to_string()),
            ("participants", &participant_items),
            ("compose", &compose),
        ],
    );
    Ok(res::page(&room.name, viewer, &content))
}

#[debug_handler]
pub(crate) async fn room(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(room_id): Path<String>,
) -> AppResult<Response> {
    let room_id = db::parse_id(&room_id, "room")?;
    let viewer = session::viewer(&session, &db_pool).await?;
    Ok(render_room(&db_pool, room_id, viewer.as_ref(), &FormErrors::new())
        .await?
        .into_response())
}

#[debug_handler]
pub(crate) async fn post_message(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(room_id): Path<String>,
    Form(form): Form<MessageForm>,
) -> AppResult<Response> {
    let room_id = db::parse_id(&room_id, "room")?;
    let viewer = session::viewer(&session, &db_pool).await?;
    let caller = viewer.as_ref().map(|user| user.id);

    let result = match form.validate() {
        Ok(body) => messages::post(&db_pool, room_id, caller, body).await,
        Err(_) if caller.is_none() => Err(ForumError::NotAuthenticated),
        Err(errors) => Err(errors.into()),
    };

    match result {
        Ok(_) => Ok(Redirect::to(&format!("/room/{room_id}")).into_response()),
        Err(ForumError::ValidationFailed(errors)) => {
            let page = render_room(&db_pool, room_id, viewer.as_ref(), &errors).await?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
