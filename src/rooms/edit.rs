use axum::{
    Form, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult,
    access,
    db::{self, rooms},
    error::ForumError,
    forms::{FormErrors, RoomForm},
    session,
};

use super::render_room_form;

const HEADING: &str = "Update room";

#[debug_handler]
pub(crate) async fn edit_room_page(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(room_id): Path<String>,
) -> AppResult<Response> {
    let room_id = db::parse_id(&room_id, "room")?;
    let viewer = session::require_viewer(&session, &db_pool).await?;
    let view = rooms::find_view(&db_pool, room_id).await?;
    if !access::can_edit_room(viewer.id, &view.room) {
        return Err(ForumError::PermissionDenied.into());
    }

    let form = RoomForm {
        room_topic: view.topic_name,
        name: view.room.name,
        description: view.room.description,
    };
    let action = format!("/room/{room_id}/update");
    Ok(render_room_form(&db_pool, &viewer, HEADING, &action, &form, &FormErrors::new())
        .await?
        .into_response())
}

#[debug_handler]
pub(crate) async fn edit_room(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(room_id): Path<String>,
    Form(form): Form<RoomForm>,
) -> AppResult<Response> {
    let room_id = db::parse_id(&room_id, "room")?;
    let viewer = session::require_viewer(&session, &db_pool).await?;

    let result = match form.clone().validate() {
        Ok(fields) => rooms::update(&db_pool, room_id, viewer.id, fields).await,
        Err(errors) => Err(errors.into()),
    };

    match result {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(ForumError::ValidationFailed(errors)) => {
            // only the host gets the form back
            let room = rooms::find(&db_pool, room_id).await?;
            if !access::can_edit_room(viewer.id, &room) {
                return Err(ForumError::PermissionDenied.into());
            }
            let action = format!("/room/{room_id}/update");
            let page = render_room_form(&db_pool, &viewer, HEADING, &action, &form, &errors).await?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
