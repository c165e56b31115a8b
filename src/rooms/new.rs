use axum::{
    Form, debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult,
    db::rooms,
    error::ForumError,
    forms::{FormErrors, RoomForm},
    session,
};

use super::render_room_form;

const HEADING: &str = "Create room";

#[debug_handler]
pub(crate) async fn new_room_page(State(db_pool): State<SqlitePool>, session: Session) -> AppResult<Response> {
    let Some(viewer) = session::viewer(&session, &db_pool).await? else {
        return Ok(Redirect::to("/login?return_url=/room/create").into_response());
    };

    Ok(render_room_form(&db_pool, &viewer, HEADING, "/room/create", &RoomForm::default(), &FormErrors::new())
        .await?
        .into_response())
}

#[debug_handler]
pub(crate) async fn new_room(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(form): Form<RoomForm>,
) -> AppResult<Response> {
    let viewer = session::viewer(&session, &db_pool).await?;

    let result = match form.clone().validate() {
        Ok(fields) => rooms::create(&db_pool, viewer.as_ref().map(|user| user.id), fields).await,
        Err(_) if viewer.is_none() => Err(ForumError::NotAuthenticated),
        Err(errors) => Err(errors.into()),
    };

    match (result, viewer) {
        (Ok(_), _) => Ok(Redirect::to("/").into_response()),
        (Err(ForumError::ValidationFailed(errors)), Some(viewer)) => {
            let page = render_room_form(&db_pool, &viewer, HEADING, "/room/create", &form, &errors).await?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        (Err(e), _) => Err(e.into()),
    }
}
