use axum::{
    Form, debug_handler,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult,
    db::{User, users},
    error::ForumError,
    forms::{FormErrors, ProfileForm},
    include_res,
    res::{self, escape, fill},
    session,
};

fn render(viewer: &User, form: &ProfileForm, errors: &FormErrors) -> Html<String> {
    let content = fill(
        include_res!(str, "/pages/profiles/update_user.html"),
        &[
            ("user_id", &viewer.id.to_string()),
            ("errors", &res::form_errors(errors)),
            ("username", &escape(&form.username)),
            ("email", &escape(&form.email)),
            ("avatar", &escape(&form.avatar)),
            ("bio", &escape(&form.bio)),
        ],
    );
    res::page("Edit profile", Some(viewer), &content)
}

#[debug_handler]
pub(crate) async fn update_user_page(State(db_pool): State<SqlitePool>, session: Session) -> AppResult<Response> {
    let viewer = session::require_viewer(&session, &db_pool).await?;
    let form = ProfileForm {
        username: viewer.username.clone(),
        email: viewer.email.clone(),
        avatar: viewer.avatar.clone().unwrap_or_default(),
        bio: viewer.bio.clone().unwrap_or_default(),
    };
    Ok(render(&viewer, &form, &FormErrors::new()).into_response())
}

#[debug_handler]
pub(crate) async fn update_user(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(form): Form<ProfileForm>,
) -> AppResult<Response> {
    let viewer = session::require_viewer(&session, &db_pool).await?;

    let result = match form.clone().validate() {
        Ok(update) => users::update_profile(&db_pool, viewer.id, update).await,
        Err(errors) => Err(errors.into()),
    };

    match result {
        Ok(user) => Ok(Redirect::to(&format!("/profile/{}", user.id)).into_response()),
        Err(ForumError::ValidationFailed(errors)) => {
            Ok((StatusCode::UNPROCESSABLE_ENTITY, render(&viewer, &form, &errors)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
