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
    db::users,
    error::ForumError,
    forms::{FormErrors, RegisterForm},
    include_res,
    res::{self, escape, fill},
    session,
};

fn render(email: &str, username: &str, errors: &FormErrors) -> String {
    fill(
        include_res!(str, "/pages/register.html"),
        &[
            ("errors", &res::form_errors(errors)),
            ("email", &escape(email)),
            ("username", &escape(username)),
        ],
    )
}

#[debug_handler]
pub async fn register_page(State(db_pool): State<SqlitePool>, session: Session) -> AppResult<Response> {
    let viewer = session::viewer(&session, &db_pool).await?;
    let content = render("", "", &FormErrors::new());
    Ok(res::page("Sign up", viewer.as_ref(), &content).into_response())
}

#[debug_handler]
pub async fn register(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let (email, username) = (form.email.clone(), form.username.clone());

    let result = match form.validate() {
        Ok(new_user) => users::register(&db_pool, new_user).await,
        Err(errors) => Err(errors.into()),
    };

    match result {
        Ok(user) => {
            session::log_in(&session, &user).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(ForumError::ValidationFailed(errors)) => {
            let content = render(&email, &username, &errors);
            Ok((StatusCode::UNPROCESSABLE_ENTITY, res::page("Sign up", None, &content)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
