use axum::{
    Form, debug_handler,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::info;

use crate::{
    AppResult,
    db::users,
    error::ForumError,
    forms::{FormErrors, LoginForm},
    include_res,
    res::{self, escape, fill},
    session,
};

use super::local_return_url;

#[derive(Deserialize)]
pub struct LoginQuery {
    pub return_url: Option<String>,
}

fn render(email: &str, return_url: &str, errors: &FormErrors) -> String {
    fill(
        include_res!(str, "/pages/login.html"),
        &[
            ("errors", &res::form_errors(errors)),
            ("email", &escape(email)),
            ("return_url", &escape(return_url)),
        ],
    )
}

#[debug_handler]
pub async fn login_page(
    Query(LoginQuery { return_url }): Query<LoginQuery>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let return_url = local_return_url(return_url.as_deref());
    if session::viewer(&session, &db_pool).await?.is_some() {
        return Ok(Redirect::to(return_url).into_response());
    }

    let content = render("", return_url, &FormErrors::new());
    Ok(res::page("Login", None, &content).into_response())
}

#[debug_handler]
pub async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    if session::viewer(&session, &db_pool).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let return_url = local_return_url(Some(form.return_url.as_str())).to_owned();
    let email = form.email.trim().to_owned();

    let result = match form.validate() {
        Ok((email, password)) => users::authenticate(&db_pool, &email, password).await,
        Err(errors) => Err(errors.into()),
    };

    match result {
        Ok(user) => {
            session::log_in(&session, &user).await?;
            info!(user_id = %user.id, "logged in");
            Ok(Redirect::to(&return_url).into_response())
        }
        Err(ForumError::ValidationFailed(errors)) => {
            let content = render(&email, &return_url, &errors);
            Ok((StatusCode::UNPROCESSABLE_ENTITY, res::page("Login", None, &content)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
