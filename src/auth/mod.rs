mod login;
mod logout;
mod register;

use axum::{Router, routing::get};

use crate::AppState;

pub use login::{login, login_page};
pub use logout::logout;
pub use register::{register, register_page};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/register", get(register_page).post(register))
}

/// Only same-site paths are followed after login/logout.
pub(crate) fn local_return_url(return_url: Option<&str>) -> &str {
    match return_url {
        Some(url) if url.starts_with('/') && !url.starts_with("//") && !url.contains('\\') => url,
        _ => "/",
    }
}
