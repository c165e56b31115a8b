pub mod access;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod index;
pub mod profiles;
pub mod res;
pub mod rooms;
pub mod session;

use axum::{
    Router,
    extract::FromRef,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};

use config::Config;
use error::ForumError;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
}

/// Every page and endpoint, with sessions and request tracing.
pub fn app(db_pool: SqlitePool, config: &Config) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.session_secure)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(config.session_inactivity_minutes)));

    Router::new()
        .merge(index::router())
        .merge(auth::router())
        .merge(rooms::router())
        .merge(profiles::router())
        .merge(api::router())
        .with_state(AppState { db_pool })
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.0.downcast_ref::<ForumError>() {
            Some(ForumError::NotAuthenticated) => Redirect::to("/login").into_response(),
            Some(ForumError::PermissionDenied) => {
                res::notice(StatusCode::FORBIDDEN, "Permission denied", "Permission denied!")
            }
            Some(ForumError::NotFound(what)) => res::sorry(what),
            Some(ForumError::ValidationFailed(errors)) => {
                res::notice(StatusCode::UNPROCESSABLE_ENTITY, "Invalid input", &errors.to_string())
            }
            _ => {
                tracing::error!("{:?}", self.0);
                res::notice(StatusCode::INTERNAL_SERVER_ERROR, "Server error", "Something went wrong.")
            }
        }
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self(anyhow::Error::msg(err))
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self(anyhow::Error::msg(err.to_owned()))
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(ForumError);
apperr_impl!(sqlx::Error);
apperr_impl!(tower_sessions::session::Error);
