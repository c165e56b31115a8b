use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppResult,
    db::{User, users},
    error::ForumError,
};

pub const USER_ID: &str = "user_id";

/// The logged-in user's id, if any.
pub async fn caller(session: &Session) -> AppResult<Option<Uuid>> {
    Ok(session.get::<Uuid>(USER_ID).await?)
}

/// The logged-in user. A session pointing at a missing account is logged out.
pub async fn viewer(session: &Session, db_pool: &SqlitePool) -> AppResult<Option<User>> {
    let Some(user_id) = caller(session).await? else {
        return Ok(None);
    };

    let user = users::find_optional(db_pool, user_id).await?;
    if user.is_none() {
        session.remove::<Uuid>(USER_ID).await?;
    }
    Ok(user)
}

pub async fn require_viewer(session: &Session, db_pool: &SqlitePool) -> AppResult<User> {
    viewer(session, db_pool)
        .await?
        .ok_or_else(|| ForumError::NotAuthenticated.into())
}

pub async fn log_in(session: &Session, user: &User) -> AppResult<()> {
    session.cycle_id().await?;
    session.insert(USER_ID, user.id).await?;
    Ok(())
}
