use axum::{
    debug_handler,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult,
    db::{self, messages, rooms, topics, users},
    include_res,
    res::{self, avatar, escape, fill},
    session,
};

#[debug_handler]
pub(crate) async fn profile(
    Path(user_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let user_id = db::parse_id(&user_id, "user")?;
    let viewer = session::viewer(&session, &db_pool).await?;
    let user = users::find(&db_pool, user_id).await?;

    let hosted = rooms::hosted_by(&db_pool, user.id).await?;
    let activity = messages::by_user(&db_pool, user.id).await?;
    let topics = topics::list(&db_pool, "", None).await?;
    let total_rooms = rooms::count(&db_pool).await?;

    let edit = match &viewer {
        Some(v) if v.id == user.id => r#"<a href="/update-user">Edit profile</a>"#,
        _ => "",
    };

    let content = fill(
        include_res!(str, "/pages/profiles/profile.html"),
        &[
            ("username", &escape(&user.username)),
            ("avatar", &avatar(user.avatar.as_deref())),
            ("bio", &escape(user.bio.as_deref().unwrap_or(""))),
            ("edit", edit),
            ("rooms", &res::room_items(&hosted, viewer.as_ref())),
            ("activity", &res::activity_items(&activity, viewer.as_ref())),
            ("topics", &res::topic_items(&topics)),
            ("total_rooms", &total_rooms.to_string()),
        ],
    );
    Ok(res::page(&user.username, viewer.as_ref(), &content).into_response())
}
