use axum::{
    Form, Router, debug_handler,
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult, AppState,
    db::{messages, rooms, topics},
    include_res,
    res::{self, escape, fill},
    session,
};

const SIDEBAR_TOPICS: i64 = 5;
const HOME_ACTIVITY: i64 = 20;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/topics", get(topics_page).post(topics_search))
        .route("/activity", get(activity))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[debug_handler]
pub(crate) async fn home(
    Query(SearchQuery { q }): Query<SearchQuery>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let viewer = session::viewer(&session, &db_pool).await?;

    let rooms = rooms::list(&db_pool, &q).await?;
    let topics = topics::list(&db_pool, "", Some(SIDEBAR_TOPICS)).await?;
    let total_rooms = rooms::count(&db_pool).await?;
    let activity = messages::recent(&db_pool, &q, Some(HOME_ACTIVITY)).await?;

    let content = fill(
        include_res!(str, "/pages/home.html"),
        &[
            ("topics", &res::topic_items(&topics)),
            ("total_rooms", &total_rooms.to_string()),
            ("room_count", &rooms.len().to_string()),
            ("rooms", &res::room_items(&rooms, viewer.as_ref())),
            ("activity", &res::activity_items(&activity, viewer.as_ref())),
        ],
    );
    Ok(res::page("Home", viewer.as_ref(), &content).into_response())
}

async fn render_topics(db_pool: &SqlitePool, session: &Session, q: &str) -> AppResult<Response> {
    let viewer = session::viewer(session, db_pool).await?;
    let topics = topics::list(db_pool, q, None).await?;
    let total_rooms = rooms::count(db_pool).await?;

    let content = fill(
        include_res!(str, "/pages/topics.html"),
        &[
            ("q", &escape(q)),
            ("total_rooms", &total_rooms.to_string()),
            ("topics", &res::topic_items(&topics)),
        ],
    );
    Ok(res::page("Topics", viewer.as_ref(), &content).into_response())
}

#[debug_handler]
pub(crate) async fn topics_page(
    Query(SearchQuery { q }): Query<SearchQuery>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    render_topics(&db_pool, &session, &q).await
}

#[debug_handler]
pub(crate) async fn topics_search(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(SearchQuery { q }): Form<SearchQuery>,
) -> AppResult<Response> {
    render_topics(&db_pool, &session, &q).await
}

#[debug_handler]
pub(crate) async fn activity(State(db_pool): State<SqlitePool>, session: Session) -> AppResult<Response> {
    let viewer = session::viewer(&session, &db_pool).await?;
    let activity = messages::recent(&db_pool, "", None).await?;

    let content = fill(
        include_res!(str, "/pages/activity.html"),
        &[("activity", &res::activity_items(&activity, viewer.as_ref()))],
    );
    Ok(res::page("Activity", viewer.as_ref(), &content).into_response())
}
