//! Read-only JSON listing of rooms.

use axum::{
    Json, Router, debug_handler,
    extract::State,
    http::Method,
    routing::get,
};
use serde::Serialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{AppResult, AppState, db::{Room, rooms}};

pub fn router() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);

    Router::new()
        .route("/api/", get(index))
        .route("/api/rooms/", get(get_rooms))
        .route("/api/rooms-class/", get(get_rooms))
        .layer(cors)
}

#[derive(Debug, Serialize)]
pub struct ApiRoom {
    pub id: Uuid,
    pub host: Uuid,
    pub topic: Uuid,
    pub name: String,
    pub description: String,
    pub participants: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

impl ApiRoom {
    fn new(room: Room, participants: Vec<Uuid>) -> Self {
        Self {
            id: room.id,
            host: room.host_id,
            topic: room.topic_id,
            name: room.name,
            description: room.description,
            participants,
            updated: room.updated,
            created: room.created,
        }
    }
}

#[debug_handler]
pub async fn index() -> Json<Value> {
    Json(json!({
        "base": "",
        "FBV": "rooms/",
        "CBV": "rooms-class/",
    }))
}

#[debug_handler]
pub async fn get_rooms(State(db_pool): State<SqlitePool>) -> AppResult<Json<Vec<ApiRoom>>> {
    let rooms = rooms::all_with_participants(&db_pool)
        .await?
        .into_iter()
        .map(|(room, participants)| ApiRoom::new(room, participants))
        .collect();
    Ok(Json(rooms))
}
