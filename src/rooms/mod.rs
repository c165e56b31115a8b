mod delete;
mod edit;
mod msg;
mod new;
mod room;

use axum::{Router, response::Html, routing::get};
use sqlx::SqlitePool;

use crate::{
    AppResult, AppState,
    db::{User, topics},
    forms::{FormErrors, RoomForm},
    include_res,
    res::{self, escape, fill},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/room/create", get(new::new_room_page).post(new::new_room))
        .route("/room/{id}", get(room::room).post(room::post_message))
        .route("/room/{id}/update", get(edit::edit_room_page).post(edit::edit_room))
        .route("/room/{id}/delete", get(delete::delete_room_page).post(delete::delete_room))
        .route("/message/{id}/delete", get(msg::delete_message_page).post(msg::delete_message))
}

/// The create/update form, filled with `form` and any errors from the last submit.
async fn render_room_form(
    db_pool: &SqlitePool,
    viewer: &User,
    heading: &str,
    action: &str,
    form: &RoomForm,
    errors: &FormErrors,
) -> AppResult<Html<String>> {
    let topic_options: String = topics::list(db_pool, "", None)
        .await?
        .iter()
        .map(|summary| format!(r#"<option value="{}"></option>"#, escape(&summary.topic.name)))
        .collect();

    let content = fill(
        include_res!(str, "/pages/rooms/room_form.html"),
        &[
            ("heading", &escape(heading)),
            ("action", action),
            ("errors", &res::form_errors(errors)),
            ("room_topic", &escape(&form.room_topic)),
            ("name", &escape(&form.name)),
            ("description", &escape(&form.description)),
            ("topic_options", &topic_options),
            ("submit", &escape(heading)),
        ],
    );
    Ok(res::page(heading, Some(viewer), &content))
}

/// Confirmation page shared by room and message deletion.
fn render_delete(viewer: &User, object: &str, action: &str, back: &str) -> Html<String> {
    let content = fill(
        include_res!(str, "/pages/delete.html"),
        &[("object", &escape(object)), ("action", action), ("back", back)],
    );
    res::page("Delete", Some(viewer), &content)
}
