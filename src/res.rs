use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag};
use time::OffsetDateTime;

use crate::{
    db::{User, messages::MessageView, rooms::RoomView, topics::TopicSummary},
    forms::FormErrors,
};

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

/// Substitutes `{key}` placeholders in one pass. Inserted values are never
/// rescanned, and braces that name no key are kept as they are.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let found = tail.find('}').and_then(|end| {
            let key = &tail[..end];
            values.iter().find(|(k, _)| *k == key).map(|(_, v)| (*v, end))
        });
        match found {
            Some((value, end)) => {
                out.push_str(value);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encodes a value for use inside a query string.
pub fn query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn unsafe_url(url: &str) -> bool {
    let url = url.trim_start().to_ascii_lowercase();
    ["javascript:", "vbscript:", "data:"].iter().any(|scheme| url.starts_with(scheme))
}

/// Renders a message body as Markdown. Raw HTML is shown as text and script
/// URLs are dropped from links and images.
pub fn markdown(body: &str) -> String {
    let parser = Parser::new_ext(body, Options::ENABLE_STRIKETHROUGH).map(|event| match event {
        Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
        Event::Start(Tag::Link { link_type, dest_url, title, id }) if unsafe_url(&dest_url) => {
            Event::Start(Tag::Link { link_type, dest_url: CowStr::Borrowed("#"), title, id })
        }
        Event::Start(Tag::Image { link_type, dest_url, title, id }) if unsafe_url(&dest_url) => {
            Event::Start(Tag::Image { link_type, dest_url: CowStr::Borrowed("#"), title, id })
        }
        _ => event,
    });

    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);
    html_output
}

pub fn timestamp(at: OffsetDateTime) -> String {
    format!(
        "{}-{:02}-{:02} {:02}:{:02} UTC",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute()
    )
}

pub fn avatar(avatar: Option<&str>) -> String {
    match avatar {
        Some(url) if url.starts_with("https://") || url.starts_with("http://") => {
            format!(r#"<img class="avatar" src="{}" alt="">"#, escape(url))
        }
        _ => String::new(),
    }
}

pub fn form_errors(errors: &FormErrors) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>", escape(&e.message)))
        .collect();
    format!(r#"<ul class="errors">{items}</ul>"#)
}

/// Wraps page content in the site layout.
pub fn page(title: &str, viewer: Option<&User>, content: &str) -> Html<String> {
    let nav = match viewer {
        Some(user) => fill(
            include_res!(str, "/pages/nav_user.html"),
            &[("user_id", &user.id.to_string()), ("username", &escape(&user.username))],
        ),
        None => include_res!(str, "/pages/nav_guest.html").to_owned(),
    };

    Html(fill(
        include_res!(str, "/pages/layout.html"),
        &[("title", &escape(title)), ("nav", &nav), ("content", content)],
    ))
}

pub fn notice(status: StatusCode, title: &str, message: &str) -> Response {
    let content = fill(
        include_res!(str, "/pages/notice.html"),
        &[("title", &escape(title)), ("message", &escape(message))],
    );
    (status, page(title, None, &content)).into_response()
}

pub fn sorry(what: &str) -> Response {
    notice(StatusCode::NOT_FOUND, "Not found", &format!("That {what} doesn't exist."))
}

pub fn room_items(rooms: &[RoomView], viewer: Option<&User>) -> String {
    rooms
        .iter()
        .map(|view| {
            let room = &view.room;
            let actions = match viewer {
                Some(user) if crate::access::can_edit_room(user.id, room) => fill(
                    include_res!(str, "/pages/room_actions.html"),
                    &[("id", &room.id.to_string())],
                ),
                _ => String::new(),
            };
            fill(
                include_res!(str, "/pages/room_item.html"),
                &[
                    ("id", &room.id.to_string()),
                    ("name", &escape(&room.name)),
                    ("host_id", &room.host_id.to_string()),
                    ("host_username", &escape(&view.host_username)),
                    ("host_avatar", &avatar(view.host_avatar.as_deref())),
                    ("topic", &escape(&view.topic_name)),
                    ("description", &escape(&room.description)),
                    ("participant_count", &view.participant_count.to_string()),
                    ("updated", &timestamp(room.updated)),
                    ("actions", &actions),
                ],
            )
        })
        .collect()
}

pub fn topic_items(topics: &[TopicSummary]) -> String {
    topics
        .iter()
        .map(|summary| {
            fill(
                include_res!(str, "/pages/topic_item.html"),
                &[
                    ("name", &escape(&summary.topic.name)),
                    ("name_q", &query_value(&summary.topic.name)),
                    ("room_count", &summary.room_count.to_string()),
                ],
            )
        })
        .collect()
}

pub fn message_delete_link(view: &MessageView, viewer: Option<&User>) -> String {
    match viewer {
        Some(user) if crate::access::can_delete_message(user.id, &view.message) => {
            format!(r#"<a href="/message/{}/delete">Delete</a>"#, view.message.id)
        }
        _ => String::new(),
    }
}

pub fn activity_items(messages: &[MessageView], viewer: Option<&User>) -> String {
    messages
        .iter()
        .map(|view| {
            let message = &view.message;
            fill(
                include_res!(str, "/pages/activity_item.html"),
                &[
                    ("user_id", &message.user_id.to_string()),
                    ("username", &escape(&view.username)),
                    ("avatar", &avatar(view.avatar.as_deref())),
                    ("room_id", &message.room_id.to_string()),
                    ("room_name", &escape(&view.room_name)),
                    ("created", &timestamp(message.created)),
                    ("body", &escape(&message.body)),
                    ("actions", &message_delete_link(view, viewer)),
                ],
            )
        })
        .collect()
}
