//! Ownership checks consulted by the room and message stores.

use uuid::Uuid;

use crate::db::{Message, Room};

/// Only a room's host may edit or delete it.
pub fn can_edit_room(user_id: Uuid, room: &Room) -> bool {
    user_id == room.host_id
}

/// Only a message's author may delete it.
pub fn can_delete_message(user_id: Uuid, message: &Message) -> bool {
    user_id == message.user_id
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn room(host_id: Uuid) -> Room {
        let now = OffsetDateTime::now_utc();
        Room {
            id: Uuid::now_v7(),
            host_id,
            topic_id: Uuid::now_v7(),
            name: "Calculus".into(),
            description: String::new(),
            updated: now,
            created: now,
        }
    }

    #[test]
    fn test_host_edits_room() {
        let host = Uuid::now_v7();
        let room = room(host);
        assert!(can_edit_room(host, &room));
        assert!(!can_edit_room(Uuid::now_v7(), &room));
    }

    #[test]
    fn test_author_deletes_message() {
        let author = Uuid::now_v7();
        let room = room(Uuid::now_v7());
        let message = Message {
            id: Uuid::now_v7(),
            room_id: room.id,
            user_id: author,
            body: "hi".into(),
            created: OffsetDateTime::now_utc(),
        };
        assert!(can_delete_message(author, &message));
        // hosting the room does not grant deleting others' messages
        assert!(!can_delete_message(room.host_id, &message));
    }
}
