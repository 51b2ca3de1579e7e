use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{blob::BlobStore, error::ChatError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Artist,
    Collector,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Artist => "artist",
            Role::Collector => "collector",
        }
    }

    fn from_db(s: &str) -> Role {
        match s {
            "artist" => Role::Artist,
            _ => Role::Collector,
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct Participant {
    pub id: Uuid,
    pub username: String,
    pub online: bool,
}

/// A room's fixed pair of participants plus their presence flags.
#[derive(Debug, Clone)]
pub struct RoomMembers {
    pub id: Uuid,
    pub artist: Participant,
    pub collector: Participant,
}

impl RoomMembers {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.artist.id == user_id || self.collector.id == user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Audio,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Audio => "audio",
        }
    }

    fn from_db(s: &str) -> MessageKind {
        match s {
            "audio" => MessageKind::Audio,
            _ => MessageKind::Text,
        }
    }
}

/// What a freshly inserted message hands back to the session for the
/// broadcast payload.
#[derive(Debug, Clone, Copy)]
pub struct MessageRecord {
    pub id: Uuid,
    pub created: OffsetDateTime,
}

/// A persisted message as read back for reply lookups and history.
#[derive(Debug, Clone)]
pub struct MessageSnapshot {
    pub id: Uuid,
    pub sender: String,
    pub kind: MessageKind,
    pub content: String,
    pub is_reply: bool,
    pub previous_sender: Option<String>,
    pub previous_content: Option<String>,
    pub previous_message_id: Option<Uuid>,
    pub created: OffsetDateTime,
}

impl MessageSnapshot {
    /// The denormalized fields a reply to this message stores. Audio sources
    /// snapshot the literal marker `"AUDIO"` instead of a content string.
    pub fn reply_snapshot(&self) -> ReplySnapshot {
        ReplySnapshot {
            previous_sender: self.sender.clone(),
            previous_content: match self.kind {
                MessageKind::Audio => "AUDIO".to_owned(),
                MessageKind::Text => self.content.clone(),
            },
            previous_message_id: self.id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplySnapshot {
    pub previous_sender: String,
    pub previous_content: String,
    pub previous_message_id: Uuid,
}

fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

fn from_ms(ms: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

pub async fn create_user(pool: &SqlitePool, username: &str, role: Role) -> Result<User, ChatError> {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO users (id,username,role) VALUES (?,?,?)")
        .bind(id.to_string())
        .bind(username)
        .bind(role.as_str())
        .execute(pool)
        .await?;
    Ok(User { id, username: username.to_owned(), role })
}

pub async fn get_user(pool: &SqlitePool, id: Uuid) -> Result<Option<User>, ChatError> {
    let row: Option<(String, String)> =
        sqlx::query_as("SELECT username,role FROM users WHERE id=?")
            .bind(id.to_string())
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(username, role)| User { id, username, role: Role::from_db(&role) }))
}

/// Opens a room between an artist and a collector, in either argument order.
/// Any other pairing is refused.
pub async fn create_room(pool: &SqlitePool, user_a: Uuid, user_b: Uuid) -> Result<RoomMembers, ChatError> {
    let a = get_user(pool, user_a).await?.ok_or(ChatError::UnknownUser)?;
    let b = get_user(pool, user_b).await?.ok_or(ChatError::UnknownUser)?;

    let (artist, collector) = match (a.role, b.role) {
        (Role::Artist, Role::Collector) => (a, b),
        (Role::Collector, Role::Artist) => (b, a),
        _ => return Err(ChatError::InvalidPairing),
    };

    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO rooms (id,artist_id,collector_id,created) VALUES (?,?,?,?)")
        .bind(id.to_string())
        .bind(artist.id.to_string())
        .bind(collector.id.to_string())
        .bind(now_ms())
        .execute(pool)
        .await?;

    Ok(RoomMembers {
        id,
        artist: Participant { id: artist.id, username: artist.username, online: false },
        collector: Participant { id: collector.id, username: collector.username, online: false },
    })
}

pub async fn room_members(pool: &SqlitePool, room_id: Uuid) -> Result<Option<RoomMembers>, ChatError> {
    let row: Option<(String, String, bool, String, String, bool)> = sqlx::query_as(
        "SELECT r.artist_id, a.username, r.is_artist_online,
                r.collector_id, c.username, r.is_collector_online
         FROM rooms r
         JOIN users a ON a.id = r.artist_id
         JOIN users c ON c.id = r.collector_id
         WHERE r.id = ?",
    )
    .bind(room_id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some((artist_id, artist_name, artist_online, collector_id, collector_name, collector_online)) = row
    else {
        return Ok(None);
    };

    Ok(Some(RoomMembers {
        id: room_id,
        artist: Participant {
            id: Uuid::parse_str(&artist_id)?,
            username: artist_name,
            online: artist_online,
        },
        collector: Participant {
            id: Uuid::parse_str(&collector_id)?,
            username: collector_name,
            online: collector_online,
        },
    }))
}

/// Flips the presence flag matching `user_id`'s seat in the room. A single
/// statement, so concurrent flips for the two seats never clobber each other.
pub async fn set_status(pool: &SqlitePool, user_id: Uuid, room_id: Uuid, online: bool) -> Result<(), ChatError> {
    sqlx::query(
        "UPDATE rooms SET
            is_artist_online = CASE WHEN artist_id = ? THEN ? ELSE is_artist_online END,
            is_collector_online = CASE WHEN collector_id = ? THEN ? ELSE is_collector_online END
         WHERE id = ?",
    )
    .bind(user_id.to_string())
    .bind(online)
    .bind(user_id.to_string())
    .bind(online)
    .bind(room_id.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_message(pool: &SqlitePool, sender: &User, content: &str, room_id: Uuid) -> Result<MessageRecord, ChatError> {
    let id = Uuid::now_v7();
    let now = now_ms();
    sqlx::query("INSERT INTO messages (id,room_id,sender_id,kind,content,created,updated) VALUES (?,?,?,'text',?,?,?)")
        .bind(id.to_string())
        .bind(room_id.to_string())
        .bind(sender.id.to_string())
        .bind(content)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(MessageRecord { id, created: from_ms(now) })
}

/// Inserts a reply row carrying the denormalized snapshot of its target.
/// Audio replies are provisional (`content` empty) until the upload lands.
pub async fn create_reply(
    pool: &SqlitePool,
    sender: &User,
    kind: MessageKind,
    content: &str,
    snapshot: &ReplySnapshot,
    room_id: Uuid,
) -> Result<MessageRecord, ChatError> {
    let id = Uuid::now_v7();
    let now = now_ms();
    sqlx::query(
        "INSERT INTO messages
            (id,room_id,sender_id,kind,content,is_reply,previous_sender,previous_content,previous_message_id,created,updated)
         VALUES (?,?,?,?,?,1,?,?,?,?,?)",
    )
    .bind(id.to_string())
    .bind(room_id.to_string())
    .bind(sender.id.to_string())
    .bind(kind.as_str())
    .bind(content)
    .bind(&snapshot.previous_sender)
    .bind(&snapshot.previous_content)
    .bind(snapshot.previous_message_id.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(MessageRecord { id, created: from_ms(now) })
}

/// Provisional audio row: created empty so the broadcast gets an id and
/// timestamp immediately; the locator is attached once the upload completes.
pub async fn create_audio_message(pool: &SqlitePool, sender: &User, room_id: Uuid) -> Result<MessageRecord, ChatError> {
    let id = Uuid::now_v7();
    let now = now_ms();
    sqlx::query("INSERT INTO messages (id,room_id,sender_id,kind,created,updated) VALUES (?,?,?,'audio',?,?)")
        .bind(id.to_string())
        .bind(room_id.to_string())
        .bind(sender.id.to_string())
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(MessageRecord { id, created: from_ms(now) })
}

pub async fn update_audio_content(pool: &SqlitePool, id: Uuid, locator: &str) -> Result<(), ChatError> {
    sqlx::query("UPDATE messages SET audio_content=?, updated=? WHERE id=?")
        .bind(locator)
        .bind(now_ms())
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Same-room lookup; a message id from another room does not resolve.
pub async fn get_message(pool: &SqlitePool, id: Uuid, room_id: Uuid) -> Result<Option<MessageSnapshot>, ChatError> {
    let row: Option<(String, String, String, bool, Option<String>, Option<String>, Option<String>, i64)> =
        sqlx::query_as(
            "SELECT u.username, m.kind, m.content, m.is_reply,
                    m.previous_sender, m.previous_content, m.previous_message_id, m.created
             FROM messages m
             JOIN users u ON u.id = m.sender_id
             WHERE m.id = ? AND m.room_id = ?",
        )
        .bind(id.to_string())
        .bind(room_id.to_string())
        .fetch_optional(pool)
        .await?;

    let Some((sender, kind, content, is_reply, previous_sender, previous_content, previous_message_id, created)) = row
    else {
        return Ok(None);
    };

    Ok(Some(MessageSnapshot {
        id,
        sender,
        kind: MessageKind::from_db(&kind),
        content,
        is_reply,
        previous_sender,
        previous_content,
        previous_message_id: match previous_message_id {
            Some(s) => Some(Uuid::parse_str(&s)?),
            None => None,
        },
        created: from_ms(created),
    }))
}

/// Latest `limit` messages of a room, oldest first.
pub async fn recent_messages(pool: &SqlitePool, room_id: Uuid, limit: i64) -> Result<Vec<MessageSnapshot>, ChatError> {
    let rows: Vec<(String, String, String, String, bool, Option<String>, Option<String>, Option<String>, i64)> =
        sqlx::query_as(
            "SELECT m.id, u.username, m.kind, m.content, m.is_reply,
                    m.previous_sender, m.previous_content, m.previous_message_id, m.created
             FROM messages m
             JOIN users u ON u.id = m.sender_id
             WHERE m.room_id = ?
             ORDER BY m.created DESC, m.id DESC
             LIMIT ?",
        )
        .bind(room_id.to_string())
        .bind(limit)
        .fetch_all(pool)
        .await?;

    let mut messages = Vec::with_capacity(rows.len());
    for (id, sender, kind, content, is_reply, previous_sender, previous_content, previous_message_id, created) in rows {
        messages.push(MessageSnapshot {
            id: Uuid::parse_str(&id)?,
            sender,
            kind: MessageKind::from_db(&kind),
            content,
            is_reply,
            previous_sender,
            previous_content,
            previous_message_id: match previous_message_id {
                Some(s) => Some(Uuid::parse_str(&s)?),
                None => None,
            },
            created: from_ms(created),
        });
    }
    messages.reverse();
    Ok(messages)
}

/// Two-phase delete: the externally stored audio resource goes first, then
/// the row. A row with no stored audio skips straight to the delete.
pub async fn delete_message(pool: &SqlitePool, blobs: &dyn BlobStore, id: Uuid, room_id: Uuid) -> Result<(), ChatError> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT audio_content FROM messages WHERE id=? AND room_id=?")
            .bind(id.to_string())
            .bind(room_id.to_string())
            .fetch_optional(pool)
            .await?;

    let Some((locator,)) = row else {
        return Ok(());
    };
    if !locator.is_empty() {
        blobs.delete(&locator).await.map_err(ChatError::Blob)?;
    }

    sqlx::query("DELETE FROM messages WHERE id=? AND room_id=?")
        .bind(id.to_string())
        .bind(room_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}
