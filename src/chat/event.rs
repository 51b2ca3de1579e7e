use serde::Serialize;

/// Everything the room fans out to its members. Serialized shape carries a
/// `type` field equal to the event name, e.g. `{"type":"chat.message",...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ChatEvent {
    #[serde(rename = "chat.status")]
    Status { username: String, content: StatusKind },
    #[serde(rename = "chat.typing")]
    Typing { username: String, content: String },
    #[serde(rename = "chat.message")]
    Message {
        content: String,
        created: String,
        time: String,
        sender: String,
        id: String,
    },
    #[serde(rename = "chat.reply")]
    Reply {
        reply_format: ReplyFormat,
        content: String,
        previous_sender: String,
        previous_content: String,
        previous_message_id: String,
        time: String,
        sender: String,
        id: String,
    },
    #[serde(rename = "chat.audio")]
    Audio {
        /// Base64 of the uploaded bytes. Audio is always text on the wire,
        /// never the stored resource locator.
        content: String,
        filename: String,
        time: String,
        sender: String,
        id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyFormat {
    Text,
    Audio,
}
