use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{
        Path, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{AppState, auth};

use super::{
    error::ChatError,
    event::{ChatEvent, ReplyFormat, StatusKind},
    fmt, frame,
    store::{self, MessageKind, ReplySnapshot, User},
};

/// Close code sent to an authenticated user who is not a participant of the
/// room they connected to.
pub const FORBIDDEN_CLOSE: u16 = 4001;

#[debug_handler(state = AppState)]
pub(crate) async fn room_ws(
    Path(room_id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ChatError> {
    let user = auth::resolve_bearer(&state.db_pool, &headers, &state.keys).await?;
    let room = store::room_members(&state.db_pool, room_id)
        .await?
        .ok_or(ChatError::RoomNotFound)?;

    if !room.has_participant(user.id) {
        // the handshake completes, then the client sees a distinguished
        // close code instead of a silently open connection
        warn!(user = %user.username, %room_id, "refusing non-participant");
        return Ok(ws.on_upgrade(move |mut socket| async move {
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: FORBIDDEN_CLOSE,
                    reason: Utf8Bytes::from_static("not a participant"),
                })))
                .await;
        }));
    }

    Ok(ws.on_upgrade(move |socket| {
        ChatSession {
            state,
            room_id,
            session_id: Uuid::now_v7(),
            user,
            joined: false,
        }
        .run(socket)
    }))
}

/// One live connection, bound to one user and one room for its lifetime.
struct ChatSession {
    state: AppState,
    room_id: Uuid,
    session_id: Uuid,
    user: User,
    joined: bool,
}

impl ChatSession {
    async fn run(mut self, socket: WebSocket) {
        let (mut sink, mut stream) = socket.split();

        let mut rx = self.state.groups.join(self.room_id, self.session_id).await;
        self.joined = true;

        self.broadcast_status(StatusKind::Online).await;
        if let Err(e) = store::set_status(&self.state.db_pool, self.user.id, self.room_id, true).await {
            warn!(user = %self.user.username, "failed to persist online status: {e}");
        }

        // Outbound delivery runs independently of inbound processing. A dead
        // client ends this task, which ends the session.
        let mut deliver = tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                if sink.send((*payload).clone().into()).await.is_err() {
                    break;
                }
            }
        });

        // Inbound frames are handled here, one at a time, in arrival order.
        loop {
            tokio::select! {
                _ = &mut deliver => break,
                inbound = stream.next() => match inbound {
                    Some(Ok(Message::Text(text))) => self.on_text(text.as_str()).await,
                    Some(Ok(Message::Binary(bytes))) => self.on_binary(&bytes).await,
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
            }
        }

        deliver.abort();
        self.shutdown().await;
    }

    /// Runs exactly once per session, whichever side closed the connection.
    async fn shutdown(&mut self) {
        if !self.joined {
            return;
        }
        self.joined = false;

        self.broadcast_status(StatusKind::Offline).await;
        self.state.groups.leave(self.room_id, self.session_id).await;
        if let Err(e) = store::set_status(&self.state.db_pool, self.user.id, self.room_id, false).await {
            warn!(user = %self.user.username, "failed to persist offline status: {e}");
        }
    }

    async fn broadcast_status(&self, content: StatusKind) {
        self.state
            .groups
            .broadcast(
                self.room_id,
                &ChatEvent::Status { username: self.user.username.clone(), content },
            )
            .await;
    }

    async fn on_text(&self, raw: &str) {
        let Ok(frame) = serde_json::from_str::<frame::TextFrame>(raw) else {
            debug!("dropping malformed text frame");
            return;
        };

        match frame.kind.as_str() {
            "typing" => {
                let content = if frame.message == "typing" {
                    format!("{} is typing...", self.user.username)
                } else {
                    self.user.username.clone()
                };
                self.state
                    .groups
                    .broadcast(
                        self.room_id,
                        &ChatEvent::Typing { username: self.user.username.clone(), content },
                    )
                    .await;
            }
            "message" => {
                if frame.message.is_empty() {
                    return;
                }
                let row = match store::create_message(
                    &self.state.db_pool,
                    &self.user,
                    &frame.message,
                    self.room_id,
                )
                .await
                {
                    Ok(row) => row,
                    Err(e) => {
                        warn!("message not persisted, suppressing broadcast: {e}");
                        return;
                    }
                };
                self.state
                    .groups
                    .broadcast(
                        self.room_id,
                        &ChatEvent::Message {
                            content: frame.message,
                            created: fmt::date(row.created),
                            time: fmt::clock(row.created),
                            sender: self.user.username.clone(),
                            id: row.id.to_string(),
                        },
                    )
                    .await;
            }
            "reply" => {
                if frame.message.is_empty() {
                    return;
                }
                let Some(snapshot) = self.resolve_reply_target(frame.previous_message_id).await
                else {
                    return;
                };
                let row = match store::create_reply(
                    &self.state.db_pool,
                    &self.user,
                    MessageKind::Text,
                    &frame.message,
                    &snapshot,
                    self.room_id,
                )
                .await
                {
                    Ok(row) => row,
                    Err(e) => {
                        warn!("reply not persisted, suppressing broadcast: {e}");
                        return;
                    }
                };
                self.state
                    .groups
                    .broadcast(
                        self.room_id,
                        &ChatEvent::Reply {
                            reply_format: ReplyFormat::Text,
                            content: frame.message,
                            previous_sender: snapshot.previous_sender,
                            previous_content: snapshot.previous_content,
                            previous_message_id: snapshot.previous_message_id.to_string(),
                            time: fmt::clock(row.created),
                            sender: self.user.username.clone(),
                            id: row.id.to_string(),
                        },
                    )
                    .await;
            }
            other => debug!(kind = other, "ignoring unknown frame type"),
        }
    }

    async fn on_binary(&self, raw: &[u8]) {
        let Some(audio) = frame::split_audio_frame(raw) else {
            debug!("dropping binary frame without delimiter or metadata");
            return;
        };
        let filename = frame::upload_filename();
        let encoded = BASE64.encode(audio.bytes);

        if audio.metadata.kind == "audio" {
            let row = match store::create_audio_message(&self.state.db_pool, &self.user, self.room_id).await {
                Ok(row) => row,
                Err(e) => {
                    warn!("audio message not persisted, suppressing broadcast: {e}");
                    return;
                }
            };
            self.state
                .groups
                .broadcast(
                    self.room_id,
                    &ChatEvent::Audio {
                        content: encoded,
                        filename: filename.clone(),
                        time: fmt::clock(row.created),
                        sender: self.user.username.clone(),
                        id: row.id.to_string(),
                    },
                )
                .await;
            self.spawn_upload(row.id, filename, audio.bytes.to_vec());
        } else {
            let Some(snapshot) = self.resolve_reply_target(audio.metadata.previous_message_id).await
            else {
                return;
            };
            let row = match store::create_reply(
                &self.state.db_pool,
                &self.user,
                MessageKind::Audio,
                "",
                &snapshot,
                self.room_id,
            )
            .await
            {
                Ok(row) => row,
                Err(e) => {
                    warn!("audio reply not persisted, suppressing broadcast: {e}");
                    return;
                }
            };
            self.state
                .groups
                .broadcast(
                    self.room_id,
                    &ChatEvent::Reply {
                        reply_format: ReplyFormat::Audio,
                        content: encoded,
                        previous_sender: snapshot.previous_sender,
                        previous_content: snapshot.previous_content,
                        previous_message_id: snapshot.previous_message_id.to_string(),
                        time: fmt::clock(row.created),
                        sender: self.user.username.clone(),
                        id: row.id.to_string(),
                    },
                )
                .await;
            self.spawn_upload(row.id, filename, audio.bytes.to_vec());
        }
    }

    /// A reply must name a message that exists in this room; anything else
    /// drops the frame rather than persisting a half-empty snapshot.
    async fn resolve_reply_target(&self, id: Option<Uuid>) -> Option<ReplySnapshot> {
        let Some(id) = id else {
            warn!("reply without previous_message_id, dropping");
            return None;
        };
        match store::get_message(&self.state.db_pool, id, self.room_id).await {
            Ok(Some(message)) => Some(message.reply_snapshot()),
            Ok(None) => {
                warn!(%id, "reply target not found in this room, dropping");
                None
            }
            Err(e) => {
                warn!(%id, "reply target lookup failed, dropping: {e}");
                None
            }
        }
    }

    /// The broadcast already carried the audio inline; durable storage and
    /// the row update happen off the session task.
    fn spawn_upload(&self, message_id: Uuid, filename: String, bytes: Vec<u8>) {
        let pool = self.state.db_pool.clone();
        let blobs = Arc::clone(&self.state.blobs);
        tokio::spawn(async move {
            let locator = match blobs.upload(&filename, &bytes).await {
                Ok(locator) => locator,
                Err(e) => {
                    warn!(%message_id, "audio upload failed, row left provisional: {e}");
                    return;
                }
            };
            if let Err(e) = store::update_audio_content(&pool, message_id, &locator).await {
                warn!(%message_id, "failed to attach uploaded audio: {e}");
            }
        });
    }
}
