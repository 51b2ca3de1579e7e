use axum::{http::StatusCode, response::{IntoResponse, Response}};

/// Failure taxonomy of the chat core. Frame-level problems (malformed JSON,
/// missing delimiter, unresolvable reply target) are not errors: the frame
/// is dropped and the connection stays open. A non-participant with valid
/// credentials is not an error either; the session is accepted and then
/// closed with [`crate::chat::FORBIDDEN_CLOSE`].
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("missing or invalid credentials")]
    Unauthorized,
    #[error("user not found")]
    UnknownUser,
    #[error("room not found")]
    RoomNotFound,
    #[error("a room pairs exactly one artist with one collector")]
    InvalidPairing,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error("malformed id in row")]
    BadRow(#[from] uuid::Error),
    #[error("blob store failure: {0}")]
    Blob(#[source] std::io::Error),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match &self {
            ChatError::Unauthorized => StatusCode::UNAUTHORIZED,
            ChatError::UnknownUser | ChatError::RoomNotFound => StatusCode::NOT_FOUND,
            ChatError::InvalidPairing => StatusCode::FORBIDDEN,
            ChatError::Db(_) | ChatError::BadRow(_) | ChatError::Blob(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}
