use roomchat_common::RoomchatError;

/// Why a client operation was rejected or failed.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("room id is empty")]
    EmptyRoomId,

    #[error("message is empty")]
    EmptyMessage,

    #[error("not connected")]
    NotConnected,

    #[error("transport closed")]
    TransportClosed,

    #[error("client has shut down")]
    Shutdown,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ClientError {
    /// Validation rejections leave the session untouched and are safe to
    /// show to the user as-is.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ClientError::EmptyRoomId | ClientError::EmptyMessage | ClientError::NotConnected
        )
    }
}

impl From<ClientError> for RoomchatError {
    fn from(err: ClientError) -> Self {
        RoomchatError::Client(err.to_string())
    }
}
