//! Error types for signrelay.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Output sink errors (never fatal to playback)
    #[error("Sink '{sink}' failed: {message}")]
    Sink { sink: String, message: String },

    // Relay backend errors
    #[error("Message repository error: {message}")]
    Repository { message: String },

    #[error("Change feed error: {message}")]
    Feed { message: String },

    // Room lifecycle errors
    #[error("Invalid room code '{room_code}'")]
    InvalidRoomCode { room_code: String },

    #[error("Room {room_code} not found")]
    RoomNotFound { room_code: String },

    #[error("Room {room_code} is full")]
    RoomFull { room_code: String },

    #[error("Chat session {session_id} not found for this user")]
    SessionNotFound { session_id: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, RelayError>;
