pub mod errors;

pub use errors::{ConfigError, RoomchatError};

pub type Result<T> = std::result::Result<T, RoomchatError>;
