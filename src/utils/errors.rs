use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Database not connected - call connect() first")]
    NotConnected,

    #[cfg(feature = "remote")]
    #[error("Remote database error: {0}")]
    Remote(#[from] mongodb::error::Error),
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<toml::de::Error> for DbError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
