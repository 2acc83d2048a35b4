use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuillError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Record {id} not found")]
    NotFound { id: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
