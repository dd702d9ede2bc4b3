use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriftqError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Queue error: {message}")]
    Queue { message: String },
}
