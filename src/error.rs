/// Errors raised at the I/O edges (storage, import). The rating engine itself
/// never fails; it degrades to defaults.
#[derive(thiserror::Error, Debug)]
pub enum PeladaError {
    /// Query or connection failure in the SQLite store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored JSON column or an import file could not be (de)serialized.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown position: {0}")]
    InvalidPosition(String),

    #[error("unknown match status: {0}")]
    InvalidStatus(String),

    #[error("invalid date {value}: {source}")]
    InvalidDate {
        value: String,
        source: chrono::ParseError,
    },

    /// A legacy lineup entry reports more goals or assists than a match can hold.
    #[error("match {match_id}: {name} has an implausible {stat} count of {count}")]
    ImplausibleCount {
        match_id: String,
        name: String,
        stat: &'static str,
        count: u32,
    },

    /// A partial update targeted a player id the store does not know.
    #[error("player not found: {0}")]
    PlayerNotFound(String),
}

pub type Result<T> = std::result::Result<T, PeladaError>;
