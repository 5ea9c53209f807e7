use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Chrono(#[from] chrono::ParseError),
    /// The backend kept returning data that cannot be read as a table.
    #[error("query against `{table}` returned unusable data after {attempts} attempt(s)")]
    UnusableResult { table: String, attempts: u32 },
    #[error("repetition count {count} leaves no room under the {row_limit}-row limit")]
    RepeatBudgetExhausted { count: u32, row_limit: u64 },
    /// The reported row count would need more chunks than a single run may issue.
    #[error("{total} rows would need {chunks} chunks of {window}; at most {max_chunks} are allowed")]
    RowCountTooLarge {
        total: u64,
        window: u64,
        chunks: u64,
        max_chunks: u64,
    },
    #[error("gateway returned status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        AppError::Message(msg.into())
    }
}
