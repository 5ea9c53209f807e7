//! Query front-end for the CSMAR data service that keeps every request under
//! the backend's row limit and clear of its repeated-query cool-down.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod query;
pub mod records;
pub mod ui;
pub mod utils;

pub use error::{AppError, Result};
pub use fetch::{CsmarApi, FetchOutcome, HttpCsmarClient};
pub use query::{QueryOrchestrator, QueryRequest};
pub use records::{QueryHistory, QuerySignature, Table};
