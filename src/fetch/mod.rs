use crate::error::Result;
use crate::query::QueryRequest;
use crate::records::Table;

pub mod client;
pub mod decode;

pub use client::HttpCsmarClient;

/// Result of a data fetch whose payload may not be a usable table.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Usable(Table),
    /// The backend answered, but not with a table; carries a short reason.
    Unusable(String),
}

/// Narrow surface of the remote data service.
///
/// Errors returned here (transport, auth, status) are passed to the caller
/// untouched; only `FetchOutcome::Unusable` is handled by the orchestrator.
pub trait CsmarApi {
    fn login(&mut self, account: &str, password: &str) -> Result<()>;

    /// Number of rows the query would return. Never subject to the row limit.
    fn count(&self, request: &QueryRequest) -> Result<u64>;

    fn fetch(&self, request: &QueryRequest) -> Result<FetchOutcome>;

    fn list_databases(&self) -> Result<Table>;

    fn list_tables(&self, database: &str) -> Result<Table>;

    fn list_fields(&self, table: &str) -> Result<Table>;
}
