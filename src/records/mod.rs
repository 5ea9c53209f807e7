pub mod history;
pub mod table;

pub use history::{HistoryEntry, LoadOutcome, QueryHistory, QuerySignature, HISTORY_FORMAT_VERSION};
pub use table::{cell_to_string, Table};
