pub mod orchestrator;
pub mod planner;
pub mod request;

pub use orchestrator::QueryOrchestrator;
pub use planner::{plan_chunks, Chunk};
pub use request::{QueryRequest, DATE_FORMAT};
