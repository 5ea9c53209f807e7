use crate::config::QueryLimits;
use crate::error::{AppError, Result};
use crate::fetch::{CsmarApi, FetchOutcome};
use crate::records::{QueryHistory, QuerySignature, Table};

use super::planner::{plan_chunks, Chunk};
use super::request::QueryRequest;

/// Attempts allowed for the single direct fetch on the fresh path.
const DIRECT_FETCH_ATTEMPTS: u32 = 2;

/// Runs logical queries against the backend while keeping them inside its
/// row limit and away from its duplicate-query detector.
pub struct QueryOrchestrator<A> {
    api: A,
    history: QueryHistory,
    limits: QueryLimits,
}

impl<A: CsmarApi> QueryOrchestrator<A> {
    pub fn new(api: A, history: QueryHistory, limits: QueryLimits) -> Self {
        Self {
            api,
            history,
            limits,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn history(&self) -> &QueryHistory {
        &self.history
    }

    /// Run `request` and return every matching row, in chunk order.
    pub fn execute(&mut self, request: &QueryRequest) -> Result<Table> {
        let total = self.api.count(request)?;
        let signature = request.signature();

        if self.history.is_active(&signature) {
            self.execute_repeated(request, &signature, total)
        } else {
            self.execute_fresh(request, &signature, total)
        }
    }

    fn execute_fresh(
        &mut self,
        request: &QueryRequest,
        signature: &QuerySignature,
        total: u64,
    ) -> Result<Table> {
        if total < self.limits.row_limit {
            log::info!(
                "Fresh query {} ({} rows): single fetch from {}",
                signature,
                total,
                request.table
            );
            return self.fetch_direct(request, signature);
        }

        let chunks = plan_chunks(total, self.limits.row_limit)?;
        self.history.record_fresh(signature);
        self.history.persist()?;

        log::info!(
            "Fresh query {} ({} rows): {} chunk(s) of {} rows",
            signature,
            total,
            chunks.len(),
            self.limits.row_limit
        );
        self.fetch_chunks(request, &chunks)
    }

    // The whole fresh single-fetch branch is retried once, timestamp included.
    fn fetch_direct(
        &mut self,
        request: &QueryRequest,
        signature: &QuerySignature,
    ) -> Result<Table> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.history.record_fresh(signature);
            self.history.persist()?;

            match self.checked_fetch(request)? {
                FetchOutcome::Usable(table) => return Ok(table),
                FetchOutcome::Unusable(reason) if attempt < DIRECT_FETCH_ATTEMPTS => {
                    log::warn!(
                        "Query against {} returned unusable data ({}); retrying once",
                        request.table,
                        reason
                    );
                }
                FetchOutcome::Unusable(reason) => {
                    log::error!(
                        "Query against {} returned unusable data again: {}",
                        request.table,
                        reason
                    );
                    return Err(AppError::UnusableResult {
                        table: request.table.clone(),
                        attempts: attempt,
                    });
                }
            }
        }
    }

    fn execute_repeated(
        &mut self,
        request: &QueryRequest,
        signature: &QuerySignature,
        total: u64,
    ) -> Result<Table> {
        let count = self.history.record_repeat(signature);
        self.history.persist()?;

        let window = self
            .limits
            .row_limit
            .checked_sub(u64::from(count))
            .filter(|window| *window > 0)
            .ok_or(AppError::RepeatBudgetExhausted {
                count,
                row_limit: self.limits.row_limit,
            })?;

        let chunks = plan_chunks(total, window)?;
        log::info!(
            "Repeated query {} (repetition {}, {} rows): {} chunk(s) of {} rows",
            signature,
            count,
            total,
            chunks.len(),
            window
        );
        self.fetch_chunks(request, &chunks)
    }

    fn fetch_chunks(&self, request: &QueryRequest, chunks: &[Chunk]) -> Result<Table> {
        let mut parts = Vec::with_capacity(chunks.len());
        for (idx, chunk) in chunks.iter().enumerate() {
            let rewritten = request.with_condition(chunk.rewrite(&request.condition));
            log::debug!(
                "Chunk {}/{}: rows [{}, {}) via `{}`",
                idx + 1,
                chunks.len(),
                chunk.offset,
                chunk.end(),
                rewritten.condition
            );

            match self.checked_fetch(&rewritten)? {
                FetchOutcome::Usable(part) => parts.push(part),
                FetchOutcome::Unusable(reason) => {
                    log::error!(
                        "Chunk at offset {} of {} returned unusable data: {}",
                        chunk.offset,
                        request.table,
                        reason
                    );
                    return Err(AppError::UnusableResult {
                        table: request.table.clone(),
                        attempts: 1,
                    });
                }
            }
        }
        Table::concat(request.columns.clone(), parts)
    }

    /// Fetch and bring a usable answer into the requested column order; a
    /// result missing a requested column counts as unusable.
    fn checked_fetch(&self, request: &QueryRequest) -> Result<FetchOutcome> {
        let outcome = match self.api.fetch(request)? {
            FetchOutcome::Usable(table) => match table.project(&request.columns) {
                Ok(table) => FetchOutcome::Usable(table),
                Err(missing) => {
                    FetchOutcome::Unusable(format!("requested column `{missing}` is missing"))
                }
            },
            unusable => unusable,
        };
        Ok(outcome)
    }
}
