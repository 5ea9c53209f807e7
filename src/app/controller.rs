use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::cli::Commands;
use crate::config::Config;
use crate::error::Result;
use crate::fetch::{CsmarApi, HttpCsmarClient};
use crate::query::{QueryOrchestrator, QueryRequest};
use crate::records::{QueryHistory, Table};
use crate::ui::print_table;
use crate::utils::{format_local, parse_column_list, SystemClock};

/// Rows shown for metadata listings.
const LISTING_PREVIEW_ROWS: usize = 500;

/// Wires configuration, the gateway client and the query history to CLI commands.
pub struct AppController {
    config: Config,
}

impl AppController {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Query {
                columns,
                condition,
                table,
                start,
                end,
                output,
                preview,
            } => {
                let request =
                    QueryRequest::new(parse_column_list(&columns), condition, table, start, end)?;
                self.run_query(&request, output.as_deref(), preview)
            }
            Commands::Databases => {
                let listing = self.connect()?.list_databases()?;
                print_table(&listing, LISTING_PREVIEW_ROWS);
                Ok(())
            }
            Commands::Tables { database } => {
                let listing = self.connect()?.list_tables(&database)?;
                print_table(&listing, LISTING_PREVIEW_ROWS);
                Ok(())
            }
            Commands::Fields { table } => {
                let listing = self.connect()?.list_fields(&table)?;
                print_table(&listing, LISTING_PREVIEW_ROWS);
                Ok(())
            }
            Commands::History { prune, clear } => self.run_history(prune, clear),
        }
    }

    fn open_history(&self) -> QueryHistory {
        QueryHistory::open(
            self.config.history_file.clone(),
            &self.config.limits,
            Arc::new(SystemClock),
        )
    }

    fn connect(&self) -> Result<HttpCsmarClient> {
        let mut client = HttpCsmarClient::from_config(&self.config)?;
        match (&self.config.account, &self.config.password) {
            (Some(account), Some(password)) => client.login(account, password)?,
            _ => log::warn!("No account credentials configured; continuing without login"),
        }
        Ok(client)
    }

    fn run_query(&self, request: &QueryRequest, output: Option<&Path>, preview: usize) -> Result<()> {
        let client = self.connect()?;
        let mut orchestrator =
            QueryOrchestrator::new(client, self.open_history(), self.config.limits.clone());

        let table = orchestrator.execute(request)?;
        print_table(&table, preview);

        if let Some(path) = output {
            table.save_to_csv(path)?;
            println!("Saved {} row(s) to {}", table.len(), path.display());
        }
        Ok(())
    }

    fn run_history(&self, prune: bool, clear: bool) -> Result<()> {
        let mut history = self.open_history();

        if clear {
            let dropped = history.len();
            history.clear();
            history.persist()?;
            println!("Cleared {} recorded signature(s).", dropped);
            return Ok(());
        }

        if prune {
            let removed = history.prune_expired();
            history.persist()?;
            println!("Removed {} expired signature(s).", removed);
        }

        print_table(&history_table(&history), usize::MAX);
        Ok(())
    }
}

fn history_table(history: &QueryHistory) -> Table {
    let mut entries: Vec<_> = history.entries().collect();
    entries.sort_by(|a, b| b.1.last_query_time.cmp(&a.1.last_query_time));

    let rows: Vec<Vec<Value>> = entries
        .into_iter()
        .map(|(signature, entry)| {
            vec![
                signature.condition.clone().into(),
                signature.start.clone().unwrap_or_default().into(),
                signature.end.clone().unwrap_or_default().into(),
                format_local(entry.last_query_time).into(),
                entry.repetition_count.into(),
            ]
        })
        .collect();

    Table::new(
        ["Condition", "Start", "End", "Last Query", "Repetitions"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        rows,
    )
}
