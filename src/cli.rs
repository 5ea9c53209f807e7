use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(name = "csmar-query")]
#[command(about = "Query the CSMAR data service without tripping its row and repeat limits")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Override the query history file from the config
    #[arg(long)]
    pub history_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a query, paginating and rewriting it as needed
    Query {
        /// Comma separated column list (e.g. Stkcd,ShortName,Accper)
        #[arg(short = 'C', long)]
        columns: String,

        /// SQL-like filter, e.g. "Stkcd='000001'" (no ORDER BY)
        #[arg(long, default_value = "")]
        condition: String,

        #[arg(short, long)]
        table: String,

        /// First date, YYYY-MM-DD
        #[arg(long)]
        start: Option<String>,

        /// Last date, YYYY-MM-DD
        #[arg(long)]
        end: Option<String>,

        /// Write the full result to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rows printed to the terminal
        #[arg(long, default_value_t = 20)]
        preview: usize,
    },

    /// List purchased databases
    Databases,

    /// List purchased tables of a database
    Tables { database: String },

    /// List the fields of a table
    Fields { table: String },

    /// Show recorded query signatures
    History {
        /// Drop entries whose cool-down has expired
        #[arg(long, conflicts_with = "clear")]
        prune: bool,

        /// Forget every recorded signature
        #[arg(long)]
        clear: bool,
    },
}
