pub mod table;

pub use table::{print_table, render_table};
