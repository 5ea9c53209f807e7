pub mod file;
pub mod text;
pub mod time;

pub use file::ensure_parent_dir;
pub use text::{parse_column_list, truncate_to_width};
pub use time::{format_local, Clock, SystemClock};
#[cfg(test)]
pub use time::ManualClock;
