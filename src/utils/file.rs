use std::fs;
use std::path::Path;

use crate::error::{Context, Result};

/// Create the parent directory of `path` when it has one that does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create parent directory {}", parent.display())
            })?;
            Ok(())
        }
        _ => Ok(()),
    }
}
