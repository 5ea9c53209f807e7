use crate::error::{AppError, Result};

/// Upper bound on chunks per query; a count beyond this is treated as bogus.
pub const MAX_CHUNKS: u64 = 10_000;

/// One row window of a paginated query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub offset: u64,
    /// Rows this chunk actually covers; only the last chunk may be shorter than `window`.
    pub len: u64,
    pub window: u64,
}

impl Chunk {
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }

    /// Restrict `condition` to this chunk's row window.
    ///
    /// The full window size is emitted, not `len`, so that two plans with
    /// different window sizes never produce the same text.
    pub fn rewrite(&self, condition: &str) -> String {
        let condition = condition.trim();
        if condition.is_empty() {
            format!("limit {},{}", self.offset, self.window)
        } else {
            format!("{} limit {},{}", condition, self.offset, self.window)
        }
    }
}

/// Split `[0, total)` into consecutive chunks of at most `window` rows.
///
/// `total` comes from the backend, so plans longer than [`MAX_CHUNKS`] are
/// refused instead of allocated.
pub fn plan_chunks(total: u64, window: u64) -> Result<Vec<Chunk>> {
    if window == 0 {
        return Err(AppError::message("chunk window must be positive"));
    }
    let needed = total.div_ceil(window);
    if needed > MAX_CHUNKS {
        return Err(AppError::RowCountTooLarge {
            total,
            window,
            chunks: needed,
            max_chunks: MAX_CHUNKS,
        });
    }

    let mut chunks = Vec::with_capacity(needed as usize);
    let mut offset = 0;
    while offset < total {
        let len = window.min(total - offset);
        chunks.push(Chunk {
            offset,
            len,
            window,
        });
        offset += len;
    }
    Ok(chunks)
}
