use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::QueryLimits;
use crate::error::{Context, Result};
use crate::utils::{ensure_parent_dir, Clock};

/// Bumped whenever the on-disk layout changes; other versions are discarded on load.
pub const HISTORY_FORMAT_VERSION: u32 = 1;

/// Identity of a logical query for duplicate detection.
///
/// Table name and column list are deliberately not part of it: two queries
/// that only differ in those still count as the same query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuerySignature {
    pub condition: String,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl QuerySignature {
    pub fn new(condition: impl Into<String>, start: Option<String>, end: Option<String>) -> Self {
        Self {
            condition: condition.into(),
            start,
            end,
        }
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` [{} .. {}]",
            self.condition,
            self.start.as_deref().unwrap_or("*"),
            self.end.as_deref().unwrap_or("*")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    pub last_query_time: DateTime<Utc>,
    pub repetition_count: u32,
}

/// What happened when the persisted history was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(usize),
    Missing,
    /// The file existed but could not be used; the store was left empty.
    Discarded(String),
}

#[derive(Serialize, Deserialize)]
struct HistoryFile {
    version: u32,
    entries: Vec<StoredEntry>,
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    #[serde(flatten)]
    signature: QuerySignature,
    last_query_time: DateTime<Utc>,
    repetition_count: u32,
}

/// Recently issued query signatures, persisted as a single JSON document.
pub struct QueryHistory {
    path: PathBuf,
    entries: HashMap<QuerySignature, HistoryEntry>,
    cooldown: Duration,
    repeat_base: u32,
    clock: Arc<dyn Clock>,
}

impl QueryHistory {
    /// Empty store bound to `path`; nothing is read from disk.
    pub fn new(path: impl Into<PathBuf>, limits: &QueryLimits, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            entries: HashMap::new(),
            cooldown: limits.cooldown(),
            repeat_base: limits.repeat_base,
            clock,
        }
    }

    /// Build the store and populate it from `path`.
    pub fn open(path: impl Into<PathBuf>, limits: &QueryLimits, clock: Arc<dyn Clock>) -> Self {
        let mut history = Self::new(path, limits, clock);
        match history.load() {
            LoadOutcome::Loaded(count) => log::info!(
                "Loaded {} query history entries from {}",
                count,
                history.path.display()
            ),
            LoadOutcome::Missing => log::debug!(
                "No query history at {}; starting empty",
                history.path.display()
            ),
            LoadOutcome::Discarded(reason) => log::warn!(
                "Ignoring query history at {}: {}",
                history.path.display(),
                reason
            ),
        }
        history
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, signature: &QuerySignature) -> Option<&HistoryEntry> {
        self.entries.get(signature)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&QuerySignature, &HistoryEntry)> {
        self.entries.iter()
    }

    /// True while `signature` was issued within the cool-down window.
    ///
    /// Finding an expired entry triggers a sweep of every expired entry.
    pub fn is_active(&mut self, signature: &QuerySignature) -> bool {
        let now = self.clock.now();
        let Some(entry) = self.entries.get(signature) else {
            return false;
        };

        if self.is_expired(entry, now) {
            let removed = self.sweep(now);
            log::debug!("Signature {} expired; swept {} stale entries", signature, removed);
            false
        } else {
            true
        }
    }

    pub fn record_fresh(&mut self, signature: &QuerySignature) {
        let entry = HistoryEntry {
            last_query_time: self.clock.now(),
            repetition_count: self.repeat_base,
        };
        self.entries.insert(signature.clone(), entry);
    }

    /// Refresh the timestamp, bump the counter and return the new count.
    pub fn record_repeat(&mut self, signature: &QuerySignature) -> u32 {
        let now = self.clock.now();
        let base = self.repeat_base;
        let entry = self
            .entries
            .entry(signature.clone())
            .or_insert(HistoryEntry {
                last_query_time: now,
                repetition_count: base,
            });
        entry.last_query_time = now;
        entry.repetition_count = entry.repetition_count.saturating_add(1);
        entry.repetition_count
    }

    /// Drop every expired entry and report how many were removed.
    pub fn prune_expired(&mut self) -> usize {
        let now = self.clock.now();
        self.sweep(now)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace the in-memory state with what is on disk.
    ///
    /// A missing, unreadable, corrupt or foreign-version file leaves the store
    /// empty instead of failing.
    pub fn load(&mut self) -> LoadOutcome {
        self.entries.clear();

        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return LoadOutcome::Missing,
            Err(err) => return LoadOutcome::Discarded(format!("unreadable: {err}")),
        };

        let file: HistoryFile = match serde_json::from_str(&data) {
            Ok(file) => file,
            Err(err) => return LoadOutcome::Discarded(format!("corrupt: {err}")),
        };

        if file.version != HISTORY_FORMAT_VERSION {
            return LoadOutcome::Discarded(format!(
                "format version {} is not supported (expected {})",
                file.version, HISTORY_FORMAT_VERSION
            ));
        }

        for stored in file.entries {
            self.entries.insert(
                stored.signature,
                HistoryEntry {
                    last_query_time: stored.last_query_time,
                    repetition_count: stored.repetition_count,
                },
            );
        }
        LoadOutcome::Loaded(self.entries.len())
    }

    /// Write the whole store next to its target and atomically swap it in.
    pub fn persist(&self) -> Result<()> {
        ensure_parent_dir(&self.path)?;

        let mut stored: Vec<StoredEntry> = self
            .entries
            .iter()
            .map(|(signature, entry)| StoredEntry {
                signature: signature.clone(),
                last_query_time: entry.last_query_time,
                repetition_count: entry.repetition_count,
            })
            .collect();
        stored.sort_by(|a, b| a.last_query_time.cmp(&b.last_query_time));

        let json = serde_json::to_string_pretty(&HistoryFile {
            version: HISTORY_FORMAT_VERSION,
            entries: stored,
        })
        .context("Failed to serialize query history")?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).with_context(|| {
            format!("Failed to create temporary history file in {}", dir.display())
        })?;
        tmp.write_all(json.as_bytes())
            .context("Failed to write query history")?;
        tmp.as_file()
            .sync_all()
            .context("Failed to flush query history")?;
        tmp.persist(&self.path)
            .map_err(|err| err.error)
            .with_context(|| format!("Failed to replace history file {}", self.path.display()))?;

        log::debug!(
            "Persisted {} query history entries to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }

    fn is_expired(&self, entry: &HistoryEntry, now: DateTime<Utc>) -> bool {
        now - entry.last_query_time > self.cooldown
    }

    fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let cooldown = self.cooldown;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now - entry.last_query_time <= cooldown);
        before - self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap()
    }

    fn signature(condition: &str) -> QuerySignature {
        QuerySignature::new(
            condition,
            Some("2020-01-01".to_string()),
            Some("2020-12-31".to_string()),
        )
    }

    fn history_at(dir: &Path) -> (QueryHistory, ManualClock) {
        let clock = ManualClock::new(start());
        let history = QueryHistory::new(
            dir.join("history.json"),
            &QueryLimits::default(),
            Arc::new(clock.clone()),
        );
        (history, clock)
    }

    #[test]
    fn unseen_signature_is_not_active() {
        let dir = tempfile::tempdir().unwrap();
        let (mut history, _) = history_at(dir.path());
        assert!(!history.is_active(&signature("Stkcd='000001'")));
    }

    #[test]
    fn fresh_record_stays_active_for_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let (mut history, clock) = history_at(dir.path());
        let sig = signature("Stkcd='000001'");

        history.record_fresh(&sig);
        assert_eq!(history.get(&sig).unwrap().repetition_count, 11);

        clock.advance(Duration::minutes(29) + Duration::seconds(59));
        assert!(history.is_active(&sig));

        clock.set(start() + Duration::minutes(30));
        assert!(history.is_active(&sig), "window boundary is inclusive");

        clock.set(start() + Duration::minutes(30) + Duration::seconds(1));
        assert!(!history.is_active(&sig));
        assert!(history.get(&sig).is_none(), "expired entry is swept");
    }

    #[test]
    fn expired_lookup_sweeps_only_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let (mut history, clock) = history_at(dir.path());
        let old_a = signature("a");
        let old_b = signature("b");
        let recent = signature("c");

        history.record_fresh(&old_a);
        history.record_fresh(&old_b);
        clock.advance(Duration::minutes(20));
        history.record_fresh(&recent);
        clock.advance(Duration::minutes(15));

        assert!(!history.is_active(&old_a));
        assert_eq!(history.len(), 1);
        assert!(history.get(&old_b).is_none());
        assert!(history.is_active(&recent));
    }

    #[test]
    fn repeat_strictly_increases_count_and_refreshes_time() {
        let dir = tempfile::tempdir().unwrap();
        let (mut history, clock) = history_at(dir.path());
        let sig = signature("Stkcd='600000'");

        history.record_fresh(&sig);
        let mut previous = history.get(&sig).unwrap().repetition_count;
        for _ in 0..5 {
            clock.advance(Duration::minutes(10));
            assert!(history.is_active(&sig));
            let count = history.record_repeat(&sig);
            assert!(count > previous);
            previous = count;
        }

        assert_eq!(previous, 16);
        assert_eq!(history.get(&sig).unwrap().last_query_time, clock.now());
    }

    #[test]
    fn prune_reports_removed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let (mut history, clock) = history_at(dir.path());
        history.record_fresh(&signature("a"));
        history.record_fresh(&signature("b"));
        clock.advance(Duration::minutes(31));
        history.record_fresh(&signature("c"));

        assert_eq!(history.prune_expired(), 2);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn persist_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let (mut history, clock) = history_at(dir.path());
        let first = signature("Stkcd='000001'");
        let open_range = QuerySignature::new("Markettype=4", None, None);

        history.record_fresh(&first);
        clock.advance(Duration::minutes(3));
        history.record_fresh(&open_range);
        history.record_repeat(&open_range);
        history.persist().unwrap();

        let mut reloaded = QueryHistory::new(
            history.path().to_path_buf(),
            &QueryLimits::default(),
            Arc::new(clock.clone()),
        );
        assert_eq!(reloaded.load(), LoadOutcome::Loaded(2));
        assert_eq!(reloaded.get(&first), history.get(&first));
        assert_eq!(reloaded.get(&open_range), history.get(&open_range));
        assert_eq!(reloaded.get(&open_range).unwrap().repetition_count, 12);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (mut history, _) = history_at(dir.path());
        assert_eq!(history.load(), LoadOutcome::Missing);
        assert!(history.is_empty());
    }

    #[test]
    fn corrupt_or_foreign_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let (mut history, _) = history_at(dir.path());
        history.record_fresh(&signature("kept in memory only"));

        fs::write(history.path(), "{ definitely not json").unwrap();
        assert!(matches!(history.load(), LoadOutcome::Discarded(_)));
        assert!(history.is_empty());

        fs::write(history.path(), r#"{ "version": 99, "entries": [] }"#).unwrap();
        match history.load() {
            LoadOutcome::Discarded(reason) => assert!(reason.contains("99"), "{reason}"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn persist_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(start());
        let mut history = QueryHistory::new(
            dir.path().join("state").join("history.json"),
            &QueryLimits::default(),
            Arc::new(clock),
        );
        history.record_fresh(&signature("x"));
        history.persist().unwrap();
        assert!(history.path().is_file());
    }
}
