//! Append-only command journal.
//!
//! One JSON entry per line, one segment file per store session. Segment
//! files are named by the sequence number of their first entry so that
//! lexicographic directory order is replay order.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::{StoreError, StoreResult};

const SEGMENT_PREFIX: &str = "journal.";
const SEGMENT_SUFFIX: &str = ".log";

/// A single journaled command, tagged with its commit sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub command: Command,
}

/// Writer for the current journal segment.
#[derive(Debug)]
pub struct Journal {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl Journal {
    /// Open the segment whose first entry will carry `start_seq`.
    ///
    /// A session that commits nothing leaves its segment empty; the next
    /// session lands on the same name and appends to it, so reopening is
    /// always possible.
    pub fn create(dir: &Path, start_seq: u64) -> StoreResult<Self> {
        let path = dir.join(segment_name(start_seq));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    /// Durably append one entry: write, flush, fsync. The caller must not
    /// apply the command in memory before this returns.
    pub fn append(&mut self, entry: &JournalEntry) -> StoreResult<()> {
        serde_json::to_writer(&mut self.writer, entry)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    /// Flush and fsync any buffered writes.
    pub fn sync(&mut self) -> StoreResult<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read every journal entry with `seq > after_seq`, across all segments, in
/// commit order. Sequence numbers must be strictly increasing; anything else
/// is a [`StoreError::ReplayInconsistency`].
pub fn read_entries(dir: &Path, after_seq: u64) -> StoreResult<Vec<JournalEntry>> {
    let mut segments: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_segment(path))
        .collect();
    segments.sort();

    let mut entries = Vec::new();
    let mut last_seq = after_seq;
    for segment in &segments {
        let reader = BufReader::new(File::open(segment)?);
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                // A torn trailing write leaves an empty line; older entries
                // are still intact.
                continue;
            }
            let entry: JournalEntry = serde_json::from_str(&line).map_err(|e| {
                StoreError::replay(format!(
                    "corrupt entry at {}:{}: {e}",
                    segment.display(),
                    line_no + 1
                ))
            })?;
            if entry.seq <= after_seq {
                continue;
            }
            if entry.seq <= last_seq {
                return Err(StoreError::replay(format!(
                    "non-monotonic sequence {} after {} in {}",
                    entry.seq,
                    last_seq,
                    segment.display()
                )));
            }
            last_seq = entry.seq;
            entries.push(entry);
        }
    }
    Ok(entries)
}

fn segment_name(start_seq: u64) -> String {
    format!("{SEGMENT_PREFIX}{start_seq:020}{SEGMENT_SUFFIX}")
}

fn is_segment(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(SEGMENT_PREFIX) && name.ends_with(SEGMENT_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use diarium_core::Identity;

    fn entry(seq: u64) -> JournalEntry {
        JournalEntry {
            seq,
            command: Command::CreateUnit {
                identity: Identity::new(seq),
                code: format!("U{seq}"),
                name: None,
            },
        }
    }

    #[test]
    fn entries_are_read_back_in_commit_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut journal = Journal::create(dir.path(), 1).unwrap();
        for seq in 1..=3 {
            journal.append(&entry(seq)).unwrap();
        }
        drop(journal);

        let entries = read_entries(dir.path(), 0).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2], entry(3));
    }

    #[test]
    fn entries_at_or_before_the_snapshot_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut journal = Journal::create(dir.path(), 1).unwrap();
        for seq in 1..=4 {
            journal.append(&entry(seq)).unwrap();
        }
        drop(journal);

        let entries = read_entries(dir.path(), 2).unwrap();
        assert_eq!(entries.iter().map(|e| e.seq).collect::<Vec<_>>(), [3, 4]);
    }

    #[test]
    fn an_empty_segment_can_be_reopened() {
        let dir = tempfile::tempdir().unwrap();
        drop(Journal::create(dir.path(), 1).unwrap());

        let mut journal = Journal::create(dir.path(), 1).unwrap();
        journal.append(&entry(1)).unwrap();
        drop(journal);

        let entries = read_entries(dir.path(), 0).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn replay_spans_multiple_segments() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = Journal::create(dir.path(), 1).unwrap();
        first.append(&entry(1)).unwrap();
        drop(first);
        let mut second = Journal::create(dir.path(), 2).unwrap();
        second.append(&entry(2)).unwrap();
        drop(second);

        let entries = read_entries(dir.path(), 0).unwrap();
        assert_eq!(entries.iter().map(|e| e.seq).collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn corrupt_entry_is_a_replay_inconsistency() {
        let dir = tempfile::tempdir().unwrap();
        let mut journal = Journal::create(dir.path(), 1).unwrap();
        journal.append(&entry(1)).unwrap();
        let path = journal.path().to_owned();
        drop(journal);
        fs::write(&path, b"{\"seq\":1,\"command\":{\"kind\":\"create_unit\"").unwrap();

        let err = read_entries(dir.path(), 0).unwrap_err();
        assert!(matches!(err, StoreError::ReplayInconsistency(_)));
    }
}
