//! Periodic root snapshots.
//!
//! A snapshot captures the materialized root as of a journal sequence
//! number; replay on open starts from the newest snapshot and only re-runs
//! entries appended after it.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use diarium_domain::Root;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

const SNAPSHOT_PREFIX: &str = "snapshot.";
const SNAPSHOT_SUFFIX: &str = ".json";

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    seq: u64,
    root: Root,
}

/// Write the root as of journal sequence `seq`. Written to a temporary file
/// first and renamed into place so a crash never leaves a half snapshot
/// under the snapshot name.
pub fn write(dir: &Path, seq: u64, root: &Root) -> StoreResult<PathBuf> {
    let path = dir.join(format!("{SNAPSHOT_PREFIX}{seq:020}{SNAPSHOT_SUFFIX}"));
    let tmp = path.with_extension("tmp");
    let mut writer = BufWriter::new(File::create(&tmp)?);
    serde_json::to_writer(
        &mut writer,
        &SnapshotFile {
            seq,
            root: root.clone(),
        },
    )?;
    writer.flush()?;
    writer.get_ref().sync_data()?;
    fs::rename(&tmp, &path)?;
    Ok(path)
}

/// Load the newest snapshot, if any, returning the sequence number it
/// covers and the restored root.
pub fn load_latest(dir: &Path) -> StoreResult<Option<(u64, Root)>> {
    let mut snapshots: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| {
                    name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(SNAPSHOT_SUFFIX)
                })
        })
        .collect();
    snapshots.sort();

    let Some(path) = snapshots.last() else {
        return Ok(None);
    };
    let file: SnapshotFile = serde_json::from_reader(BufReader::new(File::open(path)?))
        .map_err(|e| StoreError::replay(format!("corrupt snapshot {}: {e}", path.display())))?;
    Ok(Some((file.seq, file.root)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_snapshot_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut root = Root::new();
        write(dir.path(), 1, &root).unwrap();
        root.allocate_identity();
        write(dir.path(), 7, &root).unwrap();

        let (seq, restored) = load_latest(dir.path()).unwrap().unwrap();
        assert_eq!(seq, 7);
        assert_eq!(restored, root);
    }

    #[test]
    fn empty_directory_has_no_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_latest(dir.path()).unwrap().is_none());
    }
}
