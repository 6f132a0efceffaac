use crate::models::{AudioRecord, TrackRecord};
use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Column header written when the merged table has no rows; must stay in
/// sync with the field order of `TrackRecord`.
pub const COLUMNS: [&str; 13] = [
    "track_id",
    "track_name",
    "artist_id",
    "artist_name",
    "album_id",
    "album_name",
    "album_release_date",
    "release_date_precision",
    "popularity",
    "duration_ms",
    "explicit",
    "source",
    "source_id",
];

/// Row counts observable after a merge. `added` is total-after minus
/// total-before, so incoming rows that duplicate each other collapse into
/// the baseline and the count undercounts. Observed behavior, kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    pub total: usize,
    pub added: usize,
}

/// The persisted track table: a CSV file keyed by `track_id`, grown by
/// append-and-dedupe merges and rewritten whole on every merge.
pub struct TrackStore {
    path: PathBuf,
}

impl TrackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TrackStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted table. A missing file is an empty table with the
    /// known columns, not an error.
    pub fn load(&self) -> Result<Vec<TrackRecord>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            let record: TrackRecord = row?;
            records.push(record);
        }
        Ok(records)
    }

    /// Merge a batch of newly collected rows into the persisted table.
    ///
    /// Every existing row is kept; a new row is appended only when its
    /// `track_id` has not been seen before (first occurrence wins). Rows
    /// with an empty `track_id` never appear in the output. The file is
    /// overwritten with the merged result.
    pub fn merge(&self, new_rows: Vec<TrackRecord>) -> Result<MergeReport> {
        let existing = self.load()?;
        let total_before = existing.len();

        let mut seen: HashSet<String> = HashSet::new();
        let mut merged: Vec<TrackRecord> = Vec::with_capacity(total_before + new_rows.len());

        for row in existing.into_iter().chain(new_rows) {
            if row.track_id.is_empty() {
                continue;
            }
            if seen.insert(row.track_id.clone()) {
                merged.push(row);
            }
        }

        self.write_all(&merged)?;

        // An externally edited file can hold duplicate or empty-id rows, so
        // the merged table may be smaller than what was loaded
        Ok(MergeReport {
            total: merged.len(),
            added: merged.len().saturating_sub(total_before),
        })
    }

    fn write_all(&self, rows: &[TrackRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        if rows.is_empty() {
            // Serde-driven headers only appear with at least one row
            writer.write_record(COLUMNS)?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Load an audio-feature dataset. Unlike the track table, a missing file
/// here is an error: the analyses have nothing to fall back on.
pub fn load_audio_records(path: &str) -> Result<Vec<AudioRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| anyhow::anyhow!("Failed to open dataset '{}': {}", path, e))?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: AudioRecord = row?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(track_id: &str, popularity: u32) -> TrackRecord {
        TrackRecord {
            track_id: track_id.to_string(),
            track_name: Some(format!("Track {track_id}")),
            artist_id: Some("artist1".to_string()),
            artist_name: Some("Test Artist".to_string()),
            album_id: None,
            album_name: None,
            album_release_date: Some("2023-06-15".to_string()),
            release_date_precision: Some("day".to_string()),
            popularity: Some(popularity),
            duration_ms: Some(200_000),
            explicit: Some(false),
            source: Some("artist".to_string()),
            source_id: Some("Test Artist".to_string()),
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> TrackStore {
        TrackStore::new(dir.path().join("tracks.csv"))
    }

    #[test]
    fn missing_file_loads_as_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn merging_distinct_rows_into_empty_table_keeps_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let report = store
            .merge(vec![record("a", 10), record("b", 20), record("c", 30)])
            .unwrap();

        assert_eq!(report, MergeReport { total: 3, added: 3 });
        assert_eq!(store.load().unwrap().len(), 3);
    }

    #[test]
    fn conflicting_row_keeps_existing_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.merge(vec![record("A", 10)]).unwrap();
        let report = store.merge(vec![record("A", 99), record("B", 50)]).unwrap();

        assert_eq!(report, MergeReport { total: 2, added: 1 });

        let rows = store.load().unwrap();
        assert_eq!(rows[0].track_id, "A");
        assert_eq!(rows[0].popularity, Some(10));
        assert_eq!(rows[1].track_id, "B");
        assert_eq!(rows[1].popularity, Some(50));
    }

    #[test]
    fn merge_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let batch = vec![record("a", 10), record("b", 20)];

        store.merge(batch.clone()).unwrap();
        let after_first = store.load().unwrap();

        let report = store.merge(batch).unwrap();
        let after_second = store.load().unwrap();

        assert_eq!(after_first, after_second);
        assert_eq!(report, MergeReport { total: 2, added: 0 });
    }

    #[test]
    fn rows_without_track_id_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let report = store.merge(vec![record("", 10), record("b", 20)]).unwrap();

        assert_eq!(report, MergeReport { total: 1, added: 1 });
        assert_eq!(store.load().unwrap()[0].track_id, "b");
    }

    #[test]
    fn internal_duplicates_collapse_to_first_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let report = store
            .merge(vec![record("a", 10), record("a", 99), record("b", 20)])
            .unwrap();

        assert_eq!(report, MergeReport { total: 2, added: 2 });
        assert_eq!(store.load().unwrap()[0].popularity, Some(10));
    }

    #[test]
    fn preexisting_duplicate_rows_collapse_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");

        // A hand-edited file with a duplicated track_id and an id-less row
        let mut contents = COLUMNS.join(",");
        contents.push('\n');
        contents.push_str("a,,,,,,,,,,,,\n");
        contents.push_str("a,,,,,,,,,,,,\n");
        contents.push_str(",,,,,,,,,,,,\n");
        std::fs::write(&path, contents).unwrap();

        let store = TrackStore::new(&path);
        let report = store.merge(vec![record("b", 20)]).unwrap();

        assert_eq!(report, MergeReport { total: 2, added: 0 });

        let rows = store.load().unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.track_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn empty_merge_writes_header_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let report = store.merge(vec![]).unwrap();
        assert_eq!(report, MergeReport { total: 0, added: 0 });

        let contents = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(contents.lines().next().unwrap(), COLUMNS.join(","));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn records_survive_a_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut original = record("a", 77);
        original.album_name = None;
        original.explicit = Some(true);
        store.merge(vec![original.clone()]).unwrap();

        assert_eq!(store.load().unwrap(), vec![original]);
    }
}
