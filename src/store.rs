//! SQLite persistence for the hourly counters.
//!
//! All writes are monotone merges: existing rows are only ever incremented,
//! new composite keys become new rows. That makes a retried flush safe, as
//! long as the caller only resets its buffer after a successful write.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{named_params, params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::debug;

use crate::core::{Bucket, CounterRecord, CounterTable, FlushBatch};

// Created atomically: a crash can leave the file empty, never half-built.
const SCHEMA: &str = r#"
BEGIN;
CREATE TABLE keyboard (
    id TEXT, count INTEGER, day DATE, hour INTEGER,
    shift BOOLEAN, ctrl BOOLEAN, alt BOOLEAN, meta BOOLEAN, super BOOLEAN,
    PRIMARY KEY (id, day, hour, shift, ctrl, alt, meta, super)
);
CREATE TABLE mouse (
    id TEXT, count INTEGER, day DATE, hour INTEGER,
    shift BOOLEAN, ctrl BOOLEAN, alt BOOLEAN, meta BOOLEAN, super BOOLEAN,
    PRIMARY KEY (id, day, hour, shift, ctrl, alt, meta, super)
);
CREATE TABLE mouse_distance (
    x INTEGER, y INTEGER, dist FLOAT, day DATE, hour INTEGER,
    PRIMARY KEY (day, hour)
);
CREATE TABLE schema_version (version INTEGER);
INSERT INTO schema_version (version) VALUES (1);
COMMIT;
"#;

const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cumulative travel row for one bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceRow {
    pub x: i64,
    pub y: i64,
    pub dist: f64,
}

/// A handle on the store file. Opening creates the schema on first use
/// and restores a lost `schema_version` stamp on later opens.
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        let _ = conn.busy_timeout(BUSY_TIMEOUT);
        init_schema(&conn)?;
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merge buffered counter records for one table into one bucket. Two
    /// phases inside a single transaction: fold counts into existing rows,
    /// then insert the keys that had none.
    pub fn merge_counters(
        &mut self,
        table: CounterTable,
        bucket: Bucket,
        records: &[CounterRecord],
    ) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        merge_counters_tx(&tx, table, bucket, records)?;
        tx.commit()?;
        Ok(())
    }

    /// Add per-axis travel to one bucket's distance row, recomputing the
    /// Euclidean length over the new axis totals.
    pub fn merge_distance(
        &mut self,
        bucket: Bucket,
        dx: u64,
        dy: u64,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        merge_distance_tx(&tx, bucket, dx, dy)?;
        tx.commit()?;
        Ok(())
    }

    /// Merge a whole drained batch in one transaction. An empty batch
    /// performs no writes at all.
    pub fn write_batch(&mut self, bucket: Bucket, batch: &FlushBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        merge_counters_tx(&tx, CounterTable::Keyboard, bucket, &batch.keyboard)?;
        merge_counters_tx(&tx, CounterTable::Mouse, bucket, &batch.mouse)?;
        merge_distance_tx(&tx, bucket, batch.travel_x, batch.travel_y)?;
        tx.commit()?;
        debug!(
            bucket = %bucket,
            rows = batch.record_count(),
            travel_x = batch.travel_x,
            travel_y = batch.travel_y,
            "flushed batch"
        );
        Ok(())
    }

    /// Delete all rows attributed to one (day, hour) bucket.
    pub fn clear_hour(&mut self, bucket: Bucket) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for table in ["keyboard", "mouse", "mouse_distance"] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE day = ?1 AND hour = ?2"),
                params![bucket.day, bucket.hour],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Delete all rows attributed to one day.
    pub fn clear_day(&mut self, day: chrono::NaiveDate) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for table in ["keyboard", "mouse", "mouse_distance"] {
            tx.execute(&format!("DELETE FROM {table} WHERE day = ?1"), params![day])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Remove the store file itself. Missing files are fine; the point of
    /// taking a path instead of an open handle is not to create a database
    /// just to delete it.
    pub fn destroy(path: impl AsRef<Path>) -> Result<(), StoreError> {
        match fs::remove_file(path.as_ref()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Identifiers with their summed counts, highest first.
    pub fn top_counters(
        &self,
        table: CounterTable,
        limit: usize,
    ) -> Result<Vec<(String, u64)>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, SUM(count) AS total FROM {} GROUP BY id ORDER BY total DESC LIMIT ?1",
            table.table_name()
        ))?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let id: String = row.get(0)?;
            let total: i64 = row.get(1)?;
            Ok((id, u64::try_from(total).unwrap_or(0)))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Summed counts for every identifier in a table.
    pub fn identifier_totals(
        &self,
        table: CounterTable,
    ) -> Result<Vec<(String, u64)>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, SUM(count) FROM {} GROUP BY id",
            table.table_name()
        ))?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let total: i64 = row.get(1)?;
            Ok((id, u64::try_from(total).unwrap_or(0)))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// The travel row for one bucket, if any motion was recorded.
    pub fn distance_for(&self, bucket: Bucket) -> Result<Option<DistanceRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT x, y, dist FROM mouse_distance WHERE day = ?1 AND hour = ?2",
                params![bucket.day, bucket.hour],
                |row| {
                    Ok(DistanceRow {
                        x: row.get(0)?,
                        y: row.get(1)?,
                        dist: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

/// Probe the `schema_version` stamp. A missing table means an uninitialized
/// file and the whole schema is created; an unstamped table only gets the
/// version row re-inserted.
fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    // COALESCE folds an empty schema_version into 0; a missing table errors.
    let stamped: Option<i64> = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .ok();
    match stamped {
        None => {
            conn.execute_batch(SCHEMA)?;
            debug!("created store schema, version 1");
        }
        Some(0) => {
            // Tables are created in one transaction with the stamp, so an
            // empty schema_version means only the stamp row was lost.
            conn.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
            debug!("restored missing schema version stamp");
        }
        Some(_) => {}
    }
    Ok(())
}

fn merge_counters_tx(
    tx: &rusqlite::Transaction<'_>,
    table: CounterTable,
    bucket: Bucket,
    records: &[CounterRecord],
) -> Result<(), StoreError> {
    if records.is_empty() {
        return Ok(());
    }

    let mut update = tx.prepare(&format!(
        "UPDATE OR IGNORE {} SET count = count + :count \
         WHERE id = :id AND day = :day AND hour = :hour \
           AND shift = :shift AND ctrl = :ctrl AND alt = :alt \
           AND meta = :meta AND super = :super",
        table.table_name()
    ))?;
    let mut insert = tx.prepare(&format!(
        "INSERT OR IGNORE INTO {} (id, count, day, hour, shift, ctrl, alt, meta, super) \
         VALUES (:id, :count, :day, :hour, :shift, :ctrl, :alt, :meta, :super)",
        table.table_name()
    ))?;

    for record in records {
        let count = i64::try_from(record.count).unwrap_or(i64::MAX);
        update.execute(named_params! {
            ":id": record.id,
            ":count": count,
            ":day": bucket.day,
            ":hour": bucket.hour,
            ":shift": record.mask.shift(),
            ":ctrl": record.mask.ctrl(),
            ":alt": record.mask.alt(),
            ":meta": record.mask.meta(),
            ":super": record.mask.superkey(),
        })?;
    }
    for record in records {
        let count = i64::try_from(record.count).unwrap_or(i64::MAX);
        insert.execute(named_params! {
            ":id": record.id,
            ":count": count,
            ":day": bucket.day,
            ":hour": bucket.hour,
            ":shift": record.mask.shift(),
            ":ctrl": record.mask.ctrl(),
            ":alt": record.mask.alt(),
            ":meta": record.mask.meta(),
            ":super": record.mask.superkey(),
        })?;
    }
    Ok(())
}

fn merge_distance_tx(
    tx: &rusqlite::Transaction<'_>,
    bucket: Bucket,
    dx: u64,
    dy: u64,
) -> Result<(), StoreError> {
    let existing: Option<(i64, i64)> = tx
        .query_row(
            "SELECT x, y FROM mouse_distance WHERE day = ?1 AND hour = ?2",
            params![bucket.day, bucket.hour],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let (old_x, old_y) = existing.unwrap_or((0, 0));

    let x = old_x.saturating_add(i64::try_from(dx).unwrap_or(i64::MAX));
    let y = old_y.saturating_add(i64::try_from(dy).unwrap_or(i64::MAX));
    let fx = x as f64;
    let fy = y as f64;
    let dist = (fx * fx + fy * fy).sqrt();

    tx.execute(
        "DELETE FROM mouse_distance WHERE day = ?1 AND hour = ?2",
        params![bucket.day, bucket.hour],
    )?;
    tx.execute(
        "INSERT INTO mouse_distance (x, y, dist, day, hour) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![x, y, dist, bucket.day, bucket.hour],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ModifierMask;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn bucket(day: (i32, u32, u32), hour: u32) -> Bucket {
        Bucket {
            day: NaiveDate::from_ymd_opt(day.0, day.1, day.2).unwrap(),
            hour,
        }
    }

    fn record(id: &str, mask: ModifierMask, count: u64) -> CounterRecord {
        CounterRecord {
            id: id.to_string(),
            mask,
            count,
        }
    }

    #[test]
    fn test_open_is_idempotent_and_stamps_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tally.db");

        drop(Store::open(&path).unwrap());
        drop(Store::open(&path).unwrap());

        let conn = Connection::open(&path).unwrap();
        let version: i64 = conn
            .query_row("SELECT version FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_reopen_after_lost_version_stamp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tally.db");

        let mut store = Store::open(&path).unwrap();
        let b = bucket((2025, 3, 12), 14);
        store
            .merge_counters(
                CounterTable::Keyboard,
                b,
                &[record("KEY_A", ModifierMask::empty(), 3)],
            )
            .unwrap();
        drop(store);

        // Wipe the stamp while the tables stay behind.
        let conn = Connection::open(&path).unwrap();
        conn.execute("DELETE FROM schema_version", []).unwrap();
        drop(conn);

        // Reopening must repair the stamp, not re-create tables.
        drop(Store::open(&path).unwrap());
        let store = Store::open(&path).unwrap();
        let totals = store.identifier_totals(CounterTable::Keyboard).unwrap();
        assert_eq!(totals, vec![("KEY_A".to_string(), 3)]);
        drop(store);

        let conn = Connection::open(&path).unwrap();
        let version: i64 = conn
            .query_row("SELECT version FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_merge_folds_into_a_single_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tally.db");
        let mut store = Store::open(&path).unwrap();
        let b = bucket((2025, 3, 12), 14);

        let records = vec![record("KEY_C", ModifierMask::CONTROL, 2)];
        store
            .merge_counters(CounterTable::Keyboard, b, &records)
            .unwrap();
        store
            .merge_counters(CounterTable::Keyboard, b, &records)
            .unwrap();
        drop(store);

        let conn = Connection::open(&path).unwrap();
        let (rows, count): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), SUM(count) FROM keyboard WHERE id = 'KEY_C'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(count, 4);

        let ctrl: bool = conn
            .query_row("SELECT ctrl FROM keyboard WHERE id = 'KEY_C'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert!(ctrl);
        let shift: bool = conn
            .query_row("SELECT shift FROM keyboard WHERE id = 'KEY_C'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert!(!shift);
    }

    #[test]
    fn test_distinct_masks_become_distinct_rows() {
        let dir = tempdir().unwrap();
        let mut store = Store::open(dir.path().join("tally.db")).unwrap();
        let b = bucket((2025, 3, 12), 14);

        store
            .merge_counters(
                CounterTable::Keyboard,
                b,
                &[
                    record("KEY_C", ModifierMask::SHIFT, 1),
                    record("KEY_C", ModifierMask::empty(), 1),
                ],
            )
            .unwrap();

        let totals = store.identifier_totals(CounterTable::Keyboard).unwrap();
        assert_eq!(totals, vec![("KEY_C".to_string(), 2)]);
    }

    #[test]
    fn test_distance_merge_recomputes_dist() {
        let dir = tempdir().unwrap();
        let mut store = Store::open(dir.path().join("tally.db")).unwrap();
        let b = bucket((2025, 3, 12), 14);

        store.merge_distance(b, 7, 7).unwrap();
        let row = store.distance_for(b).unwrap().unwrap();
        assert_eq!(row.x, 7);
        assert_eq!(row.y, 7);
        assert!((row.dist - 98f64.sqrt()).abs() < 1e-9);

        store.merge_distance(b, 3, 4).unwrap();
        let row = store.distance_for(b).unwrap().unwrap();
        assert_eq!(row.x, 10);
        assert_eq!(row.y, 11);
        assert!((row.dist - 221f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_empty_batch_writes_nothing() {
        let dir = tempdir().unwrap();
        let mut store = Store::open(dir.path().join("tally.db")).unwrap();
        let b = bucket((2025, 3, 12), 14);

        store.write_batch(b, &FlushBatch::default()).unwrap();

        assert!(store.distance_for(b).unwrap().is_none());
        assert!(store
            .identifier_totals(CounterTable::Keyboard)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_write_batch_covers_all_three_tables() {
        let dir = tempdir().unwrap();
        let mut store = Store::open(dir.path().join("tally.db")).unwrap();
        let b = bucket((2025, 3, 12), 14);

        let batch = FlushBatch {
            keyboard: vec![record("KEY_A", ModifierMask::SHIFT, 3)],
            mouse: vec![record("BTN_LEFT", ModifierMask::empty(), 1)],
            travel_x: 10,
            travel_y: 0,
        };
        store.write_batch(b, &batch).unwrap();

        assert_eq!(
            store.top_counters(CounterTable::Keyboard, 5).unwrap(),
            vec![("KEY_A".to_string(), 3)]
        );
        assert_eq!(
            store.top_counters(CounterTable::Mouse, 5).unwrap(),
            vec![("BTN_LEFT".to_string(), 1)]
        );
        let row = store.distance_for(b).unwrap().unwrap();
        assert_eq!((row.x, row.y), (10, 0));
    }

    #[test]
    fn test_clear_hour_scopes_to_one_bucket() {
        let dir = tempdir().unwrap();
        let mut store = Store::open(dir.path().join("tally.db")).unwrap();
        let b14 = bucket((2025, 3, 12), 14);
        let b15 = bucket((2025, 3, 12), 15);

        for b in [b14, b15] {
            store
                .merge_counters(
                    CounterTable::Keyboard,
                    b,
                    &[record("KEY_A", ModifierMask::empty(), 1)],
                )
                .unwrap();
            store.merge_distance(b, 5, 5).unwrap();
        }

        store.clear_hour(b14).unwrap();

        assert!(store.distance_for(b14).unwrap().is_none());
        assert!(store.distance_for(b15).unwrap().is_some());
        let totals = store.identifier_totals(CounterTable::Keyboard).unwrap();
        assert_eq!(totals, vec![("KEY_A".to_string(), 1)]);
    }

    #[test]
    fn test_clear_day_scopes_to_one_day() {
        let dir = tempdir().unwrap();
        let mut store = Store::open(dir.path().join("tally.db")).unwrap();
        let monday = bucket((2025, 3, 10), 9);
        let tuesday = bucket((2025, 3, 11), 9);

        for b in [monday, tuesday] {
            store
                .merge_counters(
                    CounterTable::Mouse,
                    b,
                    &[record("BTN_LEFT", ModifierMask::empty(), 2)],
                )
                .unwrap();
        }

        store.clear_day(monday.day).unwrap();

        let totals = store.identifier_totals(CounterTable::Mouse).unwrap();
        assert_eq!(totals, vec![("BTN_LEFT".to_string(), 2)]);
    }

    #[test]
    fn test_top_counters_orders_by_summed_count() {
        let dir = tempdir().unwrap();
        let mut store = Store::open(dir.path().join("tally.db")).unwrap();
        let b = bucket((2025, 3, 12), 14);

        store
            .merge_counters(
                CounterTable::Keyboard,
                b,
                &[
                    record("KEY_E", ModifierMask::empty(), 2),
                    record("KEY_E", ModifierMask::SHIFT, 3),
                    record("KEY_T", ModifierMask::empty(), 4),
                    record("KEY_Q", ModifierMask::empty(), 1),
                ],
            )
            .unwrap();

        let top = store.top_counters(CounterTable::Keyboard, 2).unwrap();
        assert_eq!(
            top,
            vec![("KEY_E".to_string(), 5), ("KEY_T".to_string(), 4)]
        );
    }

    #[test]
    fn test_destroy_removes_the_file_and_tolerates_absence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tally.db");

        drop(Store::open(&path).unwrap());
        assert!(path.exists());

        Store::destroy(&path).unwrap();
        assert!(!path.exists());

        // Destroying again is fine.
        Store::destroy(&path).unwrap();
    }
}
