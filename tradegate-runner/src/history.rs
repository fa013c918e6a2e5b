//! Record log — append-only JSONL persistence for decisions, trades and
//! strategy performance.
//!
//! One JSON object per line: the record, tagged by `kind`, next to the
//! fingerprint of the configuration that produced it. Each line is
//! independent, so a torn final write loses only that record; malformed
//! lines are skipped on read.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use tradegate_core::domain::Trade;

use crate::config::ConfigFingerprint;
use crate::decision::Decision;
use crate::ensemble::StrategyPerformance;
use crate::error::RunnerResult;

/// A single persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Decision(Decision),
    Trade(Trade),
    StrategyPerformance(StrategyPerformance),
}

impl From<Decision> for Record {
    fn from(d: Decision) -> Self {
        Self::Decision(d)
    }
}

impl From<Trade> for Record {
    fn from(t: Trade) -> Self {
        Self::Trade(t)
    }
}

impl From<StrategyPerformance> for Record {
    fn from(p: StrategyPerformance) -> Self {
        Self::StrategyPerformance(p)
    }
}

/// One line of the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigFingerprint>,
    pub record: Record,
}

/// JSONL record file.
#[derive(Debug, Clone)]
pub struct RecordLog {
    path: PathBuf,
    fingerprint: Option<ConfigFingerprint>,
}

impl RecordLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fingerprint: None,
        }
    }

    /// Stamps every appended record with `fingerprint`.
    pub fn with_fingerprint(mut self, fingerprint: ConfigFingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn append(&self, record: &Record) -> RunnerResult<()> {
        self.append_all(std::slice::from_ref(record))
    }

    /// Appends `records` in order with a single open.
    pub fn append_all(&self, records: &[Record]) -> RunnerResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        for record in records {
            let entry = RecordEntry {
                config: self.fingerprint.clone(),
                record: record.clone(),
            };
            let json = serde_json::to_string(&entry)?;
            writeln!(file, "{json}")?;
        }
        file.flush()?;
        Ok(())
    }

    /// Every well-formed record in file order. A missing file reads as empty.
    pub fn read_all(&self) -> RunnerResult<Vec<Record>> {
        Ok(self.read_entries()?.into_iter().map(|e| e.record).collect())
    }

    /// Like [`Self::read_all`], keeping each record's config fingerprint.
    pub fn read_entries(&self) -> RunnerResult<Vec<RecordEntry>> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut entries = Vec::new();
        for (n, line) in io::BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RecordEntry>(&line) {
                Ok(e) => entries.push(e),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = n + 1,
                    error = %e,
                    "skipping malformed record"
                ),
            }
        }
        Ok(entries)
    }

    pub fn decisions(&self) -> RunnerResult<Vec<Decision>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter_map(|r| match r {
                Record::Decision(d) => Some(d),
                _ => None,
            })
            .collect())
    }

    pub fn trades(&self) -> RunnerResult<Vec<Trade>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter_map(|r| match r {
                Record::Trade(t) => Some(t),
                _ => None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tradegate_core::domain::Side;

    fn trade(pnl_exit: f64) -> Trade {
        let t0 = Utc.with_ymd_and_hms(2024, 2, 1, 15, 0, 0).unwrap();
        let mut t = Trade::open("SPY", "ma_crossover", Side::Long, t0, 100.0, 10.0, 2.0, 0.0);
        t.close(t0 + chrono::Duration::days(3), pnl_exit, 0.0, 0.0, false);
        t
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::new(dir.path().join("none.jsonl"));
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn records_come_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::new(dir.path().join("nested/records.jsonl"));
        log.append(&trade(105.0).into()).unwrap();
        log.append(&trade(95.0).into()).unwrap();
        let trades = log.trades().unwrap();
        assert_eq!(trades.len(), 2);
        assert!(trades[0].pnl > 0.0);
        assert!(trades[1].pnl < 0.0);
        assert!(log.decisions().unwrap().is_empty());
    }

    #[test]
    fn lines_are_tagged_by_kind() {
        let json = serde_json::to_string(&Record::from(trade(101.0))).unwrap();
        assert!(json.starts_with(r#"{"kind":"trade""#));
    }

    #[test]
    fn entries_carry_the_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        RecordLog::new(&path).append(&trade(104.0).into()).unwrap();
        let stamped = RecordLog::new(&path).with_fingerprint("abc123".to_string());
        stamped.append(&trade(99.0).into()).unwrap();

        let entries = stamped.read_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].config, None);
        assert_eq!(entries[1].config.as_deref(), Some("abc123"));
        let raw = fs::read_to_string(&path).unwrap();
        let second = raw.lines().nth(1).unwrap();
        assert!(second.starts_with(r#"{"config":"abc123","record":{"kind":"trade""#));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let log = RecordLog::new(&path);
        log.append(&trade(105.0).into()).unwrap();
        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f, "{{\"kind\":\"trade\",\"symbol\":").unwrap();
        writeln!(f).unwrap();
        drop(f);
        log.append(&trade(110.0).into()).unwrap();
        assert_eq!(log.read_all().unwrap().len(), 2);
    }
}
