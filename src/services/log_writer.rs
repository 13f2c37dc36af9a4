/// JSONL record log
///
/// Files: `{dir}/hourly_YYYYMMDD.jsonl`, `{dir}/daily_YYYY.jsonl`,
/// otherwise `{dir}/{prefix}_YYYYMMDD.jsonl`. The date comes from the
/// record's own instant, falling back to now when it does not parse.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::errors::LogWriterError;
use crate::models::features::{DailyAggregate, HourlyRecord};
use crate::services::feature_aggregator::parse_instant;

pub const HOURLY: &str = "hourly";
pub const DAILY: &str = "daily";

/// Records that know which instant (or `YYYY-MM-DD` date) names their file.
pub trait LogKey {
    fn log_key(&self) -> &str;
}

impl LogKey for HourlyRecord {
    fn log_key(&self) -> &str {
        &self.ts_utc
    }
}

impl LogKey for DailyAggregate {
    fn log_key(&self) -> &str {
        &self.date_utc
    }
}

#[derive(Debug, Clone)]
pub struct JsonlWriter {
    dir: PathBuf,
}

impl JsonlWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, prefix: &str, ts: DateTime<Utc>) -> PathBuf {
        let name = match prefix {
            HOURLY => format!("hourly_{}.jsonl", ts.format("%Y%m%d")),
            DAILY => format!("daily_{}.jsonl", ts.format("%Y")),
            other => format!("{}_{}.jsonl", other, ts.format("%Y%m%d")),
        };
        self.dir.join(name)
    }

    /// Appends one record as a single JSON line.
    pub async fn append<T: Serialize>(&self, prefix: &str, record: &T, ts: &str) -> Result<PathBuf, LogWriterError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(prefix, record_time(ts));

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(&path).await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(path)
    }

    /// Appends a batch to the same kind of log, stopping at the first failure.
    pub async fn append_all<T>(&self, prefix: &str, records: &[T]) -> Result<usize, LogWriterError>
    where
        T: Serialize + LogKey + Sync,
    {
        let mut written = 0;
        for record in records {
            self.append(prefix, record, record.log_key()).await?;
            written += 1;
        }
        Ok(written)
    }

    /// Deletes log files whose modification time is older than `retention_days`.
    /// Non-positive retention disables cleanup. Returns the number of files removed.
    pub async fn cleanup(&self, retention_days: i64) -> Result<usize, LogWriterError> {
        if retention_days <= 0 {
            return Ok(0);
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        let max_age = Duration::from_secs(u64::try_from(retention_days).unwrap_or(u64::MAX).saturating_mul(86_400));
        let now = SystemTime::now();

        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot stat log file");
                    continue;
                }
            };
            let expired = now.duration_since(modified).map(|age| age > max_age).unwrap_or(false);
            if expired {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {
                        debug!(path = %path.display(), "removed expired log file");
                        removed += 1;
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "cannot remove log file"),
                }
            }
        }
        Ok(removed)
    }
}

/// Instant used to pick the file: full instants and bare `YYYY-MM-DD` dates.
fn record_time(ts: &str) -> DateTime<Utc> {
    parse_instant(ts)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(ts, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|n| n.and_utc())
        })
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    impl LogKey for serde_json::Value {
        fn log_key(&self) -> &str {
            self["ts_utc"].as_str().unwrap_or_default()
        }
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("jsonl-test-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn file_names_follow_record_dates() {
        let w = JsonlWriter::new("/logs");
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        assert_eq!(w.path_for(HOURLY, ts), PathBuf::from("/logs/hourly_20240601.jsonl"));
        assert_eq!(w.path_for(DAILY, ts), PathBuf::from("/logs/daily_2024.jsonl"));
        assert_eq!(w.path_for("nowcast", ts), PathBuf::from("/logs/nowcast_20240601.jsonl"));
    }

    #[test]
    fn record_time_accepts_dates_and_instants() {
        assert_eq!(record_time("2024-06-01"), Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(record_time("2024-06-01T10:00:00Z"), Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap());
        let before = Utc::now();
        assert!(record_time("???") >= before);
    }

    #[tokio::test]
    async fn append_writes_one_line_per_record() {
        let dir = scratch_dir();
        let w = JsonlWriter::new(&dir);
        let a = json!({"ts_utc": "2024-06-01T10:00:00Z", "ghi_w_m2": 500.0});
        let b = json!({"ts_utc": "2024-06-01T11:00:00Z", "ghi_w_m2": 600.0});
        let rows = [a.clone(), b.clone()];
        let n = w
            .append_all(HOURLY, &rows)
            .await
            .unwrap();
        assert_eq!(n, 2);

        let content = tokio::fs::read_to_string(dir.join("hourly_20240601.jsonl")).await.unwrap();
        let lines: Vec<serde_json::Value> = content.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines, vec![a, b]);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn cleanup_keeps_fresh_files_and_can_be_disabled() {
        let dir = scratch_dir();
        let w = JsonlWriter::new(&dir);
        w.append(DAILY, &json!({"date_utc": "2024-06-01"}), "2024-06-01").await.unwrap();

        assert_eq!(w.cleanup(0).await.unwrap(), 0);
        assert_eq!(w.cleanup(-5).await.unwrap(), 0);
        assert_eq!(w.cleanup(90).await.unwrap(), 0);
        // huge retention saturates instead of overflowing
        assert_eq!(w.cleanup(i64::MAX).await.unwrap(), 0);
        assert!(dir.join("daily_2024.jsonl").exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
