//! Append-only request log.
//!
//! One line per authenticated request, `[YYYY-MM-DD HH:MM:SS] <url>` in
//! local time, appended to a file and optionally mirrored to stdout as
//! `[LOG] <line>`. All writes happen under a single lock so concurrent
//! handlers never interleave partial lines.

use std::io;
use std::path::Path;

use chrono::{DateTime, Local, TimeZone};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::config::AccessLogConfig;

#[derive(Debug)]
struct Sinks {
    file: Option<File>,
    console: bool,
}

/// Owned writer for request records, shared between handlers via `Arc`.
#[derive(Debug)]
pub struct AccessLog {
    sinks: Mutex<Sinks>,
}

/// Formats a record line without the trailing newline.
pub fn format_entry<Tz: TimeZone>(at: &DateTime<Tz>, url: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("[{}] {}", at.format("%Y-%m-%d %H:%M:%S"), url)
}

impl AccessLog {
    /// Opens (creating if needed) `path` in append mode.
    pub async fn open(path: impl AsRef<Path>, console: bool) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .await?;
        Ok(Self {
            sinks: Mutex::new(Sinks {
                file: Some(file),
                console,
            }),
        })
    }

    /// Builds the log described by `config`.
    pub async fn from_config(config: &AccessLogConfig) -> io::Result<Self> {
        if config.enabled {
            Self::open(&config.path, config.console).await
        } else {
            Ok(Self::disabled())
        }
    }

    /// A log that records nothing.
    pub fn disabled() -> Self {
        Self {
            sinks: Mutex::new(Sinks {
                file: None,
                console: false,
            }),
        }
    }

    /// Appends one record for `url` stamped with the current local time.
    ///
    /// Write failures are reported and otherwise ignored.
    pub async fn record(&self, url: &str) {
        let entry = format_entry(&Local::now(), url);
        let mut sinks = self.sinks.lock().await;

        if let Some(file) = sinks.file.as_mut() {
            let line = format!("{entry}\n");
            let written = async {
                file.write_all(line.as_bytes()).await?;
                file.flush().await
            };
            if let Err(e) = written.await {
                tracing::warn!(error = %e, "Failed to append access log entry");
            }
        }

        if sinks.console {
            let mut stdout = tokio::io::stdout();
            let line = format!("[LOG] {entry}\n");
            if let Err(e) = stdout.write_all(line.as_bytes()).await {
                tracing::warn!(error = %e, "Failed to mirror access log entry");
            }
            let _ = stdout.flush().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;

    #[test]
    fn entry_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(
            format_entry(&at, "https://example.com:443"),
            "[2024-03-07 09:05:01] https://example.com:443"
        );
    }

    #[tokio::test]
    async fn concurrent_records_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxy_log.txt");
        let log = Arc::new(AccessLog::open(&path, false).await.unwrap());

        let mut tasks = Vec::new();
        for i in 0..50 {
            let log = Arc::clone(&log);
            tasks.push(tokio::spawn(async move {
                log.record(&format!("http://host-{i}.example/{}", "x".repeat(200))).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 50);
        for line in lines {
            assert!(line.starts_with('['));
            assert!(line.ends_with(&"x".repeat(200)));
            assert_eq!(line.matches("http://").count(), 1);
        }
    }

    #[tokio::test]
    async fn open_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxy_log.txt");
        std::fs::write(&path, "existing\n").unwrap();

        let log = AccessLog::open(&path, false).await.unwrap();
        log.record("http://example.com/").await;

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("existing\n["));
        assert!(content.ends_with("] http://example.com/\n"));
    }

    #[tokio::test]
    async fn disabled_log_is_a_no_op() {
        AccessLog::disabled().record("http://example.com/").await;
    }
}
