//! Capture sources feeding the pipeline.
//!
//! The binlog/WAL readers that produce events live outside this crate. What
//! arrives here is an already-deserialized stream of records, either from a
//! JSON-lines file or from memory.

use std::collections::VecDeque;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use pipeline_core::{Position, RawRecord, Record, StreamPosition};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

/// Trait for an ordered stream of captured records.
///
/// Sources must be able to re-deliver from a checkpointed position: after
/// `resume_from(Some(p))`, every record at or after `p` is delivered again.
///
/// The pipeline polls a pending `next_record` call to completion and only
/// drops it when the run ends, so implementations may consume an event
/// before their first await point.
#[async_trait]
pub trait CaptureSource<T: Position>: Send {
    /// Skip records before `position`.
    fn resume_from(&mut self, position: Option<T>);

    /// Get the next record.
    /// Returns None when the stream is exhausted.
    async fn next_record(&mut self) -> Option<Result<Record<StreamPosition<T>>>>;
}

/// Drops records that come before a resume position.
///
/// Placeholders carry no ordering information of their own, so they are
/// dropped until the first record at or after the resume position shows up.
#[derive(Debug)]
struct ResumeFilter<T> {
    resume_from: Option<T>,
    reached: bool,
    skipped: u64,
}

impl<T: Position> ResumeFilter<T> {
    fn new() -> Self {
        Self {
            resume_from: None,
            reached: true,
            skipped: 0,
        }
    }

    fn reset(&mut self, position: Option<T>) {
        self.reached = position.is_none();
        self.resume_from = position;
        self.skipped = 0;
    }

    fn admit(&mut self, record: &Record<StreamPosition<T>>) -> bool {
        if self.reached {
            return true;
        }
        let (Some(resume), Some(token)) = (&self.resume_from, record.position().token()) else {
            self.skipped += 1;
            return false;
        };
        if token.is_placeholder() || token < resume {
            self.skipped += 1;
            return false;
        }
        debug!("Resumed at {:?} after skipping {} record(s)", token, self.skipped);
        self.reached = true;
        true
    }
}

/// Reads records from a JSON-lines file, one [`RawRecord`] per line.
pub struct JsonlSource<T, R> {
    lines: Lines<R>,
    line_no: u64,
    filter: ResumeFilter<T>,
}

impl<T> JsonlSource<T, BufReader<tokio::fs::File>>
where
    T: Position,
{
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open records file {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<T, R> JsonlSource<T, R>
where
    T: Position,
    R: tokio::io::AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            filter: ResumeFilter::new(),
        }
    }
}

#[async_trait]
impl<T, R> CaptureSource<T> for JsonlSource<T, R>
where
    T: Position + FromStr<Err = pipeline_core::Error>,
    R: tokio::io::AsyncBufRead + Unpin + Send,
{
    fn resume_from(&mut self, position: Option<T>) {
        self.filter.reset(position);
    }

    async fn next_record(&mut self) -> Option<Result<Record<StreamPosition<T>>>> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let line_no = self.line_no;
            let record = serde_json::from_str::<RawRecord>(&line)
                .map_err(anyhow::Error::from)
                .and_then(|raw| {
                    Record::<StreamPosition<T>>::try_from_raw(raw).map_err(anyhow::Error::from)
                })
                .with_context(|| format!("Invalid record on line {line_no}"));

            match record {
                Ok(record) if !self.filter.admit(&record) => continue,
                other => return Some(other),
            }
        }
    }
}

/// Serves records from memory. Useful for tests and for replaying a batch
/// that was captured elsewhere.
pub struct MemorySource<T> {
    records: Vec<Record<StreamPosition<T>>>,
    pending: VecDeque<Record<StreamPosition<T>>>,
    filter: ResumeFilter<T>,
}

impl<T: Position> MemorySource<T> {
    pub fn new(records: Vec<Record<StreamPosition<T>>>) -> Self {
        Self {
            pending: records.iter().cloned().collect(),
            records,
            filter: ResumeFilter::new(),
        }
    }
}

#[async_trait]
impl<T: Position> CaptureSource<T> for MemorySource<T> {
    fn resume_from(&mut self, position: Option<T>) {
        self.pending = self.records.iter().cloned().collect();
        self.filter.reset(position);
    }

    async fn next_record(&mut self) -> Option<Result<Record<StreamPosition<T>>>> {
        while let Some(record) = self.pending.pop_front() {
            if self.filter.admit(&record) {
                return Some(Ok(record));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_core::Lsn;

    const RECORDS: &str = r#"
{"type":"data","table":"t_order","op":"INSERT","position":"0/10","columns":[{"name":"id","value":1,"unique_key":true,"updated":true}]}
{"type":"placeholder","reason":"heartbeat"}
{"type":"data","table":"t_order","op":"INSERT","position":"0/20","columns":[{"name":"id","value":2,"unique_key":true,"updated":true}]}

{"type":"data","table":"t_order","op":"DELETE","position":"0/30","columns":[{"name":"id","value":1,"unique_key":true,"updated":true}]}
"#;

    async fn collect<S: CaptureSource<Lsn>>(source: &mut S) -> Vec<Record<StreamPosition<Lsn>>> {
        let mut out = Vec::new();
        while let Some(record) = source.next_record().await {
            out.push(record.unwrap());
        }
        out
    }

    fn positions(records: &[Record<StreamPosition<Lsn>>]) -> Vec<String> {
        records.iter().map(|r| r.position().to_string()).collect()
    }

    #[tokio::test]
    async fn test_jsonl_source_reads_all_records() {
        let mut source = JsonlSource::<Lsn, _>::new(RECORDS.as_bytes());
        let records = collect(&mut source).await;
        assert_eq!(positions(&records), ["0/10", "placeholder", "0/20", "0/30"]);
    }

    #[tokio::test]
    async fn test_jsonl_source_resumes_at_or_after_position() {
        let mut source = JsonlSource::<Lsn, _>::new(RECORDS.as_bytes());
        source.resume_from(Some(Lsn(0x20)));
        let records = collect(&mut source).await;
        assert_eq!(positions(&records), ["0/20", "0/30"]);
    }

    #[tokio::test]
    async fn test_jsonl_source_reports_line_number() {
        let input = "{\"type\":\"placeholder\"}\n{\"type\":\"data\",\"table\":\"t\",\"op\":\"MERGE\",\"columns\":[]}\n";
        let mut source = JsonlSource::<Lsn, _>::new(input.as_bytes());

        assert!(source.next_record().await.unwrap().is_ok());
        let err = source.next_record().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(format!("{err:#}").contains("Unsupported operation kind: MERGE"));
    }

    #[tokio::test]
    async fn test_memory_source_resume_restarts_stream() {
        let mut source = JsonlSource::<Lsn, _>::new(RECORDS.as_bytes());
        let records = collect(&mut source).await;

        let mut memory = MemorySource::new(records);
        assert_eq!(collect(&mut memory).await.len(), 4);

        memory.resume_from(Some(Lsn(0x11)));
        assert_eq!(positions(&collect(&mut memory).await), ["0/20", "0/30"]);
    }
}
