//! Async line reader for replay traces

use super::TraceRecord;
use crate::error::{Error, Result};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Counters kept while reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceStats {
    /// Lines consumed, including blank and malformed ones
    pub lines: u64,
    /// Records handed out successfully
    pub records: u64,
    /// Malformed records
    pub skipped: u64,
}

/// Lazy, single-pass reader over a trace source
#[derive(Debug)]
pub struct TraceReader<R> {
    reader: R,
    buf: Vec<u8>,
    source: String,
    stats: TraceStats,
    finished: bool,
}

impl TraceReader<BufReader<File>> {
    /// Open a trace file
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .await
            .map_err(|e| Error::trace_io(path.display().to_string(), e))?;
        Ok(Self::new(BufReader::new(file), path.display().to_string()))
    }
}

impl<R: AsyncBufRead + Unpin> TraceReader<R> {
    /// Wrap any buffered source; `source` names it in errors
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            source: source.into(),
            stats: TraceStats::default(),
            finished: false,
        }
    }

    /// Next record, a recoverable parse error, or `None` at the end
    ///
    /// Lines that are not valid UTF-8 are parse errors like any other
    /// malformed line. After an IO error or end of input the reader stays
    /// exhausted.
    pub async fn next_record(&mut self) -> Option<Result<TraceRecord>> {
        if self.finished {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf).await {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(Error::trace_io(self.source.clone(), e)));
                }
            }
            self.stats.lines += 1;
            let line_no = self.stats.lines;

            let parsed = match std::str::from_utf8(&self.buf) {
                Ok(line) => {
                    let line = line.trim_end_matches(['\n', '\r']);
                    if line.trim().is_empty() {
                        continue;
                    }
                    TraceRecord::parse_line(line, line_no)
                }
                Err(e) => Err(Error::RecordParse {
                    line: line_no,
                    reason: format!("line is not valid UTF-8: {}", e),
                }),
            };

            match parsed {
                Ok(_) => self.stats.records += 1,
                Err(_) => self.stats.skipped += 1,
            }
            return Some(parsed);
        }
    }

    pub fn stats(&self) -> TraceStats {
        self.stats
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}
