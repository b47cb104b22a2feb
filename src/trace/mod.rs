//! Trace Ingestion
//!
//! Replay traces are plain text, one access per line:
//!
//! ```text
//! <sequence> <objectID> <sizeBytes>
//! 1 obj-A 100
//! 2 obj-B 4096
//! ```
//!
//! The reader is lazy and single-pass. Malformed records are surfaced as
//! recoverable [`Error::RecordParse`](crate::error::Error::RecordParse) items
//! so the caller can log and skip them; IO failures end the sequence.

pub mod reader;

pub use reader::{TraceReader, TraceStats};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// One object access from the trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Position in the trace; not necessarily gap-free
    pub sequence: u64,
    /// Object identifier
    pub object_id: String,
    /// Object size in bytes
    pub size_bytes: u64,
}

impl TraceRecord {
    /// Parse one non-blank trace line
    pub fn parse_line(line: &str, line_no: u64) -> Result<Self> {
        let mut fields = line.split(' ').filter(|f| !f.is_empty());

        let (Some(seq), Some(id), Some(size)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(Error::RecordParse {
                line: line_no,
                reason: format!("expected 3 fields, got {:?}", line),
            });
        };

        let sequence = seq.parse().map_err(|_| Error::RecordParse {
            line: line_no,
            reason: format!("invalid sequence {:?}", seq),
        })?;
        let size_bytes = size.parse().map_err(|_| Error::RecordParse {
            line: line_no,
            reason: format!("invalid size {:?}", size),
        })?;

        Ok(Self {
            sequence,
            object_id: id.to_string(),
            size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_line() {
        let record = TraceRecord::parse_line("1 obj-A 100", 1).unwrap();
        assert_eq!(record.sequence, 1);
        assert_eq!(record.object_id, "obj-A");
        assert_eq!(record.size_bytes, 100);
    }

    #[test]
    fn test_parse_line_errors() {
        assert_matches!(
            TraceRecord::parse_line("x obj-A 100", 4),
            Err(Error::RecordParse { line: 4, .. })
        );
        assert_matches!(
            TraceRecord::parse_line("1 obj-A big", 5),
            Err(Error::RecordParse { line: 5, .. })
        );
        assert_matches!(
            TraceRecord::parse_line("1 obj-A -3", 6),
            Err(Error::RecordParse { line: 6, .. })
        );
        assert_matches!(
            TraceRecord::parse_line("1 obj-A", 7),
            Err(Error::RecordParse { line: 7, .. })
        );
    }
}
