//! Submission sources: a JSON array or JSON lines (one object per line).

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde_json::Value;

use crate::error::{IngestError, Result};

/// Lazily parsed JSON lines. Blank lines are skipped; each bad line yields
/// its own error so callers can decide to skip or abort.
pub struct JsonLines<R> {
    lines: std::io::Lines<R>,
    line: usize,
    source: String,
}

impl<R: BufRead> JsonLines<R> {
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            source: source.into(),
        }
    }
}

impl<R: BufRead> Iterator for JsonLines<R> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line += 1;
            let line = match line {
                Ok(line) => line,
                Err(source) => {
                    return Some(Err(IngestError::Io {
                        path: self.source.clone().into(),
                        source,
                    }));
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(|source| IngestError::Json {
                context: format!("{} line {}", self.source, self.line),
                source,
            }));
        }
    }
}

/// Every submission of a JSON array document.
pub fn parse_submission_array(text: &str, source: &str) -> Result<Vec<Value>> {
    serde_json::from_str(text).map_err(|error| IngestError::Json {
        context: source.to_string(),
        source: error,
    })
}

/// Open a submissions file: JSON arrays are parsed whole, anything else is
/// read as JSON lines.
pub fn open_submissions(path: &Path) -> Result<Box<dyn Iterator<Item = Result<Value>>>> {
    let io_error = |source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = BufReader::new(File::open(path).map_err(io_error)?);
    let starts_with_array = {
        let buffer = reader.fill_buf().map_err(io_error)?;
        buffer
            .iter()
            .find(|byte| !byte.is_ascii_whitespace())
            .is_some_and(|byte| *byte == b'[')
    };
    let source = path.display().to_string();
    if starts_with_array {
        let mut text = String::new();
        reader.read_to_string(&mut text).map_err(io_error)?;
        let submissions = parse_submission_array(&text, &source)?;
        Ok(Box::new(submissions.into_iter().map(Ok)))
    } else {
        Ok(Box::new(JsonLines::new(reader, source)))
    }
}

/// Read every submission, failing on the first bad one.
pub fn read_submissions(path: &Path) -> Result<Vec<Value>> {
    open_submissions(path)?.collect()
}
