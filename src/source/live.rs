//! Live line-oriented sample source
//!
//! Reads one text record per call from a byte stream. On the target rig
//! the sensor board streams `timestamp,volume,pressure\n` over a serial
//! port, which the OS exposes as a character device readable like a file.
//!
//! A malformed line is a transient error: the caller skips it and reads
//! the next one. End-of-stream means the device went away and the session
//! is over.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{parse_record, SampleSource, SourceError};
use crate::breath::Sample;

/// Streams samples from any line-oriented reader.
pub struct LiveSource<R: BufRead> {
    reader: R,
    line: String,
}

impl LiveSource<BufReader<File>> {
    /// Open a sensor device (or FIFO) by path.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        tracing::info!(path = %path.display(), "opened live sample source");
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> LiveSource<R> {
    /// Wrap an already-open reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }
}

impl<R: BufRead> SampleSource for LiveSource<R> {
    fn next_sample(&mut self) -> Result<Option<Sample>, SourceError> {
        self.line.clear();
        let bytes = self.reader.read_line(&mut self.line)?;
        if bytes == 0 {
            return Ok(None);
        }
        parse_record(&self.line).map(Some)
    }
}
