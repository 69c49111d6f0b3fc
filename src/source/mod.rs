//! Sample sources
//!
//! A source supplies one `(timestamp, volume, pressure)` sample per call.
//! Records arrive as comma-separated text lines, both from log files
//! ([`replay`]) and from the live sensor stream ([`live`]), since the
//! rig writes the same format to its serial port.
//!
//! Transient failures (unreadable or malformed records) surface as errors
//! that the caller logs and skips; retrying happens naturally on the next
//! loop iteration. Only end-of-stream ends a source.

pub mod live;
pub mod replay;

use thiserror::Error;

use crate::breath::Sample;

/// Errors produced while pulling samples from a source.
///
/// Both variants are transient from the pipeline's point of view: the
/// offending record is discarded and processing continues.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("malformed record: {0:?}")]
    Malformed(String),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Pull-based sample supplier.
///
/// `Ok(Some(sample))` delivers one sample; `Ok(None)` is end-of-stream;
/// `Err` is a transient failure the caller must skip without terminating.
pub trait SampleSource {
    fn next_sample(&mut self) -> Result<Option<Sample>, SourceError>;
}

/// Parse one `timestamp,volume,pressure` record.
///
/// Surrounding whitespace per field is tolerated; anything after the third
/// field is ignored. Short or non-numeric records are malformed.
pub fn parse_record(line: &str) -> Result<Sample, SourceError> {
    let mut parts = line.split(',');

    let mut field = || -> Result<f64, SourceError> {
        parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| SourceError::Malformed(line.trim_end().to_string()))
    };

    Ok(Sample {
        timestamp: field()?,
        volume: field()?,
        pressure: field()?,
    })
}
