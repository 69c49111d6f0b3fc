//! Log-file replay source
//!
//! Loads a `timestamp,volume,pressure` CSV log up front and replays it
//! sample by sample, optionally looping back to the start at the end of
//! the file. Malformed lines are logged and dropped at load time, so
//! replay itself never fails.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{parse_record, SampleSource, SourceError};
use crate::breath::Sample;

/// Replays a recorded sample log.
pub struct ReplaySource {
    samples: Vec<Sample>,
    cursor: usize,
    looping: bool,
}

impl ReplaySource {
    /// Load a CSV log from disk.
    ///
    /// # Arguments
    /// * `path` - the log file
    /// * `looping` - restart from the first sample on end-of-file
    pub fn from_path(path: &Path, looping: bool) -> Result<Self, SourceError> {
        let reader = BufReader::new(File::open(path)?);

        let mut samples = Vec::new();
        let mut dropped = 0usize;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_record(&line) {
                Ok(sample) => samples.push(sample),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed log line");
                    dropped += 1;
                }
            }
        }

        tracing::info!(
            path = %path.display(),
            samples = samples.len(),
            dropped,
            "loaded replay log"
        );

        Ok(Self::from_samples(samples, looping))
    }

    /// Build a replay source from in-memory samples.
    pub fn from_samples(samples: Vec<Sample>, looping: bool) -> Self {
        Self {
            samples,
            cursor: 0,
            looping,
        }
    }

    /// Number of samples in the log.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the log holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl SampleSource for ReplaySource {
    fn next_sample(&mut self) -> Result<Option<Sample>, SourceError> {
        if self.cursor >= self.samples.len() {
            if !self.looping || self.samples.is_empty() {
                return Ok(None);
            }
            tracing::info!("replay reached end of log, looping");
            self.cursor = 0;
        }

        let sample = self.samples[self.cursor];
        self.cursor += 1;
        Ok(Some(sample))
    }
}
