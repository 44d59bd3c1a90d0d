//! Core engine: reads an audit log once, reconstructs events, runs detectors.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use tracing::{debug, info};

use crate::config::Config;
use crate::correlation::EventGrouper;
use crate::detect::{self, Detector, IncidentReport};
use crate::error::EngineError;
use crate::identity::{CachedIdentities, IdentityLookup, SystemIdentities};
use crate::record::{LineOutcome, RecordParser};
use crate::types::*;

/// Default location of the kernel audit log.
pub const DEFAULT_LOG_PATH: &str = "/var/log/audit/audit.log";

/// Events from one parse pass plus its counters.
#[derive(Debug, Clone)]
pub struct ParsedLog {
  /// Newest first.
  pub events: Vec<Event>,
  pub report: ParseReport,
}

/// The audit engine. Holds configuration and the identity database; every
/// parse starts from scratch and keeps no state between calls.
pub struct Engine<L = SystemIdentities> {
  config: Config,
  identities: L,
}

impl<L: IdentityLookup> Engine<L> {
  pub fn new(config: Config, identities: L) -> Self {
    Self { config, identities }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Parse a log file into events, newest first.
  ///
  /// A missing or unopenable file is `LogNotFound` / `Unreadable`; a
  /// failure while reading is a parse error. No partial results either way.
  pub fn parse_file(&self, path: &Path) -> Result<ParsedLog, EngineError> {
    let file = match File::open(path) {
      Ok(f) => f,
      Err(e) if e.kind() == ErrorKind::NotFound => {
        return Err(EngineError::LogNotFound {
          path: path.display().to_string(),
        })
      }
      Err(e) => {
        return Err(EngineError::Unreadable {
          path: path.display().to_string(),
          source: e,
        })
      }
    };
    debug!(path = %path.display(), "reading audit log");
    self.parse_reader(BufReader::new(file))
  }

  /// Parse any line-oriented source. Invalid UTF-8 bytes are dropped, not fatal.
  pub fn parse_reader<R: BufRead>(&self, mut reader: R) -> Result<ParsedLog, EngineError> {
    let parser = RecordParser::new()?;
    let identities = CachedIdentities::new(&self.identities);
    let mut grouper = EventGrouper::new();
    let mut report = ParseReport::default();
    let mut buf = Vec::new();

    loop {
      buf.clear();
      if reader.read_until(b'\n', &mut buf)? == 0 {
        break;
      }
      report.total_lines += 1;

      let line = decode_ignoring_invalid(&buf);
      match parser.parse_line(&line) {
        LineOutcome::Skip(_) => report.skipped_no_match += 1,
        LineOutcome::Record(record) => {
          report.matched_lines += 1;
          *report
            .record_types
            .entry(record.record_type.to_string())
            .or_insert(0) += 1;
          if !grouper.push(record) {
            report.skipped_no_event_id += 1;
          }
        }
      }
    }

    let events = grouper.finish(&identities);
    report.events = events.len() as u64;

    info!(
      total_lines = report.total_lines,
      matched = report.matched_lines,
      skipped_no_match = report.skipped_no_match,
      skipped_no_event_id = report.skipped_no_event_id,
      events = report.events,
      "parsed audit log"
    );
    for (record_type, count) in report.top_types(10) {
      debug!(record_type, count, "record type");
    }

    Ok(ParsedLog { events, report })
  }

  /// Run one detector over `events`.
  pub fn detect<'a>(&self, detector: Detector, events: &'a [Event]) -> Vec<&'a Event> {
    detector.run(events, &self.config)
  }

  /// Run several detectors concurrently; reports follow `detectors` order.
  pub fn incidents<'a>(&self, detectors: &[Detector], events: &'a [Event]) -> Vec<IncidentReport<'a>> {
    detect::run_all(detectors, events, &self.config)
  }
}

/// UTF-8 decode that skips undecodable byte sequences.
pub fn decode_ignoring_invalid(bytes: &[u8]) -> String {
  let mut out = String::with_capacity(bytes.len());
  for chunk in bytes.utf8_chunks() {
    out.push_str(chunk.valid());
  }
  out
}
