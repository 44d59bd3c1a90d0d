//! Line grammar: `type=<TAG> msg=audit(<epoch>[.<frac>]:<id>): key=value ...`.

use regex::{Captures, Regex};
use std::collections::HashMap;

use crate::error::EngineError;
use crate::types::{RawRecord, RecordType};

const LINE_PATTERN: &str =
  r"^type=(?P<type>\S+)\s+msg=audit\((?P<ts>[\d.]+):(?P<eid>\d+)\):\s*(?P<data>.*)$";
const FIELD_PATTERN: &str = r#"([A-Za-z0-9_]+)=("[^"]*"|\S+)"#;

/// Separator the kernel puts in front of enriched (uppercase) fields.
const ENRICHED_SEPARATOR: char = '\u{1d}';

/// Why a line produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
  Blank,
  NoMatch,
}

/// Result of one line: a record, or a skip the caller counts and moves past.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
  Record(RawRecord),
  Skip(SkipReason),
}

/// Compiled line grammar. Build once per parse pass.
#[derive(Debug, Clone)]
pub struct RecordParser {
  line: Regex,
  field: Regex,
}

impl RecordParser {
  pub fn new() -> Result<Self, EngineError> {
    let line = Regex::new(LINE_PATTERN)
      .map_err(|e| EngineError::parse(format!("line pattern: {}", e)))?;
    let field = Regex::new(FIELD_PATTERN)
      .map_err(|e| EngineError::parse(format!("field pattern: {}", e)))?;
    Ok(Self { line, field })
  }

  /// Parse one line. A timestamp or event id that doesn't convert to a
  /// number is left `None`; the record itself is kept.
  pub fn parse_line(&self, line: &str) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
      return LineOutcome::Skip(SkipReason::Blank);
    }

    let caps = match self.line.captures(line) {
      Some(c) => c,
      None => return LineOutcome::Skip(SkipReason::NoMatch),
    };

    let timestamp = group(&caps, "ts")
      .parse::<f64>()
      .ok()
      .filter(|t| t.is_finite());
    let event_id = group(&caps, "eid").parse::<u64>().ok();

    let data = group(&caps, "data").replace(ENRICHED_SEPARATOR, " ");
    let mut fields = HashMap::new();
    for fc in self.field.captures_iter(&data) {
      let key = fc.get(1).map_or("", |m| m.as_str());
      let value = fc.get(2).map_or("", |m| m.as_str());
      fields.insert(key.to_string(), strip_quotes(value).to_string());
    }

    LineOutcome::Record(RawRecord {
      record_type: RecordType::from_tag(group(&caps, "type")),
      timestamp,
      event_id,
      fields,
      raw_text: line.to_string(),
    })
  }
}

fn group<'t>(caps: &Captures<'t>, name: &str) -> &'t str {
  caps.name(name).map_or("", |m| m.as_str())
}

/// Remove a matching pair of `"` or `'` around a value. Failing that, drop a
/// lone trailing `'` (PAM writes `res=failed'` at the end of its msg block).
pub fn strip_quotes(value: &str) -> &str {
  let bytes = value.as_bytes();
  if bytes.len() >= 2 && bytes[0] == bytes[bytes.len() - 1] && matches!(bytes[0], b'"' | b'\'') {
    return &value[1..value.len() - 1];
  }
  value.strip_suffix('\'').unwrap_or(value)
}
