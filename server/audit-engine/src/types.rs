//! Core types for the audit engine (parsed records, reconstructed events, JSON contracts).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::detect::IncidentReport;
use crate::stats::Summary;

// ---------------------------------------------------------------------------
// Record type tag
// ---------------------------------------------------------------------------

/// Record category from the `type=` clause.
///
/// The kernel adds record types over time, so anything not listed here is
/// carried as `Unknown(tag)` instead of failing the line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
  Syscall,
  Execve,
  Path,
  Cwd,
  Proctitle,
  Sockaddr,
  UserAuth,
  UserLogin,
  UserAcct,
  UserStart,
  UserEnd,
  UserCmd,
  Login,
  CredAcq,
  CredDisp,
  CredRefr,
  Avc,
  ConfigChange,
  DaemonStart,
  DaemonEnd,
  ServiceStart,
  ServiceStop,
  Unknown(String),
}

impl RecordType {
  pub fn from_tag(tag: &str) -> Self {
    match tag {
      "SYSCALL" => Self::Syscall,
      "EXECVE" => Self::Execve,
      "PATH" => Self::Path,
      "CWD" => Self::Cwd,
      "PROCTITLE" => Self::Proctitle,
      "SOCKADDR" => Self::Sockaddr,
      "USER_AUTH" => Self::UserAuth,
      "USER_LOGIN" => Self::UserLogin,
      "USER_ACCT" => Self::UserAcct,
      "USER_START" => Self::UserStart,
      "USER_END" => Self::UserEnd,
      "USER_CMD" => Self::UserCmd,
      "LOGIN" => Self::Login,
      "CRED_ACQ" => Self::CredAcq,
      "CRED_DISP" => Self::CredDisp,
      "CRED_REFR" => Self::CredRefr,
      "AVC" => Self::Avc,
      "CONFIG_CHANGE" => Self::ConfigChange,
      "DAEMON_START" => Self::DaemonStart,
      "DAEMON_END" => Self::DaemonEnd,
      "SERVICE_START" => Self::ServiceStart,
      "SERVICE_STOP" => Self::ServiceStop,
      other => Self::Unknown(other.to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Syscall => "SYSCALL",
      Self::Execve => "EXECVE",
      Self::Path => "PATH",
      Self::Cwd => "CWD",
      Self::Proctitle => "PROCTITLE",
      Self::Sockaddr => "SOCKADDR",
      Self::UserAuth => "USER_AUTH",
      Self::UserLogin => "USER_LOGIN",
      Self::UserAcct => "USER_ACCT",
      Self::UserStart => "USER_START",
      Self::UserEnd => "USER_END",
      Self::UserCmd => "USER_CMD",
      Self::Login => "LOGIN",
      Self::CredAcq => "CRED_ACQ",
      Self::CredDisp => "CRED_DISP",
      Self::CredRefr => "CRED_REFR",
      Self::Avc => "AVC",
      Self::ConfigChange => "CONFIG_CHANGE",
      Self::DaemonStart => "DAEMON_START",
      Self::DaemonEnd => "DAEMON_END",
      Self::ServiceStart => "SERVICE_START",
      Self::ServiceStop => "SERVICE_STOP",
      Self::Unknown(tag) => tag,
    }
  }

  /// USER_AUTH or USER_LOGIN.
  pub fn is_authentication(&self) -> bool {
    matches!(self, Self::UserAuth | Self::UserLogin)
  }
}

impl fmt::Display for RecordType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl From<String> for RecordType {
  fn from(tag: String) -> Self {
    Self::from_tag(&tag)
  }
}

impl From<RecordType> for String {
  fn from(t: RecordType) -> Self {
    t.as_str().to_string()
  }
}

// ---------------------------------------------------------------------------
// Raw record (one log line)
// ---------------------------------------------------------------------------

/// One structurally valid log line. Keys in `fields` are unique; a key
/// repeated on the same line keeps its last value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecord {
  pub record_type: RecordType,
  /// Seconds since the epoch, with the fractional part the log carries.
  pub timestamp: Option<f64>,
  pub event_id: Option<u64>,
  pub fields: HashMap<String, String>,
  pub raw_text: String,
}

impl RawRecord {
  pub fn field(&self, key: &str) -> Option<&str> {
    self.fields.get(key).map(String::as_str)
  }
}

// ---------------------------------------------------------------------------
// Merged field values
// ---------------------------------------------------------------------------

/// A field in an event's merged details. Becomes `Multi` once the same key
/// shows up in more than one record (e.g. several PATH records with `name`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
  Single(String),
  Multi(Vec<String>),
}

impl FieldValue {
  pub fn first(&self) -> &str {
    match self {
      Self::Single(v) => v,
      Self::Multi(vs) => vs.first().map(String::as_str).unwrap_or(""),
    }
  }

  pub fn values(&self) -> impl Iterator<Item = &str> {
    let slice: &[String] = match self {
      Self::Single(v) => std::slice::from_ref(v),
      Self::Multi(vs) => vs,
    };
    slice.iter().map(String::as_str)
  }

  pub fn push(&mut self, value: String) {
    match self {
      Self::Single(prev) => {
        let prev = std::mem::take(prev);
        *self = Self::Multi(vec![prev, value]);
      }
      Self::Multi(vs) => vs.push(value),
    }
  }
}

// ---------------------------------------------------------------------------
// Outcome (tri-state)
// ---------------------------------------------------------------------------

/// Outcome of the action. `Unknown` means the log said nothing either way
/// and must never be read as success. Serialized as `true` / `false` / `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Outcome {
  Success,
  Failure,
  #[default]
  Unknown,
}

impl Outcome {
  pub fn is_success(self) -> bool {
    self == Self::Success
  }

  pub fn is_failure(self) -> bool {
    self == Self::Failure
  }
}

impl From<Option<bool>> for Outcome {
  fn from(v: Option<bool>) -> Self {
    match v {
      Some(true) => Self::Success,
      Some(false) => Self::Failure,
      None => Self::Unknown,
    }
  }
}

impl From<Outcome> for Option<bool> {
  fn from(o: Outcome) -> Self {
    match o {
      Outcome::Success => Some(true),
      Outcome::Failure => Some(false),
      Outcome::Unknown => None,
    }
  }
}

// ---------------------------------------------------------------------------
// Correlation key
// ---------------------------------------------------------------------------

/// Records sharing this key belong to one event. `second` is the record
/// timestamp truncated to whole seconds (0 when the timestamp is missing),
/// which keeps recycled event ids from merging unrelated events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CorrelationKey {
  pub node: Option<String>,
  pub event_id: u64,
  pub second: i64,
}

// ---------------------------------------------------------------------------
// Event (reconstructed)
// ---------------------------------------------------------------------------

/// A logical action rebuilt from one or more correlated records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
  /// Stable identifier, identical across re-parses of the same file.
  pub id: String,
  pub correlation_key: CorrelationKey,
  /// Earliest timestamp among the constituent records.
  pub timestamp: Option<f64>,
  pub time_display: String,
  pub user: String,
  /// Type of the primary record.
  pub event_type: RecordType,
  pub comm: Option<String>,
  pub exe: Option<String>,
  pub pid: Option<String>,
  pub ppid: Option<String>,
  pub syscall: Option<String>,
  pub exit: Option<String>,
  pub cwd: Option<String>,
  pub tty: Option<String>,
  pub acct: Option<String>,
  pub addr: Option<String>,
  pub hostname: Option<String>,
  pub key: Option<String>,
  pub success: Outcome,
  pub details: BTreeMap<String, FieldValue>,
  pub raw_text: String,
  #[serde(skip)]
  pub records: Vec<RawRecord>,
}

impl Event {
  /// First value of a merged detail field.
  pub fn detail(&self, key: &str) -> Option<&str> {
    self.details.get(key).map(FieldValue::first)
  }

  /// Every value of a merged detail field, in record order.
  pub fn detail_values<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a str> + 'a {
    self.details.get(key).into_iter().flat_map(FieldValue::values)
  }
}

// ---------------------------------------------------------------------------
// Parse report
// ---------------------------------------------------------------------------

/// Counters from one parse pass. Skips here are expected, not errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
  pub total_lines: u64,
  pub matched_lines: u64,
  /// Blank lines and lines that don't match the audit grammar.
  pub skipped_no_match: u64,
  /// Matched records without a usable event id.
  pub skipped_no_event_id: u64,
  pub events: u64,
  pub record_types: BTreeMap<String, u64>,
}

impl ParseReport {
  /// Record types by frequency, most common first.
  pub fn top_types(&self, n: usize) -> Vec<(&str, u64)> {
    let mut types: Vec<(&str, u64)> = self
      .record_types
      .iter()
      .map(|(t, c)| (t.as_str(), *c))
      .collect();
    types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    types.truncate(n);
    types
  }
}

// ---------------------------------------------------------------------------
// Helper stream wrappers
// ---------------------------------------------------------------------------

/// Success document written by `audit-helper`.
#[derive(Debug, Serialize)]
pub struct EventsOutput<'a> {
  pub events: &'a [Event],
  #[serde(skip_serializing_if = "Option::is_none")]
  pub report: Option<&'a ParseReport>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub incidents: Vec<IncidentReport<'a>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stats: Option<Summary>,
}

impl<'a> EventsOutput<'a> {
  pub fn new(events: &'a [Event]) -> Self {
    Self {
      events,
      report: None,
      incidents: Vec::new(),
      stats: None,
    }
  }
}

/// Failure document: `error` is `log_not_found` or `parse_error`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

impl ErrorOutput {
  pub fn new(category: &'static str) -> Self {
    Self {
      error: category,
      message: None,
    }
  }

  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }
}
