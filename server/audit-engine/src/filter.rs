//! Event selection for the presentation layer: time range, type, user,
//! outcome, rule key and free-text search.

use crate::types::{Event, Outcome, RecordType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutcomeFilter {
  #[default]
  Any,
  /// Explicit success only.
  Succeeded,
  /// Explicit failure only; unknown outcomes are excluded.
  Failed,
}

impl OutcomeFilter {
  pub fn accepts(self, outcome: Outcome) -> bool {
    match self {
      Self::Any => true,
      Self::Succeeded => outcome == Outcome::Success,
      Self::Failed => outcome == Outcome::Failure,
    }
  }
}

/// Conjunction of optional criteria. The default filter accepts everything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
  from: Option<f64>,
  to: Option<f64>,
  event_type: Option<RecordType>,
  user: Option<String>,
  outcome: OutcomeFilter,
  key: Option<String>,
  text: Option<String>,
}

impl EventFilter {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inclusive bounds in epoch seconds. Events without a timestamp pass.
  pub fn between(mut self, from: Option<f64>, to: Option<f64>) -> Self {
    self.from = from;
    self.to = to;
    self
  }

  pub fn event_type(mut self, event_type: RecordType) -> Self {
    self.event_type = Some(event_type);
    self
  }

  pub fn user(mut self, user: impl Into<String>) -> Self {
    self.user = Some(user.into());
    self
  }

  pub fn outcome(mut self, outcome: OutcomeFilter) -> Self {
    self.outcome = outcome;
    self
  }

  /// Case-insensitive substring of the rule key.
  pub fn key_contains(mut self, key: &str) -> Self {
    self.key = lowered(key);
    self
  }

  /// Case-insensitive substring of process name, executable or raw text.
  pub fn text_contains(mut self, text: &str) -> Self {
    self.text = lowered(text);
    self
  }

  pub fn matches(&self, ev: &Event) -> bool {
    if let Some(ts) = ev.timestamp {
      if self.from.map_or(false, |from| ts < from) || self.to.map_or(false, |to| ts > to) {
        return false;
      }
    }
    if self.event_type.as_ref().map_or(false, |t| *t != ev.event_type) {
      return false;
    }
    if self.user.as_deref().map_or(false, |u| u != ev.user) {
      return false;
    }
    if !self.outcome.accepts(ev.success) {
      return false;
    }
    if let Some(key) = &self.key {
      let ev_key = ev.key.as_deref().unwrap_or("").to_lowercase();
      if !ev_key.contains(key.as_str()) {
        return false;
      }
    }
    if let Some(text) = &self.text {
      let haystack = [
        ev.comm.as_deref().unwrap_or(""),
        ev.exe.as_deref().unwrap_or(""),
        ev.raw_text.as_str(),
      ]
      .join(" ")
      .to_lowercase();
      if !haystack.contains(text.as_str()) {
        return false;
      }
    }
    true
  }

  /// Matching events, in input order.
  pub fn apply<'a>(&self, events: &'a [Event]) -> Vec<&'a Event> {
    events.iter().filter(|ev| self.matches(ev)).collect()
  }
}

fn lowered(s: &str) -> Option<String> {
  let s = s.trim();
  if s.is_empty() {
    None
  } else {
    Some(s.to_lowercase())
  }
}
