//! Aggregate statistics over an event sequence: totals, distinct users and
//! types, failed authentications, critical changes, per-type/user/day counts.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::config::Config;
use crate::detect::critical_files;
use crate::filter::EventFilter;
use crate::types::Event;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Count {
  pub label: String,
  pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
  pub total_events: usize,
  pub unique_users: usize,
  pub unique_types: usize,
  /// USER_AUTH / USER_LOGIN with an explicit failure.
  pub failed_auth: usize,
  pub critical_changes: usize,
  /// Most frequent first; ties by label.
  pub by_type: Vec<Count>,
  pub by_user: Vec<Count>,
  /// Calendar day (local time), oldest first. Events without a timestamp
  /// are not counted here.
  pub by_day: Vec<Count>,
}

/// Local calendar day of a timestamp: "YYYY-MM-DD".
pub fn day_bucket(ts: f64) -> Option<String> {
  DateTime::from_timestamp(ts.floor() as i64, 0)
    .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d").to_string())
}

/// Summarize events whose timestamp lies within `[from, to]`; events
/// without a timestamp are always included.
pub fn summarize(events: &[Event], from: Option<f64>, to: Option<f64>, config: &Config) -> Summary {
  let range = EventFilter::new().between(from, to);
  let selected: Vec<&Event> = range.apply(events);

  let users: HashSet<&str> = selected
    .iter()
    .map(|e| e.user.as_str())
    .filter(|u| !u.is_empty())
    .collect();
  let types: HashSet<&str> = selected.iter().map(|e| e.event_type.as_str()).collect();

  let failed_auth = selected
    .iter()
    .filter(|e| e.event_type.is_authentication() && e.success.is_failure())
    .count();

  let critical_changes = critical_files::find(events, config)
    .into_iter()
    .filter(|e| range.matches(e))
    .count();

  let mut type_counts: HashMap<&str, usize> = HashMap::new();
  let mut user_counts: HashMap<&str, usize> = HashMap::new();
  let mut day_counts: BTreeMap<String, usize> = BTreeMap::new();
  for ev in &selected {
    *type_counts.entry(ev.event_type.as_str()).or_insert(0) += 1;
    let user = if ev.user.is_empty() { "?" } else { ev.user.as_str() };
    *user_counts.entry(user).or_insert(0) += 1;
    if let Some(day) = ev.timestamp.and_then(day_bucket) {
      *day_counts.entry(day).or_insert(0) += 1;
    }
  }

  Summary {
    total_events: selected.len(),
    unique_users: users.len(),
    unique_types: types.len(),
    failed_auth,
    critical_changes,
    by_type: ranked(type_counts),
    by_user: ranked(user_counts),
    by_day: day_counts
      .into_iter()
      .map(|(label, count)| Count { label, count })
      .collect(),
  }
}

fn ranked(counts: HashMap<&str, usize>) -> Vec<Count> {
  let mut out: Vec<Count> = counts
    .into_iter()
    .map(|(label, count)| Count {
      label: label.to_string(),
      count,
    })
    .collect();
  out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
  out
}
