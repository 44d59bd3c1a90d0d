//! Correlate raw records into logical events.
//!
//! Records are grouped by (node, event id, timestamp second). Groups keep
//! arrival order; the finished sequence is ordered newest first.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::identity::IdentityLookup;
use crate::normalize;
use crate::types::{CorrelationKey, Event, RawRecord};

/// Key a record belongs to, or `None` when it has no event id to group on.
pub fn correlation_key(record: &RawRecord) -> Option<CorrelationKey> {
  let event_id = record.event_id?;
  Some(CorrelationKey {
    node: record.field("node").map(String::from),
    event_id,
    second: record.timestamp.map_or(0, |ts| ts.trunc() as i64),
  })
}

struct Accumulator {
  key: CorrelationKey,
  records: Vec<RawRecord>,
}

/// Incremental grouping state for one parse pass.
#[derive(Default)]
pub struct EventGrouper {
  index: HashMap<CorrelationKey, usize>,
  groups: Vec<Accumulator>,
  dropped: u64,
}

impl EventGrouper {
  pub fn new() -> Self {
    Self::default()
  }

  /// Buffer a record under its key. Returns `false` (and counts the drop)
  /// when the record has no event id.
  pub fn push(&mut self, record: RawRecord) -> bool {
    let key = match correlation_key(&record) {
      Some(k) => k,
      None => {
        self.dropped += 1;
        return false;
      }
    };

    match self.index.get(&key) {
      Some(&slot) => self.groups[slot].records.push(record),
      None => {
        self.index.insert(key.clone(), self.groups.len());
        self.groups.push(Accumulator {
          key,
          records: vec![record],
        });
      }
    }
    true
  }

  pub fn dropped(&self) -> u64 {
    self.dropped
  }

  pub fn len(&self) -> usize {
    self.groups.len()
  }

  pub fn is_empty(&self) -> bool {
    self.groups.is_empty()
  }

  /// Convert every group into an event, newest first.
  pub fn finish<L: IdentityLookup + ?Sized>(self, identities: &L) -> Vec<Event> {
    let mut events: Vec<Event> = self
      .groups
      .into_iter()
      .filter_map(|acc| normalize::build_event(acc.key, acc.records, identities))
      .collect();
    sort_newest_first(&mut events);
    events
  }
}

/// Group `records` into events, newest first. Records without an event id
/// are dropped.
pub fn reconstruct_events<L, I>(records: I, identities: &L) -> Vec<Event>
where
  L: IdentityLookup + ?Sized,
  I: IntoIterator<Item = RawRecord>,
{
  let mut grouper = EventGrouper::new();
  for record in records {
    grouper.push(record);
  }
  grouper.finish(identities)
}

/// Stable sort by timestamp descending; a missing timestamp sorts as 0.
pub fn sort_newest_first(events: &mut [Event]) {
  events.sort_by(|a, b| newest_first(a.timestamp, b.timestamp));
}

fn newest_first(a: Option<f64>, b: Option<f64>) -> Ordering {
  b.unwrap_or(0.0).total_cmp(&a.unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::identity::StaticIdentities;
  use crate::types::RecordType;
  use std::collections::HashMap;

  fn rec(event_id: Option<u64>, ts: Option<f64>, node: Option<&str>, tag: &str) -> RawRecord {
    let mut fields = HashMap::new();
    if let Some(n) = node {
      fields.insert("node".to_string(), n.to_string());
    }
    RawRecord {
      record_type: RecordType::from_tag(tag),
      timestamp: ts,
      event_id,
      fields,
      raw_text: format!("{}:{:?}", tag, event_id),
    }
  }

  fn ids() -> StaticIdentities {
    StaticIdentities::new()
  }

  #[test]
  fn key_truncates_to_the_second() {
    let k = correlation_key(&rec(Some(9), Some(1700000000.999), Some("web01"), "PATH")).unwrap();
    assert_eq!(k.second, 1700000000);
    assert_eq!(k.node.as_deref(), Some("web01"));
    assert!(correlation_key(&rec(None, Some(1.0), None, "PATH")).is_none());
    assert_eq!(correlation_key(&rec(Some(1), None, None, "PATH")).unwrap().second, 0);
  }

  #[test]
  fn records_sharing_a_key_merge() {
    let events = reconstruct_events(
      vec![
        rec(Some(10), Some(100.1), None, "SYSCALL"),
        rec(Some(11), Some(100.2), None, "SYSCALL"),
        rec(Some(10), Some(100.3), None, "PATH"),
        rec(Some(10), Some(100.0), None, "CWD"),
      ],
      &ids(),
    );
    assert_eq!(events.len(), 2);
    let merged = events.iter().find(|e| e.correlation_key.event_id == 10).unwrap();
    assert_eq!(merged.records.len(), 3);
    assert_eq!(merged.timestamp, Some(100.0));
    let types: Vec<_> = merged.records.iter().map(|r| r.record_type.as_str()).collect();
    assert_eq!(types, vec!["SYSCALL", "PATH", "CWD"]);
  }

  #[test]
  fn recycled_ids_in_other_seconds_stay_apart() {
    let events = reconstruct_events(
      vec![
        rec(Some(10), Some(100.5), None, "SYSCALL"),
        rec(Some(10), Some(5000.5), None, "SYSCALL"),
      ],
      &ids(),
    );
    assert_eq!(events.len(), 2);
  }

  #[test]
  fn different_nodes_stay_apart() {
    let events = reconstruct_events(
      vec![
        rec(Some(10), Some(100.5), Some("a"), "SYSCALL"),
        rec(Some(10), Some(100.5), Some("b"), "SYSCALL"),
      ],
      &ids(),
    );
    assert_eq!(events.len(), 2);
  }

  #[test]
  fn records_without_event_id_are_dropped() {
    let mut grouper = EventGrouper::new();
    assert!(!grouper.push(rec(None, Some(1.0), None, "SYSCALL")));
    assert!(grouper.push(rec(Some(1), Some(1.0), None, "SYSCALL")));
    assert_eq!(grouper.dropped(), 1);
    assert_eq!(grouper.len(), 1);
    assert_eq!(grouper.finish(&ids()).len(), 1);
  }

  #[test]
  fn ordered_newest_first_with_missing_timestamps_last() {
    let events = reconstruct_events(
      vec![
        rec(Some(1), Some(100.0), None, "SYSCALL"),
        rec(Some(2), None, None, "SYSCALL"),
        rec(Some(3), Some(300.0), None, "SYSCALL"),
        rec(Some(4), Some(200.0), None, "SYSCALL"),
      ],
      &ids(),
    );
    let order: Vec<u64> = events.iter().map(|e| e.correlation_key.event_id).collect();
    assert_eq!(order, vec![3, 4, 1, 2]);
  }
}
