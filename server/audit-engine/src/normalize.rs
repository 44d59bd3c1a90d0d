//! Turn one group of correlated records into a canonical Event.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};

use crate::fingerprint;
use crate::identity::{resolve_user, IdentityLookup};
use crate::types::*;

/// Build an event from records sharing `key`, in arrival order.
///
/// Returns `None` for an empty group; an event always has at least one record.
pub fn build_event<L: IdentityLookup + ?Sized>(
  key: CorrelationKey,
  records: Vec<RawRecord>,
  identities: &L,
) -> Option<Event> {
  let primary = primary_record(&records)?;
  let timestamp = earliest_timestamp(&records);
  let f = |name: &str| primary.field(name).map(String::from);

  let user = resolve_user(primary.field("auid"), primary.field("uid"), identities);
  let addr = first_present(primary, &["addr", "addr4", "addr6"]);
  let hostname = first_present(primary, &["hostname", "node"]);

  let raw_text = records
    .iter()
    .map(|r| r.raw_text.as_str())
    .collect::<Vec<_>>()
    .join("\n");

  let mut event = Event {
    id: fingerprint::compute(&key, &raw_text),
    correlation_key: key,
    timestamp,
    time_display: timestamp.map(format_timestamp).unwrap_or_default(),
    user,
    event_type: primary.record_type.clone(),
    comm: f("comm"),
    exe: f("exe"),
    pid: f("pid"),
    ppid: f("ppid"),
    syscall: f("syscall"),
    exit: f("exit"),
    cwd: f("cwd"),
    tty: f("tty"),
    acct: f("acct"),
    addr,
    hostname,
    key: f("key"),
    success: outcome(primary),
    details: merge_details(&records),
    raw_text,
    records: Vec::new(),
  };
  event.records = records;
  Some(event)
}

/// SYSCALL first, then USER_AUTH / USER_LOGIN, then whatever came first.
pub fn primary_record(records: &[RawRecord]) -> Option<&RawRecord> {
  records
    .iter()
    .find(|r| r.record_type == RecordType::Syscall)
    .or_else(|| records.iter().find(|r| r.record_type.is_authentication()))
    .or_else(|| records.first())
}

/// Smallest timestamp present among the records.
pub fn earliest_timestamp(records: &[RawRecord]) -> Option<f64> {
  records
    .iter()
    .filter_map(|r| r.timestamp)
    .fold(None, |min: Option<f64>, ts| match min {
      Some(m) if m <= ts => Some(m),
      _ => Some(ts),
    })
}

/// `success=` decides when present; otherwise `res=`; otherwise unknown.
pub fn outcome(record: &RawRecord) -> Outcome {
  if let Some(v) = record.field("success") {
    let v = v.to_ascii_lowercase();
    return if matches!(v.as_str(), "yes" | "1" | "true" | "ok") {
      Outcome::Success
    } else {
      Outcome::Failure
    };
  }

  match record.field("res").map(str::to_ascii_lowercase).as_deref() {
    Some("success" | "ok" | "1") => Outcome::Success,
    Some("failed" | "fail" | "error" | "0") => Outcome::Failure,
    _ => Outcome::Unknown,
  }
}

/// Merge every record's fields. A key seen in several records keeps all of
/// its values, in record order.
pub fn merge_details(records: &[RawRecord]) -> BTreeMap<String, FieldValue> {
  let mut details: BTreeMap<String, FieldValue> = BTreeMap::new();
  for rec in records {
    for (k, v) in &rec.fields {
      match details.get_mut(k) {
        Some(existing) => existing.push(v.clone()),
        None => {
          details.insert(k.clone(), FieldValue::Single(v.clone()));
        }
      }
    }
  }
  details
}

/// Local wall-clock time as "YYYY-MM-DD HH:MM:SS"; empty if out of range.
pub fn format_timestamp(ts: f64) -> String {
  let secs = ts.floor();
  let nanos = ((ts - secs) * 1e9) as u32;
  match DateTime::from_timestamp(secs as i64, nanos) {
    Some(dt) => dt
      .with_timezone(&Local)
      .format("%Y-%m-%d %H:%M:%S")
      .to_string(),
    None => String::new(),
  }
}

fn first_present(record: &RawRecord, names: &[&str]) -> Option<String> {
  names
    .iter()
    .filter_map(|n| record.field(n))
    .find(|v| !v.is_empty())
    .map(String::from)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::identity::StaticIdentities;
  use std::collections::HashMap;

  fn rec(record_type: &str, ts: Option<f64>, fields: &[(&str, &str)]) -> RawRecord {
    RawRecord {
      record_type: RecordType::from_tag(record_type),
      timestamp: ts,
      event_id: Some(7),
      fields: fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<HashMap<_, _>>(),
      raw_text: format!("type={} ...", record_type),
    }
  }

  fn key() -> CorrelationKey {
    CorrelationKey {
      node: None,
      event_id: 7,
      second: 1700000000,
    }
  }

  fn ids() -> StaticIdentities {
    StaticIdentities::new().with(33, "www-data")
  }

  #[test]
  fn empty_group_builds_nothing() {
    assert!(build_event(key(), Vec::new(), &ids()).is_none());
  }

  #[test]
  fn syscall_is_primary_even_when_not_first() {
    let records = vec![
      rec("CWD", Some(1700000000.2), &[("cwd", "/var/www")]),
      rec("USER_AUTH", Some(1700000000.3), &[("res", "failed")]),
      rec(
        "SYSCALL",
        Some(1700000000.1),
        &[("syscall", "59"), ("uid", "33"), ("comm", "bash"), ("success", "yes")],
      ),
    ];
    let ev = build_event(key(), records, &ids()).unwrap();
    assert_eq!(ev.event_type, RecordType::Syscall);
    assert_eq!(ev.comm.as_deref(), Some("bash"));
    assert_eq!(ev.user, "www-data (33)");
    assert_eq!(ev.success, Outcome::Success);
    assert_eq!(ev.timestamp, Some(1700000000.1));
    assert_eq!(ev.records.len(), 3);
    assert_eq!(ev.raw_text, "type=CWD ...\ntype=USER_AUTH ...\ntype=SYSCALL ...");
  }

  #[test]
  fn auth_record_beats_first_record() {
    let records = vec![
      rec("CRED_ACQ", Some(1.0), &[]),
      rec("USER_LOGIN", Some(1.0), &[("res", "failed"), ("addr", "10.0.0.9")]),
    ];
    assert_eq!(primary_record(&records).unwrap().record_type, RecordType::UserLogin);

    let records = vec![rec("PROCTITLE", None, &[]), rec("PATH", None, &[])];
    assert_eq!(primary_record(&records).unwrap().record_type, RecordType::Proctitle);
  }

  #[test]
  fn earliest_timestamp_ignores_missing() {
    let records = vec![rec("PATH", None, &[]), rec("PATH", Some(5.5), &[]), rec("PATH", Some(2.5), &[])];
    assert_eq!(earliest_timestamp(&records), Some(2.5));
    assert_eq!(earliest_timestamp(&[rec("PATH", None, &[])]), None);
  }

  #[test]
  fn outcome_is_tri_state() {
    assert_eq!(outcome(&rec("SYSCALL", None, &[("success", "yes")])), Outcome::Success);
    assert_eq!(outcome(&rec("SYSCALL", None, &[("success", "no")])), Outcome::Failure);
    assert_eq!(outcome(&rec("SYSCALL", None, &[("success", "OK")])), Outcome::Success);
    assert_eq!(outcome(&rec("USER_AUTH", None, &[("res", "success")])), Outcome::Success);
    assert_eq!(outcome(&rec("USER_AUTH", None, &[("res", "FAILED")])), Outcome::Failure);
    assert_eq!(outcome(&rec("USER_AUTH", None, &[("res", "maybe")])), Outcome::Unknown);
    assert_eq!(outcome(&rec("PATH", None, &[])), Outcome::Unknown);
    // success= takes precedence over res=
    assert_eq!(
      outcome(&rec("SYSCALL", None, &[("success", "no"), ("res", "success")])),
      Outcome::Failure
    );
  }

  #[test]
  fn repeated_fields_aggregate_into_lists() {
    let records = vec![
      rec("SYSCALL", None, &[("syscall", "82")]),
      rec("PATH", None, &[("name", "/etc/passwd+"), ("item", "0")]),
      rec("PATH", None, &[("name", "/etc/passwd"), ("item", "1")]),
    ];
    let details = merge_details(&records);
    assert_eq!(
      details.get("name"),
      Some(&FieldValue::Multi(vec!["/etc/passwd+".into(), "/etc/passwd".into()]))
    );
    assert_eq!(details.get("syscall"), Some(&FieldValue::Single("82".into())));
  }

  #[test]
  fn address_and_hostname_aliases() {
    let records = vec![rec(
      "USER_LOGIN",
      None,
      &[("addr", ""), ("addr6", "::1"), ("node", "web01")],
    )];
    let ev = build_event(key(), records, &ids()).unwrap();
    assert_eq!(ev.addr.as_deref(), Some("::1"));
    assert_eq!(ev.hostname.as_deref(), Some("web01"));
    assert_eq!(ev.user, "?");
    assert_eq!(ev.time_display, "");
  }

  #[test]
  fn display_time_shape() {
    let s = format_timestamp(1700000000.75);
    assert_eq!(s.len(), 19);
    assert_eq!(&s[4..5], "-");
    assert_eq!(&s[10..11], " ");
  }
}
