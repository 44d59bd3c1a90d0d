//! SSH brute force: bursts of failed sshd authentications per (user, address).

use std::collections::HashMap;

use super::select;
use crate::config::Config;
use crate::types::Event;

const ADDRESS_FIELDS: [&str; 3] = ["addr", "addr4", "addr6"];
const NO_ADDRESS: &str = "-";

/// Failed sshd authentications that fall inside a qualifying window.
///
/// Only explicit failures count; events with unknown outcome or no
/// timestamp are left out.
pub fn find<'a>(events: &'a [Event], config: &Config) -> Vec<&'a Event> {
  // (user, address) -> [(timestamp, index into events)]
  let mut groups: HashMap<(&str, &str), Vec<(f64, usize)>> = HashMap::new();

  for (idx, ev) in events.iter().enumerate() {
    if !ev.event_type.is_authentication() || !ev.success.is_failure() || !is_ssh(ev) {
      continue;
    }
    let ts = match ev.timestamp {
      Some(ts) => ts,
      None => continue,
    };
    groups
      .entry((ev.user.as_str(), source_address(ev)))
      .or_default()
      .push((ts, idx));
  }

  let window = config.ssh_window_seconds();
  let mut flagged = vec![false; events.len()];
  for attempts in groups.values_mut() {
    attempts.sort_by(|a, b| a.0.total_cmp(&b.0));
    mark_bursts(attempts, window, config.ssh_min_failures, &mut flagged);
  }

  select(events, &flagged)
}

/// Two-pointer scan over time-sorted attempts. Every attempt inside a window
/// holding at least `min_failures` attempts is flagged.
fn mark_bursts(attempts: &[(f64, usize)], window: f64, min_failures: usize, flagged: &mut [bool]) {
  let mut left = 0;
  for right in 0..attempts.len() {
    while left < right && attempts[right].0 - attempts[left].0 > window {
      left += 1;
    }
    if right - left + 1 >= min_failures {
      for &(_, idx) in &attempts[left..=right] {
        flagged[idx] = true;
      }
    }
  }
}

fn is_ssh(ev: &Event) -> bool {
  [ev.detail("exe"), ev.exe.as_deref(), ev.comm.as_deref()]
    .into_iter()
    .flatten()
    .any(|v| v.to_ascii_lowercase().contains("ssh"))
}

fn source_address(ev: &Event) -> &str {
  ADDRESS_FIELDS
    .iter()
    .filter_map(|f| ev.detail(f))
    .find(|v| !v.is_empty())
    .unwrap_or(NO_ADDRESS)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testutil::*;

  fn failures(count: u64, span_secs: f64, addr: &str, first_eid: u64) -> String {
    let step = if count > 1 { span_secs / (count - 1) as f64 } else { 0.0 };
    (0..count)
      .map(|i| ssh_failure(first_eid + i, T0 + step * i as f64, "root", addr))
      .collect()
  }

  #[test]
  fn five_failures_in_nine_minutes_fire() {
    let events = parse_log(&failures(5, 9.0 * 60.0, "203.0.113.5", 1));
    assert_eq!(find(&events, &Config::default()).len(), 5);
  }

  #[test]
  fn five_failures_over_eleven_minutes_do_not() {
    let events = parse_log(&failures(5, 11.0 * 60.0, "203.0.113.5", 1));
    assert!(find(&events, &Config::default()).is_empty());
  }

  #[test]
  fn addresses_are_grouped_separately() {
    let mut log = failures(3, 60.0, "203.0.113.5", 1);
    log.push_str(&failures(3, 60.0, "198.51.100.7", 10));
    let events = parse_log(&log);
    assert!(find(&events, &Config::default()).is_empty());
  }

  #[test]
  fn overlapping_windows_report_each_event_once() {
    // 8 attempts, one per minute: every window of 5 overlaps the next.
    let events = parse_log(&failures(8, 7.0 * 60.0, "203.0.113.5", 1));
    let hits = find(&events, &Config::default());
    assert_eq!(hits.len(), 8);
    for (i, a) in hits.iter().enumerate() {
      assert!(hits[i + 1..].iter().all(|b| !std::ptr::eq(*a, *b)));
    }
  }

  #[test]
  fn output_keeps_input_order() {
    let events = parse_log(&failures(6, 120.0, "203.0.113.5", 1));
    let hits = find(&events, &Config::default());
    let positions: Vec<usize> = hits
      .iter()
      .map(|h| events.iter().position(|e| std::ptr::eq(e, *h)).unwrap())
      .collect();
    let mut sorted = positions.clone();
    sorted.sort();
    assert_eq!(positions, sorted);
  }

  #[test]
  fn unknown_outcome_and_non_ssh_are_ignored() {
    let mut log = String::new();
    for i in 0..5 {
      // res=failed removed: outcome unknown
      log.push_str(&ssh_failure(i + 1, T0 + i as f64, "root", "10.0.0.1").replace(" res=failed'", "'"));
    }
    for i in 0..5 {
      log.push_str(&ssh_failure(i + 20, T0 + i as f64, "root", "10.0.0.2").replace("/usr/sbin/sshd", "/usr/sbin/vsftpd"));
    }
    let events = parse_log(&log);
    assert_eq!(events.len(), 10);
    assert!(find(&events, &Config::default()).is_empty());
  }

  #[test]
  fn thresholds_are_configurable() {
    let events = parse_log(&failures(3, 30.0, "203.0.113.5", 1));
    let config = Config {
      ssh_min_failures: 3,
      ssh_window_minutes: 1,
      ..Config::default()
    };
    assert_eq!(find(&events, &config).len(), 3);
  }

  #[test]
  fn very_wide_window_covers_everything() {
    let events = parse_log(&failures(5, 30.0 * 24.0 * 3600.0, "203.0.113.5", 1));
    let config = Config {
      ssh_window_minutes: u64::MAX,
      ..Config::default()
    };
    assert_eq!(find(&events, &config).len(), 5);
  }

  #[test]
  fn mark_bursts_window_boundary_is_inclusive() {
    let attempts = vec![(0.0, 0), (300.0, 1), (600.0, 2)];
    let mut flagged = vec![false; 3];
    mark_bursts(&attempts, 600.0, 3, &mut flagged);
    assert_eq!(flagged, vec![true, true, true]);

    let mut flagged = vec![false; 3];
    mark_bursts(&attempts, 599.0, 3, &mut flagged);
    assert_eq!(flagged, vec![false, false, false]);
  }
}
