//! Critical file modification: successful syscalls on sensitive system files.

use crate::config::Config;
use crate::types::{Event, RecordType};

/// SYSCALL events with explicit success whose path list hits a critical file.
pub fn find<'a>(events: &'a [Event], config: &Config) -> Vec<&'a Event> {
  events
    .iter()
    .filter(|ev| ev.event_type == RecordType::Syscall && ev.success.is_success())
    .filter(|ev| {
      touched_paths(ev).any(|path| {
        config
          .critical_paths
          .iter()
          .any(|critical| matches_critical(path, critical))
      })
    })
    .collect()
}

/// Exact match, or the critical path followed by `.` (`/etc/shadow.bak`).
pub fn matches_critical(path: &str, critical: &str) -> bool {
  match path.strip_prefix(critical) {
    Some(rest) => rest.is_empty() || rest.starts_with('.'),
    None => false,
  }
}

/// Every `name` value across the event's PATH records, falling back to `path`.
fn touched_paths(ev: &Event) -> Box<dyn Iterator<Item = &str> + '_> {
  if ev.details.contains_key("name") {
    Box::new(ev.detail_values("name"))
  } else {
    Box::new(ev.detail_values("path"))
  }
}
