//! Stable event identifiers.

use crate::types::CorrelationKey;

/// Compute a stable id for an event from its correlation key and raw text.
///
/// Uses blake3 so the same log yields the same ids on every parse; callers
/// across the process boundary can key selections on it.
pub fn compute(key: &CorrelationKey, raw_text: &str) -> String {
  let mut hasher = blake3::Hasher::new();
  hasher.update(key.node.as_deref().unwrap_or("").as_bytes());
  hasher.update(b"|");
  hasher.update(key.event_id.to_string().as_bytes());
  hasher.update(b"|");
  hasher.update(key.second.to_string().as_bytes());
  hasher.update(b"|");
  hasher.update(raw_text.as_bytes());

  let hex = hasher.finalize().to_hex();
  format!("evt-{}", &hex[..16])
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(node: Option<&str>, event_id: u64, second: i64) -> CorrelationKey {
    CorrelationKey {
      node: node.map(String::from),
      event_id,
      second,
    }
  }

  #[test]
  fn same_input_same_id() {
    let k = key(None, 42, 1700000000);
    assert_eq!(compute(&k, "type=SYSCALL"), compute(&k, "type=SYSCALL"));
  }

  #[test]
  fn key_components_change_the_id() {
    let base = compute(&key(None, 42, 1700000000), "line");
    assert_ne!(base, compute(&key(Some("web01"), 42, 1700000000), "line"));
    assert_ne!(base, compute(&key(None, 43, 1700000000), "line"));
    assert_ne!(base, compute(&key(None, 42, 1700000001), "line"));
    assert_ne!(base, compute(&key(None, 42, 1700000000), "other line"));
  }

  #[test]
  fn id_format() {
    let id = compute(&key(None, 1, 0), "x");
    assert!(id.starts_with("evt-"));
    assert_eq!(id.len(), 20);
    assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
  }
}
