//! Identity resolution: audit uids to display strings.
//!
//! Lookups go through [`IdentityLookup`] so a parse can use the live
//! system database, a passwd file copied off another host, or a fixed
//! table in tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use nix::unistd::{Uid, User};
use tracing::debug;

use crate::error::EngineError;

/// Values meaning "never set" (`-1` and its unsigned 32-bit wraparound).
pub const UNSET_SENTINELS: [&str; 2] = ["-1", "4294967295"];

pub trait IdentityLookup {
  /// Account name for `uid`, or `None` when the database has no entry.
  fn name_for_uid(&self, uid: u32) -> Option<String>;
}

impl<T: IdentityLookup + ?Sized> IdentityLookup for &T {
  fn name_for_uid(&self, uid: u32) -> Option<String> {
    (**self).name_for_uid(uid)
  }
}

/// The host's account database (getpwuid_r, so NSS sources are honored).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemIdentities;

impl IdentityLookup for SystemIdentities {
  fn name_for_uid(&self, uid: u32) -> Option<String> {
    match User::from_uid(Uid::from_raw(uid)) {
      Ok(user) => user.map(|u| u.name),
      Err(e) => {
        debug!(uid, error = %e, "account lookup failed");
        None
      }
    }
  }
}

/// Fixed uid → name table.
#[derive(Debug, Default, Clone)]
pub struct StaticIdentities {
  names: HashMap<u32, String>,
}

impl StaticIdentities {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, uid: u32, name: impl Into<String>) -> Self {
    self.names.insert(uid, name.into());
    self
  }

  /// Build from passwd(5) content. Comment and malformed lines are ignored;
  /// the first entry for a uid wins, as with getpwuid.
  pub fn from_passwd(content: &str) -> Self {
    let mut names = HashMap::new();
    for line in content.lines() {
      let line = line.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }
      let mut parts = line.split(':');
      let name = parts.next().unwrap_or("");
      let uid = parts.nth(1).and_then(|u| u.parse::<u32>().ok());
      match uid {
        Some(uid) if !name.is_empty() => {
          names.entry(uid).or_insert_with(|| name.to_string());
        }
        _ => {}
      }
    }
    Self { names }
  }

  pub fn load_passwd(path: &Path) -> Result<Self, EngineError> {
    let content = std::fs::read_to_string(path).map_err(|e| EngineError::IdentityDb {
      path: path.display().to_string(),
      source: e,
    })?;
    Ok(Self::from_passwd(&content))
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}

impl IdentityLookup for StaticIdentities {
  fn name_for_uid(&self, uid: u32) -> Option<String> {
    self.names.get(&uid).cloned()
  }
}

/// Memoizes another lookup. Scoped to a single parse; never shared.
pub struct CachedIdentities<L> {
  inner: L,
  cache: RefCell<HashMap<u32, Option<String>>>,
}

impl<L: IdentityLookup> CachedIdentities<L> {
  pub fn new(inner: L) -> Self {
    Self {
      inner,
      cache: RefCell::new(HashMap::new()),
    }
  }
}

impl<L: IdentityLookup> IdentityLookup for CachedIdentities<L> {
  fn name_for_uid(&self, uid: u32) -> Option<String> {
    if let Some(hit) = self.cache.borrow().get(&uid) {
      return hit.clone();
    }
    let name = self.inner.name_for_uid(uid);
    self.cache.borrow_mut().insert(uid, name.clone());
    name
  }
}

/// Render the acting identity of a record.
///
/// `audit_uid` wins over `uid`. Sentinels give `"unset"`, uid 0 gives
/// `"root (0)"`, known uids give `"<name> (<uid>)"`, unknown uids give the
/// bare number, and anything that isn't a number comes back verbatim.
/// `"?"` when neither field is present.
pub fn resolve_user<L: IdentityLookup + ?Sized>(
  audit_uid: Option<&str>,
  uid: Option<&str>,
  identities: &L,
) -> String {
  let raw = match audit_uid.filter(|s| !s.is_empty()).or(uid) {
    Some(r) => r,
    None => return "?".to_string(),
  };

  if UNSET_SENTINELS.contains(&raw) {
    return "unset".to_string();
  }

  // Values may already carry an annotation: "1000 (ivan)".
  let numeric = raw.split_whitespace().next().unwrap_or("");
  let value = match numeric.parse::<i64>() {
    Ok(v) => v,
    Err(_) => return raw.to_string(),
  };

  if value == 0 {
    return "root (0)".to_string();
  }

  match u32::try_from(value).ok().and_then(|u| identities.name_for_uid(u)) {
    Some(name) => format!("{} ({})", name, value),
    None => value.to_string(),
  }
}
