//! Web shell: an interactive shell launched under a service account.

use crate::config::Config;
use crate::normalize;
use crate::types::{Event, RecordType};

/// Syscall number of execve for the `arch=` values the kernel writes, or
/// `None` for an architecture not listed here. Logs interpreted by ausearch
/// carry the names instead. A record without `arch` is taken as x86_64.
fn execve_number(arch: Option<&str>) -> Option<u32> {
  match arch.map(str::to_ascii_lowercase).as_deref() {
    None | Some("c000003e" | "x86_64") => Some(59),
    Some("c00000b7" | "aarch64") => Some(221),
    Some("40000003" | "i386" | "i686" | "40000028" | "arm" | "armeb" | "armv7l") => Some(11),
    Some(_) => None,
  }
}

pub fn find<'a>(events: &'a [Event], config: &Config) -> Vec<&'a Event> {
  events
    .iter()
    .filter(|ev| ev.event_type == RecordType::Syscall && is_execve(ev))
    .filter(|ev| is_shell(ev, config) && is_service_identity(ev, config))
    .collect()
}

fn is_execve(ev: &Event) -> bool {
  let syscall = match ev.syscall.as_deref().or_else(|| ev.detail("syscall")) {
    Some(s) => s,
    None => return false,
  };
  if syscall == "execve" {
    return true;
  }
  match (syscall.parse::<u32>(), execve_number(ev.detail("arch"))) {
    (Ok(number), Some(execve)) => number == execve,
    _ => false,
  }
}

fn is_shell(ev: &Event, config: &Config) -> bool {
  let exe = ev.exe.as_deref().or_else(|| ev.detail("exe"));
  let comm = ev.comm.as_deref().or_else(|| ev.detail("comm"));
  exe.map_or(false, |e| config.shell_executables.iter().any(|s| s == e))
    || comm.map_or(false, |c| config.shell_names.iter().any(|s| s == c))
}

/// Decide whether the acting identity looks like a service account.
///
/// In order: a service token in any name-bearing field; a uid on the
/// service list; a uid inside the configured low range (never uid 0).
pub fn is_service_identity(ev: &Event, config: &Config) -> bool {
  let raw_uid = acting_uid(ev);
  let names = [
    raw_uid.and_then(uid_annotation),
    ev.acct.as_deref().or_else(|| ev.detail("acct")),
    Some(ev.user.as_str()),
    ev.detail("UID"),
  ];
  let named_service = names.into_iter().flatten().any(|name| {
    let name = name.to_ascii_lowercase();
    config
      .service_name_tokens
      .iter()
      .any(|token| name.contains(token.as_str()))
  });
  if named_service {
    return true;
  }

  let uid = match raw_uid
    .and_then(|u| u.split_whitespace().next())
    .and_then(|u| u.parse::<u32>().ok())
  {
    Some(uid) => uid,
    None => return false,
  };
  if config.service_uids.contains(&uid) {
    return true;
  }
  uid != 0
    && config
      .service_uid_range
      .as_ref()
      .map_or(false, |range| range.contains(&uid))
}

/// `uid` of the primary record, the one the event's identity comes from.
fn acting_uid(ev: &Event) -> Option<&str> {
  match normalize::primary_record(&ev.records) {
    Some(primary) => primary.field("uid"),
    None => ev.detail("uid"),
  }
}

/// Name inside a uid annotation: `33 (www-data)` gives `www-data`.
fn uid_annotation(raw: &str) -> Option<&str> {
  let open = raw.find('(')?;
  let close = raw[open..].find(')')? + open;
  Some(raw[open + 1..close].trim())
}
