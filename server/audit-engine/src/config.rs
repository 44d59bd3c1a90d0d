//! Detector configuration with sane defaults.

use std::ops::RangeInclusive;

/// Tunable thresholds and signature sets for the incident detectors.
#[derive(Debug, Clone)]
pub struct Config {
  /// Failed SSH authentications needed inside one window.
  pub ssh_min_failures: usize,
  /// Width of the brute-force sliding window.
  pub ssh_window_minutes: u64,
  /// Files whose successful modification is reported. A path also matches
  /// when it continues with `.` (backup and editor copies).
  pub critical_paths: Vec<String>,
  /// Executable paths treated as interactive shells.
  pub shell_executables: Vec<String>,
  /// Process names treated as interactive shells.
  pub shell_names: Vec<String>,
  /// Substrings marking an account name as a web/service account.
  pub service_name_tokens: Vec<String>,
  /// Numeric uids always treated as service accounts.
  pub service_uids: Vec<u32>,
  /// Heuristic only: uids in this range count as system/service accounts.
  /// `None` disables it. Uid 0 is never matched, whatever the range says.
  pub service_uid_range: Option<RangeInclusive<u32>>,
}

impl Config {
  pub fn ssh_window_seconds(&self) -> f64 {
    self.ssh_window_minutes as f64 * 60.0
  }
}

fn strings(items: &[&str]) -> Vec<String> {
  items.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
  fn default() -> Self {
    Self {
      ssh_min_failures: 5,
      ssh_window_minutes: 10,
      critical_paths: strings(&[
        "/etc/passwd",
        "/etc/shadow",
        "/etc/group",
        "/etc/sudoers",
        "/etc/ssh/sshd_config",
      ]),
      shell_executables: strings(&[
        "/bin/bash",
        "/bin/sh",
        "/bin/dash",
        "/bin/zsh",
        "/usr/bin/bash",
        "/usr/bin/sh",
        "/usr/bin/dash",
        "/usr/bin/zsh",
      ]),
      shell_names: strings(&["bash", "sh", "dash", "zsh"]),
      service_name_tokens: strings(&[
        "www-data", "nginx", "apache", "httpd", "lighttpd", "php-fpm", "tomcat",
      ]),
      service_uids: vec![33, 48, 80],
      service_uid_range: Some(1..=999),
    }
  }
}
