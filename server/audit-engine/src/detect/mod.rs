//! Incident detectors over a reconstructed event sequence.
//!
//! Every detector is a pure function of (events, config): it never mutates
//! its input, keeps input order in its output, and reports each event at
//! most once. That makes them safe to run side by side on scoped threads.

pub mod critical_files;
pub mod ssh_bruteforce;
pub mod web_shell;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::types::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Detector {
  SshBruteforce,
  CriticalFileChange,
  WebShell,
}

impl Detector {
  pub const ALL: [Detector; 3] = [
    Detector::SshBruteforce,
    Detector::CriticalFileChange,
    Detector::WebShell,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Self::SshBruteforce => "ssh_bruteforce",
      Self::CriticalFileChange => "critical_file_change",
      Self::WebShell => "web_shell",
    }
  }

  pub fn title(self) -> &'static str {
    match self {
      Self::SshBruteforce => "SSH password brute force",
      Self::CriticalFileChange => "Critical file modification",
      Self::WebShell => "Web shell (shell launched by a service account)",
    }
  }

  /// Why the heuristic fires. Static text, independent of the data.
  pub fn description(self) -> &'static str {
    match self {
      Self::SshBruteforce => {
        "Looks for runs of failed USER_AUTH/USER_LOGIN events from sshd: at least 5 \
         authentication failures for the same user and source address within a short \
         sliding window (10 minutes by default). Such bursts usually mean password guessing."
      }
      Self::CriticalFileChange => {
        "Looks for successful system calls touching /etc/passwd, /etc/shadow, /etc/group, \
         /etc/sudoers or /etc/ssh/sshd_config, including backup copies such as \
         /etc/shadow.bak. Changes there alter accounts, passwords, privileges or remote access."
      }
      Self::WebShell => {
        "Looks for execve of an interactive shell (bash/sh/dash/zsh) by a service account \
         such as www-data, nginx or apache. This often means a web application was exploited \
         to obtain remote command execution. Accounts with uids 1-999 are treated as service \
         accounts by heuristic only and may include legitimate system jobs."
      }
    }
  }

  /// Run this detector. The result borrows from `events`, in input order.
  pub fn run<'a>(self, events: &'a [Event], config: &Config) -> Vec<&'a Event> {
    let matches = match self {
      Self::SshBruteforce => ssh_bruteforce::find(events, config),
      Self::CriticalFileChange => critical_files::find(events, config),
      Self::WebShell => web_shell::find(events, config),
    };
    debug!(detector = self.name(), events = events.len(), matches = matches.len(), "detector finished");
    matches
  }

  pub fn report<'a>(self, events: &'a [Event], config: &Config) -> IncidentReport<'a> {
    IncidentReport {
      detector: self,
      title: self.title(),
      description: self.description(),
      events: self.run(events, config),
    }
  }
}

impl fmt::Display for Detector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Detector {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
    Detector::ALL
      .into_iter()
      .find(|d| d.name() == normalized)
      .ok_or_else(|| {
        format!(
          "unknown detector '{}' (expected one of: ssh_bruteforce, critical_file_change, web_shell)",
          s
        )
      })
  }
}

/// One detector's findings, ready for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct IncidentReport<'a> {
  pub detector: Detector,
  pub title: &'static str,
  pub description: &'static str,
  pub events: Vec<&'a Event>,
}

/// Run several detectors over the same events, one scoped thread each.
/// Reports come back in the order `detectors` lists them.
pub fn run_all<'a>(
  detectors: &[Detector],
  events: &'a [Event],
  config: &Config,
) -> Vec<IncidentReport<'a>> {
  std::thread::scope(|s| {
    let handles: Vec<_> = detectors
      .iter()
      .map(|&d| s.spawn(move || d.report(events, config)))
      .collect();
    handles
      .into_iter()
      .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
      .collect()
  })
}

/// Events whose flag is set, in input order.
fn select<'a>(events: &'a [Event], flagged: &[bool]) -> Vec<&'a Event> {
  events
    .iter()
    .zip(flagged)
    .filter(|(_, hit)| **hit)
    .map(|(ev, _)| ev)
    .collect()
}
