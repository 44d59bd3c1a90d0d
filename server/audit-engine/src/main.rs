//! Binary entrypoint: parse one audit log, write one JSON document to stdout.
//!
//! The document is either
//! - `{"events": [...], "report"?, "incidents"?, "stats"?}` on success, or
//! - `{"error": "log_not_found" | "parse_error", "message": "..."}` with exit status 1.
//!
//! Diagnostics go to stderr through tracing (`RUST_LOG`, default `warn`).

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use audit_engine::stats;
use audit_engine::types::{ErrorOutput, EventsOutput};
use audit_engine::{
  Config, Detector, Engine, EngineError, IdentityLookup, StaticIdentities, SystemIdentities,
  DEFAULT_LOG_PATH,
};
use clap::Parser;
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
  name = "audit-helper",
  version,
  about = "Reconstruct events from a Linux audit log and run intrusion heuristics"
)]
struct Cli {
  /// Audit log to read
  #[arg(default_value = DEFAULT_LOG_PATH)]
  log: PathBuf,

  /// Resolve uids from this passwd-format file instead of the system database
  #[arg(long, value_name = "FILE")]
  passwd: Option<PathBuf>,

  /// Detector to run: ssh_bruteforce, critical_file_change, web_shell (repeatable)
  #[arg(long = "detect", value_name = "NAME")]
  detect: Vec<Detector>,

  /// Run every detector
  #[arg(long, conflicts_with = "detect")]
  all_detectors: bool,

  /// Include parse counters
  #[arg(long)]
  report: bool,

  /// Include summary statistics
  #[arg(long)]
  stats: bool,

  /// Start of the statistics range, epoch seconds (inclusive)
  #[arg(long, value_name = "EPOCH", requires = "stats")]
  from: Option<f64>,

  /// End of the statistics range, epoch seconds (inclusive)
  #[arg(long, value_name = "EPOCH", requires = "stats")]
  to: Option<f64>,

  /// Failed SSH authentications that make a burst
  #[arg(long, default_value_t = 5)]
  ssh_min_failures: usize,

  /// Width of the SSH brute-force window
  #[arg(long, default_value_t = 10)]
  ssh_window_minutes: u64,

  /// Highest uid the service-account heuristic treats as a system account (0 disables)
  #[arg(long, default_value_t = 999)]
  service_uid_max: u32,

  /// Pretty-print the JSON document
  #[arg(long)]
  pretty: bool,
}

impl Cli {
  fn config(&self) -> Config {
    Config {
      ssh_min_failures: self.ssh_min_failures,
      ssh_window_minutes: self.ssh_window_minutes,
      service_uid_range: (self.service_uid_max > 0).then(|| 1..=self.service_uid_max),
      ..Config::default()
    }
  }

  /// Requested detectors, first mention wins.
  fn detectors(&self) -> Vec<Detector> {
    if self.all_detectors {
      return Detector::ALL.to_vec();
    }
    let mut out = Vec::new();
    for d in &self.detect {
      if !out.contains(d) {
        out.push(*d);
      }
    }
    out
  }
}

fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(io::stderr)
    .with_target(false)
    .init();

  let cli = Cli::parse();

  let rendered = match &cli.passwd {
    Some(path) => StaticIdentities::load_passwd(path)
      .and_then(|ids| render(&cli, &Engine::new(cli.config(), ids))),
    None => render(&cli, &Engine::new(cli.config(), SystemIdentities)),
  };

  let (doc, status) = match rendered {
    Ok(doc) => (doc, ExitCode::SUCCESS),
    Err(e) => {
      warn!(error = %e, log = %cli.log.display(), "audit-helper failed");
      let err = ErrorOutput::new(e.category()).with_message(e.to_string());
      match to_json(&err, cli.pretty) {
        Ok(doc) => (doc, ExitCode::FAILURE),
        Err(_) => (b"{\"error\":\"parse_error\"}\n".to_vec(), ExitCode::FAILURE),
      }
    }
  };

  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());
  if let Err(e) = out.write_all(&doc).and_then(|()| out.flush()) {
    let _ = writeln!(io::stderr(), "audit-helper: write error: {}", e);
    return ExitCode::FAILURE;
  }
  status
}

/// Serialized success document. Nothing reaches stdout until it is complete.
fn render<L: IdentityLookup>(cli: &Cli, engine: &Engine<L>) -> Result<Vec<u8>, EngineError> {
  let parsed = engine.parse_file(&cli.log)?;

  let mut doc = EventsOutput::new(&parsed.events);
  if cli.report {
    doc.report = Some(&parsed.report);
  }
  doc.incidents = engine.incidents(&cli.detectors(), &parsed.events);
  if cli.stats {
    doc.stats = Some(stats::summarize(&parsed.events, cli.from, cli.to, engine.config()));
  }
  to_json(&doc, cli.pretty)
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<Vec<u8>, EngineError> {
  let mut buf = if pretty {
    serde_json::to_vec_pretty(value)?
  } else {
    serde_json::to_vec(value)?
  };
  buf.push(b'\n');
  Ok(buf)
}
