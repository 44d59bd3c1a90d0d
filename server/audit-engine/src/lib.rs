//! Linux audit log event reconstruction and intrusion heuristics.
//!
//! Parses `type=... msg=audit(<epoch>:<id>): key=value ...` lines into
//! records, groups them into events by (node, event id, second), resolves
//! acting users, and runs fixed detectors over the result: SSH brute force,
//! critical file modification and web shell execution.
//!
//! No DB, no network; one sequential read of the log per parse.

pub mod config;
pub mod correlation;
pub mod detect;
pub mod engine;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod identity;
pub mod normalize;
pub mod record;
pub mod stats;
pub mod types;

#[cfg(test)]
mod testutil;

pub use config::Config;
pub use detect::{Detector, IncidentReport};
pub use engine::{Engine, ParsedLog, DEFAULT_LOG_PATH};
pub use error::EngineError;
pub use filter::{EventFilter, OutcomeFilter};
pub use identity::{resolve_user, IdentityLookup, StaticIdentities, SystemIdentities};
pub use stats::Summary;
pub use types::{Event, Outcome, ParseReport, RawRecord, RecordType};
