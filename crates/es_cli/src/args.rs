// crates/es_cli/src/args.rs
//
// Offline, deterministic argument parsing for `es-store`. Every subcommand
// takes an explicit `--workspace` root — there is no env-var fallback and
// no implicit cwd default.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use es_core::model::EntityRef;

#[derive(Debug, Parser)]
#[command(name = "es-store", about = "Append-only replay event store — offline CLI")]
pub struct Cli {
    /// Store workspace root (contains `store/signals`, `store/emissions`, ...).
    #[arg(long, global = true)]
    pub workspace: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Append a signal envelope read from a JSON file (or `-` for stdin).
    AppendSignal {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value = "raise")]
        on_duplicate: String,
    },
    /// Append an emission envelope read from a JSON file (or `-` for stdin).
    AppendEmission {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value = "raise")]
        on_duplicate: String,
    },
    /// Scan signals in `[start, end]` and print each as one JSON line.
    ScanSignals {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        source: Option<String>,
        #[arg(long, value_parser = parse_entity_ref)]
        entity_ref: Option<EntityRef>,
    },
    /// Scan emissions in `[start, end]` and print each as one JSON line.
    ScanEmissions {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        emission_type: Option<String>,
        #[arg(long, value_parser = parse_entity_ref)]
        entity_ref: Option<EntityRef>,
    },
    /// Build a checkpoint from every signal in `[start, end]` and persist it
    /// under `--name`.
    Checkpoint {
        #[arg(long)]
        name: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Resume a signal scan from a named checkpoint, printing each record
    /// that has not already been processed.
    Resume {
        #[arg(long)]
        name: String,
        #[arg(long)]
        end: String,
    },
    /// Write an arbitrary named snapshot from a JSON payload file.
    Snapshot {
        #[arg(long)]
        name: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Recent signals referencing an entity, newest first.
    RecentByEntity {
        #[arg(long, value_parser = parse_entity_ref)]
        entity_ref: EntityRef,
        #[arg(long)]
        end: String,
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Recent signals from a source, newest first.
    RecentBySource {
        #[arg(long)]
        source: String,
        #[arg(long)]
        end: String,
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Top-K recommendation candidate signals by numeric score.
    TopCandidates {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        unique_by_entity: bool,
    },
    /// Pending / expired / success / failure outcome buckets as of `--now`.
    OutcomeBuckets {
        #[arg(long)]
        now: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
}

#[derive(Debug)]
pub enum CliError {
    BadTimestamp(String),
    Io(String),
    Store(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::BadTimestamp(s) => write!(f, "invalid timestamp: {s}"),
            CliError::Io(s) => write!(f, "I/O error: {s}"),
            CliError::Store(s) => write!(f, "store error: {s}"),
        }
    }
}

impl std::error::Error for CliError {}

/// Parses `ref_type:value` or `ref_type:platform:value` on the command line.
fn parse_entity_ref(raw: &str) -> Result<EntityRef, String> {
    let parts: Vec<&str> = raw.splitn(3, ':').collect();
    match parts.as_slice() {
        [ref_type, value] if !ref_type.is_empty() && !value.is_empty() => {
            Ok(EntityRef::new(*ref_type, *value))
        }
        [ref_type, platform, value] if !ref_type.is_empty() && !value.is_empty() => {
            let er = EntityRef::new(*ref_type, *value);
            Ok(if platform.is_empty() {
                er
            } else {
                er.with_platform(*platform)
            })
        }
        _ => Err(format!(
            "invalid entity ref {raw:?} (want ref_type:value or ref_type:platform:value)"
        )),
    }
}

pub fn parse_required_timestamp(raw: &str) -> Result<chrono::DateTime<chrono::Utc>, CliError> {
    es_core::time::parse_timestamp(raw).ok_or_else(|| CliError::BadTimestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ref_parses_two_part_form() {
        let er = parse_entity_ref("entity_id:ent-1").unwrap();
        assert_eq!(er, EntityRef::new("entity_id", "ent-1"));
    }

    #[test]
    fn entity_ref_parses_three_part_form_with_platform() {
        let er = parse_entity_ref("entity_id:twitter:ent-1").unwrap();
        assert_eq!(
            er,
            EntityRef::new("entity_id", "ent-1").with_platform("twitter")
        );
    }

    #[test]
    fn entity_ref_rejects_malformed_input() {
        assert!(parse_entity_ref("nope").is_err());
    }
}
