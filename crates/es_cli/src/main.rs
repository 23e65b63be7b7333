// crates/es_cli/src/main.rs
//
// `es-store` — offline CLI entrypoint driving the replay event store end to
// end: append, scan, checkpoint, snapshot, and the query facade. Strictly
// offline: no network, the only side effect is the filesystem under
// `--workspace`.

mod args;

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::ExitCode;

use args::{parse_required_timestamp, Cli, CliError, Command};
use clap::Parser;
use es_core::model::{EmissionEnvelope, SignalEnvelope};
use es_io::canonical_json::to_canonical_bytes;
use es_io::store::EventStore;
use es_io::writer::DuplicatePolicy;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("es-store: error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let store = EventStore::open(&cli.workspace).map_err(store_err)?;

    match cli.command {
        Command::AppendSignal { file, on_duplicate } => {
            let envelope: SignalEnvelope = read_json(&file)?;
            let policy = DuplicatePolicy::parse(&on_duplicate).map_err(store_err)?;
            let path = store.write_signal(&envelope, policy).map_err(store_err)?;
            println!("{}", path.display());
        }
        Command::AppendEmission { file, on_duplicate } => {
            let envelope: EmissionEnvelope = read_json(&file)?;
            let policy = DuplicatePolicy::parse(&on_duplicate).map_err(store_err)?;
            let path = store.write_emission(&envelope, policy).map_err(store_err)?;
            println!("{}", path.display());
        }
        Command::ScanSignals {
            start,
            end,
            source,
            entity_ref,
        } => {
            let start = parse_required_timestamp(&start)?;
            let end = parse_required_timestamp(&end)?;
            let sources = source.map(|s| vec![s]);
            let filter = es_query::filter::SignalFilter {
                entity_ref: entity_ref.as_ref(),
                sources: sources.as_deref(),
                payload_types: None,
            };
            for record in es_query::filter::collect_signals(&store, start, end, &filter)
                .map_err(store_err)?
            {
                print_json_line(&record)?;
            }
        }
        Command::ScanEmissions {
            start,
            end,
            emission_type,
            entity_ref,
        } => {
            let start = parse_required_timestamp(&start)?;
            let end = parse_required_timestamp(&end)?;
            let emission_types = emission_type.map(|t| vec![t]);
            let filter = es_query::filter::EmissionFilter {
                entity_ref: entity_ref.as_ref(),
                emission_types: emission_types.as_deref(),
            };
            for record in es_query::filter::collect_emissions(&store, start, end, &filter)
                .map_err(store_err)?
            {
                print_json_line(&record)?;
            }
        }
        Command::Checkpoint { name, start, end } => {
            let start = parse_required_timestamp(&start)?;
            let end = parse_required_timestamp(&end)?;
            let processed: Vec<SignalEnvelope> = store
                .scan_signals(start, end)
                .map_err(store_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(store_err)?;
            match EventStore::build_signal_checkpoint(&processed).map_err(store_err)? {
                Some(cp) => {
                    store.write_checkpoint(&name, &cp).map_err(store_err)?;
                    println!("wrote checkpoint {name:?}: last_timestamp={}", cp.last_timestamp);
                }
                None => println!("no signals in range; no checkpoint written"),
            }
        }
        Command::Resume { name, end } => {
            let end = parse_required_timestamp(&end)?;
            let checkpoint = store
                .read_checkpoint(&name)
                .map_err(store_err)?
                .ok_or_else(|| CliError::Store(format!("no checkpoint named {name:?}")))?;
            let start = checkpoint.last_timestamp;
            for record in store
                .iter_signals_from_checkpoint(&checkpoint, start, end)
                .map_err(store_err)?
            {
                print_json_line(&record.map_err(store_err)?)?;
            }
        }
        Command::Snapshot { name, file } => {
            let payload: serde_json::Value = read_json(&file)?;
            let at = chrono::Utc::now();
            store
                .write_snapshot(&name, at, &payload)
                .map_err(store_err)?;
            println!("wrote snapshot {name:?} at {at}");
        }
        Command::RecentByEntity {
            entity_ref,
            end,
            limit,
        } => {
            let end = parse_required_timestamp(&end)?;
            let found = es_query::query::recent_signals_by_entity(&store, &entity_ref, None, end, limit)
                .map_err(store_err)?;
            for record in found {
                print_json_line(&record)?;
            }
        }
        Command::RecentBySource { source, end, limit } => {
            let end = parse_required_timestamp(&end)?;
            let found = es_query::query::recent_signals_by_source(&store, &source, None, end, limit)
                .map_err(store_err)?;
            for record in found {
                print_json_line(&record)?;
            }
        }
        Command::TopCandidates {
            start,
            end,
            limit,
            unique_by_entity,
        } => {
            let start = parse_required_timestamp(&start)?;
            let end = parse_required_timestamp(&end)?;
            let found = es_query::query::top_recommendation_candidates(
                &store,
                start,
                end,
                limit,
                None,
                None,
                None,
                unique_by_entity,
            )
            .map_err(store_err)?;
            for record in found {
                print_json_line(&record)?;
            }
        }
        Command::OutcomeBuckets { now, start, end } => {
            let now = parse_required_timestamp(&now)?;
            let start = parse_required_timestamp(&start)?;
            let end = parse_required_timestamp(&end)?;
            let buckets = es_query::query::outcome_window_buckets(
                &store, now, start, end, None, None, None, None, None,
            )
            .map_err(store_err)?;
            let summary = serde_json::json!({
                "pending": buckets.pending.iter().map(|s| &s.signal_id).collect::<Vec<_>>(),
                "expired": buckets.expired.iter().map(|s| &s.signal_id).collect::<Vec<_>>(),
                "success": buckets.success.iter().map(|e| &e.emission_id).collect::<Vec<_>>(),
                "failure": buckets.failure.iter().map(|e| &e.emission_id).collect::<Vec<_>>(),
            });
            print_json_line(&summary)?;
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| CliError::Io(e.to_string()))?;
        buf
    } else {
        fs::read_to_string(path).map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?
    };
    serde_json::from_str(&contents).map_err(|e| CliError::Io(format!("parsing JSON: {e}")))
}

fn print_json_line<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let bytes = to_canonical_bytes(value).map_err(store_err)?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(&bytes).map_err(|e| CliError::Io(e.to_string()))?;
    handle
        .write_all(b"\n")
        .map_err(|e| CliError::Io(e.to_string()))?;
    Ok(())
}

fn store_err<E: std::fmt::Display>(e: E) -> CliError {
    CliError::Store(e.to_string())
}
