//! `lims-lineage`: reconstruct a sample's processing history from a
//! JSON lab snapshot.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use lims_history::{History, LocalProcessIndex, SampleHistory};
use lims_model::{EntityKind, LimsId};
use lims_session::{LabSnapshot, Session, SessionConfig, SnapshotService};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Alternate,
    Sorted,
}

fn walk_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("snapshot")
                .long("snapshot")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("JSON lab snapshot to read"),
        )
        .arg(
            Arg::new("sample")
                .long("sample")
                .required(true)
                .help("Sample name"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .required(true)
                .value_parser(value_parser!(LimsId))
                .help("Target artifact id"),
        )
        .arg(
            Arg::new("input")
                .long("input")
                .value_parser(value_parser!(LimsId))
                .help("Start the walk from this input artifact"),
        )
        .arg(
            Arg::new("local-index")
                .long("local-index")
                .action(ArgAction::SetTrue)
                .help("Answer consumer lookups from an index of every snapshot process"),
        )
}

fn cli() -> Command {
    Command::new("lims-lineage")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Reconstruct sample histories from a LIMS lab snapshot")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Session configuration (TOML)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print the history as JSON"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(walk_args(
            Command::new("alternate").about("Follow parent processes through the sample's analytes"),
        ))
        .subcommand(walk_args(
            Command::new("sorted").about("Walk a precomputed sample artifact map"),
        ))
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lims_history=info,lims_session=warn".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(SessionConfig::default()),
    }
}

fn load_snapshot(path: &Path) -> Result<LabSnapshot> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    LabSnapshot::from_json_str(&source).with_context(|| format!("parsing snapshot {}", path.display()))
}

fn reconstruct(walk: Walk, args: &ArgMatches, config: SessionConfig) -> Result<(String, History)> {
    let snapshot_path = args
        .get_one::<PathBuf>("snapshot")
        .context("--snapshot is required")?;
    let sample = args.get_one::<String>("sample").context("--sample is required")?;
    let output = args.get_one::<LimsId>("output").context("--output is required")?;
    let input = args.get_one::<LimsId>("input");

    let snapshot = load_snapshot(snapshot_path)?;
    let process_ids: Vec<LimsId> = snapshot.processes.iter().map(|p| p.id.clone()).collect();
    let session = Session::new(Arc::new(SnapshotService::from(snapshot)), config);
    tracing::debug!(target_uri = %session.uri_for(EntityKind::Artifact, output), "reconstructing");

    let index = if args.get_flag("local-index") {
        let processes: Vec<_> = process_ids.iter().map(|id| session.process(id)).collect();
        Some(LocalProcessIndex::from_processes(&session, &processes)?)
    } else {
        None
    };

    let mut builder = SampleHistory::builder(sample.as_str()).session(&session);
    if let Some(index) = &index {
        builder = builder.process_index(index);
    }
    let reconstructor = builder.build()?;

    let history = match walk {
        Walk::Alternate => reconstructor.reconstruct(output, input)?,
        Walk::Sorted => {
            let map = reconstructor.artifact_map()?;
            reconstructor.reconstruct_sorted(&map, output, input)?
        }
    };
    tracing::debug!(cache = ?session.cache_stats(), "session cache after walk");
    Ok((sample.clone(), history))
}

fn run(matches: &ArgMatches) -> Result<()> {
    let (walk, args) = match matches.subcommand() {
        Some(("alternate", args)) => (Walk::Alternate, args),
        Some(("sorted", args)) => (Walk::Sorted, args),
        _ => anyhow::bail!("unknown subcommand"),
    };
    let config = load_config(args.get_one::<PathBuf>("config"))?;
    let (sample, history) = reconstruct(walk, args, config)?;

    history.log_summary(&sample);
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&history)?);
    } else {
        print!("{history}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "reconstruction failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
