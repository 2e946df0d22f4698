//! BizPulse command-line inspector.
//!
//! ```bash
//! bizpulse ping
//! bizpulse --config bizpulse.toml spaces
//! bizpulse --sqlite /data/bizpulse.db report --space acme
//! ```

use bizpulse_core::{
    init_logging, open_store, AlertService, AppConfig, CrmService, ObjectiveService,
    SpaceService, StorageBackend, Store,
};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "bizpulse")]
#[command(about = "Inspect BizPulse spaces, pipelines and objectives")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database file; overrides the configured storage backend
    #[arg(long)]
    sqlite: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print core linkage and version
    Ping,
    /// List spaces
    Spaces,
    /// Objective, pipeline, client and alert summary for one space
    Report {
        #[arg(long)]
        space: String,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_failed module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(path) = args.sqlite {
        config.storage.backend = StorageBackend::Sqlite;
        config.storage.sqlite_path = Some(path);
    }
    init_logging(&config.logging)?;

    match args.command {
        Command::Ping => {
            println!("bizpulse_core ping={}", bizpulse_core::ping());
            println!("bizpulse_core version={}", bizpulse_core::core_version());
        }
        Command::Spaces => {
            let store = open_store(&config.storage)?;
            for space in SpaceService::new(&*store).list_spaces()? {
                println!("{}\t{}\t{}", space.id, space.label, space.description);
            }
        }
        Command::Report { space } => {
            let store = open_store(&config.storage)?;
            print_report(&*store, &space)?;
        }
    }
    Ok(())
}

fn print_report(store: &dyn Store, space_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let space = SpaceService::new(store).get_space(space_id)?;
    let objectives = ObjectiveService::new(store);
    let crm = CrmService::new(store);
    info!(
        "event=cli_report module=cli status=ok space={} backend={}",
        space.id,
        store.backend_name()
    );

    println!("{} ({})", space.label, space.id);

    let stats = objectives.objective_stats(space_id)?;
    println!(
        "objectives: total={} in_progress={} completed={} overdue={} paused={}",
        stats.total, stats.in_progress, stats.completed, stats.overdue, stats.paused
    );
    for objective in objectives.list_objectives(space_id)? {
        let target = objective
            .target_value
            .map_or_else(|| "-".to_string(), |value| value.to_string());
        println!(
            "  [{}] {} {}/{} {}",
            objective.status.as_str(),
            objective.title,
            objective.current_value,
            target,
            objective.unit.symbol()
        );
    }

    let pipeline = crm.pipeline_stats(space_id)?;
    println!(
        "pipeline: open={} open_value={} proposals={} won={} won_value={} conversion={}%",
        pipeline.open_count,
        pipeline.open_value,
        pipeline.proposals_sent,
        pipeline.won_count,
        pipeline.won_value,
        pipeline.conversion_rate
    );

    let clients = crm.client_stats(space_id)?;
    println!(
        "clients: active={} inactive={} churned={} mrr={} ticket={} nps={}",
        clients.active_count,
        clients.inactive_count,
        clients.churned_count,
        clients.total_mrr,
        clients.average_ticket,
        clients.average_nps
    );

    for alert in AlertService::new(store).space_alerts(space_id)? {
        println!("alert: [{}] {}", alert.kind.as_str(), alert.message());
    }
    Ok(())
}
