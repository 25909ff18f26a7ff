use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use airport_tycoon::{
    engine::{EngineBuilder, EngineSettings},
    scenario::{validate_frame_secs, Scenario, ScenarioLoader},
    web::{self, WebServerConfig},
    world::SimSpeed,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Airport tycoon simulation")]
struct Cli {
    #[command(subcommand)]
    command: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Run the simulation headless with a fixed frame length
    Run(RunArgs),
    /// Serve the simulation over HTTP for a browser front end
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/regional_airport.yaml")]
    scenario: PathBuf,

    /// Override tick count (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the real seconds per frame
    #[arg(long)]
    frame_secs: Option<f64>,

    /// Override the starting speed multiplier (0, 1, 4 or 10)
    #[arg(long)]
    speed: Option<u32>,

    /// Override snapshot interval in ticks
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/regional_airport.yaml")]
    scenario: PathBuf,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    match cli.command {
        Mode::Run(args) => {
            let scenario = loader.load(&args.scenario)?;
            run_headless(scenario, args)
        }
        Mode::Serve(args) => {
            let scenario = loader.load(&args.scenario)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(web::run(WebServerConfig {
                scenario,
                host: args.host,
                port: args.port,
            }))
        }
    }
}

fn run_headless(mut scenario: Scenario, args: RunArgs) -> Result<()> {
    if let Some(speed) = args.speed {
        scenario.initial_speed = SimSpeed::try_from(speed)?;
    }
    let ticks = scenario.ticks(args.ticks);
    let frame_secs = args.frame_secs.unwrap_or(scenario.frame_secs);
    validate_frame_secs(frame_secs)?;
    let mut world = scenario.build_world()?;

    let mut settings = EngineSettings::from_scenario(&scenario);
    if let Some(interval) = args.snapshot_interval {
        settings.snapshot_interval_ticks = interval;
    }
    if let Some(dir) = args.snapshot_dir {
        settings.snapshot_dir = dir;
    }

    let mut engine = EngineBuilder::new(settings)
        .with_standard_systems(&scenario)
        .build();

    let mut landings = 0usize;
    engine.run_with_hook(&mut world, ticks, frame_secs, |summary| {
        landings += summary
            .notices
            .iter()
            .filter(|notice| notice.message.starts_with("Plane landed"))
            .count();
    })?;
    info!(
        scenario = %scenario.name,
        ticks,
        money = world.money(),
        passengers = world.passengers(),
        "run.completed"
    );

    let clock = world.clock();
    println!(
        "Scenario '{}' ran {} ticks to day {} {:02}:{:02}. Money: ${:.0}, income: ${}/10s, \
         buildings: {}, landings: {}, passengers: {}, phase: {:?}",
        scenario.name,
        ticks,
        clock.day,
        clock.hour,
        clock.minute.floor() as u32,
        world.money(),
        world.income_rate(),
        world.buildings().len(),
        landings,
        world.passengers(),
        world.phase()
    );
    Ok(())
}
