use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::{
    notices::Notice,
    rng::{RngManager, SystemRng},
    scenario::Scenario,
    snapshot::SnapshotWriter,
    systems::{ClockSystem, DisasterSystem, EconomySystem, FlightSystem, TrafficSystem},
    world::{World, WorldSnapshot},
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub snapshot_interval_ticks: u64,
    pub snapshot_dir: PathBuf,
}

impl EngineSettings {
    pub fn from_scenario(scenario: &Scenario) -> Self {
        Self {
            scenario_name: scenario.name.clone(),
            seed: scenario.seed,
            snapshot_interval_ticks: scenario.snapshot_interval_ticks,
            snapshot_dir: PathBuf::from("snapshots"),
        }
    }
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    /// Registers the per-tick pipeline in its fixed order: time, disasters,
    /// spawning, then aircraft movement.
    pub fn with_standard_systems(self, scenario: &Scenario) -> Self {
        self.with_system(EconomySystem::new())
            .with_system(ClockSystem::new())
            .with_system(DisasterSystem::new(scenario.disasters.clone()))
            .with_system(TrafficSystem::new(scenario.aircraft.clone()))
            .with_system(FlightSystem::new(scenario.aircraft.clone()))
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_ticks,
            ),
            settings: self.settings,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TickSummary {
    pub tick: u64,
    pub snapshot: WorldSnapshot,
    pub notices: Vec<Notice>,
    pub snapshot_path: Option<PathBuf>,
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
}

impl Engine {
    /// Advances the world by one frame of `wall_dt` real seconds.
    pub fn tick(&mut self, world: &mut World, wall_dt: f64) -> Result<TickSummary> {
        let wall_dt = wall_dt.max(0.0);
        let tick = world.advance_tick();
        let scaled_dt = wall_dt * world.speed().multiplier() as f64;
        for system in &mut self.systems {
            if world.is_game_over() && !system.runs_after_game_over() {
                continue;
            }
            let mut rng_stream = self.rng.stream(system.name());
            let ctx = SystemContext {
                tick,
                wall_dt,
                scaled_dt,
                scenario_name: &self.settings.scenario_name,
            };
            system
                .run(&ctx, world, &mut rng_stream)
                .with_context(|| format!("system '{}' failed on tick {tick}", system.name()))?;
        }
        let snapshot_path = self
            .snapshot_writer
            .maybe_write(world, &self.settings.scenario_name)?;
        Ok(TickSummary {
            tick,
            snapshot: world.snapshot(),
            notices: world.drain_notices(),
            snapshot_path,
        })
    }

    pub fn run(&mut self, world: &mut World, ticks: u64, wall_dt: f64) -> Result<()> {
        self.run_with_hook(world, ticks, wall_dt, |_| {})
    }

    pub fn run_with_hook<F>(
        &mut self,
        world: &mut World,
        ticks: u64,
        wall_dt: f64,
        mut hook: F,
    ) -> Result<()>
    where
        F: FnMut(TickSummary),
    {
        for _ in 0..ticks {
            let summary = self.tick(world, wall_dt)?;
            hook(summary);
        }
        Ok(())
    }

    pub fn scenario_name(&self) -> &str {
        &self.settings.scenario_name
    }
}

pub struct SystemContext<'a> {
    pub tick: u64,
    /// Real seconds since the previous tick.
    pub wall_dt: f64,
    /// `wall_dt` multiplied by the speed in effect at the start of the tick.
    pub scaled_dt: f64,
    pub scenario_name: &'a str,
}

pub trait System: Send {
    fn name(&self) -> &str;

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;

    /// Whether the system keeps running once the airport is bankrupt.
    fn runs_after_game_over(&self) -> bool {
        false
    }
}
