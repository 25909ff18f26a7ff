use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    buildings::BuildingKind,
    grid::{Cell, Grid},
    world::{SimSpeed, World},
};

fn default_frame_secs() -> f64 {
    1.0 / 60.0
}

fn default_starting_money() -> f64 {
    5_000.0
}

fn default_initial_speed() -> SimSpeed {
    SimSpeed::Fast
}

/// Inclusive-exclusive sampling interval, `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span<T> {
    pub min: T,
    pub max: T,
}

impl<T> Span<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl Span<f64> {
    /// Uniform draw; a degenerate span always yields `min`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.max > self.min {
            rng.gen_range(self.min..self.max)
        } else {
            self.min
        }
    }
}

impl Span<u32> {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        if self.max > self.min {
            rng.gen_range(self.min..self.max)
        } else {
            self.min
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "GridConfig::default_rows")]
    pub rows: u32,
    #[serde(default = "GridConfig::default_cols")]
    pub cols: u32,
    /// Pixels per cell, used for aircraft geometry.
    #[serde(default = "GridConfig::default_cell_size")]
    pub cell_size: f64,
}

impl GridConfig {
    fn default_rows() -> u32 {
        18
    }

    fn default_cols() -> u32 {
        32
    }

    fn default_cell_size() -> f64 {
        40.0
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: Self::default_rows(),
            cols: Self::default_cols(),
            cell_size: Self::default_cell_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterSpec {
    pub name: String,
    pub description: String,
    pub cost: u64,
}

impl DisasterSpec {
    pub fn new(name: &str, description: &str, cost: u64) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            cost,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisasterConfig {
    /// Simulated seconds between resolutions.
    #[serde(default = "DisasterConfig::default_threshold")]
    pub threshold_secs: Span<f64>,
    /// Real seconds the active disaster stays on screen.
    #[serde(default = "DisasterConfig::default_banner_secs")]
    pub banner_secs: f64,
    #[serde(default = "DisasterConfig::default_catalog")]
    pub catalog: Vec<DisasterSpec>,
}

impl DisasterConfig {
    fn default_threshold() -> Span<f64> {
        Span::new(120.0, 600.0)
    }

    fn default_banner_secs() -> f64 {
        3.0
    }

    fn default_catalog() -> Vec<DisasterSpec> {
        vec![
            DisasterSpec::new(
                "Lightning Strike",
                "A lightning strike damaged a building!",
                2000,
            ),
            DisasterSpec::new(
                "Storm Incoming",
                "Heavy storms force runway closures!",
                1500,
            ),
            DisasterSpec::new(
                "Equipment Failure",
                "Critical equipment malfunction!",
                3000,
            ),
            DisasterSpec::new("Staff Strike", "Workers demand better conditions!", 2500),
            DisasterSpec::new("Runway Damage", "Runway cracked and needs repairs!", 4000),
            DisasterSpec::new(
                "Security Breach",
                "Security system upgrade required!",
                1800,
            ),
        ]
    }
}

impl Default for DisasterConfig {
    fn default() -> Self {
        Self {
            threshold_secs: Self::default_threshold(),
            banner_secs: Self::default_banner_secs(),
            catalog: Self::default_catalog(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircraftConfig {
    /// Ground speed in pixels per simulated second.
    #[serde(default = "AircraftConfig::default_speed")]
    pub speed: Span<f64>,
    #[serde(default = "AircraftConfig::default_passengers")]
    pub passengers: Span<u32>,
    /// Real seconds a landed aircraft waits before leaving.
    #[serde(default = "AircraftConfig::default_dwell_secs")]
    pub dwell_secs: f64,
    #[serde(default = "AircraftConfig::default_arrival_radius")]
    pub arrival_radius: f64,
    #[serde(default = "AircraftConfig::default_offscreen_margin")]
    pub offscreen_margin: f64,
}

impl AircraftConfig {
    fn default_speed() -> Span<f64> {
        Span::new(150.0, 200.0)
    }

    fn default_passengers() -> Span<u32> {
        Span::new(50, 150)
    }

    fn default_dwell_secs() -> f64 {
        2.0
    }

    fn default_arrival_radius() -> f64 {
        10.0
    }

    fn default_offscreen_margin() -> f64 {
        80.0
    }
}

impl Default for AircraftConfig {
    fn default() -> Self {
        Self {
            speed: Self::default_speed(),
            passengers: Self::default_passengers(),
            dwell_secs: Self::default_dwell_secs(),
            arrival_radius: Self::default_arrival_radius(),
            offscreen_margin: Self::default_offscreen_margin(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningBuild {
    pub kind: BuildingKind,
    pub row: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub ticks: Option<u64>,
    /// Wall-clock seconds per headless frame.
    #[serde(default = "default_frame_secs")]
    pub frame_secs: f64,
    #[serde(default)]
    pub snapshot_interval_ticks: u64,
    #[serde(default = "default_starting_money")]
    pub starting_money: f64,
    #[serde(default = "default_initial_speed")]
    pub initial_speed: SimSpeed,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub disasters: DisasterConfig,
    #[serde(default)]
    pub aircraft: AircraftConfig,
    #[serde(default)]
    pub opening: Vec<OpeningBuild>,
}

impl Scenario {
    /// Scenario with every tunable at its default.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            seed: 0,
            ticks: None,
            frame_secs: default_frame_secs(),
            snapshot_interval_ticks: 0,
            starting_money: default_starting_money(),
            initial_speed: default_initial_speed(),
            grid: GridConfig::default(),
            disasters: DisasterConfig::default(),
            aircraft: AircraftConfig::default(),
            opening: Vec::new(),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(text).context("invalid scenario yaml")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("scenario must define a name");
        }
        if self.grid.rows == 0 || self.grid.cols == 0 {
            bail!(
                "grid must have at least one cell, got {}x{}",
                self.grid.rows,
                self.grid.cols
            );
        }
        ensure_positive("grid cell_size", self.grid.cell_size)?;
        validate_frame_secs(self.frame_secs)?;
        ensure_non_negative("starting_money", self.starting_money)?;

        let disasters = &self.disasters;
        if disasters.catalog.is_empty() {
            bail!("disaster catalog must contain at least one entry");
        }
        ensure_span("disaster threshold_secs", disasters.threshold_secs)?;
        ensure_non_negative("disaster banner_secs", disasters.banner_secs)?;

        let aircraft = &self.aircraft;
        ensure_span("aircraft speed", aircraft.speed)?;
        if aircraft.speed.min <= 0.0 {
            bail!("aircraft speed must be positive, got min {}", aircraft.speed.min);
        }
        if aircraft.passengers.max < aircraft.passengers.min {
            bail!("aircraft passenger range must be ordered");
        }
        ensure_non_negative("aircraft dwell_secs", aircraft.dwell_secs)?;
        ensure_positive("aircraft arrival_radius", aircraft.arrival_radius)?;
        ensure_non_negative("aircraft offscreen_margin", aircraft.offscreen_margin)?;
        Ok(())
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(3_600)
    }

    /// Fresh world with the opening buildings placed and paid for.
    pub fn build_world(&self) -> Result<World> {
        let grid = Grid::new(self.grid.rows, self.grid.cols);
        let mut world = World::new(
            grid,
            self.grid.cell_size,
            self.starting_money,
            self.initial_speed,
        );
        for build in &self.opening {
            world
                .place_building(build.kind, Cell::new(build.row, build.col))
                .with_context(|| {
                    format!(
                        "opening {} at ({}, {}) in scenario '{}'",
                        build.kind, build.row, build.col, self.name
                    )
                })?;
        }
        world.drain_notices();
        Ok(world)
    }
}

/// Shortest frame the realtime loop accepts.
pub const MIN_FRAME_SECS: f64 = 0.001;

/// Checks a frame length, including ones overridden on the command line.
pub fn validate_frame_secs(frame_secs: f64) -> Result<()> {
    if !frame_secs.is_finite() || frame_secs < MIN_FRAME_SECS {
        bail!("frame_secs must be finite and at least {MIN_FRAME_SECS}, got {frame_secs}");
    }
    Ok(())
}

fn ensure_non_negative(label: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        bail!("{label} must be finite and non-negative, got {value}");
    }
    Ok(())
}

fn ensure_positive(label: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        bail!("{label} must be finite and positive, got {value}");
    }
    Ok(())
}

fn ensure_span(label: &str, span: Span<f64>) -> Result<()> {
    ensure_non_negative(label, span.min)?;
    ensure_non_negative(label, span.max)?;
    if span.max < span.min {
        bail!("{label} range [{}, {}) is inverted", span.min, span.max);
    }
    Ok(())
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario = Scenario::from_yaml(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!(scenario = %scenario.name, path = %path.display(), "scenario.loaded");
        Ok(scenario)
    }
}
