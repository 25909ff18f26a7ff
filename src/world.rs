use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    buildings::{level_multiplier, BuildingKind, Footprint},
    grid::{Cell, FootprintConflict, Grid},
    notices::Notice,
    scenario::DisasterSpec,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("not enough money: need ${needed}, have ${available:.0}")]
    InsufficientFunds { needed: u64, available: f64 },
    #[error("space not available at ({}, {})", .cell.row, .cell.col)]
    SpaceOccupied { cell: Cell },
    #[error("({}, {}) lies outside the airfield", .cell.row, .cell.col)]
    OutOfBounds { cell: Cell },
    #[error("the airport is bankrupt")]
    GameOver,
    #[error("unsupported speed multiplier {0}; expected 0, 1, 4 or 10")]
    InvalidSpeed(u32),
}

/// Simulation speed multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SimSpeed {
    Paused,
    Normal,
    Fast,
    Fastest,
}

impl SimSpeed {
    pub fn multiplier(self) -> u32 {
        match self {
            SimSpeed::Paused => 0,
            SimSpeed::Normal => 1,
            SimSpeed::Fast => 4,
            SimSpeed::Fastest => 10,
        }
    }
}

impl TryFrom<u32> for SimSpeed {
    type Error = CommandError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SimSpeed::Paused),
            1 => Ok(SimSpeed::Normal),
            4 => Ok(SimSpeed::Fast),
            10 => Ok(SimSpeed::Fastest),
            other => Err(CommandError::InvalidSpeed(other)),
        }
    }
}

impl From<SimSpeed> for u32 {
    fn from(value: SimSpeed) -> Self {
        value.multiplier()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Running,
    GameOver,
}

/// Day/hour/minute clock fed by scaled seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clock {
    pub elapsed_secs: f64,
    pub day: u32,
    pub hour: u32,
    pub minute: f64,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            elapsed_secs: 0.0,
            day: 1,
            hour: 0,
            minute: 0.0,
        }
    }
}

impl Clock {
    /// Non-finite or negative deltas leave the clock untouched.
    pub fn advance(&mut self, scaled_dt: f64) {
        if !scaled_dt.is_finite() || scaled_dt <= 0.0 {
            return;
        }
        self.elapsed_secs += scaled_dt;
        self.minute += scaled_dt * 60.0;
        if self.minute >= 60.0 {
            let hours = (self.minute / 60.0).floor() as u32;
            self.minute %= 60.0;
            self.day = self.day.saturating_add(hours / 24);
            let hour = self.hour + hours % 24;
            self.day = self.day.saturating_add(hour / 24);
            self.hour = hour % 24;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedBuilding {
    pub id: EntityId,
    pub kind: BuildingKind,
    pub origin: Cell,
    pub footprint: Footprint,
    pub level: u32,
    /// Simulated seconds elapsed when the building was placed.
    pub placed_at_secs: f64,
}

impl PlacedBuilding {
    pub fn income(&self) -> u64 {
        (self.kind.spec().income as f64 * level_multiplier(self.level)).floor() as u64
    }

    pub fn throughput_per_hour(&self) -> f64 {
        self.kind
            .spec()
            .throughput_per_hour
            .map(|base| base * level_multiplier(self.level))
            .unwrap_or(0.0)
    }
}

/// Total income rate and aircraft-per-hour over every building.
pub fn aggregate_income(buildings: &[PlacedBuilding]) -> (u64, f64) {
    buildings.iter().fold((0, 0.0), |(income, throughput), building| {
        (
            income + building.income(),
            throughput + building.throughput_per_hour(),
        )
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightDirection {
    Arriving,
    Departing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aircraft {
    pub position: Point,
    pub target: Point,
    /// Pixels per simulated second.
    pub speed: f64,
    pub direction: FlightDirection,
    pub runway: EntityId,
    pub touchdown: Point,
    pub landed: bool,
    pub landed_for_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterOutcome {
    Paid,
    Bankrupt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveDisaster {
    pub disaster: DisasterSpec,
    pub outcome: DisasterOutcome,
    /// Real seconds until the banner clears.
    pub display_remaining_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockSnapshot {
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub money: f64,
    pub income_rate: u64,
    pub throughput_per_hour: f64,
    pub passengers: u64,
    pub clock: ClockSnapshot,
    pub speed: SimSpeed,
    pub phase: GamePhase,
    pub rows: u32,
    pub cols: u32,
    pub buildings: Vec<PlacedBuilding>,
    pub aircraft: Vec<Aircraft>,
    pub disaster: Option<ActiveDisaster>,
}

#[derive(Debug)]
pub struct World {
    next_entity: u64,
    tick: u64,
    cell_size: f64,
    money: f64,
    income_rate: u64,
    throughput_per_hour: f64,
    speed: SimSpeed,
    phase: GamePhase,
    grid: Grid,
    buildings: Vec<PlacedBuilding>,
    pub(crate) passengers: u64,
    pub(crate) clock: Clock,
    pub(crate) disaster: Option<ActiveDisaster>,
    pub(crate) aircraft: Vec<Aircraft>,
    notices: Vec<Notice>,
}

impl World {
    pub fn new(grid: Grid, cell_size: f64, starting_money: f64, speed: SimSpeed) -> Self {
        Self {
            next_entity: 0,
            tick: 0,
            cell_size,
            money: starting_money,
            income_rate: 0,
            throughput_per_hour: 0.0,
            speed,
            phase: GamePhase::Running,
            grid,
            buildings: Vec::new(),
            passengers: 0,
            clock: Clock::default(),
            disaster: None,
            aircraft: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn place_building(&mut self, kind: BuildingKind, origin: Cell) -> Result<EntityId, CommandError> {
        self.ensure_running()?;
        let spec = kind.spec();
        if self.money < spec.cost as f64 {
            return Err(self.reject(
                CommandError::InsufficientFunds {
                    needed: spec.cost,
                    available: self.money,
                },
                "Not enough money!",
            ));
        }
        if let Err(conflict) = self.grid.check_footprint(origin, spec.footprint) {
            let err = match conflict {
                FootprintConflict::OutOfBounds(cell) => CommandError::OutOfBounds { cell },
                FootprintConflict::Occupied(cell) => CommandError::SpaceOccupied { cell },
            };
            return Err(self.reject(err, "Space not available!"));
        }

        self.grid.fill(origin, spec.footprint, kind);
        self.money -= spec.cost as f64;
        let id = self.allocate();
        self.buildings.push(PlacedBuilding {
            id,
            kind,
            origin,
            footprint: spec.footprint,
            level: 1,
            placed_at_secs: self.clock.elapsed_secs,
        });
        self.recalculate_income();
        info!(
            kind = %kind,
            row = origin.row,
            col = origin.col,
            money = self.money,
            "building.placed"
        );
        self.notify(Notice::normal(format!("Built {}!", spec.name)));
        Ok(id)
    }

    /// Upgrades the building whose origin is exactly `origin`.
    ///
    /// Returns the new level, or `None` when no building starts at that cell.
    /// Other cells of a multi-cell footprint are not upgrade targets.
    pub fn upgrade_building(&mut self, origin: Cell) -> Result<Option<u32>, CommandError> {
        self.ensure_running()?;
        let Some(index) = self.buildings.iter().position(|b| b.origin == origin) else {
            return Ok(None);
        };
        let kind = self.buildings[index].kind;
        let cost = kind.upgrade_cost(self.buildings[index].level);
        if self.money < cost as f64 {
            return Err(self.reject(
                CommandError::InsufficientFunds {
                    needed: cost,
                    available: self.money,
                },
                "Not enough money to upgrade!",
            ));
        }

        self.money -= cost as f64;
        let building = &mut self.buildings[index];
        building.level += 1;
        let level = building.level;
        self.recalculate_income();
        info!(kind = %kind, level, cost, "building.upgraded");
        self.notify(Notice::normal(format!(
            "Upgraded {} to Level {}!",
            kind.spec().name,
            level
        )));
        Ok(Some(level))
    }

    pub fn set_speed(&mut self, speed: SimSpeed) -> Result<(), CommandError> {
        self.ensure_running()?;
        self.speed = speed;
        Ok(())
    }

    pub fn recalculate_income(&mut self) {
        let (income, throughput) = aggregate_income(&self.buildings);
        self.income_rate = income;
        self.throughput_per_hour = throughput;
    }

    /// Charges `disaster` against the treasury, entering game over when it
    /// cannot be paid. The banner stays up for `banner_secs` of real time.
    pub fn resolve_disaster(&mut self, disaster: DisasterSpec, banner_secs: f64) -> DisasterOutcome {
        let outcome = if self.money >= disaster.cost as f64 {
            self.money -= disaster.cost as f64;
            info!(disaster = %disaster.name, cost = disaster.cost, money = self.money, "disaster.paid");
            self.notify(Notice::normal(format!(
                "{}: Paid ${} to resolve!",
                disaster.name, disaster.cost
            )));
            DisasterOutcome::Paid
        } else {
            self.notify(Notice::error(format!(
                "{}: Not enough money! GAME OVER!",
                disaster.name
            )));
            self.enter_game_over();
            DisasterOutcome::Bankrupt
        };
        self.disaster = Some(ActiveDisaster {
            disaster,
            outcome,
            display_remaining_secs: banner_secs,
        });
        outcome
    }

    pub(crate) fn accrue(&mut self, amount: f64) {
        self.money += amount;
    }

    pub(crate) fn advance_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn enter_game_over(&mut self) {
        self.phase = GamePhase::GameOver;
        self.speed = SimSpeed::Paused;
        info!(money = self.money, tick = self.tick, "game.bankrupt");
        self.notify(Notice::error(
            "BANKRUPTCY! Game Over! Your airport is closed.",
        ));
    }

    fn ensure_running(&self) -> Result<(), CommandError> {
        match self.phase {
            GamePhase::Running => Ok(()),
            GamePhase::GameOver => Err(CommandError::GameOver),
        }
    }

    fn reject(&mut self, err: CommandError, message: &str) -> CommandError {
        warn!(error = %err, "command.rejected");
        self.notify(Notice::error(message));
        err
    }

    pub(crate) fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn pending_notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn money(&self) -> f64 {
        self.money
    }

    pub fn income_rate(&self) -> u64 {
        self.income_rate
    }

    pub fn throughput_per_hour(&self) -> f64 {
        self.throughput_per_hour
    }

    pub fn passengers(&self) -> u64 {
        self.passengers
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn speed(&self) -> SimSpeed {
        self.speed
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<BuildingKind> {
        self.grid.get(Cell::new(row, col))
    }

    pub fn buildings(&self) -> &[PlacedBuilding] {
        &self.buildings
    }

    pub fn building(&self, id: EntityId) -> Option<&PlacedBuilding> {
        self.buildings.iter().find(|b| b.id == id)
    }

    pub fn buildings_of(&self, kind: BuildingKind) -> impl Iterator<Item = &PlacedBuilding> {
        self.buildings.iter().filter(move |b| b.kind == kind)
    }

    pub fn has_building(&self, kind: BuildingKind) -> bool {
        self.buildings_of(kind).next().is_some()
    }

    pub fn aircraft(&self) -> &[Aircraft] {
        &self.aircraft
    }

    pub fn active_disaster(&self) -> Option<&ActiveDisaster> {
        self.disaster.as_ref()
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            money: self.money,
            income_rate: self.income_rate,
            throughput_per_hour: self.throughput_per_hour,
            passengers: self.passengers,
            clock: ClockSnapshot {
                day: self.clock.day,
                hour: self.clock.hour,
                minute: self.clock.minute.floor() as u32,
            },
            speed: self.speed,
            phase: self.phase,
            rows: self.grid.rows(),
            cols: self.grid.cols(),
            buildings: self.buildings.clone(),
            aircraft: self.aircraft.clone(),
            disaster: self.disaster.clone(),
        }
    }

    fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with(money: f64) -> World {
        World::new(Grid::new(12, 20), 40.0, money, SimSpeed::Normal)
    }

    #[test]
    fn terminal_placement_charges_and_tags_footprint() {
        let mut world = world_with(5_000.0);
        world
            .place_building(BuildingKind::Terminal, Cell::new(0, 0))
            .unwrap();

        assert_eq!(world.money(), 4_000.0);
        assert_eq!(world.buildings().len(), 1);
        for row in 0..3 {
            for col in 0..3 {
                assert_eq!(world.cell(row, col), Some(BuildingKind::Terminal));
            }
        }
        assert_eq!(world.cell(3, 0), None);
        assert_eq!(world.cell(0, 3), None);
        assert_eq!(world.grid().occupied_cells(), 9);
        assert_eq!(world.income_rate(), 50);
        assert_eq!(world.drain_notices()[0].message, "Built Terminal!");
    }

    #[test]
    fn overlapping_runway_is_rejected_without_mutation() {
        let mut world = world_with(5_000.0);
        world
            .place_building(BuildingKind::Terminal, Cell::new(0, 0))
            .unwrap();
        world.drain_notices();

        let err = world
            .place_building(BuildingKind::Runway, Cell::new(1, 1))
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::SpaceOccupied {
                cell: Cell::new(1, 1)
            }
        );
        assert_eq!(world.money(), 4_000.0);
        assert_eq!(world.buildings().len(), 1);
        assert_eq!(world.grid().occupied_cells(), 9);
        assert_eq!(world.cell(2, 5), None);

        let notices = world.drain_notices();
        assert!(notices[0].is_error());
        assert_eq!(notices[0].message, "Space not available!");
    }

    #[test]
    fn placement_past_the_edge_is_out_of_bounds() {
        let mut world = world_with(5_000.0);
        let err = world
            .place_building(BuildingKind::Runway, Cell::new(11, 0))
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::OutOfBounds {
                cell: Cell::new(12, 0)
            }
        );
        assert_eq!(world.money(), 5_000.0);
        assert_eq!(world.grid().occupied_cells(), 0);
    }

    #[test]
    fn funds_are_checked_before_space() {
        let mut world = world_with(500.0);
        world.grid.fill(
            Cell::new(0, 0),
            Footprint::square(1),
            BuildingKind::Cargo,
        );
        let err = world
            .place_building(BuildingKind::Restaurant, Cell::new(0, 0))
            .unwrap_err();
        assert!(matches!(err, CommandError::InsufficientFunds { needed: 800, .. }));
        assert_eq!(world.pending_notices()[0].message, "Not enough money!");
    }

    #[test]
    fn upgrade_charges_half_cost_per_level() {
        let mut world = world_with(5_000.0);
        world
            .place_building(BuildingKind::Terminal, Cell::new(0, 0))
            .unwrap();

        assert_eq!(world.upgrade_building(Cell::new(0, 0)), Ok(Some(2)));
        assert_eq!(world.money(), 3_500.0);
        assert_eq!(world.buildings()[0].level, 2);
        assert_eq!(world.income_rate(), (50.0 * 1.3_f64).floor() as u64);

        assert_eq!(world.upgrade_building(Cell::new(0, 0)), Ok(Some(3)));
        assert_eq!(world.money(), 2_500.0);
    }

    #[test]
    fn upgrade_ignores_non_origin_cells() {
        let mut world = world_with(5_000.0);
        world
            .place_building(BuildingKind::Terminal, Cell::new(0, 0))
            .unwrap();
        world.drain_notices();

        assert_eq!(world.upgrade_building(Cell::new(1, 1)), Ok(None));
        assert_eq!(world.upgrade_building(Cell::new(9, 9)), Ok(None));
        assert_eq!(world.money(), 4_000.0);
        assert_eq!(world.buildings()[0].level, 1);
        assert!(world.pending_notices().is_empty());
    }

    #[test]
    fn upgrade_without_funds_keeps_level() {
        let mut world = world_with(3_000.0);
        world
            .place_building(BuildingKind::Hangar, Cell::new(0, 0))
            .unwrap();
        let err = world.upgrade_building(Cell::new(0, 0)).unwrap_err();
        assert_eq!(
            err,
            CommandError::InsufficientFunds {
                needed: 1_500,
                available: 0.0
            }
        );
        assert_eq!(world.buildings()[0].level, 1);
    }

    #[test]
    fn aggregates_are_idempotent() {
        let mut world = world_with(20_000.0);
        world
            .place_building(BuildingKind::Runway, Cell::new(0, 0))
            .unwrap();
        world
            .place_building(BuildingKind::FuelStation, Cell::new(3, 0))
            .unwrap();
        world.upgrade_building(Cell::new(0, 0)).unwrap();
        world.upgrade_building(Cell::new(0, 0)).unwrap();

        let expected_income = (100.0 * level_multiplier(3)).floor() as u64 + 40;
        let expected_throughput = 120.0 * level_multiplier(3) + 60.0;
        assert_eq!(world.income_rate(), expected_income);
        assert!((world.throughput_per_hour() - expected_throughput).abs() < 1e-9);

        world.recalculate_income();
        world.recalculate_income();
        assert_eq!(world.income_rate(), expected_income);
        assert!((world.throughput_per_hour() - expected_throughput).abs() < 1e-9);
    }

    #[test]
    fn affordable_disaster_is_paid() {
        let mut world = world_with(3_500.0);
        let outcome = world.resolve_disaster(DisasterSpec::new("Storm", "Wind", 1_500), 3.0);
        assert_eq!(outcome, DisasterOutcome::Paid);
        assert_eq!(world.money(), 2_000.0);
        assert_eq!(world.phase(), GamePhase::Running);
        assert_eq!(world.speed(), SimSpeed::Normal);
        let active = world.active_disaster().unwrap();
        assert_eq!(active.display_remaining_secs, 3.0);
    }

    #[test]
    fn unaffordable_disaster_bankrupts_without_charging() {
        let mut world = world_with(3_500.0);
        let outcome = world.resolve_disaster(
            DisasterSpec::new("Runway Damage", "Cracks", 4_000),
            3.0,
        );
        assert_eq!(outcome, DisasterOutcome::Bankrupt);
        assert_eq!(world.money(), 3_500.0);
        assert!(world.is_game_over());
        assert_eq!(world.speed(), SimSpeed::Paused);

        let notices = world.drain_notices();
        assert!(notices.iter().all(Notice::is_error));
        assert!(notices
            .iter()
            .any(|n| n.message.starts_with("BANKRUPTCY!")));

        assert_eq!(world.set_speed(SimSpeed::Fastest), Err(CommandError::GameOver));
        assert_eq!(
            world.place_building(BuildingKind::Restaurant, Cell::new(5, 5)),
            Err(CommandError::GameOver)
        );
    }

    #[test]
    fn clock_rolls_minutes_into_hours_and_days() {
        let mut clock = Clock::default();
        clock.advance(0.5);
        assert_eq!((clock.day, clock.hour), (1, 0));
        assert!((clock.minute - 30.0).abs() < 1e-9);

        clock.advance(1.0);
        assert_eq!((clock.day, clock.hour), (1, 1));
        assert!((clock.minute - 30.0).abs() < 1e-9);

        clock.advance(23.0);
        assert_eq!((clock.day, clock.hour), (2, 0));
        assert!((clock.elapsed_secs - 24.5).abs() < 1e-9);
    }

    #[test]
    fn clock_survives_extreme_deltas() {
        let mut clock = Clock::default();
        clock.advance(f64::INFINITY);
        clock.advance(f64::NAN);
        clock.advance(-5.0);
        assert_eq!(clock, Clock::default());

        clock.advance(f64::MAX / 120.0);
        assert!(clock.hour < 24);
        assert!((0.0..60.0).contains(&clock.minute));
        assert!(clock.day > 1);
        let (day, hour) = (clock.day, clock.hour);
        clock.advance(3_600.0);
        assert_eq!((clock.day, clock.hour), (day + 150, hour));
    }

    #[test]
    fn speed_accepts_only_known_multipliers() {
        assert_eq!(SimSpeed::try_from(4), Ok(SimSpeed::Fast));
        assert_eq!(SimSpeed::try_from(2), Err(CommandError::InvalidSpeed(2)));
        assert_eq!(u32::from(SimSpeed::Fastest), 10);
    }
}
