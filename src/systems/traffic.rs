use anyhow::Result;
use rand::Rng;
use tracing::debug;

use crate::{
    buildings::BuildingKind,
    engine::{System, SystemContext},
    rng::SystemRng,
    scenario::{AircraftConfig, Span},
    world::{Aircraft, FlightDirection, PlacedBuilding, Point, World},
};

const SECS_PER_HOUR: f64 = 3_600.0;

/// Converts throughput into aircraft, carrying the fractional remainder
/// between ticks.
pub struct TrafficSystem {
    config: AircraftConfig,
    pending: f64,
}

impl TrafficSystem {
    pub fn new(config: AircraftConfig) -> Self {
        Self {
            config,
            pending: 0.0,
        }
    }

    /// Fraction of the next aircraft accumulated so far.
    pub fn pending(&self) -> f64 {
        self.pending
    }

    fn spawn<R: Rng + ?Sized>(&self, world: &World, runways: &[&PlacedBuilding], rng: &mut R) -> Aircraft {
        let runway = runways[rng.gen_range(0..runways.len())];
        let cell = world.cell_size();
        let margin = self.config.offscreen_margin;
        let start_x = runway.origin.col as f64 * cell;
        let end_x = (runway.origin.col + runway.footprint.width) as f64 * cell;
        let center_y = (runway.origin.row as f64 + runway.footprint.height as f64 / 2.0) * cell;
        let touchdown = Point::new(Span::new(start_x, end_x).sample(rng), center_y);
        let direction = if rng.gen_bool(0.5) {
            FlightDirection::Arriving
        } else {
            FlightDirection::Departing
        };
        let (position, target) = match direction {
            FlightDirection::Arriving => (Point::new(-margin, center_y - margin), touchdown),
            FlightDirection::Departing => {
                let exit_x = world.grid().cols() as f64 * cell + margin;
                (touchdown, Point::new(exit_x, center_y - margin))
            }
        };
        Aircraft {
            position,
            target,
            speed: self.config.speed.sample(rng),
            direction,
            runway: runway.id,
            touchdown,
            landed: false,
            landed_for_secs: 0.0,
        }
    }
}

impl System for TrafficSystem {
    fn name(&self) -> &str {
        "traffic"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let runways: Vec<&PlacedBuilding> = world.buildings_of(BuildingKind::Runway).collect();
        if runways.is_empty() {
            return Ok(());
        }

        self.pending += ctx.scaled_dt * world.throughput_per_hour() / SECS_PER_HOUR;
        let mut spawned = Vec::new();
        while self.pending >= 1.0 {
            spawned.push(self.spawn(world, &runways, rng));
            self.pending -= 1.0;
        }
        for aircraft in &spawned {
            debug!(
                direction = ?aircraft.direction,
                runway = aircraft.runway.raw(),
                speed = aircraft.speed,
                "aircraft.spawned"
            );
        }
        world.aircraft.extend(spawned);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grid::Cell, rng::RngManager, scenario::Scenario};

    fn ctx(scaled_dt: f64) -> SystemContext<'static> {
        SystemContext {
            tick: 0,
            wall_dt: scaled_dt,
            scaled_dt,
            scenario_name: "traffic",
        }
    }

    fn airfield(kinds: &[(BuildingKind, u32, u32)]) -> World {
        let mut scenario = Scenario::named("traffic");
        scenario.starting_money = 50_000.0;
        let mut world = scenario.build_world().unwrap();
        for (kind, row, col) in kinds {
            world.place_building(*kind, Cell::new(*row, *col)).unwrap();
        }
        world
    }

    #[test]
    fn no_runway_means_no_traffic() {
        let mut world = airfield(&[(BuildingKind::FuelStation, 0, 0)]);
        let mut system = TrafficSystem::new(AircraftConfig::default());
        let mut rngs = RngManager::new(5);
        system
            .run(&ctx(3_600.0), &mut world, &mut rngs.stream("traffic"))
            .unwrap();
        assert!(world.aircraft().is_empty());
        assert_eq!(system.pending(), 0.0);
    }

    #[test]
    fn long_tick_spawns_several_aircraft() {
        let mut world = airfield(&[(BuildingKind::Runway, 2, 2)]);
        let mut system = TrafficSystem::new(AircraftConfig::default());
        let mut rngs = RngManager::new(5);
        // 120 aircraft per hour over 100 seconds.
        system
            .run(&ctx(100.0), &mut world, &mut rngs.stream("traffic"))
            .unwrap();
        assert_eq!(world.aircraft().len(), 3);
        assert!((system.pending() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn spawn_count_tracks_rate_without_drift() {
        let mut world = airfield(&[
            (BuildingKind::Runway, 0, 0),
            (BuildingKind::FuelStation, 4, 0),
        ]);
        let rate = world.throughput_per_hour();
        assert_eq!(rate, 180.0);
        let mut system = TrafficSystem::new(AircraftConfig::default());
        let mut rngs = RngManager::new(5);
        let dt = 0.37;
        let ticks = 5_000;
        for _ in 0..ticks {
            system
                .run(&ctx(dt), &mut world, &mut rngs.stream("traffic"))
                .unwrap();
        }
        let expected = (ticks as f64 * dt * rate / SECS_PER_HOUR).floor() as i64;
        let spawned = world.aircraft().len() as i64;
        assert!((spawned - expected).abs() <= 1, "{spawned} vs {expected}");
    }

    #[test]
    fn aircraft_are_anchored_to_a_runway() {
        let mut world = airfield(&[(BuildingKind::Runway, 2, 4), (BuildingKind::Runway, 8, 10)]);
        let mut system = TrafficSystem::new(AircraftConfig::default());
        let mut rngs = RngManager::new(9);
        system
            .run(&ctx(600.0), &mut world, &mut rngs.stream("traffic"))
            .unwrap();
        assert_eq!(world.aircraft().len(), 40);

        let cell = world.cell_size();
        let exit_x = world.grid().cols() as f64 * cell + 80.0;
        for aircraft in world.aircraft() {
            let runway = world.building(aircraft.runway).unwrap();
            assert_eq!(runway.kind, BuildingKind::Runway);
            let center_y = (runway.origin.row as f64 + 1.0) * cell;
            let start_x = runway.origin.col as f64 * cell;
            assert_eq!(aircraft.touchdown.y, center_y);
            assert!(aircraft.touchdown.x >= start_x && aircraft.touchdown.x < start_x + 5.0 * cell);
            assert!((150.0..200.0).contains(&aircraft.speed));
            assert!(!aircraft.landed);
            match aircraft.direction {
                FlightDirection::Arriving => {
                    assert_eq!(aircraft.position, Point::new(-80.0, center_y - 80.0));
                    assert_eq!(aircraft.target, aircraft.touchdown);
                }
                FlightDirection::Departing => {
                    assert_eq!(aircraft.position, aircraft.touchdown);
                    assert_eq!(aircraft.target, Point::new(exit_x, center_y - 80.0));
                }
            }
        }
    }
}
