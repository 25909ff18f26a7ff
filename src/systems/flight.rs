use anyhow::Result;
use tracing::debug;

use crate::{
    buildings::BuildingKind,
    engine::{System, SystemContext},
    notices::Notice,
    rng::SystemRng,
    scenario::AircraftConfig,
    world::{Aircraft, FlightDirection, World},
};

/// Moves aircraft toward their targets, lands arrivals and retires
/// departures and aircraft that have finished their dwell.
///
/// Movement follows scaled time; the dwell on the ground follows real time.
pub struct FlightSystem {
    config: AircraftConfig,
}

impl FlightSystem {
    pub fn new(config: AircraftConfig) -> Self {
        Self { config }
    }

    /// Advances one aircraft. Returns `false` once it should leave the list.
    fn step<R: rand::Rng + ?Sized>(
        &self,
        aircraft: &mut Aircraft,
        ctx: &SystemContext,
        has_terminal: bool,
        rng: &mut R,
        landings: &mut Vec<Option<u32>>,
    ) -> bool {
        if aircraft.landed {
            aircraft.landed_for_secs += ctx.wall_dt;
            return aircraft.landed_for_secs <= self.config.dwell_secs;
        }

        let distance = aircraft.position.distance_to(aircraft.target);
        if distance > self.config.arrival_radius {
            let step = aircraft.speed * ctx.scaled_dt;
            if step >= distance {
                aircraft.position = aircraft.target;
            } else {
                let ratio = step / distance;
                aircraft.position.x += (aircraft.target.x - aircraft.position.x) * ratio;
                aircraft.position.y += (aircraft.target.y - aircraft.position.y) * ratio;
            }
            return true;
        }

        match aircraft.direction {
            FlightDirection::Arriving => {
                aircraft.landed = true;
                aircraft.position = aircraft.touchdown;
                let passengers = has_terminal.then(|| self.config.passengers.sample(rng));
                landings.push(passengers);
                true
            }
            FlightDirection::Departing => {
                debug!(runway = aircraft.runway.raw(), "aircraft.departed");
                false
            }
        }
    }
}

impl System for FlightSystem {
    fn name(&self) -> &str {
        "flight"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let has_terminal = world.has_building(BuildingKind::Terminal);
        let mut landings = Vec::new();
        let mut fleet = std::mem::take(&mut world.aircraft);
        fleet.retain_mut(|aircraft| self.step(aircraft, ctx, has_terminal, rng, &mut landings));
        world.aircraft = fleet;

        for passengers in landings {
            match passengers {
                Some(count) => {
                    world.passengers += count as u64;
                    debug!(passengers = count, total = world.passengers, "aircraft.landed");
                    world.notify(Notice::normal(format!("Plane landed! +{count} passengers")));
                }
                None => {
                    debug!("aircraft.landed without terminal");
                    world.notify(Notice::normal(
                        "Plane landed (no terminal - no passengers counted)",
                    ));
                }
            }
        }
        Ok(())
    }
}
