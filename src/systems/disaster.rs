use anyhow::Result;
use rand::Rng;
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    scenario::DisasterConfig,
    world::World,
};

/// Idle/active disaster scheduler.
///
/// While idle the trigger timer accumulates scaled time. Once a disaster is
/// active the timer is frozen and the banner counts down in real time, so a
/// paused game still clears it.
pub struct DisasterSystem {
    config: DisasterConfig,
    elapsed_secs: f64,
    threshold_secs: Option<f64>,
}

impl DisasterSystem {
    pub fn new(config: DisasterConfig) -> Self {
        Self {
            config,
            elapsed_secs: 0.0,
            threshold_secs: None,
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn threshold_secs(&self) -> Option<f64> {
        self.threshold_secs
    }
}

impl System for DisasterSystem {
    fn name(&self) -> &str {
        "disasters"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        if let Some(active) = world.disaster.as_mut() {
            active.display_remaining_secs -= ctx.wall_dt;
            if active.display_remaining_secs <= 0.0 {
                debug!(disaster = %active.disaster.name, "disaster.cleared");
                world.disaster = None;
                self.elapsed_secs = 0.0;
            }
            return Ok(());
        }
        if world.is_game_over() || self.config.catalog.is_empty() {
            return Ok(());
        }

        let threshold = match self.threshold_secs {
            Some(threshold) => threshold,
            None => *self
                .threshold_secs
                .insert(self.config.threshold_secs.sample(rng)),
        };
        self.elapsed_secs += ctx.scaled_dt;
        if self.elapsed_secs < threshold {
            return Ok(());
        }

        let index = rng.gen_range(0..self.config.catalog.len());
        let disaster = self.config.catalog[index].clone();
        world.resolve_disaster(disaster, self.config.banner_secs);
        self.elapsed_secs = 0.0;
        self.threshold_secs = Some(self.config.threshold_secs.sample(rng));
        Ok(())
    }

    fn runs_after_game_over(&self) -> bool {
        true
    }
}
