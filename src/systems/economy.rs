use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// Income rates are quoted per ten simulated seconds.
const INCOME_PERIOD_SECS: f64 = 10.0;

pub struct EconomySystem;

impl EconomySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EconomySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for EconomySystem {
    fn name(&self) -> &str {
        "economy"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let earned = world.income_rate() as f64 * ctx.scaled_dt / INCOME_PERIOD_SECS;
        world.accrue(earned);
        Ok(())
    }
}
