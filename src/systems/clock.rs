use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

pub struct ClockSystem;

impl ClockSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClockSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ClockSystem {
    fn name(&self) -> &str {
        "clock"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        world.clock.advance(ctx.scaled_dt);
        Ok(())
    }
}
