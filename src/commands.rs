//! Player commands forwarded from the presentation layer.

use serde::{Deserialize, Serialize};

use crate::{
    buildings::BuildingKind,
    grid::Cell,
    world::{CommandError, EntityId, SimSpeed, World},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Place { kind: BuildingKind, row: u32, col: u32 },
    Upgrade { row: u32, col: u32 },
    SetSpeed { multiplier: SimSpeed },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandOutcome {
    Placed { id: EntityId, kind: BuildingKind },
    Upgraded { level: u32 },
    /// Upgrade aimed at a cell where no building originates.
    NoTarget,
    SpeedChanged { multiplier: SimSpeed },
}

impl World {
    pub fn apply(&mut self, command: Command) -> Result<CommandOutcome, CommandError> {
        match command {
            Command::Place { kind, row, col } => {
                let id = self.place_building(kind, Cell::new(row, col))?;
                Ok(CommandOutcome::Placed { id, kind })
            }
            Command::Upgrade { row, col } => Ok(match self.upgrade_building(Cell::new(row, col))? {
                Some(level) => CommandOutcome::Upgraded { level },
                None => CommandOutcome::NoTarget,
            }),
            Command::SetSpeed { multiplier } => {
                self.set_speed(multiplier)?;
                Ok(CommandOutcome::SpeedChanged { multiplier })
            }
        }
    }
}
