pub mod buildings;
pub mod commands;
pub mod engine;
pub mod grid;
pub mod notices;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod systems;
pub mod web;
pub mod world;

pub use commands::{Command, CommandOutcome};
pub use engine::{Engine, EngineBuilder, EngineSettings, TickSummary};
pub use scenario::{Scenario, ScenarioLoader};
pub use world::{CommandError, World};
