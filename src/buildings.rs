//! Static building catalog.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::grid::Cell;

/// Per-level boost applied to both income and throughput.
const LEVEL_STEP: f64 = 0.3;

/// Share of the base cost charged per current level when upgrading.
const UPGRADE_COST_FACTOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    Terminal,
    Runway,
    Hangar,
    FuelStation,
    Maintenance,
    Cargo,
    Restaurant,
}

impl BuildingKind {
    pub const ALL: [BuildingKind; 7] = [
        BuildingKind::Terminal,
        BuildingKind::Runway,
        BuildingKind::Hangar,
        BuildingKind::FuelStation,
        BuildingKind::Maintenance,
        BuildingKind::Cargo,
        BuildingKind::Restaurant,
    ];

    pub fn spec(self) -> &'static BuildingSpec {
        match self {
            BuildingKind::Terminal => &TERMINAL,
            BuildingKind::Runway => &RUNWAY,
            BuildingKind::Hangar => &HANGAR,
            BuildingKind::FuelStation => &FUEL_STATION,
            BuildingKind::Maintenance => &MAINTENANCE,
            BuildingKind::Cargo => &CARGO,
            BuildingKind::Restaurant => &RESTAURANT,
        }
    }

    /// Tag stored in grid cells and accepted on the command line.
    pub fn tag(self) -> &'static str {
        match self {
            BuildingKind::Terminal => "terminal",
            BuildingKind::Runway => "runway",
            BuildingKind::Hangar => "hangar",
            BuildingKind::FuelStation => "fuel_station",
            BuildingKind::Maintenance => "maintenance",
            BuildingKind::Cargo => "cargo",
            BuildingKind::Restaurant => "restaurant",
        }
    }

    /// Cost of raising a building of this kind from `level` to `level + 1`.
    pub fn upgrade_cost(self, level: u32) -> u64 {
        (self.spec().cost as f64 * UPGRADE_COST_FACTOR * level as f64).floor() as u64
    }
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown building kind '{0}'")]
pub struct UnknownBuildingKind(pub String);

impl FromStr for BuildingKind {
    type Err = UnknownBuildingKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        BuildingKind::ALL
            .into_iter()
            .find(|kind| kind.tag() == value.trim())
            .ok_or_else(|| UnknownBuildingKind(value.to_string()))
    }
}

/// Width and height of a building in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
}

impl Footprint {
    pub const fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }

    /// Cells covered when the footprint is anchored at `origin`, row by row.
    pub fn cells(self, origin: Cell) -> impl Iterator<Item = Cell> {
        (0..self.height).flat_map(move |dr| {
            (0..self.width).map(move |dc| Cell {
                row: origin.row.saturating_add(dr),
                col: origin.col.saturating_add(dc),
            })
        })
    }

    pub fn area(self) -> u32 {
        self.width * self.height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub cost: u64,
    pub income: u64,
    /// Aircraft per hour contributed at level 1.
    pub throughput_per_hour: Option<f64>,
    pub footprint: Footprint,
    pub color: &'static str,
}

pub fn level_multiplier(level: u32) -> f64 {
    1.0 + (level.saturating_sub(1)) as f64 * LEVEL_STEP
}

const TERMINAL: BuildingSpec = BuildingSpec {
    name: "Terminal",
    description: "Handles passenger boarding and arrivals",
    cost: 1000,
    income: 50,
    throughput_per_hour: None,
    footprint: Footprint::square(3),
    color: "#FF6B6B",
};

const RUNWAY: BuildingSpec = BuildingSpec {
    name: "Runway",
    description: "Allows planes to land and take off",
    cost: 2000,
    income: 100,
    throughput_per_hour: Some(120.0),
    footprint: Footprint {
        width: 5,
        height: 2,
    },
    color: "#4ECDC4",
};

const HANGAR: BuildingSpec = BuildingSpec {
    name: "Hangar",
    description: "Stores and maintains aircraft",
    cost: 3000,
    income: 75,
    throughput_per_hour: None,
    footprint: Footprint::square(3),
    color: "#FFD93D",
};

const FUEL_STATION: BuildingSpec = BuildingSpec {
    name: "Fuel Station",
    description: "Increases plane capacity",
    cost: 1500,
    income: 40,
    throughput_per_hour: Some(60.0),
    footprint: Footprint::square(2),
    color: "#6BCB77",
};

const MAINTENANCE: BuildingSpec = BuildingSpec {
    name: "Maintenance",
    description: "Improves aircraft efficiency",
    cost: 2500,
    income: 60,
    throughput_per_hour: None,
    footprint: Footprint::square(3),
    color: "#A29BFE",
};

const CARGO: BuildingSpec = BuildingSpec {
    name: "Cargo Hub",
    description: "Handles cargo operations",
    cost: 2000,
    income: 80,
    throughput_per_hour: None,
    footprint: Footprint::square(2),
    color: "#FD79A8",
};

const RESTAURANT: BuildingSpec = BuildingSpec {
    name: "Restaurant",
    description: "Generates revenue from dining",
    cost: 800,
    income: 30,
    throughput_per_hour: None,
    footprint: Footprint::square(2),
    color: "#FDCB6E",
};
