//! Periodic JSON dumps of the world for offline inspection.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::world::{World, WorldSnapshot};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct SnapshotFile<'a> {
    scenario: &'a str,
    written_at: DateTime<Utc>,
    world: WorldSnapshot,
}

pub struct SnapshotWriter {
    dir: PathBuf,
    interval_ticks: u64,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, interval_ticks: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval_ticks,
        }
    }

    /// Writes `<dir>/<scenario>/tick_NNNNNN.json` on every `interval_ticks`-th tick.
    pub fn maybe_write(&self, world: &World, scenario: &str) -> Result<Option<PathBuf>, SnapshotError> {
        if self.interval_ticks == 0 || world.tick() % self.interval_ticks != 0 {
            return Ok(None);
        }

        let dir = self.dir.join(scenario);
        fs::create_dir_all(&dir).map_err(|source| SnapshotError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = dir.join(format!("tick_{:06}.json", world.tick()));
        let file = SnapshotFile {
            scenario,
            written_at: Utc::now(),
            world: world.snapshot(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&path, json).map_err(|source| SnapshotError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "snapshot.written");
        Ok(Some(path))
    }
}
