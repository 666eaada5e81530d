//! JSON-lines score store used by the terminal surface.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use mindboard_game::{ScoreRecord, ScoreStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode score record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredScore {
    pub saved_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: ScoreRecord,
}

/// Appends one JSON object per saved assessment.
#[derive(Debug, Clone)]
pub struct JsonlScoreStore {
    path: PathBuf,
}

impl JsonlScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every stored line.
    pub fn load_all(&self) -> Result<Vec<StoredScore>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StoreError::from))
            .collect()
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ScoreStore for JsonlScoreStore {
    type Error = StoreError;

    fn save_scores(&self, record: &ScoreRecord) -> Result<(), Self::Error> {
        let line = serde_json::to_string(&StoredScore {
            saved_at: Utc::now(),
            record: record.clone(),
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| self.io_error(err))?;
        writeln!(file, "{line}").map_err(|err| self.io_error(err))?;
        log::debug!("appended score line to {}", self.path.display());
        Ok(())
    }
}
