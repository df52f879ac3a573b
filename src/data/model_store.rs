//! File-backed store for trained projection models
//!
//! One JSON file per `(player, season)` key. Writes go to a temporary file in
//! the same directory and are renamed into place, so readers never observe a
//! partially written model.

use crate::model::ProjectionModel;
use crate::{PlayerId, ProjectionError, Result, Season, Stat};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// Identifies one stored model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelKey {
    pub player: PlayerId,
    pub season: Season,
}

fn file_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^proj_model_(\d+)_(\d{6})\.json$").expect("file name pattern is valid")
    })
}

impl ModelKey {
    pub fn new(player: PlayerId, season: Season) -> Self {
        ModelKey { player, season }
    }

    /// File name for this key, e.g. `proj_model_2544_202425.json`
    pub fn file_name(&self) -> String {
        format!("proj_model_{}_{}.json", self.player.0, self.season.compact())
    }

    /// Inverse of [`ModelKey::file_name`]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let caps = file_name_pattern().captures(name)?;
        let player = PlayerId(caps[1].parse().ok()?);
        let season: Season = caps[2].parse().ok()?;
        Some(ModelKey::new(player, season))
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {} ({})", self.player, self.season)
    }
}

/// Model file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredModel {
    pub player_id: PlayerId,
    pub season: Season,
    pub stat: Stat,
    pub trained_at: DateTime<Utc>,
    #[serde(flatten)]
    pub model: ProjectionModel,
}

impl StoredModel {
    pub fn key(&self) -> ModelKey {
        ModelKey::new(self.player_id, self.season)
    }
}

/// Directory of model files
pub struct ModelStore {
    root: PathBuf,
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

impl ModelStore {
    /// Open or create a store rooted at the given directory
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(ModelStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, key: ModelKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    pub fn contains(&self, key: ModelKey) -> bool {
        self.path(key).is_file()
    }

    /// Write a model, replacing any existing one for the same key.
    ///
    /// Non-finite coefficients are refused; JSON would store them as `null`.
    pub fn put(&self, record: &StoredModel) -> Result<PathBuf> {
        let key = record.key();
        if !record.model.is_finite() {
            return Err(ProjectionError::Fit(format!(
                "refusing to store non-finite model for {}",
                key
            )));
        }
        let target = self.path(key);
        let content = serde_json::to_vec_pretty(record)
            .map_err(|e| ProjectionError::Fit(format!("Failed to serialize model: {}", e)))?;

        let tmp = self.root.join(format!(
            ".{}.{}-{}.tmp",
            key.file_name(),
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let written = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&content)?;
            file.sync_all()?;
            fs::rename(&tmp, &target)
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        log::debug!("Saved model for {} to {}", key, target.display());
        Ok(target)
    }

    /// Load the model for a key
    pub fn get(&self, key: ModelKey) -> Result<StoredModel> {
        let path = self.path(key);
        let content = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProjectionError::ModelNotFound(key))
            }
            Err(e) => {
                return Err(ProjectionError::Prediction(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let record: StoredModel = serde_json::from_slice(&content).map_err(|e| {
            ProjectionError::Prediction(format!("Corrupt model file {}: {}", path.display(), e))
        })?;

        if record.key() != key {
            return Err(ProjectionError::Prediction(format!(
                "{} holds the model for {}",
                path.display(),
                record.key()
            )));
        }
        if !record.model.is_finite() {
            return Err(ProjectionError::Prediction(format!(
                "{} has non-finite coefficients",
                path.display()
            )));
        }

        Ok(record)
    }

    /// Remove the model for a key
    pub fn delete(&self, key: ModelKey) -> Result<()> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ProjectionError::ModelNotFound(key))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All readable models, sorted by season then player
    pub fn list(&self) -> Result<Vec<StoredModel>> {
        let mut models = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(ModelKey::from_file_name) else {
                continue;
            };
            match self.get(key) {
                Ok(record) => models.push(record),
                Err(e) => log::warn!("Skipping {}: {}", entry.path().display(), e),
            }
        }

        models.sort_by_key(|m| (m.season, m.player_id));
        Ok(models)
    }
}
