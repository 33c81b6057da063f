use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Rider attributes used by the statistics calculator. Weight is optional;
/// without it no calorie estimate is produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderProfile {
    pub weight_kg: Option<f64>,
}

pub trait RiderProfileSource: Send + Sync {
    fn profile(&self) -> RiderProfile;
}

/// JSON-file-backed profile store. Reads once at construction, serves from
/// memory afterwards, and writes through on update.
pub struct FileRiderProfile {
    path: PathBuf,
    data: RwLock<RiderProfile>,
}

impl FileRiderProfile {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read rider profile from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            RiderProfile::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn update(&self, profile: RiderProfile) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        *guard = profile;
        self.persist(&guard)
    }

    fn persist(&self, data: &RiderProfile) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write rider profile to {}", self.path.display()))
    }
}

impl RiderProfileSource for FileRiderProfile {
    fn profile(&self) -> RiderProfile {
        self.data.read().unwrap().clone()
    }
}
