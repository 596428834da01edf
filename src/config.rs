use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::transform::{ResizeMode, TargetSize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Side of the square capture region in upright frame pixels.
    pub crop_side: u32,
    /// Classifier input resolution.
    pub target_width: u32,
    pub target_height: u32,
    pub resize_mode: ResizeMode,
    pub jpeg_quality: u8,
    /// Frames waiting for the capture loop; extra frames are dropped as late.
    pub frame_queue_depth: usize,
    /// Keep a capture whose classification failed, stored without a label.
    pub keep_unlabeled_captures: bool,
    pub database_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            crop_side: 300,
            target_width: 48,
            target_height: 48,
            resize_mode: ResizeMode::Fit,
            jpeg_quality: 100,
            frame_queue_depth: 1,
            keep_unlabeled_captures: true,
            database_file: "history.sqlite3".into(),
        }
    }
}

impl AppConfig {
    pub fn target_size(&self) -> TargetSize {
        TargetSize::new(self.target_width, self.target_height)
    }

    pub fn validate(&self) -> Result<()> {
        if self.crop_side == 0 {
            bail!("cropSide must be greater than zero");
        }
        if self.target_width == 0 || self.target_height == 0 {
            bail!(
                "target size must be non-empty, got {}x{}",
                self.target_width,
                self.target_height
            );
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            bail!("jpegQuality must be within 1..=100, got {}", self.jpeg_quality);
        }
        if self.frame_queue_depth == 0 {
            bail!("frameQueueDepth must be at least 1");
        }
        if self.database_file.trim().is_empty() {
            bail!("databaseFile must not be empty");
        }
        Ok(())
    }
}

/// JSON-backed config file. Missing or unreadable contents fall back to
/// defaults; every update rewrites the whole file.
pub struct ConfigStore {
    path: PathBuf,
    data: RwLock<AppConfig>,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<AppConfig>(&contents) {
                Ok(config) => match config.validate() {
                    Ok(()) => config,
                    Err(err) => {
                        warn!("Ignoring invalid settings in {}: {err:#}", path.display());
                        AppConfig::default()
                    }
                },
                Err(err) => {
                    warn!("Ignoring malformed settings in {}: {err}", path.display());
                    AppConfig::default()
                }
            }
        } else {
            AppConfig::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn config(&self) -> AppConfig {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update(&self, config: AppConfig) -> Result<()> {
        config.validate()?;
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.persist(&config)?;
        *guard = config;
        Ok(())
    }

    fn persist(&self, data: &AppConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
