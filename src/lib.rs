pub mod capture;
pub mod classifier;
pub mod config;
pub mod db;
pub mod frame;
pub mod history;
pub mod transform;
pub mod utils;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use log::info;

use capture::{
    apply_pinch, CaptureController, CapturePipeline, CapturePreview, FrameDelivery,
    PipelineSettings, ZoomableDevice,
};
use classifier::ImageClassifier;
use config::{AppConfig, ConfigStore};
use db::Database;
use frame::{FrameGeometry, RawFrame};
use history::HistoryStore;

pub use utils::init_logging;

const SETTINGS_FILE: &str = "settings.json";

/// Everything one running camera screen needs, opened from a data directory.
pub struct AppState {
    pub(crate) config: ConfigStore,
    pub(crate) history: HistoryStore,
    pub(crate) capture: CaptureController,
}

impl AppState {
    /// Load settings, open (or recover) the history database and start the
    /// capture loop for a camera session producing frames of `geometry`.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn open(
        data_dir: &Path,
        geometry: FrameGeometry,
        classifier: Arc<dyn ImageClassifier>,
    ) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let config_store = ConfigStore::new(data_dir.join(SETTINGS_FILE))?;
        let config = config_store.config();

        let database = Database::open_or_recover(data_dir.join(&config.database_file))?;
        let history = HistoryStore::new(database);

        let pipeline = CapturePipeline::new(
            classifier,
            history.clone(),
            PipelineSettings::from_config(&config),
        );
        let capture = CaptureController::start(
            pipeline,
            geometry,
            config.crop_side,
            config.frame_queue_depth,
        )
        .await?;

        info!("signcam ready, data in {}", data_dir.display());

        Ok(Self {
            config: config_store,
            history,
            capture,
        })
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn capture(&self) -> &CaptureController {
        &self.capture
    }

    /// Forward a camera frame; see [`CaptureController::deliver_frame`].
    pub fn deliver_frame(&self, frame: RawFrame) -> FrameDelivery {
        self.capture.deliver_frame(frame)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.capture.stop().await
    }
}

/// Shutter button. `false` means a capture was already pending.
pub fn capture_photo(state: &AppState) -> Result<bool, String> {
    Ok(state.capture.trigger_capture())
}

pub fn get_latest_preview(state: &AppState) -> Result<Option<CapturePreview>, String> {
    Ok(state.capture.latest_preview())
}

pub fn get_config(state: &AppState) -> Result<AppConfig, String> {
    Ok(state.config.config())
}

/// Persist new settings. Capture settings apply from the next session.
pub fn update_config(state: &AppState, config: AppConfig) -> Result<(), String> {
    state.config.update(config).map_err(|e| e.to_string())
}

pub fn pinch_to_zoom(device: &dyn ZoomableDevice, velocity: f64) -> Result<f64, String> {
    apply_pinch(device, velocity).map_err(|e| e.to_string())
}
