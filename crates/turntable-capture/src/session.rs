//! Session - owns every store for one workspace and persists them
//!
//! Layout of a workspace directory:
//! - `state.json`: component tree, scene settings, models, screenshots
//! - `images/`: captured PNGs, one file per `image_<id>` key
//! - `models/`: model bytes and thumbnails (`model_<id>`, `thumb_<id>`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use turntable_core::{
    CameraPatch, ComponentTree, DirBlobStore, ExportEntry, ModelError, ModelId, ModelLibrary,
    ModelUpdate, NewModel, SceneComponent, SceneSettings, SceneTemplate, ScreenshotError,
    ScreenshotLog, StoreError,
};

use crate::backend::{ModelProvider, ModelRef, Renderer};
use crate::orchestrator::{
    CaptureConfig, CaptureError, CaptureMode, CaptureOrchestrator, CaptureReport,
};

const STATE_FILE: &str = "state.json";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Model error: {0}")]
    ModelError(#[from] ModelError),
    #[error("Screenshot error: {0}")]
    ScreenshotError(#[from] ScreenshotError),
    #[error("Capture error: {0}")]
    CaptureError(#[from] CaptureError),
}

/// Settings used when opening a session
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub capture: CaptureConfig,
    /// Applied over factory camera defaults for a new workspace
    pub camera: Option<CameraPatch>,
    pub template: SceneTemplate,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionState {
    #[serde(default)]
    components: Vec<SceneComponent>,
    #[serde(default)]
    settings: SceneSettings,
    #[serde(default)]
    models: ModelLibrary,
    #[serde(default)]
    screenshots: ScreenshotLog,
}

/// Model provider that also loads the selected model's saved view
struct SessionModels<'a> {
    library: &'a mut ModelLibrary,
    settings: &'a mut SceneSettings,
}

impl ModelProvider for SessionModels<'_> {
    fn models(&self) -> Vec<ModelRef> {
        ModelProvider::models(&*self.library)
    }

    fn select(&mut self, id: &ModelId) -> Result<(), ModelError> {
        let model = self.library.select(id)?;
        self.settings.apply_model_settings(model);
        Ok(())
    }

    fn current_selection(&self) -> Option<ModelRef> {
        self.library.current_selection()
    }

    fn clear_selection(&mut self) {
        ModelProvider::clear_selection(&mut *self.library);
    }
}

/// All stores of one workspace
pub struct Session {
    dir: PathBuf,
    template: SceneTemplate,
    camera: Option<CameraPatch>,
    pub tree: ComponentTree,
    pub settings: SceneSettings,
    pub models: ModelLibrary,
    pub screenshots: ScreenshotLog,
    images: DirBlobStore,
    model_blobs: DirBlobStore,
    orchestrator: CaptureOrchestrator,
}

impl Session {
    /// Open a workspace, loading saved state if present
    pub fn open(dir: impl Into<PathBuf>, config: SessionConfig) -> Result<Self, SessionError> {
        let dir = dir.into();
        let images = DirBlobStore::open(dir.join("images"))?;
        let model_blobs = DirBlobStore::open(dir.join("models"))?;

        let state_path = dir.join(STATE_FILE);
        let state = if state_path.exists() {
            let content = std::fs::read_to_string(&state_path)?;
            let state: SessionState = serde_json::from_str(&content)?;
            info!(path = %state_path.display(), models = state.models.len(), "Loaded session");
            state
        } else {
            let mut settings = SceneSettings::new();
            if let Some(camera) = &config.camera {
                settings.update_camera(camera);
            }
            info!(path = %dir.display(), "Starting new session");
            SessionState {
                settings,
                ..Default::default()
            }
        };

        let mut tree = ComponentTree::from_components(state.components);
        tree.ensure_default_scene(&config.template);

        Ok(Self {
            dir,
            template: config.template,
            camera: config.camera,
            tree,
            settings: state.settings,
            models: state.models,
            screenshots: state.screenshots,
            images,
            model_blobs,
            orchestrator: CaptureOrchestrator::new(config.capture),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn orchestrator(&self) -> &CaptureOrchestrator {
        &self.orchestrator
    }

    pub fn save(&self) -> Result<(), SessionError> {
        let state = SessionState {
            components: self.tree.snapshot(),
            settings: self.settings.clone(),
            models: self.models.clone(),
            screenshots: self.screenshots.clone(),
        };
        let path = self.dir.join(STATE_FILE);
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(&path, serde_json::to_string_pretty(&state)?)?;
        debug!(path = %path.display(), "Saved session");
        Ok(())
    }

    /// Add a model; its saved view is applied if it becomes selected
    pub fn add_model(&mut self, model: NewModel, first_in_batch: bool) -> Result<ModelId, SessionError> {
        let id = self.models.upload(model, first_in_batch, &mut self.model_blobs)?;
        if let Some(selected) = self.models.selected().filter(|m| m.id == id) {
            self.settings.apply_model_settings(selected);
        }
        Ok(id)
    }

    pub fn select_model(&mut self, id: &ModelId) -> Result<(), SessionError> {
        let model = self.models.select(id)?;
        self.settings.apply_model_settings(model);
        Ok(())
    }

    pub fn delete_model(&mut self, id: &ModelId) -> Result<bool, SessionError> {
        Ok(self.models.delete(id, &mut self.model_blobs)?)
    }

    /// Store the current zoom and component tree with the selected model
    pub fn save_model_view(&mut self) -> Result<bool, SessionError> {
        let Some(model) = self.models.selected() else {
            return Ok(false);
        };
        let id = model.id.clone();
        let mut settings = model.settings.clone();
        let mut camera = settings.camera.take().unwrap_or_default();
        camera.overlay(&CameraPatch::zoom(self.settings.camera.zoom));
        settings.camera = Some(camera);

        self.models.update(
            &id,
            ModelUpdate {
                settings: Some(settings),
                components: Some(self.tree.snapshot()),
                ..Default::default()
            },
        )?;
        Ok(true)
    }

    pub fn model_data(&self, id: &ModelId) -> Result<Vec<u8>, SessionError> {
        let model = self
            .models
            .get(id)
            .ok_or_else(|| ModelError::NotFound(id.clone()))?;
        Ok(self.models.model_data(&model.data_key, &self.model_blobs)?)
    }

    pub fn image_data(&self, image_key: &str) -> Result<Vec<u8>, SessionError> {
        Ok(self.screenshots.image_data(image_key, &self.images)?)
    }

    pub fn delete_screenshot(&mut self, id: &str) -> Result<bool, SessionError> {
        Ok(self.screenshots.delete(id, &mut self.images)?)
    }

    pub fn export_entries(&self) -> Result<Vec<ExportEntry>, SessionError> {
        Ok(self.screenshots.export_entries(&self.images)?)
    }

    /// Run a capture against this session's models and screenshot log
    pub async fn capture<R: Renderer>(
        &mut self,
        mode: CaptureMode,
        renderer: &mut R,
    ) -> Result<CaptureReport, SessionError> {
        let scene_zoom = self.settings.camera.zoom;
        let result = {
            let mut models = SessionModels {
                library: &mut self.models,
                settings: &mut self.settings,
            };
            self.orchestrator
                .run(mode, renderer, &mut models, &mut self.screenshots, &mut self.images)
                .await
        };
        // Reselecting during the run loads each model's saved zoom
        self.settings.update_camera(&CameraPatch::zoom(scene_zoom));
        Ok(result?)
    }

    /// Restore factory scene settings
    pub fn reset_scene(&mut self) {
        self.settings.reset();
        if let Some(camera) = &self.camera {
            self.settings.update_camera(camera);
        }
        info!("Reset scene settings");
    }

    /// Replace the component tree with the default scene
    pub fn reset_components(&mut self) {
        self.tree.initialize_from_template(&self.template);
        info!("Reset components");
    }

    pub fn reset_models(&mut self) -> Result<(), SessionError> {
        Ok(self.models.reset(&mut self.model_blobs)?)
    }

    pub fn reset_screenshots(&mut self) -> Result<(), SessionError> {
        Ok(self.screenshots.clear(&mut self.images)?)
    }
}
