//! Capture orchestrator - drives the camera through positions and models,
//! recording one screenshot per step
//!
//! A run owns the renderer and model selection for its whole duration. The
//! camera position, zoom, and (for `all-models`) the selected model are put
//! back when the run ends, whether it completes, fails, is stopped, or its
//! future is dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use turntable_core::position::distance_from_origin;
use turntable_core::{
    calculate_positions, BlobStore, ModelError, Position, ScreenshotError, ScreenshotLog,
    CUSTOM_VIEW, DEFAULT_MODEL_ZOOM, ORIGIN,
};

use crate::backend::{ModelProvider, ModelRef, RenderError, Renderer};

/// Model name recorded when nothing is selected
const FALLBACK_MODEL_NAME: &str = "model";

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Render error: {0}")]
    RenderError(#[from] RenderError),
    #[error("Screenshot error: {0}")]
    ScreenshotError(#[from] ScreenshotError),
    #[error("Model error: {0}")]
    ModelError(#[from] ModelError),
    #[error("Unknown capture mode: {0}")]
    UnknownMode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMode {
    /// One image at the live camera position
    Single,
    /// Every fixed position, current model only
    All,
    /// Every fixed position for every model, in list order
    AllModels,
}

impl CaptureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMode::Single => "single",
            CaptureMode::All => "all",
            CaptureMode::AllModels => "all-models",
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureMode {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(CaptureMode::Single),
            "all" => Ok(CaptureMode::All),
            "all-models" => Ok(CaptureMode::AllModels),
            other => Err(CaptureError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "mode", rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    Capturing(CaptureMode),
}

impl CaptureState {
    pub fn is_capturing(&self) -> bool {
        matches!(self, CaptureState::Capturing(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureOutcome {
    Completed,
    Cancelled,
    Failed,
    /// A capture was already running
    Ignored,
}

/// Capture lifecycle notification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CaptureEvent {
    Started {
        mode: CaptureMode,
    },
    ModelStarted {
        model_name: String,
        index: usize,
        total: usize,
    },
    Captured {
        model_name: String,
        position: String,
        image_key: String,
    },
    Finished {
        mode: CaptureMode,
        outcome: CaptureOutcome,
        captured: usize,
    },
}

/// Result of a run that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureReport {
    pub mode: CaptureMode,
    pub outcome: CaptureOutcome,
    pub captured: usize,
}

/// Reselect sequence applied after switching models in `all-models` mode.
///
/// The renderer may show the previous model's frame right after a switch;
/// selecting a neighbor and back with pauses in between lets it catch up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettleConfig {
    pub enabled: bool,
    pub delay: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay: Duration::from_millis(150),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureConfig {
    pub settle: SettleConfig,
    /// Zoom for models without a saved zoom
    pub default_zoom: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            settle: SettleConfig::default(),
            default_zoom: DEFAULT_MODEL_ZOOM,
        }
    }
}

/// Requests that a running capture stop at its next step
#[derive(Clone)]
pub struct StopHandle {
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<CaptureState>>,
}

impl StopHandle {
    /// Ends the current run. A run started afterwards is not affected.
    pub fn stop(&self) {
        let stopped = self.state.send_if_modified(|state| {
            if state.is_capturing() {
                *state = CaptureState::Idle;
                self.generation.fetch_add(1, Ordering::SeqCst);
                true
            } else {
                false
            }
        });
        if stopped {
            info!("Capture stop requested");
        }
    }
}

/// Sequential capture state machine
pub struct CaptureOrchestrator {
    config: CaptureConfig,
    state: Arc<watch::Sender<CaptureState>>,
    /// Bumped on every start and stop; a run is live while it matches
    generation: Arc<AtomicU64>,
    events: broadcast::Sender<CaptureEvent>,
}

impl Default for CaptureOrchestrator {
    fn default() -> Self {
        Self::new(CaptureConfig::default())
    }
}

impl CaptureOrchestrator {
    pub fn new(config: CaptureConfig) -> Self {
        let (state, _) = watch::channel(CaptureState::Idle);
        let (events, _) = broadcast::channel(100);
        Self {
            config,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            events,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn state(&self) -> CaptureState {
        *self.state.borrow()
    }

    pub fn is_capturing(&self) -> bool {
        self.state().is_capturing()
    }

    /// Watch state transitions
    pub fn watch_state(&self) -> watch::Receiver<CaptureState> {
        self.state.subscribe()
    }

    /// Subscribe to capture events
    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.events.subscribe()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            generation: self.generation.clone(),
            state: self.state.clone(),
        }
    }

    fn emit(&self, event: CaptureEvent) {
        let _ = self.events.send(event);
    }

    /// Run one capture.
    ///
    /// A start while another capture is running is ignored. On error the
    /// remaining steps are skipped; screenshots already recorded stay in
    /// the log.
    pub async fn run<'a>(
        &'a self,
        mode: CaptureMode,
        renderer: &'a mut dyn Renderer,
        models: &'a mut dyn ModelProvider,
        log: &'a mut ScreenshotLog,
        images: &'a mut dyn BlobStore,
    ) -> Result<CaptureReport, CaptureError> {
        let mut generation = 0;
        let started = self.state.send_if_modified(|state| {
            if state.is_capturing() {
                false
            } else {
                *state = CaptureState::Capturing(mode);
                generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                true
            }
        });
        if !started {
            warn!(%mode, "Capture already in progress, ignoring start");
            return Ok(CaptureReport {
                mode,
                outcome: CaptureOutcome::Ignored,
                captured: 0,
            });
        }

        info!(%mode, "Starting capture");
        self.emit(CaptureEvent::Started { mode });

        let mut run = CaptureRun::begin(self, generation, mode, renderer, models, log, images);
        let result = match mode {
            CaptureMode::Single => run.capture_single(),
            CaptureMode::All => run.capture_all(),
            CaptureMode::AllModels => run.capture_all_models().await,
        };
        let captured = run.captured;
        drop(run);

        let outcome = match &result {
            Ok(true) => CaptureOutcome::Completed,
            Ok(false) => CaptureOutcome::Cancelled,
            Err(_) => CaptureOutcome::Failed,
        };
        match &result {
            Err(e) => warn!(%mode, captured, "Capture failed: {}", e),
            Ok(_) => info!(%mode, captured, ?outcome, "Capture finished"),
        }
        self.emit(CaptureEvent::Finished {
            mode,
            outcome,
            captured,
        });

        result.map(|_| CaptureReport {
            mode,
            outcome,
            captured,
        })
    }
}

/// One in-flight capture. Dropping it restores the camera and selection.
struct CaptureRun<'a> {
    orchestrator: &'a CaptureOrchestrator,
    generation: u64,
    mode: CaptureMode,
    renderer: &'a mut dyn Renderer,
    models: &'a mut dyn ModelProvider,
    log: &'a mut ScreenshotLog,
    images: &'a mut dyn BlobStore,
    original_position: [f64; 3],
    original_zoom: f64,
    original_selection: Option<ModelRef>,
    captured: usize,
}

impl<'a> CaptureRun<'a> {
    fn begin(
        orchestrator: &'a CaptureOrchestrator,
        generation: u64,
        mode: CaptureMode,
        renderer: &'a mut dyn Renderer,
        models: &'a mut dyn ModelProvider,
        log: &'a mut ScreenshotLog,
        images: &'a mut dyn BlobStore,
    ) -> Self {
        let original_position = renderer.position();
        let original_zoom = renderer.zoom();
        let original_selection = models.current_selection();
        renderer.set_controls_enabled(false);

        Self {
            orchestrator,
            generation,
            mode,
            renderer,
            models,
            log,
            images,
            original_position,
            original_zoom,
            original_selection,
            captured: 0,
        }
    }

    /// True once this run was stopped, even if a newer run is active
    fn stopped(&self) -> bool {
        self.orchestrator.generation.load(Ordering::SeqCst) != self.generation
    }

    fn current_model_name(&self) -> String {
        self.original_selection
            .as_ref()
            .map(|m| m.name.clone())
            .unwrap_or_else(|| FALLBACK_MODEL_NAME.to_string())
    }

    /// Render the current frame and record it
    fn shoot(&mut self, model_name: &str, position: Position) -> Result<(), CaptureError> {
        self.renderer.render()?;
        let bytes = self.renderer.capture_frame()?;
        let position_name = position.name.clone();
        let screenshot = self
            .log
            .add_screenshot(model_name, position, bytes, &mut *self.images)?;

        self.captured += 1;
        let image_key = screenshot.image_key.clone();
        self.orchestrator.emit(CaptureEvent::Captured {
            model_name: model_name.to_string(),
            position: position_name,
            image_key,
        });
        Ok(())
    }

    fn capture_single(&mut self) -> Result<bool, CaptureError> {
        let name = self.current_model_name();
        let position = Position::new(CUSTOM_VIEW, self.renderer.position());
        self.shoot(&name, position)?;
        Ok(true)
    }

    fn capture_all(&mut self) -> Result<bool, CaptureError> {
        let name = self.current_model_name();
        let distance = distance_from_origin(self.original_position);
        self.capture_positions(&name, distance)
    }

    /// Capture the fixed position set. Returns false if stopped.
    fn capture_positions(&mut self, model_name: &str, distance: f64) -> Result<bool, CaptureError> {
        for position in calculate_positions(distance) {
            if self.stopped() {
                return Ok(false);
            }
            self.renderer.set_position(position.vector);
            self.renderer.look_at(ORIGIN);
            self.renderer.update_projection();
            self.shoot(model_name, position)?;
        }
        Ok(true)
    }

    async fn capture_all_models(&mut self) -> Result<bool, CaptureError> {
        let models = self.models.models();
        // Every model is shot from the distance the camera had at start
        let distance = distance_from_origin(self.original_position);

        for index in 0..models.len() {
            if self.stopped() {
                return Ok(false);
            }
            let model = &models[index];
            info!(model = %model.name, index, total = models.len(), "Capturing model");
            self.orchestrator.emit(CaptureEvent::ModelStarted {
                model_name: model.name.clone(),
                index,
                total: models.len(),
            });

            if !self.settle(&models, index).await? {
                return Ok(false);
            }
            if !self.capture_positions(&model.name, distance)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Select a model and let the renderer catch up. Returns false if stopped.
    async fn settle(&mut self, models: &[ModelRef], index: usize) -> Result<bool, CaptureError> {
        let model = &models[index];
        self.models.select(&model.id)?;

        let settle = self.orchestrator.config.settle;
        if settle.enabled {
            let neighbor = &models[(index + 1) % models.len()];
            for id in [&neighbor.id, &model.id] {
                if !self.pause(settle.delay).await {
                    return Ok(false);
                }
                self.models.select(id)?;
            }
            if !self.pause(settle.delay).await {
                return Ok(false);
            }
        }

        let zoom = model.zoom.unwrap_or(self.orchestrator.config.default_zoom);
        debug!(model = %model.name, zoom, "Applying model zoom");
        self.renderer.set_zoom(zoom);
        self.renderer.update_projection();
        Ok(true)
    }

    async fn pause(&self, delay: Duration) -> bool {
        tokio::time::sleep(delay).await;
        !self.stopped()
    }
}

impl Drop for CaptureRun<'_> {
    fn drop(&mut self) {
        if self.mode == CaptureMode::AllModels {
            match &self.original_selection {
                Some(model) => {
                    if let Err(e) = self.models.select(&model.id) {
                        warn!(model = %model.name, "Failed to restore model selection: {}", e);
                    }
                }
                None => self.models.clear_selection(),
            }
        }

        self.renderer.set_zoom(self.original_zoom);
        self.renderer.set_position(self.original_position);
        if self.mode != CaptureMode::Single {
            self.renderer.look_at(ORIGIN);
        }
        self.renderer.update_projection();
        self.renderer.set_controls_enabled(true);

        // A stopped run no longer owns the state; a newer run may hold it
        let generation = self.generation;
        let counter = &self.orchestrator.generation;
        self.orchestrator.state.send_if_modified(|state| {
            if state.is_capturing() && counter.load(Ordering::SeqCst) == generation {
                *state = CaptureState::Idle;
                true
            } else {
                false
            }
        });
        debug!(mode = %self.mode, "Restored camera after capture");
    }
}
