//! Scene settings store - camera and canvas configuration
//!
//! Updates are deep overlays: a patch only replaces the leaves it names, and
//! nested groups (such as the renderer flags) keep their other fields.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::Model;

/// Zoom applied when a model has no saved camera settings
pub const DEFAULT_MODEL_ZOOM: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub fov: f64,
    pub near: f64,
    pub far: f64,
    pub zoom: f64,
    pub position: [f64; 3],
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov: 35.0,
            near: 0.1,
            far: 10000.0,
            zoom: 2.0,
            position: [0.0, 0.0, 100.0],
        }
    }
}

/// Renderer context flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlSettings {
    pub logarithmic_depth_buffer: bool,
    pub antialias: bool,
}

impl Default for GlSettings {
    fn default() -> Self {
        Self {
            logarithmic_depth_buffer: true,
            antialias: true,
        }
    }
}

/// Device pixel ratio: a fixed value or a clamped range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PixelRatio {
    Fixed(f64),
    Range([f64; 2]),
}

impl PixelRatio {
    /// Resolve against the device's native ratio
    pub fn resolve(&self, native: f64) -> f64 {
        match self {
            PixelRatio::Fixed(ratio) => *ratio,
            PixelRatio::Range([min, max]) => native.clamp(*min, *max),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameLoop {
    /// Render every frame
    Always,
    /// Render only when something changed
    Demand,
    /// Render only on explicit request
    Never,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasSettings {
    pub gl: GlSettings,
    pub dpr: PixelRatio,
    pub shadows: bool,
    pub frameloop: FrameLoop,
    /// Disable tone mapping
    pub flat: bool,
    /// Disable sRGB color management
    pub linear: bool,
    pub orthographic: bool,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            gl: GlSettings::default(),
            dpr: PixelRatio::Range([1.0, 100.0]),
            shadows: true,
            frameloop: FrameLoop::Demand,
            flat: true,
            linear: true,
            orthographic: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fov: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub near: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub far: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 3]>,
}

impl CameraPatch {
    pub fn zoom(zoom: f64) -> Self {
        Self {
            zoom: Some(zoom),
            ..Default::default()
        }
    }

    /// Overlay `other` on top of this patch
    pub fn overlay(&mut self, other: &CameraPatch) {
        self.fov = other.fov.or(self.fov);
        self.near = other.near.or(self.near);
        self.far = other.far.or(self.far);
        self.zoom = other.zoom.or(self.zoom);
        self.position = other.position.or(self.position);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logarithmic_depth_buffer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antialias: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gl: Option<GlPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpr: Option<PixelRatio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadows: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frameloop: Option<FrameLoop>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linear: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orthographic: Option<bool>,
}

impl CameraSettings {
    fn apply(&mut self, patch: &CameraPatch) {
        if let Some(fov) = patch.fov {
            self.fov = fov;
        }
        if let Some(near) = patch.near {
            self.near = near;
        }
        if let Some(far) = patch.far {
            self.far = far;
        }
        if let Some(zoom) = patch.zoom {
            self.zoom = zoom;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
    }
}

impl CanvasSettings {
    fn apply(&mut self, patch: &CanvasPatch) {
        if let Some(gl) = &patch.gl {
            if let Some(log_depth) = gl.logarithmic_depth_buffer {
                self.gl.logarithmic_depth_buffer = log_depth;
            }
            if let Some(antialias) = gl.antialias {
                self.gl.antialias = antialias;
            }
        }
        if let Some(dpr) = patch.dpr {
            self.dpr = dpr;
        }
        if let Some(shadows) = patch.shadows {
            self.shadows = shadows;
        }
        if let Some(frameloop) = patch.frameloop {
            self.frameloop = frameloop;
        }
        if let Some(flat) = patch.flat {
            self.flat = flat;
        }
        if let Some(linear) = patch.linear {
            self.linear = linear;
        }
        if let Some(orthographic) = patch.orthographic {
            self.orthographic = orthographic;
        }
    }
}

/// Camera and canvas configuration for one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSettings {
    pub canvas: CanvasSettings,
    pub camera: CameraSettings,
}

impl SceneSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_camera(&mut self, patch: &CameraPatch) {
        self.camera.apply(patch);
        debug!(?patch, "Updated camera settings");
    }

    pub fn update_canvas(&mut self, patch: &CanvasPatch) {
        self.canvas.apply(patch);
        debug!(?patch, "Updated canvas settings");
    }

    /// Restore factory defaults
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Apply a model's saved view settings, as done when the model is loaded
    pub fn apply_model_settings(&mut self, model: &Model) {
        match &model.settings.camera {
            Some(camera) => self.update_camera(camera),
            None => self.update_camera(&CameraPatch::zoom(DEFAULT_MODEL_ZOOM)),
        }
        if let Some(canvas) = &model.settings.canvas {
            self.update_canvas(canvas);
        }
    }
}
