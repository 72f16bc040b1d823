//! Turntable Core - scene components, settings, and capture records
//!
//! This crate provides the state behind the model viewer:
//! - Type catalog, component registry, and the component tree store
//! - Scene settings (camera and canvas) with deep-overlay patches
//! - Fixed camera positions for multi-view capture
//! - Screenshot log and model library over a pluggable blob store
//! - Render plan derived from the component tree

pub mod catalog;
pub mod component;
pub mod model;
pub mod plan;
pub mod position;
pub mod registry;
pub mod screenshot;
pub mod settings;
pub mod store;
pub mod tree;

pub use catalog::{catalog, infer_control, ComponentDescriptor, ControlDescriptor, DisplayFormat};
pub use component::{
    ComponentError, ComponentId, ComponentKind, ComponentSettings, SceneComponent, SettingValue,
    SettingsPatch,
};
pub use model::{
    fit_zoom, Model, ModelError, ModelId, ModelLibrary, ModelSettings, ModelUpdate, NewModel,
};
pub use plan::{Effect, MeshPlan, RenderPlan};
pub use position::{calculate_positions, Position, CUSTOM_VIEW, ORIGIN, POSITION_COUNT};
pub use registry::{ComponentRegistry, SceneTemplate, TemplateNode};
pub use screenshot::{archive_name, ExportEntry, Screenshot, ScreenshotError, ScreenshotLog};
pub use settings::{
    CameraPatch, CameraSettings, CanvasPatch, CanvasSettings, SceneSettings, DEFAULT_MODEL_ZOOM,
};
pub use store::{BlobStore, DirBlobStore, MemoryBlobStore, StoreError};
pub use tree::{ComponentTree, TreeEvent, WalkEntry};
