//! Turntable Capture - multi-view capture and session services
//!
//! The renderer and model source are reached through the `Renderer` and
//! `ModelProvider` traits. `Session` ties them to the stores of one
//! workspace directory.

pub mod backend;
pub mod orchestrator;
pub mod session;
pub mod zoom;

pub use backend::{ModelProvider, ModelRef, RenderError, Renderer};
pub use orchestrator::{
    CaptureConfig, CaptureError, CaptureEvent, CaptureMode, CaptureOrchestrator, CaptureOutcome,
    CaptureReport, CaptureState, SettleConfig, StopHandle,
};
pub use session::{Session, SessionConfig, SessionError};
pub use zoom::ZoomTracker;
