// src/lib.rs
//! CodeCube
//!
//! Renders a 2D scannable-code image as an animated, interactive 3D object
//! using wgpu and winit.
//!
//! [`Viewer`] is the embeddable session; [`CodeCubeApp`] wraps it in a
//! desktop window with a settings panel.

pub mod animation;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod gfx;
pub mod performance;
pub mod physics;
pub mod settings;
pub mod ui;
pub mod viewer;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use animation::AnimationMode;
pub use app::CodeCubeApp;
pub use config::EngineConfig;
pub use error::{EngineError, RenderError, TextureLoadError};
pub use events::EngineEvent;
pub use gfx::rendering::{LoopState, RenderBackend, RenderEngine, TeardownStep};
pub use gfx::resources::{FileSource, ImageSource, MaterialStyle, MemorySource, RasterSource};
pub use performance::PerformanceSample;
pub use settings::{ControlCommand, PerformanceTier, ViewSettings};
pub use viewer::{FallbackView, Viewer};
