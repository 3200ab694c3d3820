//! Rendering backend and lifecycle
//!
//! [`RenderLoop`] decides when frames are drawn and handles context loss;
//! [`RenderEngine`] does the drawing with wgpu behind the [`RenderBackend`]
//! seam.

pub mod backend;
pub mod lifecycle;
pub mod pipeline_manager;
pub mod render_engine;
pub mod render_pass_ext;

pub use backend::{FrameOverlay, RenderBackend, Rendered};
pub use lifecycle::{LoopState, RenderLoop, TeardownStep};
pub use pipeline_manager::{PipelineConfig, PipelineManager};
pub use render_engine::RenderEngine;
