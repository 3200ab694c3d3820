//! # User Interface Module
//!
//! Dear ImGui layer of the desktop viewer.
//!
//! - [`UiManager`] integrates ImGui with winit and wgpu and draws the UI on
//!   top of each rendered frame through [`FrameOverlay`]
//! - [`panel`] holds the settings panel
//!
//! When the UI has focus, pointer and keyboard input stays out of the camera
//! and the drag physics.
//!
//! [`FrameOverlay`]: crate::gfx::rendering::FrameOverlay

pub mod manager;
pub mod panel;

pub use manager::UiManager;
pub use panel::{settings_panel, PanelActions};
