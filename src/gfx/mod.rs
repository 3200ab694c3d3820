//! # Graphics Module
//!
//! Everything between a code image and pixels on screen:
//!
//! - **Camera System** ([`camera`]) - orbit camera with bounded zoom
//! - **Geometry** ([`geometry`]) - the card, ground and grid meshes
//! - **Resources** ([`resources`]) - texture acquisition, materials, bindings
//! - **Scene** ([`scene`]) - per-frame scene description
//! - **Rendering** ([`rendering`]) - wgpu backend and the render loop

pub mod camera;
pub mod geometry;
pub mod rendering;
pub mod resources;
pub mod scene;

pub use camera::OrbitCamera;
pub use rendering::RenderEngine;
