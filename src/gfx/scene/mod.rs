//! # Scene Composition
//!
//! - [`SceneComposer`] - camera, lights and environment for each frame
//! - [`SceneDescription`] - what the renderer draws
//! - [`Vertex3D`] - GPU vertex layout

pub mod composer;
pub mod vertex;

pub use composer::{
    DirectionalLight, GridSpec, GroundPlane, LightRig, SceneComposer, SceneDescription, CARD_SIZE,
};
pub use vertex::Vertex3D;
