//! GPU resources and the texture acquisition pipeline
//!
//! Handles the code texture from source to GPU, the material catalogue and
//! the bind groups shared by the pipelines.

pub mod fallback;
pub mod global_bindings;
pub mod material;
pub mod texture_pipeline;
pub mod texture_resource;

pub use global_bindings::{GlobalBindings, GlobalUniform, ObjectBindings, ShadowBindings};
pub use material::{MaterialBindings, MaterialParams, MaterialStyle};
pub use texture_pipeline::{
    FileSource, ImageSource, MemorySource, RasterSource, SourcePayload, Texture, TextureKind,
    TexturePipeline, TextureUpdate,
};
pub use texture_resource::TextureResource;
