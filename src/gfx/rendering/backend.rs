//! The seam between the lifecycle manager and the GPU.
//!
//! [`RenderEngine`](super::RenderEngine) implements [`RenderBackend`] on top of
//! wgpu; tests drive the lifecycle with an in-memory implementation.

use image::RgbaImage;

use crate::error::RenderResult;
use crate::gfx::resources::Texture;
use crate::gfx::scene::SceneDescription;
use crate::performance::RendererCounters;

/// What a successful render attempt reports back.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rendered {
    pub counters: RendererCounters,
}

/// Something drawn on top of the 3D scene inside the same frame, e.g. the UI.
pub trait FrameOverlay {
    fn render_overlay(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
    ) -> RenderResult<()>;
}

pub trait RenderBackend {
    /// Replaces the code texture. The previous GPU texture is released once
    /// the new one is bound.
    fn upload_texture(&mut self, texture: &Texture) -> RenderResult<()>;

    /// Draws one frame to the drawable surface.
    fn render(
        &mut self,
        scene: &SceneDescription,
        overlay: Option<&mut dyn FrameOverlay>,
    ) -> RenderResult<Rendered>;

    /// Draws one frame offscreen and reads it back as RGBA8.
    fn capture(&mut self, scene: &SceneDescription) -> RenderResult<RgbaImage>;

    fn resize(&mut self, width: u32, height: u32);

    /// Rebuilds the rendering context after a loss. The texture is
    /// re-uploaded by the caller afterwards.
    fn recover(&mut self) -> RenderResult<()>;

    /// Frees every GPU resource. No other method is called afterwards.
    fn release(&mut self);
}
