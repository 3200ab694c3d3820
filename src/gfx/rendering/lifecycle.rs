//! # Render Loop & Resource Lifecycle
//!
//! [`RenderLoop`] owns the rendering backend exclusively and moves through
//! four states:
//!
//! ```text
//!  Idle ──texture──▶ Rendering ──loss──▶ ContextLost ──recovered──▶ Rendering
//!                                              │
//!                                              └──failed──▶ Degraded
//! ```
//!
//! A failed capability probe goes straight to `Degraded`. Context loss
//! schedules exactly one recovery attempt after a short delay; the attempt is
//! made from the frame tick once the deadline has passed, so nothing blocks.
//! `Degraded` is final for the session and the backend is released.

use std::time::{Duration, Instant};

use super::backend::{FrameOverlay, RenderBackend, Rendered};
use crate::error::{EngineError, RenderError};
use crate::events::EngineEvent;
use crate::export::{self, RasterImage};
use crate::gfx::resources::Texture;
use crate::gfx::scene::SceneDescription;
use crate::performance::{PerformanceMonitor, PerformanceSample, SampleCallback};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Rendering,
    ContextLost,
    Degraded,
}

/// Teardown stages in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    StopFrameLoop,
    CancelTimers,
    ReleaseGpuResources,
    RevokeImageHandles,
    DetachListeners,
}

pub struct RenderLoop<B: RenderBackend> {
    backend: Option<B>,
    state: LoopState,
    degraded_reason: Option<String>,
    recovery_delay: Duration,
    /// One-shot recovery timer
    recovery_at: Option<Instant>,
    uploaded_texture: Option<u64>,
    redraw_requested: bool,
    surface_size: (u32, u32),
    monitor: PerformanceMonitor,
    events: Vec<EngineEvent>,
    running: bool,
}

impl<B: RenderBackend> RenderLoop<B> {
    /// `probe` is the outcome of creating the backend. Failure means the
    /// environment cannot do 3D at all.
    pub fn new(
        probe: Result<B, EngineError>,
        recovery_delay: Duration,
        sample_interval: Duration,
        surface_size: (u32, u32),
        now: Instant,
    ) -> Self {
        let mut render_loop = Self {
            backend: None,
            state: LoopState::Idle,
            degraded_reason: None,
            recovery_delay,
            recovery_at: None,
            uploaded_texture: None,
            redraw_requested: true,
            surface_size,
            monitor: PerformanceMonitor::new(sample_interval, now),
            events: Vec::new(),
            running: true,
        };
        match probe {
            Ok(backend) => render_loop.backend = Some(backend),
            Err(err) => render_loop.degrade(err.to_string()),
        }
        render_loop
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        self.degraded_reason.as_deref()
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }

    pub fn set_sample_callback(&mut self, callback: SampleCallback) {
        self.monitor.set_callback(callback);
    }

    pub fn performance(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    pub fn latest_sample(&self) -> Option<&PerformanceSample> {
        self.monitor.latest()
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Asks for one frame even when nothing is animating.
    pub fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    /// Whether the next tick will draw, given whether the scene animates.
    pub fn wants_frame(&self, continuous: bool) -> bool {
        match self.state {
            LoopState::Rendering => continuous || self.redraw_requested,
            LoopState::ContextLost => true,
            LoopState::Idle | LoopState::Degraded => false,
        }
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface_size = (width.max(1), height.max(1));
        if let Some(backend) = self.backend.as_mut() {
            backend.resize(self.surface_size.0, self.surface_size.1);
        }
        self.redraw_requested = true;
    }

    /// Binds a new texture. The first one moves `Idle` to `Rendering`.
    pub fn texture_available(&mut self, texture: &Texture, now: Instant) {
        if !self.running || self.uploaded_texture == Some(texture.id) {
            return;
        }
        if !matches!(self.state, LoopState::Idle | LoopState::Rendering) {
            // Uploaded after recovery instead
            return;
        }
        let Some(backend) = self.backend.as_mut() else {
            return;
        };

        match backend.upload_texture(texture) {
            Ok(()) => {
                self.uploaded_texture = Some(texture.id);
                self.redraw_requested = true;
                if self.state == LoopState::Idle {
                    log::info!("first texture bound, rendering starts");
                    self.state = LoopState::Rendering;
                    self.monitor.reset(now);
                }
            }
            Err(err) if err.is_context_loss() => self.context_lost(err.to_string(), now),
            Err(err) => log::error!("texture {} upload failed: {err}", texture.id),
        }
    }

    /// Reports a context loss detected outside a render call.
    pub fn context_lost(&mut self, reason: String, now: Instant) {
        if !self.running || !matches!(self.state, LoopState::Rendering | LoopState::Idle) {
            return;
        }
        log::warn!("rendering context lost: {reason}; retrying in {:?}", self.recovery_delay);
        self.state = LoopState::ContextLost;
        self.uploaded_texture = None;
        self.recovery_at = Some(now + self.recovery_delay);
        self.events.push(EngineEvent::ContextLost { reason });
    }

    /// Runs one tick: the pending recovery attempt if due, then a frame if
    /// one is wanted. Returns what the frame reported.
    pub fn frame(
        &mut self,
        now: Instant,
        scene: &SceneDescription,
        texture: Option<&Texture>,
        continuous: bool,
        overlay: Option<&mut dyn FrameOverlay>,
    ) -> Option<Rendered> {
        if !self.running {
            return None;
        }
        if self.state == LoopState::ContextLost {
            self.try_recover(now, texture);
        }
        if !self.wants_frame(continuous) || self.state != LoopState::Rendering {
            return None;
        }

        let backend = self.backend.as_mut()?;
        let started = Instant::now();
        match backend.render(scene, overlay) {
            Ok(rendered) => {
                self.redraw_requested = false;
                self.monitor
                    .record_frame(now, started.elapsed(), rendered.counters);
                log::trace!("frame rendered: {:?}", rendered.counters);
                Some(rendered)
            }
            Err(RenderError::ContextLost(reason)) => {
                self.context_lost(reason, now);
                None
            }
            Err(RenderError::SurfaceTimeout) => {
                log::debug!("surface timeout, frame skipped");
                None
            }
            Err(err) => {
                log::error!("frame failed: {err}");
                self.redraw_requested = false;
                None
            }
        }
    }

    fn try_recover(&mut self, now: Instant, texture: Option<&Texture>) {
        let Some(deadline) = self.recovery_at else {
            return;
        };
        if now < deadline {
            return;
        }
        self.recovery_at = None;

        let Some(backend) = self.backend.as_mut() else {
            self.degrade("no backend to recover".to_string());
            return;
        };

        let result = backend
            .recover()
            .and_then(|()| match texture {
                Some(texture) => backend.upload_texture(texture).map(|()| Some(texture.id)),
                None => Ok(None),
            });

        match result {
            Ok(uploaded) => {
                log::info!("rendering context recovered");
                self.uploaded_texture = uploaded;
                self.state = if uploaded.is_some() {
                    LoopState::Rendering
                } else {
                    LoopState::Idle
                };
                self.redraw_requested = true;
                self.monitor.reset(now);
                self.events.push(EngineEvent::ContextRecovered);
            }
            Err(err) => {
                let reason = EngineError::RecoveryFailed(err.to_string()).to_string();
                self.degrade(reason);
            }
        }
    }

    fn degrade(&mut self, reason: String) {
        log::error!("3D rendering disabled: {reason}");
        self.state = LoopState::Degraded;
        self.recovery_at = None;
        self.uploaded_texture = None;
        if let Some(mut backend) = self.backend.take() {
            backend.release();
        }
        self.degraded_reason = Some(reason.clone());
        self.events.push(EngineEvent::Degraded { reason });
    }

    /// Current frame as a raster. Outside `Rendering` this is a fixed
    /// placeholder of the surface size.
    pub fn export_snapshot(&mut self, scene: &SceneDescription) -> Result<RasterImage, EngineError> {
        if !self.running {
            return Err(EngineError::TornDown);
        }
        let (width, height) = self.surface_size;
        match (self.state, self.backend.as_mut()) {
            (LoopState::Rendering, Some(backend)) => match backend.capture(scene) {
                Ok(image) => Ok(image),
                Err(err) if err.is_context_loss() => {
                    self.context_lost(err.to_string(), Instant::now());
                    Err(EngineError::Export(err.to_string()))
                }
                Err(err) => Err(EngineError::Export(err.to_string())),
            },
            _ => Ok(export::degraded_placeholder(width, height)),
        }
    }

    /// Stops the loop and frees the GPU. Later calls do nothing.
    pub fn teardown(&mut self) -> Vec<TeardownStep> {
        if !self.running {
            return Vec::new();
        }
        let mut steps = Vec::with_capacity(3);

        self.running = false;
        self.redraw_requested = false;
        steps.push(TeardownStep::StopFrameLoop);

        if let Some(deadline) = self.recovery_at.take() {
            log::debug!("cancelled recovery scheduled for {deadline:?}");
        }
        steps.push(TeardownStep::CancelTimers);

        if let Some(mut backend) = self.backend.take() {
            backend.release();
        }
        self.uploaded_texture = None;
        steps.push(TeardownStep::ReleaseGpuResources);

        steps
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}
