//! # Viewer Session
//!
//! [`Viewer`] is what an application embeds: it owns the user settings, the
//! animator and physics, the texture pipeline, the scene composer and the
//! render loop, and wires them together once per tick.
//!
//! The viewer is generic over the [`RenderBackend`] so the whole session can
//! be driven without a GPU.
//!
//! ```no_run
//! # use std::time::Instant;
//! # use codecube::{EngineConfig, Viewer, FileSource, RenderEngine};
//! # fn run(engine: RenderEngine) {
//! let mut viewer = Viewer::new(EngineConfig::from_env(), Ok(engine), Instant::now());
//! viewer.set_source(Some(Box::new(FileSource::new("code.png"))), Instant::now());
//! loop {
//!     viewer.tick(Instant::now(), None);
//! }
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Instant;

use winit::event::{DeviceEvent, KeyEvent};

use crate::animation::{AnimationMode, Animator};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::export::{self, RasterImage};
use crate::gfx::rendering::{FrameOverlay, LoopState, RenderBackend, RenderLoop, Rendered, TeardownStep};
use crate::gfx::resources::{fallback, ImageSource, TexturePipeline, TextureUpdate};
use crate::gfx::scene::{SceneComposer, SceneDescription};
use crate::performance::{PerformanceSample, SampleCallback};
use crate::physics::Physics;
use crate::settings::{ControlCommand, ViewSettings};

/// Longest step fed to the animator and physics, so a stalled window does
/// not make the object jump.
const MAX_TICK_SECONDS: f32 = 0.1;

pub type EventListener = Box<dyn FnMut(&EngineEvent)>;

/// What to show instead of the 3D view once rendering is unavailable.
#[derive(Debug, Clone)]
pub struct FallbackView {
    pub image: RasterImage,
    pub message: String,
}

pub struct Viewer<B: RenderBackend> {
    settings: ViewSettings,
    animator: Animator,
    physics: Physics,
    textures: TexturePipeline,
    composer: SceneComposer,
    render_loop: RenderLoop<B>,
    /// Name of the current source, used for snapshot file names
    content: String,
    last_tick: Option<Instant>,
    listener: Option<EventListener>,
    events: Vec<EngineEvent>,
}

impl<B: RenderBackend> Viewer<B> {
    /// Starts a session. `probe` is the result of creating the backend; an
    /// error, or `force_degraded` in the config, starts in `Degraded`.
    pub fn new(config: EngineConfig, probe: Result<B, EngineError>, now: Instant) -> Self {
        let probe = match probe {
            Ok(mut backend) if config.force_degraded => {
                backend.release();
                Err(EngineError::UnsupportedEnvironment(
                    "3D rendering disabled by configuration".to_string(),
                ))
            }
            other => other,
        };

        let settings = ViewSettings::default();
        let mut composer = SceneComposer::new(&config);
        composer.sync_settings(&settings);

        let render_loop = RenderLoop::new(
            probe,
            config.recovery_delay,
            config.sample_interval,
            config.window_size,
            now,
        );

        let mut viewer = Self {
            animator: Animator::new(settings.animation_mode),
            physics: Physics::new(config.physics),
            textures: TexturePipeline::new(config.texture_timeout, config.fallback_texture_size),
            settings,
            composer,
            render_loop,
            content: String::new(),
            last_tick: None,
            listener: None,
            events: Vec::new(),
        };
        viewer.collect_loop_events();
        viewer
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn state(&self) -> LoopState {
        self.render_loop.state()
    }

    pub fn render_loop(&self) -> &RenderLoop<B> {
        &self.render_loop
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.render_loop.backend_mut()
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn physics(&self) -> &Physics {
        &self.physics
    }

    pub fn composer(&self) -> &SceneComposer {
        &self.composer
    }

    pub fn latest_sample(&self) -> Option<&PerformanceSample> {
        self.render_loop.latest_sample()
    }

    pub fn set_sample_callback(&mut self, callback: SampleCallback) {
        self.render_loop.set_sample_callback(callback);
    }

    /// Events are delivered to the listener as they happen. Without one they
    /// queue up for [`Viewer::take_events`].
    pub fn set_event_listener(&mut self, listener: EventListener) {
        self.listener = Some(listener);
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Replaces the settings wholesale, e.g. after a UI edit.
    pub fn apply_settings(&mut self, mut settings: ViewSettings) {
        // Route through the clamping setters
        settings.set_scale(settings.scale());
        settings.set_rotation(settings.rotation_x(), settings.rotation_y());
        settings.set_background_color(settings.background_color);
        if settings == self.settings {
            return;
        }

        let mode_changed = settings.animation_mode != self.settings.animation_mode;
        if settings.playing && !self.settings.playing {
            // Time spent paused does not count
            self.last_tick = None;
        }
        self.settings = settings;
        if mode_changed {
            self.enter_mode(self.settings.animation_mode);
        }
        self.composer.sync_settings(&self.settings);
        self.render_loop.request_redraw();
    }

    pub fn set_animation_mode(&mut self, mode: AnimationMode) {
        let mut settings = self.settings.clone();
        settings.animation_mode = mode;
        self.apply_settings(settings);
    }

    /// Every mode entry starts from a clean phase and a resting object.
    fn enter_mode(&mut self, mode: AnimationMode) {
        self.animator.set_mode(mode);
        self.physics.reset();
        self.last_tick = None;
    }

    /// Starts loading a new code image. `None` shows the placeholder.
    pub fn set_source(&mut self, source: Option<Box<dyn ImageSource>>, now: Instant) {
        self.content = source
            .as_ref()
            .map(|source| source.name().to_string())
            .unwrap_or_default();
        if let Some(update) = self.textures.acquire(source, now) {
            self.texture_finished(update, now);
        }
    }

    fn texture_finished(&mut self, update: TextureUpdate, now: Instant) {
        let event = match &update {
            TextureUpdate::Ready(texture) => EngineEvent::TextureReady {
                texture_id: texture.id,
            },
            TextureUpdate::Fallback { texture, error } => EngineEvent::TextureFallbackUsed {
                texture_id: texture.id,
                error: error.clone(),
            },
        };
        self.emit(event);
        self.render_loop.texture_available(update.texture(), now);
        self.collect_loop_events();
    }

    /// Applies a keyboard command. Returns whether the view changed.
    ///
    /// Panel toggling, export and quitting belong to the host application
    /// and are ignored here.
    pub fn apply_command(&mut self, command: ControlCommand) -> bool {
        let changed = match command {
            ControlCommand::ResetCamera => {
                self.composer.reset_camera();
                true
            }
            command => {
                let mut settings = self.settings.clone();
                let changed = settings.apply(command);
                if changed {
                    self.apply_settings(settings);
                }
                changed
            }
        };
        if changed {
            self.render_loop.request_redraw();
        }
        changed
    }

    /// Feeds a raw pointer event to the camera controls. In interactive mode
    /// dragging pushes the object instead of orbiting.
    pub fn pointer_event(&mut self, event: &DeviceEvent) {
        let outcome = self
            .composer
            .handle_pointer(event, self.settings.animation_mode);
        if let Some((dx, dy)) = outcome.object_drag {
            self.pointer_drag(dx, dy);
        }
        if outcome.camera_changed || outcome.interaction_changed {
            self.render_loop.request_redraw();
        }
    }

    /// Drag of `dx`, `dy` pixels on the object. Only interactive mode reacts.
    pub fn pointer_drag(&mut self, dx: f32, dy: f32) {
        if self.settings.animation_mode != AnimationMode::Interactive {
            return;
        }
        self.physics.apply_drag(dx, dy);
        self.render_loop.request_redraw();
    }

    /// Camera keys (Shift+C reset). Returns whether the camera was reset.
    pub fn key_event(&mut self, event: &KeyEvent) -> bool {
        let reset = self.composer.handle_key(event);
        if reset {
            self.render_loop.request_redraw();
        }
        reset
    }

    pub fn is_shift_held(&self) -> bool {
        self.composer.is_shift_held()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.composer.resize(width, height);
        self.render_loop.resize(width, height);
    }

    /// Asks for one more frame, e.g. when an overlay changed.
    pub fn request_redraw(&mut self) {
        self.render_loop.request_redraw();
    }

    /// Whether the host should keep scheduling ticks without new input.
    pub fn wants_frame(&self) -> bool {
        self.textures.is_loading() || self.render_loop.wants_frame(self.is_continuous())
    }

    fn is_continuous(&self) -> bool {
        self.settings.is_animating()
    }

    /// One step of the session: finishes texture loads, advances animation
    /// and physics, and renders if a frame is due.
    pub fn tick(&mut self, now: Instant, overlay: Option<&mut dyn FrameOverlay>) -> Option<Rendered> {
        if !self.render_loop.is_running() {
            return None;
        }
        if let Some(update) = self.textures.poll(now) {
            self.texture_finished(update, now);
        }

        let delta = self
            .last_tick
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0)
            .min(MAX_TICK_SECONDS);
        self.last_tick = Some(now);

        let scene = self.advance(delta);
        let rendered = self.render_loop.frame(
            now,
            &scene,
            self.textures.current(),
            self.is_continuous(),
            overlay,
        );
        self.collect_loop_events();
        rendered
    }

    fn advance(&mut self, delta: f32) -> SceneDescription {
        let angles = self.settings.static_angles();
        let transform = if self.settings.playing {
            let physics = if self.settings.animation_mode == AnimationMode::Interactive {
                self.physics.integrate(delta)
            } else {
                self.physics.output()
            };
            self.composer.update(delta);
            self.animator.advance(delta, angles, physics)
        } else {
            self.animator.current(angles, self.physics.output())
        };

        self.composer
            .compose(&self.settings, &transform, self.settings.style.parameters())
    }

    /// Current frame as an image. Outside `Rendering` this is a fixed
    /// placeholder.
    pub fn export_snapshot(&mut self) -> Result<RasterImage, EngineError> {
        let angles = self.settings.static_angles();
        let transform = self.animator.current(angles, self.physics.output());
        let scene = self
            .composer
            .compose(&self.settings, &transform, self.settings.style.parameters());
        let image = self.render_loop.export_snapshot(&scene);
        self.collect_loop_events();
        image
    }

    /// Exports and writes a PNG into `dir`.
    pub fn save_snapshot(&mut self, dir: &Path) -> Result<PathBuf, EngineError> {
        let image = self.export_snapshot()?;
        export::save_snapshot(&image, dir, &self.content)
    }

    /// The static 2-D view for `Degraded`: the decoded code image when there
    /// is one, else the placeholder.
    pub fn fallback_view(&self) -> FallbackView {
        let (width, height) = self.render_loop.surface_size();
        let image = match self.textures.current() {
            Some(texture) if !texture.is_fallback() => (*texture.image).clone(),
            _ => fallback::placeholder(width, height, fallback::NO_PREVIEW_LABEL),
        };
        let message = match self.render_loop.degraded_reason() {
            Some(reason) => format!("3D preview unavailable ({reason}); showing the 2D image"),
            None => "3D preview unavailable; showing the 2D image".to_string(),
        };
        FallbackView { image, message }
    }

    /// Stops everything in order and frees every resource. Idempotent.
    pub fn teardown(&mut self) -> Vec<TeardownStep> {
        let mut steps = self.render_loop.teardown();
        if steps.is_empty() {
            return steps;
        }

        self.textures.release_all();
        steps.push(TeardownStep::RevokeImageHandles);

        self.collect_loop_events();
        self.listener = None;
        steps.push(TeardownStep::DetachListeners);

        log::info!("viewer torn down");
        steps
    }

    fn collect_loop_events(&mut self) {
        for event in self.render_loop.take_events() {
            self.emit(event);
        }
    }

    fn emit(&mut self, event: EngineEvent) {
        if event.is_warning() {
            let context = format!(
                "mode {}, style {}, texture {:?}",
                self.settings.animation_mode.name(),
                self.settings.style.name(),
                self.textures.current().map(|texture| texture.kind)
            );
            match &event {
                EngineEvent::Degraded { .. } => log::error!("{event:?} ({context})"),
                _ => log::warn!("{event:?} ({context})"),
            }
        }
        match self.listener.as_mut() {
            Some(listener) => listener(&event),
            None => self.events.push(event),
        }
    }
}
