//! Desktop viewer application
//!
//! Opens a window, probes the GPU and drives a [`Viewer`] from the winit
//! event loop. Frames are scheduled on demand: only while the viewer is
//! animating, loading or recovering, or while the settings panel is open.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    error::EventLoopError,
    event::{DeviceEvent, DeviceId, ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowAttributes, WindowId},
};

use crate::config::EngineConfig;
use crate::events::EngineEvent;
use crate::gfx::rendering::{FrameOverlay, LoopState, RenderEngine};
use crate::gfx::resources::ImageSource;
use crate::settings::{ControlCommand, ViewSettings};
use crate::ui::{self, PanelActions, UiManager};
use crate::viewer::Viewer;

const WINDOW_TITLE: &str = "codecube";

pub struct CodeCubeApp {
    event_loop: EventLoop<()>,
    app_state: AppState,
}

struct AppState {
    config: EngineConfig,
    /// Handed to the viewer once the window exists
    pending_source: Option<Box<dyn ImageSource>>,
    export_dir: PathBuf,
    window: Option<Arc<Window>>,
    viewer: Option<Viewer<RenderEngine>>,
    ui_manager: Option<UiManager>,
    show_panel: bool,
}

impl CodeCubeApp {
    /// Snapshots (D key, panel button) are written to `export_dir`.
    pub fn new(
        config: EngineConfig,
        source: Option<Box<dyn ImageSource>>,
        export_dir: impl Into<PathBuf>,
    ) -> Result<Self, EventLoopError> {
        let event_loop = EventLoop::new()?;
        Ok(Self {
            event_loop,
            app_state: AppState {
                config,
                pending_source: source,
                export_dir: export_dir.into(),
                window: None,
                viewer: None,
                ui_manager: None,
                show_panel: false,
            },
        })
    }

    /// Runs until the window closes. Teardown happens before this returns.
    pub fn run(self) -> Result<(), EventLoopError> {
        let Self {
            event_loop,
            mut app_state,
        } = self;
        event_loop.set_control_flow(ControlFlow::Wait);
        event_loop.run_app(&mut app_state)
    }
}

impl AppState {
    fn keyboard_input(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        viewer.key_event(event);

        if event.state != ElementState::Pressed {
            return;
        }
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let Some(command) = ControlCommand::from_key(code, viewer.is_shift_held()) else {
            return;
        };
        let repeatable = matches!(
            command,
            ControlCommand::YawLeft
                | ControlCommand::YawRight
                | ControlCommand::PitchUp
                | ControlCommand::PitchDown
                | ControlCommand::ScaleUp
                | ControlCommand::ScaleDown
        );
        if event.repeat && !repeatable {
            return;
        }

        match command {
            ControlCommand::Quit => event_loop.exit(),
            ControlCommand::ToggleSettingsPanel => {
                self.show_panel = !self.show_panel;
                viewer.request_redraw();
            }
            ControlCommand::ExportSnapshot => match viewer.save_snapshot(&self.export_dir) {
                Ok(path) => log::info!("snapshot saved to {}", path.display()),
                Err(err) => log::error!("snapshot failed: {err}"),
            },
            command => {
                viewer.apply_command(command);
            }
        }

        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn redraw(&mut self, window: &Window) {
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        if viewer.state() == LoopState::Degraded {
            return;
        }

        let mut actions = PanelActions::default();
        let mut edited = viewer.settings().clone();
        if let Some(ui_manager) = self.ui_manager.as_mut() {
            let show_panel = self.show_panel;
            let performance = viewer.render_loop().performance();
            ui_manager.prepare(window, |ui| {
                if show_panel {
                    actions = ui::settings_panel(ui, &mut edited);
                    performance.render_ui(ui);
                } else {
                    performance.render_overlay(ui);
                }
            });
            if show_panel {
                viewer.request_redraw();
            }
        }

        if actions.settings_changed {
            viewer.apply_settings(edited);
        }
        if actions.reset_camera {
            viewer.apply_command(ControlCommand::ResetCamera);
        }
        if actions.export_snapshot {
            match viewer.save_snapshot(&self.export_dir) {
                Ok(path) => log::info!("snapshot saved to {}", path.display()),
                Err(err) => log::error!("snapshot failed: {err}"),
            }
        }

        let overlay = self
            .ui_manager
            .as_mut()
            .map(|ui_manager| ui_manager as &mut dyn FrameOverlay);
        viewer.tick(Instant::now(), overlay);
        self.handle_viewer_events();
    }

    /// Keeps the UI renderer in step with the GPU context.
    fn handle_viewer_events(&mut self) {
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        for event in viewer.take_events() {
            match event {
                EngineEvent::ContextLost { .. } => {
                    // Its buffers belong to the dead device
                    self.ui_manager = None;
                }
                EngineEvent::ContextRecovered => {
                    if let Some(window) = self.window.as_ref() {
                        self.ui_manager = create_ui(viewer, window);
                    }
                }
                EngineEvent::Degraded { .. } => {
                    self.ui_manager = None;
                    let fallback = viewer.fallback_view();
                    log::warn!(
                        "{} ({}x{} image available to the host)",
                        fallback.message,
                        fallback.image.width(),
                        fallback.image.height()
                    );
                    if let Some(window) = self.window.as_ref() {
                        window.set_title(&format!("{WINDOW_TITLE} - {}", fallback.message));
                    }
                }
                other => log::debug!("{other:?}"),
            }
        }
    }
}

fn create_ui(viewer: &mut Viewer<RenderEngine>, window: &Window) -> Option<UiManager> {
    let engine = viewer.backend_mut()?;
    Some(UiManager::new(
        engine.device(),
        engine.queue(),
        engine.surface_format(),
        window,
    ))
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.config.window_size;
        let attributes = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(width, height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };

        let (width, height) = window.inner_size().into();
        let shadow_map_size = ViewSettings::default()
            .performance_tier
            .shadow_map_size();
        let probe = pollster::block_on(RenderEngine::new(
            window.clone(),
            width,
            height,
            shadow_map_size,
        ));
        if let Err(err) = &probe {
            log::warn!("GPU probe failed: {err}");
        }

        let now = Instant::now();
        let mut viewer = Viewer::new(self.config.clone(), probe, now);
        viewer.resize(width, height);
        self.ui_manager = create_ui(&mut viewer, &window);
        viewer.set_source(self.pending_source.take(), now);

        self.viewer = Some(viewer);
        self.window = Some(window.clone());
        self.handle_viewer_events();
        window.request_redraw();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };

        // Handle UI input first
        if let Some(ui_manager) = self.ui_manager.as_mut() {
            let ui_event: Event<()> = Event::WindowEvent {
                window_id,
                event: event.clone(),
            };
            if ui_manager.handle_input(&window, &ui_event) {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.request_redraw();
                }
                window.request_redraw();
                return;
            }
        }

        match event {
            WindowEvent::KeyboardInput {
                event: key_event, ..
            } => self.keyboard_input(event_loop, &key_event),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.resize(width, height);
                }
                window.request_redraw();
            }
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => self.redraw(&window),
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        // Don't move the camera or the object while the UI is active
        if let Some(ui_manager) = self.ui_manager.as_ref() {
            if ui_manager.wants_input() {
                return;
            }
        }
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.pointer_event(&event);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        let (Some(window), Some(viewer)) = (self.window.as_ref(), self.viewer.as_ref()) else {
            return;
        };
        if viewer.wants_frame() || (self.show_panel && self.ui_manager.is_some()) {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.ui_manager = None;
        if let Some(viewer) = self.viewer.as_mut() {
            let steps = viewer.teardown();
            log::debug!("teardown steps: {steps:?}");
        }
    }
}
