//! Session-level behaviour of the viewer, driven through a scripted backend
//! so no GPU is needed.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use image::{Rgba, RgbaImage};

use codecube::error::RenderResult;
use codecube::gfx::rendering::{FrameOverlay, Rendered};
use codecube::gfx::resources::{SourcePayload, Texture};
use codecube::gfx::scene::SceneDescription;
use codecube::performance::RendererCounters;
use codecube::physics::PhysicsState;
use codecube::{
    AnimationMode, ControlCommand, EngineConfig, EngineError, EngineEvent, ImageSource, LoopState,
    RasterSource, RenderBackend, RenderError, TeardownStep, TextureLoadError, Viewer,
};

#[derive(Default)]
struct Script {
    calls: Vec<String>,
    fail_next_render: Option<RenderError>,
    fail_recover: bool,
    releases: u32,
}

struct ScriptedBackend {
    script: Rc<RefCell<Script>>,
}

impl RenderBackend for ScriptedBackend {
    fn upload_texture(&mut self, texture: &Texture) -> RenderResult<()> {
        self.script
            .borrow_mut()
            .calls
            .push(format!("upload {}", texture.id));
        Ok(())
    }

    fn render(
        &mut self,
        scene: &SceneDescription,
        _overlay: Option<&mut dyn FrameOverlay>,
    ) -> RenderResult<Rendered> {
        let mut script = self.script.borrow_mut();
        if let Some(err) = script.fail_next_render.take() {
            return Err(err);
        }
        script.calls.push("render".to_string());
        Ok(Rendered {
            counters: RendererCounters {
                triangles: scene.triangle_count(),
                draw_calls: scene.draw_calls(),
                memory_bytes: None,
            },
        })
    }

    fn capture(&mut self, _scene: &SceneDescription) -> RenderResult<RgbaImage> {
        self.script.borrow_mut().calls.push("capture".to_string());
        Ok(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])))
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.script
            .borrow_mut()
            .calls
            .push(format!("resize {width}x{height}"));
    }

    fn recover(&mut self) -> RenderResult<()> {
        let mut script = self.script.borrow_mut();
        script.calls.push("recover".to_string());
        if script.fail_recover {
            Err(RenderError::ContextLost("device still gone".to_string()))
        } else {
            Ok(())
        }
    }

    fn release(&mut self) {
        let mut script = self.script.borrow_mut();
        script.releases += 1;
        script.calls.push("release".to_string());
    }
}

/// Never finishes loading; counts how often its handle is revoked.
struct StalledSource {
    releases: Rc<RefCell<u32>>,
}

impl ImageSource for StalledSource {
    fn name(&self) -> &str {
        "stalled"
    }

    fn fetch(&self) -> LocalBoxFuture<'static, Result<SourcePayload, TextureLoadError>> {
        future::pending().boxed_local()
    }

    fn release(&mut self) {
        *self.releases.borrow_mut() += 1;
    }
}

/// Loads instantly; counts releases.
struct CountedSource {
    releases: Rc<RefCell<u32>>,
}

impl ImageSource for CountedSource {
    fn name(&self) -> &str {
        "counted"
    }

    fn fetch(&self) -> LocalBoxFuture<'static, Result<SourcePayload, TextureLoadError>> {
        future::ready(Ok(SourcePayload::Rgba {
            width: 2,
            height: 2,
            pixels: vec![0; 16],
        }))
        .boxed_local()
    }

    fn release(&mut self) {
        *self.releases.borrow_mut() += 1;
    }
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn config() -> EngineConfig {
    EngineConfig::default()
        .with_recovery_delay(ms(250))
        .with_texture_timeout(ms(500))
        .with_sample_interval(Duration::from_secs(1))
        .with_window_size(64, 48)
}

fn viewer_with(config: EngineConfig, now: Instant) -> (Viewer<ScriptedBackend>, Rc<RefCell<Script>>) {
    let script = Rc::new(RefCell::new(Script::default()));
    let backend = ScriptedBackend {
        script: script.clone(),
    };
    (Viewer::new(config, Ok(backend), now), script)
}

fn code_source() -> Box<dyn ImageSource> {
    Box::new(RasterSource::new(
        "https://example.com",
        RgbaImage::from_pixel(21, 21, Rgba([0, 0, 0, 255])),
    ))
}

/// A viewer that has drawn its first frame.
fn rendering_viewer(start: Instant) -> (Viewer<ScriptedBackend>, Rc<RefCell<Script>>) {
    let (mut viewer, script) = viewer_with(config(), start);
    viewer.set_source(Some(code_source()), start);
    assert!(viewer.tick(start, None).is_some());
    viewer.take_events();
    (viewer, script)
}

#[test]
fn stays_idle_until_first_texture() {
    let start = Instant::now();
    let (mut viewer, script) = viewer_with(config(), start);

    assert_eq!(viewer.state(), LoopState::Idle);
    assert!(!viewer.wants_frame());
    assert!(viewer.tick(start, None).is_none());
    assert!(script.borrow().calls.is_empty());

    viewer.set_source(Some(code_source()), start);
    assert_eq!(viewer.state(), LoopState::Rendering);
    assert!(matches!(
        viewer.take_events().as_slice(),
        [EngineEvent::TextureReady { .. }]
    ));

    let rendered = viewer.tick(start + ms(16), None).expect("first frame");
    assert!(rendered.counters.triangles >= 2);
    assert!(rendered.counters.draw_calls >= 1);
    assert_eq!(script.borrow().calls, vec!["upload 1", "render"]);
}

#[test]
fn static_view_renders_on_demand() {
    let start = Instant::now();
    let (mut viewer, script) = rendering_viewer(start);

    assert_eq!(viewer.settings().animation_mode, AnimationMode::Static);
    assert!(!viewer.wants_frame());
    assert!(viewer.tick(start + ms(16), None).is_none());

    assert!(viewer.apply_command(ControlCommand::YawRight));
    assert!(viewer.wants_frame());
    assert!(viewer.tick(start + ms(32), None).is_some());
    assert!(viewer.tick(start + ms(48), None).is_none());

    let renders = script.borrow().calls.iter().filter(|c| *c == "render").count();
    assert_eq!(renders, 2);
}

#[test]
fn animated_modes_render_every_tick() {
    let start = Instant::now();
    let (mut viewer, _script) = rendering_viewer(start);
    viewer.set_animation_mode(AnimationMode::Rotate);

    for frame in 1..=5 {
        assert!(viewer.tick(start + ms(16 * frame), None).is_some());
    }

    viewer.apply_command(ControlCommand::TogglePlay);
    assert!(!viewer.settings().playing);
    // The pause itself is drawn once, then nothing
    assert!(viewer.tick(start + ms(100), None).is_some());
    assert!(viewer.tick(start + ms(116), None).is_none());
}

#[test]
fn context_loss_recovers_after_delay() {
    let start = Instant::now();
    let (mut viewer, script) = rendering_viewer(start);

    script.borrow_mut().fail_next_render = Some(RenderError::ContextLost("device reset".into()));
    viewer.request_redraw();
    assert!(viewer.tick(start + ms(16), None).is_none());
    assert_eq!(viewer.state(), LoopState::ContextLost);

    // Not before the delay
    assert!(viewer.tick(start + ms(100), None).is_none());
    assert!(!script.borrow().calls.contains(&"recover".to_string()));

    let rendered = viewer.tick(start + ms(300), None);
    assert!(rendered.is_some());
    assert_eq!(viewer.state(), LoopState::Rendering);

    let calls = script.borrow().calls.clone();
    let tail: Vec<&str> = calls.iter().rev().take(3).rev().map(String::as_str).collect();
    assert_eq!(tail, vec!["recover", "upload 1", "render"]);

    let events = viewer.take_events();
    assert!(matches!(
        events.as_slice(),
        [EngineEvent::ContextLost { .. }, EngineEvent::ContextRecovered]
    ));
}

#[test]
fn failed_recovery_degrades_for_good() {
    let start = Instant::now();
    let (mut viewer, script) = rendering_viewer(start);
    script.borrow_mut().fail_recover = true;
    script.borrow_mut().fail_next_render = Some(RenderError::ContextLost("device reset".into()));

    viewer.request_redraw();
    viewer.tick(start + ms(16), None);
    viewer.tick(start + ms(300), None);

    assert_eq!(viewer.state(), LoopState::Degraded);
    assert_eq!(script.borrow().releases, 1);
    assert!(!viewer.wants_frame());
    assert!(viewer.tick(start + ms(600), None).is_none());

    let recoveries = script.borrow().calls.iter().filter(|c| *c == "recover").count();
    assert_eq!(recoveries, 1);

    let events = viewer.take_events();
    assert!(matches!(events.last(), Some(EngineEvent::Degraded { .. })));

    // The decoded code image is still available as a flat view
    let fallback = viewer.fallback_view();
    assert_eq!(fallback.image.dimensions(), (21, 21));
    assert!(fallback.message.contains("unavailable"));
}

#[test]
fn probe_failure_starts_degraded() {
    let start = Instant::now();
    let mut viewer = Viewer::<ScriptedBackend>::new(
        config(),
        Err(EngineError::UnsupportedEnvironment("no adapter".into())),
        start,
    );

    assert_eq!(viewer.state(), LoopState::Degraded);
    assert!(matches!(
        viewer.take_events().as_slice(),
        [EngineEvent::Degraded { .. }]
    ));

    // Without a texture the placeholder fills the surface
    let fallback = viewer.fallback_view();
    assert_eq!(fallback.image.dimensions(), (64, 48));
}

#[test]
fn forced_degraded_releases_backend() {
    let start = Instant::now();
    let (mut viewer, script) = viewer_with(config().with_force_degraded(true), start);

    assert_eq!(viewer.state(), LoopState::Degraded);
    assert_eq!(script.borrow().releases, 1);

    viewer.set_source(Some(code_source()), start);
    assert!(viewer.tick(start + ms(16), None).is_none());
    assert!(!script.borrow().calls.iter().any(|c| c.starts_with("upload")));
}

#[test]
fn export_captures_while_rendering() {
    let start = Instant::now();
    let (mut viewer, script) = rendering_viewer(start);

    let image = viewer.export_snapshot().expect("snapshot");
    assert_eq!(image.dimensions(), (4, 4));
    assert_eq!(image.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
    assert!(script.borrow().calls.contains(&"capture".to_string()));
}

#[test]
fn export_while_degraded_is_placeholder() {
    let start = Instant::now();
    let (mut viewer, script) = viewer_with(config().with_force_degraded(true), start);

    let image = viewer.export_snapshot().expect("placeholder");
    assert_eq!(image.dimensions(), (64, 48));
    assert!(!script.borrow().calls.contains(&"capture".to_string()));
}

#[test]
fn saved_snapshot_is_named_after_content() {
    let start = Instant::now();
    let (mut viewer, _script) = rendering_viewer(start);
    let dir = std::env::temp_dir().join(format!("codecube-snapshot-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let path = viewer.save_snapshot(&dir).expect("saved");
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("code3d-https-example-com-"), "{name}");
    assert!(path.exists());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn teardown_runs_in_order_once() {
    let start = Instant::now();
    let (mut viewer, script) = viewer_with(config(), start);
    let releases = Rc::new(RefCell::new(0));
    viewer.set_source(
        Some(Box::new(CountedSource {
            releases: releases.clone(),
        })),
        start,
    );

    let steps = viewer.teardown();
    assert_eq!(
        steps,
        vec![
            TeardownStep::StopFrameLoop,
            TeardownStep::CancelTimers,
            TeardownStep::ReleaseGpuResources,
            TeardownStep::RevokeImageHandles,
            TeardownStep::DetachListeners,
        ]
    );
    assert_eq!(script.borrow().releases, 1);
    assert_eq!(*releases.borrow(), 1);

    assert!(viewer.teardown().is_empty());
    assert_eq!(script.borrow().releases, 1);
    assert!(viewer.tick(start + ms(16), None).is_none());
    assert!(matches!(viewer.export_snapshot(), Err(EngineError::TornDown)));
}

#[test]
fn teardown_cancels_pending_recovery() {
    let start = Instant::now();
    let (mut viewer, script) = rendering_viewer(start);
    script.borrow_mut().fail_next_render = Some(RenderError::ContextLost("device reset".into()));
    viewer.request_redraw();
    viewer.tick(start + ms(16), None);
    assert_eq!(viewer.state(), LoopState::ContextLost);

    viewer.teardown();
    viewer.tick(start + ms(500), None);
    assert!(!script.borrow().calls.contains(&"recover".to_string()));
}

#[test]
fn slow_source_times_out_to_fallback() {
    let start = Instant::now();
    let (mut viewer, script) = viewer_with(config(), start);
    let releases = Rc::new(RefCell::new(0));
    viewer.set_source(
        Some(Box::new(StalledSource {
            releases: releases.clone(),
        })),
        start,
    );

    assert_eq!(viewer.state(), LoopState::Idle);
    assert!(viewer.wants_frame());
    assert!(viewer.tick(start + ms(100), None).is_none());

    assert!(viewer.tick(start + ms(600), None).is_some());
    assert_eq!(viewer.state(), LoopState::Rendering);
    assert!(script.borrow().calls.contains(&"upload 1".to_string()));

    let events = viewer.take_events();
    assert!(matches!(
        events.as_slice(),
        [EngineEvent::TextureFallbackUsed {
            error: TextureLoadError::Timeout { .. },
            ..
        }]
    ));
}

#[test]
fn missing_source_uses_fallback_at_once() {
    let start = Instant::now();
    let (mut viewer, _script) = viewer_with(config(), start);

    viewer.set_source(None, start);
    assert_eq!(viewer.state(), LoopState::Rendering);
    assert!(matches!(
        viewer.take_events().as_slice(),
        [EngineEvent::TextureFallbackUsed {
            error: TextureLoadError::MissingSource,
            ..
        }]
    ));
}

#[test]
fn replacing_a_loading_source_revokes_it() {
    let start = Instant::now();
    let (mut viewer, _script) = viewer_with(config(), start);
    let releases = Rc::new(RefCell::new(0));
    viewer.set_source(
        Some(Box::new(StalledSource {
            releases: releases.clone(),
        })),
        start,
    );

    viewer.set_source(Some(code_source()), start + ms(10));
    assert_eq!(*releases.borrow(), 1);
    assert_eq!(viewer.state(), LoopState::Rendering);
}

#[test]
fn mode_switch_resets_phase_and_physics() {
    let start = Instant::now();
    let (mut viewer, _script) = rendering_viewer(start);
    viewer.set_animation_mode(AnimationMode::Interactive);

    viewer.pointer_drag(30.0, -10.0);
    for frame in 1..=10 {
        viewer.tick(start + ms(16 * frame), None);
    }
    assert!(viewer.animator().elapsed() > 0.0);
    assert_ne!(viewer.physics().state(), &PhysicsState::default());

    viewer.set_animation_mode(AnimationMode::Rotate);
    assert_eq!(viewer.animator().mode(), AnimationMode::Rotate);
    assert_eq!(viewer.animator().elapsed(), 0.0);
    assert_eq!(viewer.animator().accumulator(), 0.0);
    assert_eq!(viewer.physics().state(), &PhysicsState::default());
}

#[test]
fn reentering_a_mode_matches_a_fresh_entry() {
    let start = Instant::now();
    let (mut fresh, _script) = rendering_viewer(start);
    fresh.set_animation_mode(AnimationMode::Rotate);
    fresh.tick(start + ms(16), None);

    let (mut viewer, _script) = rendering_viewer(start);
    viewer.set_animation_mode(AnimationMode::Rotate);
    for frame in 1..=10 {
        viewer.tick(start + ms(16 * frame), None);
    }
    viewer.set_animation_mode(AnimationMode::Static);
    viewer.tick(start + ms(200), None);

    // Static draws on demand, so nothing ticks while it idles
    let reentry = start + ms(5_200);
    viewer.set_animation_mode(AnimationMode::Rotate);
    viewer.tick(reentry, None);

    assert_eq!(viewer.animator().elapsed(), fresh.animator().elapsed());
    assert_eq!(viewer.animator().accumulator(), fresh.animator().accumulator());
    assert_eq!(viewer.animator().elapsed(), 0.0);
}

#[test]
fn resuming_skips_time_spent_paused() {
    let start = Instant::now();
    let (mut viewer, _script) = rendering_viewer(start);
    viewer.set_animation_mode(AnimationMode::Rotate);
    for frame in 1..=5 {
        viewer.tick(start + ms(16 * frame), None);
    }
    assert!(viewer.apply_command(ControlCommand::TogglePlay));
    viewer.tick(start + ms(100), None);
    let paused_at = viewer.animator().elapsed();

    assert!(viewer.apply_command(ControlCommand::TogglePlay));
    viewer.tick(start + ms(3_100), None);
    assert_eq!(viewer.animator().elapsed(), paused_at);

    viewer.tick(start + ms(3_116), None);
    let stepped = viewer.animator().elapsed() - paused_at;
    assert!(stepped > 0.0 && stepped < 0.05, "stepped {stepped}");
}

#[test]
fn drag_outside_interactive_mode_is_ignored() {
    let start = Instant::now();
    let (mut viewer, _script) = rendering_viewer(start);

    viewer.pointer_drag(50.0, 50.0);
    viewer.tick(start + ms(16), None);
    assert_eq!(viewer.physics().state(), &PhysicsState::default());
}

#[test]
fn samples_reach_the_callback() {
    let start = Instant::now();
    let (mut viewer, _script) = rendering_viewer(start);
    let samples = Rc::new(RefCell::new(Vec::new()));
    let sink = samples.clone();
    viewer.set_sample_callback(Box::new(move |sample| sink.borrow_mut().push(*sample)));
    viewer.set_animation_mode(AnimationMode::Pulse);

    for frame in 1..=70 {
        viewer.tick(start + ms(16 * frame), None);
    }

    let samples = samples.borrow();
    assert_eq!(samples.len(), 1);
    assert!(samples[0].fps > 50.0 && samples[0].fps < 70.0);
    assert!(samples[0].triangle_count >= 2);
    assert_eq!(samples[0].memory_mb, 0.0);
}

#[test]
fn listener_receives_events_instead_of_queue() {
    let start = Instant::now();
    let (mut viewer, _script) = viewer_with(config(), start);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    viewer.set_event_listener(Box::new(move |event| sink.borrow_mut().push(event.clone())));

    viewer.set_source(Some(code_source()), start);
    assert_eq!(seen.borrow().len(), 1);
    assert!(viewer.take_events().is_empty());
}
