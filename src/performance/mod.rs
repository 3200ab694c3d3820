//! # Performance Sampling
//!
//! Counts frames and reads the renderer's own counters, and once per sample
//! interval turns them into a [`PerformanceSample`]. Samples go to an
//! injected callback; nothing is stored globally.
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use codecube::performance::{PerformanceMonitor, RendererCounters};
//!
//! let start = Instant::now();
//! let mut monitor = PerformanceMonitor::new(Duration::from_secs(1), start);
//! monitor.set_callback(Box::new(|sample| println!("{:.0} fps", sample.fps)));
//!
//! // After each rendered frame
//! monitor.record_frame(start, Duration::from_millis(16), RendererCounters::default());
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Counters reported by the renderer for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RendererCounters {
    pub triangles: u32,
    pub draw_calls: u32,
    /// GPU memory the renderer knows it holds; `None` when it cannot tell
    pub memory_bytes: Option<u64>,
}

/// One performance reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerformanceSample {
    pub fps: f32,
    pub triangle_count: u32,
    pub draw_calls: u32,
    /// 0 when the renderer cannot report memory
    pub memory_mb: f32,
}

pub type SampleCallback = Box<dyn FnMut(&PerformanceSample)>;

pub struct PerformanceMonitor {
    /// Ring buffer of recent frame times for the overlay graph
    frame_times: VecDeque<Duration>,
    max_samples: usize,
    interval: Duration,
    window_start: Instant,
    frames_in_window: u32,
    last_counters: RendererCounters,
    latest: Option<PerformanceSample>,
    callback: Option<SampleCallback>,
}

impl PerformanceMonitor {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(120), // ~2 seconds at 60fps
            max_samples: 120,
            interval: interval.max(Duration::from_millis(1)),
            window_start: now,
            frames_in_window: 0,
            last_counters: RendererCounters::default(),
            latest: None,
            callback: None,
        }
    }

    pub fn set_callback(&mut self, callback: SampleCallback) {
        self.callback = Some(callback);
    }

    /// Counts a rendered frame. Returns the new sample when the interval has
    /// elapsed.
    pub fn record_frame(
        &mut self,
        now: Instant,
        frame_time: Duration,
        counters: RendererCounters,
    ) -> Option<PerformanceSample> {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(frame_time);
        self.frames_in_window += 1;
        self.last_counters = counters;

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.interval {
            return None;
        }

        let sample = PerformanceSample {
            fps: self.frames_in_window as f32 / elapsed.as_secs_f32(),
            triangle_count: counters.triangles,
            draw_calls: counters.draw_calls,
            memory_mb: counters
                .memory_bytes
                .map(|bytes| bytes as f32 / 1_048_576.0)
                .unwrap_or(0.0),
        };
        log::debug!(
            "perf: {:.1} fps, {} triangles, {} draw calls, {:.1} MB",
            sample.fps,
            sample.triangle_count,
            sample.draw_calls,
            sample.memory_mb
        );

        self.frames_in_window = 0;
        self.window_start = now;
        self.latest = Some(sample);
        if let Some(callback) = self.callback.as_mut() {
            callback(&sample);
        }
        Some(sample)
    }

    pub fn latest(&self) -> Option<&PerformanceSample> {
        self.latest.as_ref()
    }

    /// Frame time history in milliseconds, oldest first
    pub fn frame_time_history(&self) -> Vec<f32> {
        self.frame_times
            .iter()
            .map(|duration| duration.as_secs_f32() * 1000.0)
            .collect()
    }

    /// Starts a new sampling window, e.g. after rendering resumed.
    pub fn reset(&mut self, now: Instant) {
        self.frame_times.clear();
        self.frames_in_window = 0;
        self.window_start = now;
    }

    /// Detailed metrics window
    pub fn render_ui(&self, ui: &imgui::Ui) {
        ui.window("Performance")
            .size([280.0, 180.0], imgui::Condition::FirstUseEver)
            .position([350.0, 20.0], imgui::Condition::FirstUseEver)
            .build(|| {
                match self.latest {
                    Some(sample) => {
                        ui.text(format!("FPS: {:.1}", sample.fps));
                        ui.text(format!("Triangles: {}", sample.triangle_count));
                        ui.text(format!("Draw Calls: {}", sample.draw_calls));
                        ui.text(format!("GPU Memory: {:.1} MB", sample.memory_mb));
                    }
                    None => ui.text("Collecting..."),
                }

                if !self.frame_times.is_empty() {
                    ui.separator();
                    let history = self.frame_time_history();
                    ui.plot_lines("##frame_times", &history)
                        .graph_size([260.0, 60.0])
                        .scale_min(0.0)
                        .scale_max(50.0)
                        .build();
                }
            });
    }

    /// Compact corner overlay
    pub fn render_overlay(&self, ui: &imgui::Ui) {
        let display_size = ui.io().display_size;
        let sample = self.latest.unwrap_or_default();

        ui.window("FPS")
            .size([140.0, 60.0], imgui::Condition::Always)
            .position([display_size[0] - 150.0, 10.0], imgui::Condition::Always)
            .no_decoration()
            .no_inputs()
            .bg_alpha(0.3)
            .build(|| {
                ui.text(format!("FPS: {:.0}", sample.fps));
                ui.text(format!("{} tris / {} calls", sample.triangle_count, sample.draw_calls));
            });
    }
}
