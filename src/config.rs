//! Engine configuration
//!
//! [`EngineConfig`] holds the knobs fixed for a viewing session. Values can be
//! overridden from `CODECUBE_*` environment variables; a malformed override is
//! logged and ignored so a bad environment never stops the viewer.

use std::time::Duration;

use crate::physics::{PhysicsConfig, StepMode};

pub const ENV_TEXTURE_TIMEOUT_MS: &str = "CODECUBE_TEXTURE_TIMEOUT_MS";
pub const ENV_RECOVERY_DELAY_MS: &str = "CODECUBE_RECOVERY_DELAY_MS";
pub const ENV_PHYSICS_STEP: &str = "CODECUBE_PHYSICS_STEP";
pub const ENV_FORCE_DEGRADED: &str = "CODECUBE_FORCE_DEGRADED";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Budget for decoding and uploading a source image
    pub texture_timeout: Duration,
    /// Edge length of the square fallback texture
    pub fallback_texture_size: u32,
    /// Delay before the single context recovery attempt
    pub recovery_delay: Duration,
    /// How often a [`PerformanceSample`](crate::performance::PerformanceSample) is produced
    pub sample_interval: Duration,
    pub physics: PhysicsConfig,
    pub min_camera_distance: f32,
    pub max_camera_distance: f32,
    pub window_size: (u32, u32),
    /// Skip the GPU probe and start in the static 2D view
    pub force_degraded: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            texture_timeout: Duration::from_secs(5),
            fallback_texture_size: 300,
            recovery_delay: Duration::from_millis(250),
            sample_interval: Duration::from_secs(1),
            physics: PhysicsConfig::default(),
            min_camera_distance: 1.5,
            max_camera_distance: 10.0,
            window_size: (1024, 768),
            force_degraded: false,
        }
    }
}

impl EngineConfig {
    /// Defaults with overrides from the process environment applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key lookup, e.g. a map in tests.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ms) = parse_millis(&lookup, ENV_TEXTURE_TIMEOUT_MS) {
            self.texture_timeout = ms;
        }
        if let Some(ms) = parse_millis(&lookup, ENV_RECOVERY_DELAY_MS) {
            self.recovery_delay = ms;
        }
        if let Some(value) = lookup(ENV_PHYSICS_STEP) {
            let key = value.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
            match key.as_str() {
                "perframe" | "frame" => self.physics.step_mode = StepMode::PerFrame,
                "delta" | "deltascaled" => self.physics.step_mode = StepMode::DeltaScaled,
                _ => log::warn!("ignoring {ENV_PHYSICS_STEP}={value:?}, expected per-frame or delta"),
            }
        }
        if let Some(value) = lookup(ENV_FORCE_DEGRADED) {
            self.force_degraded = matches!(value.trim(), "1" | "true" | "yes");
        }
        self
    }

    pub fn with_texture_timeout(mut self, timeout: Duration) -> Self {
        self.texture_timeout = timeout;
        self
    }

    pub fn with_recovery_delay(mut self, delay: Duration) -> Self {
        self.recovery_delay = delay;
        self
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn with_physics(mut self, physics: PhysicsConfig) -> Self {
        self.physics = physics;
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width.max(1), height.max(1));
        self
    }

    pub fn with_force_degraded(mut self, force: bool) -> Self {
        self.force_degraded = force;
        self
    }
}

fn parse_millis<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key)?;
    match value.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(err) => {
            log::warn!("ignoring {key}={value:?}: {err}");
            None
        }
    }
}
