//! # Physics Interaction Subsystem
//!
//! A damped two-axis spring integrator that gives the code object a toy-like
//! drag-and-bounce feel in [`AnimationMode::Interactive`].
//!
//! Each step: the pending user impulse is added to the velocity, a spring pulls
//! the object back toward the origin, the velocity is damped and then applied
//! to the position. Leaving the box `[-boundary, boundary]` clamps the position
//! and reflects that velocity component with some energy loss. The object's
//! tumbling is derived from its translational velocity.
//!
//! [`AnimationMode::Interactive`]: crate::animation::AnimationMode::Interactive

use cgmath::{InnerSpace, Vector2, Zero};

/// Reference frame rate the per-frame step constants were tuned for.
pub const REFERENCE_FPS: f32 = 60.0;

/// How `integrate` interprets its `delta_seconds` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepMode {
    /// One fixed step per call, regardless of elapsed time. Matches the
    /// original feel at 60 Hz but runs faster on faster displays.
    #[default]
    PerFrame,
    /// Scales every step by `delta_seconds * REFERENCE_FPS`, so the motion is
    /// the same at any frame rate.
    DeltaScaled,
}

/// Tunables of the integrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsConfig {
    /// Per-step velocity retention, in (0, 1)
    pub damping: f32,
    /// Strength of the spring pulling toward the origin
    pub pull_factor: f32,
    /// Half-extent of the allowed position box
    pub boundary: f32,
    /// Fraction of speed kept when bouncing off the boundary
    pub restitution: f32,
    /// Pointer pixels to impulse conversion
    pub impulse_scale: f32,
    /// Velocity to tumble conversion
    pub tumble_factor: f32,
    pub step_mode: StepMode,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            damping: 0.98,
            pull_factor: 0.02,
            boundary: 1.5,
            restitution: 0.8,
            impulse_scale: 0.01,
            tumble_factor: 0.5,
            step_mode: StepMode::PerFrame,
        }
    }
}

impl PhysicsConfig {
    /// Returns a copy with out-of-range values pulled back into range.
    pub fn sanitized(mut self) -> Self {
        if !(self.damping > 0.0 && self.damping < 1.0) {
            log::warn!("physics damping {} outside (0, 1), using 0.98", self.damping);
            self.damping = 0.98;
        }
        self.pull_factor = self.pull_factor.max(0.0);
        self.boundary = self.boundary.abs().max(f32::EPSILON);
        self.restitution = self.restitution.clamp(0.0, 1.0);
        self
    }
}

/// Mutable state owned by [`Physics`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsState {
    pub position: Vector2<f32>,
    pub velocity: Vector2<f32>,
    /// Impulse waiting to be applied on the next step
    pub user_force: Vector2<f32>,
    /// Accumulated tumble (x, y) in radians
    pub rotation: Vector2<f32>,
}

impl Default for PhysicsState {
    fn default() -> Self {
        Self {
            position: Vector2::zero(),
            velocity: Vector2::zero(),
            user_force: Vector2::zero(),
            rotation: Vector2::zero(),
        }
    }
}

/// What the animation system reads from the physics subsystem each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsOutput {
    pub position: Vector2<f32>,
    pub rotation: Vector2<f32>,
}

impl Default for PhysicsOutput {
    fn default() -> Self {
        Self {
            position: Vector2::zero(),
            rotation: Vector2::zero(),
        }
    }
}

/// The damped spring integrator.
#[derive(Debug, Clone)]
pub struct Physics {
    config: PhysicsConfig,
    state: PhysicsState,
}

impl Default for Physics {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

impl Physics {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config: config.sanitized(),
            state: PhysicsState::default(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn state(&self) -> &PhysicsState {
        &self.state
    }

    /// Replaces the state, e.g. to start from a known velocity.
    pub fn set_state(&mut self, state: PhysicsState) {
        self.state = state;
    }

    pub fn output(&self) -> PhysicsOutput {
        PhysicsOutput {
            position: self.state.position,
            rotation: self.state.rotation,
        }
    }

    /// Queues an impulse for the next integration step.
    pub fn apply_impulse(&mut self, force: Vector2<f32>) {
        self.state.user_force += force;
    }

    /// Converts a pointer drag in pixels into an impulse.
    ///
    /// Screen y grows downward, object y grows upward.
    pub fn apply_drag(&mut self, dx: f32, dy: f32) {
        let scale = self.config.impulse_scale;
        self.apply_impulse(Vector2::new(dx * scale, -dy * scale));
    }

    /// Returns to rest at the origin.
    pub fn reset(&mut self) {
        self.state = PhysicsState::default();
    }

    /// Advances the simulation and returns the new position and rotation.
    pub fn integrate(&mut self, delta_seconds: f32) -> PhysicsOutput {
        let k = match self.config.step_mode {
            StepMode::PerFrame => 1.0,
            StepMode::DeltaScaled => (delta_seconds.max(0.0) * REFERENCE_FPS).min(4.0),
        };
        if k <= 0.0 {
            return self.output();
        }

        let cfg = self.config;
        let state = &mut self.state;

        state.velocity += state.user_force;
        state.user_force = Vector2::zero();

        state.velocity += -state.position * (cfg.pull_factor * k);
        state.velocity *= cfg.damping.powf(k);
        state.position += state.velocity * k;

        let limit = cfg.boundary;
        if state.position.x.abs() > limit {
            state.position.x = limit.copysign(state.position.x);
            state.velocity.x = -state.velocity.x * cfg.restitution;
        }
        if state.position.y.abs() > limit {
            state.position.y = limit.copysign(state.position.y);
            state.velocity.y = -state.velocity.y * cfg.restitution;
        }

        state.rotation.x += state.velocity.y * cfg.tumble_factor * k;
        state.rotation.y += state.velocity.x * cfg.tumble_factor * k;

        log::trace!(
            "physics step pos=({:.3}, {:.3}) speed={:.4}",
            state.position.x,
            state.position.y,
            state.velocity.magnitude()
        );

        self.output()
    }
}
