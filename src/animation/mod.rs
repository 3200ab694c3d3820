//! # Animation State Machine
//!
//! Advances the transform of the code object every frame according to the
//! active [`AnimationMode`]. Exactly one mode is active at a time.
//!
//! Every mode is a pure function of a [`ModeInput`]; the functions live in a
//! lookup table indexed by the mode tag so each formula can be tested on its
//! own. The [`Animator`] owns the mode-local phase (time since mode entry and
//! the Rotate/Spiral accumulators) and resets it whenever the mode changes.

use std::f32::consts::{PI, TAU};

use cgmath::{Deg, Matrix4, Rad, Vector2, Vector3};

use crate::physics::PhysicsOutput;

/// The animation modes a viewer can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnimationMode {
    #[default]
    Static,
    Rotate,
    Pulse,
    Float,
    Flip,
    Wave,
    Bounce,
    Spiral,
    Interactive,
}

impl AnimationMode {
    pub const ALL: [AnimationMode; 9] = [
        AnimationMode::Static,
        AnimationMode::Rotate,
        AnimationMode::Pulse,
        AnimationMode::Float,
        AnimationMode::Flip,
        AnimationMode::Wave,
        AnimationMode::Bounce,
        AnimationMode::Spiral,
        AnimationMode::Interactive,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AnimationMode::Static => "static",
            AnimationMode::Rotate => "rotate",
            AnimationMode::Pulse => "pulse",
            AnimationMode::Float => "float",
            AnimationMode::Flip => "flip",
            AnimationMode::Wave => "wave",
            AnimationMode::Bounce => "bounce",
            AnimationMode::Spiral => "spiral",
            AnimationMode::Interactive => "interactive",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.name().eq_ignore_ascii_case(name))
    }

    /// Position of this mode in [`AnimationMode::ALL`] and in the dispatch table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether the mode moves the object on its own.
    pub fn is_animated(self) -> bool {
        self != AnimationMode::Static
    }
}

/// Object transform produced by the animation system.
///
/// Rotation is an XYZ Euler triple in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vector3::new(0.0, 0.0, 0.0),
        rotation: Vector3::new(0.0, 0.0, 0.0),
        scale: Vector3::new(1.0, 1.0, 1.0),
    };

    /// Builds the model matrix as T * Rx * Ry * Rz * S, with `user_scale`
    /// applied on top of the animated scale.
    pub fn to_matrix(&self, user_scale: f32) -> Matrix4<f32> {
        let t = Matrix4::from_translation(self.position);
        let r = Matrix4::from_angle_x(Rad(self.rotation.x))
            * Matrix4::from_angle_y(Rad(self.rotation.y))
            * Matrix4::from_angle_z(Rad(self.rotation.z));
        let s = Matrix4::from_nonuniform_scale(
            self.scale.x * user_scale,
            self.scale.y * user_scale,
            self.scale.z * user_scale,
        );
        t * r * s
    }
}

/// Manual rotation set by the user for [`AnimationMode::Static`], in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StaticAngles {
    pub x_degrees: f32,
    pub y_degrees: f32,
}

impl StaticAngles {
    pub fn new(x_degrees: f32, y_degrees: f32) -> Self {
        Self {
            x_degrees,
            y_degrees,
        }
    }

    pub fn to_radians(self) -> Vector2<f32> {
        Vector2::new(
            Rad::from(Deg(self.x_degrees)).0,
            Rad::from(Deg(self.y_degrees)).0,
        )
    }
}

/// Rates for the accumulating modes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeParams {
    /// Yaw speed of [`AnimationMode::Rotate`] in rad/s
    pub rotate_speed: f32,
    /// Roll speed of [`AnimationMode::Spiral`] in rad/s
    pub spiral_roll_speed: f32,
}

impl Default for ModeParams {
    fn default() -> Self {
        Self {
            rotate_speed: 0.5,
            spiral_roll_speed: 0.3,
        }
    }
}

/// Everything a mode function may read for one frame.
#[derive(Debug, Clone, Copy)]
pub struct ModeInput {
    /// Seconds since the current mode became active
    pub elapsed: f32,
    /// Mode-local accumulator (yaw for Rotate, roll for Spiral), already advanced
    pub accumulator: f32,
    pub static_angles: StaticAngles,
    pub physics: PhysicsOutput,
}

impl ModeInput {
    pub fn at(elapsed: f32) -> Self {
        Self {
            elapsed,
            accumulator: 0.0,
            static_angles: StaticAngles::default(),
            physics: PhysicsOutput::default(),
        }
    }
}

/// Signature shared by every entry of the dispatch table.
pub type ModeFn = fn(&ModeInput) -> Transform;

/// Dispatch table, indexed by [`AnimationMode::index`].
pub const MODE_TABLE: [ModeFn; 9] = [
    static_transform,
    rotate_transform,
    pulse_transform,
    float_transform,
    flip_transform,
    wave_transform,
    bounce_transform,
    spiral_transform,
    interactive_transform,
];

pub fn transform_for(mode: AnimationMode, input: &ModeInput) -> Transform {
    MODE_TABLE[mode.index()](input)
}

pub fn static_transform(input: &ModeInput) -> Transform {
    let angles = input.static_angles.to_radians();
    Transform {
        rotation: Vector3::new(angles.x, angles.y, 0.0),
        ..Transform::IDENTITY
    }
}

pub fn rotate_transform(input: &ModeInput) -> Transform {
    Transform {
        rotation: Vector3::new(0.0, input.accumulator, 0.0),
        ..Transform::IDENTITY
    }
}

pub fn pulse_transform(input: &ModeInput) -> Transform {
    let s = 1.0 + 0.1 * (2.0 * input.elapsed).sin();
    Transform {
        scale: Vector3::new(s, s, s),
        ..Transform::IDENTITY
    }
}

pub fn float_transform(input: &ModeInput) -> Transform {
    let t = input.elapsed;
    Transform {
        position: Vector3::new(0.0, t.sin(), 0.0),
        rotation: Vector3::new(0.2 * (0.7 * t).sin(), 0.2 * (0.5 * t).cos(), 0.0),
        ..Transform::IDENTITY
    }
}

pub fn flip_transform(input: &ModeInput) -> Transform {
    Transform {
        rotation: Vector3::new(0.0, PI * (0.5 * input.elapsed).sin(), 0.0),
        ..Transform::IDENTITY
    }
}

pub fn wave_transform(input: &ModeInput) -> Transform {
    let t = input.elapsed;
    Transform {
        rotation: Vector3::new(0.3 * (2.0 * t).sin(), 0.0, 0.3 * (1.5 * t).cos()),
        ..Transform::IDENTITY
    }
}

pub fn bounce_transform(input: &ModeInput) -> Transform {
    let s = (3.0 * input.elapsed).sin();
    let magnitude = s.abs();
    // Squash only on the downward half of the cycle
    let scale = if s < 0.0 {
        let squash = (1.0 - 0.1 * magnitude).max(0.9);
        let stretch = (1.0 + 0.05 * magnitude).min(1.1);
        Vector3::new(stretch, squash, stretch)
    } else {
        Vector3::new(1.0, 1.0, 1.0)
    };
    Transform {
        position: Vector3::new(0.0, 0.3 * magnitude, 0.0),
        scale,
        ..Transform::IDENTITY
    }
}

pub fn spiral_transform(input: &ModeInput) -> Transform {
    let t = input.elapsed;
    Transform {
        position: Vector3::new(0.2 * (2.0 * t).cos(), 0.0, 0.2 * (2.0 * t).sin()),
        rotation: Vector3::new(0.5 * t.sin(), 0.5 * t.cos(), input.accumulator),
        ..Transform::IDENTITY
    }
}

pub fn interactive_transform(input: &ModeInput) -> Transform {
    let physics = input.physics;
    Transform {
        position: Vector3::new(physics.position.x, physics.position.y, 0.0),
        rotation: Vector3::new(
            physics.rotation.x,
            physics.rotation.y,
            0.1 * (2.0 * input.elapsed).sin(),
        ),
        ..Transform::IDENTITY
    }
}

/// Holds the active mode and its mode-local phase.
#[derive(Debug, Clone)]
pub struct Animator {
    mode: AnimationMode,
    params: ModeParams,
    elapsed: f32,
    accumulator: f32,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new(AnimationMode::Static)
    }
}

impl Animator {
    pub fn new(mode: AnimationMode) -> Self {
        Self::with_params(mode, ModeParams::default())
    }

    pub fn with_params(mode: AnimationMode, params: ModeParams) -> Self {
        Self {
            mode,
            params,
            elapsed: 0.0,
            accumulator: 0.0,
        }
    }

    pub fn mode(&self) -> AnimationMode {
        self.mode
    }

    /// Seconds spent in the current mode (excluding paused time).
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Switches mode. Entering a different mode discards all mode-local phase.
    ///
    /// Returns true when the mode actually changed.
    pub fn set_mode(&mut self, mode: AnimationMode) -> bool {
        if mode == self.mode {
            return false;
        }
        log::debug!("animation mode {} -> {}", self.mode.name(), mode.name());
        self.mode = mode;
        self.reset_phase();
        true
    }

    /// Restarts the current mode from its entry state.
    pub fn reset_phase(&mut self) {
        self.elapsed = 0.0;
        self.accumulator = 0.0;
    }

    fn accumulator_rate(&self) -> f32 {
        match self.mode {
            AnimationMode::Rotate => self.params.rotate_speed,
            AnimationMode::Spiral => self.params.spiral_roll_speed,
            _ => 0.0,
        }
    }

    /// Advances mode-local time by `delta` seconds and returns the new transform.
    pub fn advance(
        &mut self,
        delta: f32,
        static_angles: StaticAngles,
        physics: PhysicsOutput,
    ) -> Transform {
        let delta = delta.max(0.0);
        self.elapsed += delta;
        self.accumulator = (self.accumulator + delta * self.accumulator_rate()).rem_euclid(TAU);
        self.current(static_angles, physics)
    }

    /// Transform for the current phase without advancing time.
    pub fn current(&self, static_angles: StaticAngles, physics: PhysicsOutput) -> Transform {
        let input = ModeInput {
            elapsed: self.elapsed,
            accumulator: self.accumulator,
            static_angles,
            physics,
        };
        transform_for(self.mode, &input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    // Summing many small deltas drifts a little in f32
    fn angle_approx(a: f32, b: f32) -> bool {
        let d = (a - b).rem_euclid(TAU);
        d < 1e-3 || (TAU - d) < 1e-3
    }

    fn run(animator: &mut Animator, seconds: f32, steps: usize) -> Transform {
        let dt = seconds / steps as f32;
        let mut last = Transform::IDENTITY;
        for _ in 0..steps {
            last = animator.advance(dt, StaticAngles::default(), PhysicsOutput::default());
        }
        last
    }

    #[test]
    fn table_order_matches_mode_index() {
        for (i, mode) in AnimationMode::ALL.iter().enumerate() {
            assert_eq!(mode.index(), i);
        }
    }

    #[test]
    fn rotate_yaw_is_frame_rate_independent() {
        let t = 7.3;
        let mut coarse = Animator::new(AnimationMode::Rotate);
        let mut fine = Animator::new(AnimationMode::Rotate);
        let a = run(&mut coarse, t, 1);
        let b = run(&mut fine, t, 1000);
        assert!(angle_approx(a.rotation.y, (0.5 * t).rem_euclid(TAU)));
        assert!(angle_approx(a.rotation.y, b.rotation.y));
    }

    #[test]
    fn pulse_starts_at_one_and_stays_bounded() {
        let transform = pulse_transform(&ModeInput::at(0.0));
        assert_eq!(transform.scale, Vector3::new(1.0, 1.0, 1.0));

        for i in 0..2000 {
            let t = i as f32 * 0.01;
            let s = pulse_transform(&ModeInput::at(t)).scale.x;
            assert!((0.9 - EPS..=1.1 + EPS).contains(&s), "scale {s} at {t}");
        }
    }

    #[test]
    fn static_uses_manual_angles() {
        let input = ModeInput {
            static_angles: StaticAngles::new(90.0, -45.0),
            ..ModeInput::at(3.0)
        };
        let transform = static_transform(&input);
        assert!(approx(transform.rotation.x, PI / 2.0));
        assert!(approx(transform.rotation.y, -PI / 4.0));
        assert_eq!(transform.position, Vector3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn float_flip_and_wave_follow_their_curves() {
        let t = 1.25;
        let float = float_transform(&ModeInput::at(t));
        assert!(approx(float.position.y, t.sin()));
        assert!(approx(float.rotation.x, 0.2 * (0.7 * t).sin()));
        assert!(approx(float.rotation.y, 0.2 * (0.5 * t).cos()));

        let flip = flip_transform(&ModeInput::at(t));
        assert!(approx(flip.rotation.y, PI * (0.5 * t).sin()));

        let wave = wave_transform(&ModeInput::at(t));
        assert!(approx(wave.rotation.x, 0.3 * (2.0 * t).sin()));
        assert!(approx(wave.rotation.z, 0.3 * (1.5 * t).cos()));
    }

    #[test]
    fn bounce_squashes_only_on_negative_half() {
        // sin(3t) > 0
        let up = bounce_transform(&ModeInput::at(0.3));
        assert_eq!(up.scale, Vector3::new(1.0, 1.0, 1.0));
        assert!(approx(up.position.y, 0.3 * (0.9f32).sin().abs()));

        // sin(3t) < 0 at t = 1.5 (sin 4.5 ~ -0.977)
        let down = bounce_transform(&ModeInput::at(1.5));
        let s = (4.5f32).sin().abs();
        assert!(approx(down.scale.y, (1.0 - 0.1 * s).max(0.9)));
        assert!(approx(down.scale.x, (1.0 + 0.05 * s).min(1.1)));
        assert_eq!(down.scale.x, down.scale.z);
        assert!(down.position.y >= 0.0);
    }

    #[test]
    fn spiral_accumulates_roll() {
        let mut animator = Animator::new(AnimationMode::Spiral);
        let transform = run(&mut animator, 2.0, 200);
        assert!(angle_approx(transform.rotation.z, 0.6));
        assert!(approx(transform.position.x, 0.2 * (4.0f32).cos()));
        assert!(approx(transform.position.z, 0.2 * (4.0f32).sin()));
    }

    #[test]
    fn interactive_reads_physics_and_wobbles() {
        let input = ModeInput {
            physics: PhysicsOutput {
                position: Vector2::new(0.4, -0.2),
                rotation: Vector2::new(0.1, 0.3),
            },
            ..ModeInput::at(0.5)
        };
        let transform = interactive_transform(&input);
        assert!(approx(transform.position.x, 0.4));
        assert!(approx(transform.position.y, -0.2));
        assert!(approx(transform.rotation.x, 0.1));
        assert!(approx(transform.rotation.y, 0.3));
        assert!(approx(transform.rotation.z, 0.1 * (1.0f32).sin()));
    }

    #[test]
    fn switching_modes_resets_phase() {
        let mut reused = Animator::new(AnimationMode::Rotate);
        run(&mut reused, 3.0, 30);
        reused.set_mode(AnimationMode::Static);
        run(&mut reused, 1.0, 10);
        reused.set_mode(AnimationMode::Rotate);
        assert_eq!(reused.elapsed(), 0.0);
        assert_eq!(reused.accumulator(), 0.0);

        let mut fresh = Animator::new(AnimationMode::Rotate);
        for _ in 0..50 {
            let a = reused.advance(0.016, StaticAngles::default(), PhysicsOutput::default());
            let b = fresh.advance(0.016, StaticAngles::default(), PhysicsOutput::default());
            assert!(approx(a.rotation.y, b.rotation.y));
        }
    }

    #[test]
    fn setting_same_mode_keeps_phase() {
        let mut animator = Animator::new(AnimationMode::Pulse);
        run(&mut animator, 1.0, 10);
        assert!(!animator.set_mode(AnimationMode::Pulse));
        assert!(approx(animator.elapsed(), 1.0));
    }

    #[test]
    fn modes_round_trip_through_names() {
        for mode in AnimationMode::ALL {
            assert_eq!(AnimationMode::from_name(mode.name()), Some(mode));
        }
        assert_eq!(AnimationMode::from_name("SPIRAL"), Some(AnimationMode::Spiral));
        assert_eq!(AnimationMode::from_name("jitter"), None);
    }
}
