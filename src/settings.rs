//! User-facing view settings and keyboard commands
//!
//! Settings never fail to apply: out-of-range values are clamped or wrapped
//! silently and the change is logged at debug level.

use winit::keyboard::KeyCode;

use crate::animation::{AnimationMode, StaticAngles};
use crate::gfx::resources::MaterialStyle;

pub const MIN_SCALE: f32 = 0.5;
pub const MAX_SCALE: f32 = 2.0;
pub const SCALE_STEP: f32 = 0.1;
pub const ANGLE_STEP_DEGREES: f32 = 10.0;

/// Render quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PerformanceTier {
    Low,
    #[default]
    Medium,
    High,
}

impl PerformanceTier {
    pub const ALL: [PerformanceTier; 3] = [
        PerformanceTier::Low,
        PerformanceTier::Medium,
        PerformanceTier::High,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PerformanceTier::Low => "low",
            PerformanceTier::Medium => "medium",
            PerformanceTier::High => "high",
        }
    }

    /// Edge length of the square shadow map.
    pub fn shadow_map_size(self) -> u32 {
        match self {
            PerformanceTier::Low => 1024,
            PerformanceTier::Medium => 2048,
            PerformanceTier::High => 4096,
        }
    }

    /// Cells per side of the debug grid.
    pub fn grid_divisions(self) -> u32 {
        match self {
            PerformanceTier::Low => 10,
            PerformanceTier::Medium | PerformanceTier::High => 20,
        }
    }

    /// Present mode to ask for; the renderer falls back to Fifo when the
    /// surface does not offer it.
    pub fn preferred_present_mode(self) -> wgpu::PresentMode {
        match self {
            PerformanceTier::Low => wgpu::PresentMode::Fifo,
            PerformanceTier::Medium | PerformanceTier::High => wgpu::PresentMode::Mailbox,
        }
    }
}

/// Everything the user can change while viewing.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSettings {
    scale: f32,
    /// Static tilt in degrees, wrapped to `[-180, 180)`
    rotation_x: f32,
    rotation_y: f32,
    pub style: MaterialStyle,
    pub performance_tier: PerformanceTier,
    pub background_color: [f32; 3],
    pub show_grid: bool,
    pub show_shadows: bool,
    pub animation_mode: AnimationMode,
    pub playing: bool,
    /// Free camera orbit; only honoured in static mode
    pub auto_rotate: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            scale: 1.0,
            rotation_x: 0.0,
            rotation_y: 0.0,
            style: MaterialStyle::Normal,
            performance_tier: PerformanceTier::Medium,
            background_color: [0.102, 0.102, 0.180],
            show_grid: false,
            show_shadows: true,
            animation_mode: AnimationMode::Static,
            playing: true,
            auto_rotate: false,
        }
    }
}

fn wrap_degrees(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

impl ViewSettings {
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Sets the uniform scale, clamped into `[0.5, 2.0]`.
    pub fn set_scale(&mut self, scale: f32) {
        let clamped = if scale.is_finite() {
            scale.clamp(MIN_SCALE, MAX_SCALE)
        } else {
            1.0
        };
        if clamped != scale {
            log::debug!("scale {scale} clamped to {clamped}");
        }
        self.scale = clamped;
    }

    /// Sets the scale from a slider, snapped to the nearest 0.1 step.
    pub fn set_scale_stepped(&mut self, scale: f32) {
        self.set_scale((scale / SCALE_STEP).round() * SCALE_STEP);
    }

    /// Manual tilt only applies to the static pose.
    pub fn rotation_editable(&self) -> bool {
        self.animation_mode == AnimationMode::Static
    }

    pub fn rotation_x(&self) -> f32 {
        self.rotation_x
    }

    pub fn rotation_y(&self) -> f32 {
        self.rotation_y
    }

    pub fn set_rotation(&mut self, x_degrees: f32, y_degrees: f32) {
        self.rotation_x = wrap_degrees(x_degrees);
        self.rotation_y = wrap_degrees(y_degrees);
    }

    pub fn static_angles(&self) -> StaticAngles {
        StaticAngles {
            x_degrees: self.rotation_x,
            y_degrees: self.rotation_y,
        }
    }

    pub fn set_background_color(&mut self, color: [f32; 3]) {
        self.background_color = color.map(|c| if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 });
    }

    /// Whether frames have to be produced continuously.
    pub fn is_animating(&self) -> bool {
        self.playing && (self.animation_mode.is_animated() || self.camera_auto_rotates())
    }

    /// Camera auto-rotation is off in every driven mode.
    pub fn camera_auto_rotates(&self) -> bool {
        self.auto_rotate && self.animation_mode == AnimationMode::Static
    }

    /// Applies a keyboard command that edits settings. Returns `true` when
    /// something changed; commands handled elsewhere return `false`.
    pub fn apply(&mut self, command: ControlCommand) -> bool {
        let before = self.clone();
        match command {
            ControlCommand::YawLeft => {
                self.set_rotation(self.rotation_x, self.rotation_y - ANGLE_STEP_DEGREES)
            }
            ControlCommand::YawRight => {
                self.set_rotation(self.rotation_x, self.rotation_y + ANGLE_STEP_DEGREES)
            }
            ControlCommand::PitchUp => {
                self.set_rotation(self.rotation_x - ANGLE_STEP_DEGREES, self.rotation_y)
            }
            ControlCommand::PitchDown => {
                self.set_rotation(self.rotation_x + ANGLE_STEP_DEGREES, self.rotation_y)
            }
            ControlCommand::ScaleUp => self.set_scale(self.scale + SCALE_STEP),
            ControlCommand::ScaleDown => self.set_scale(self.scale - SCALE_STEP),
            ControlCommand::TogglePlay => self.playing = !self.playing,
            ControlCommand::ToggleSettingsPanel
            | ControlCommand::ExportSnapshot
            | ControlCommand::ResetCamera
            | ControlCommand::Quit => return false,
        }
        *self != before
    }
}

/// Keyboard surface of the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    YawLeft,
    YawRight,
    PitchUp,
    PitchDown,
    ScaleUp,
    ScaleDown,
    TogglePlay,
    ToggleSettingsPanel,
    ExportSnapshot,
    ResetCamera,
    Quit,
}

impl ControlCommand {
    /// Maps a pressed key to a command.
    pub fn from_key(code: KeyCode, shift_held: bool) -> Option<Self> {
        let command = match code {
            KeyCode::ArrowLeft => ControlCommand::YawLeft,
            KeyCode::ArrowRight => ControlCommand::YawRight,
            KeyCode::ArrowUp => ControlCommand::PitchUp,
            KeyCode::ArrowDown => ControlCommand::PitchDown,
            KeyCode::Equal | KeyCode::NumpadAdd => ControlCommand::ScaleUp,
            KeyCode::Minus | KeyCode::NumpadSubtract => ControlCommand::ScaleDown,
            KeyCode::KeyP => ControlCommand::TogglePlay,
            KeyCode::KeyS => ControlCommand::ToggleSettingsPanel,
            KeyCode::KeyD => ControlCommand::ExportSnapshot,
            KeyCode::KeyC if shift_held => ControlCommand::ResetCamera,
            KeyCode::Escape => ControlCommand::Quit,
            _ => return None,
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_is_clamped() {
        let mut settings = ViewSettings::default();
        settings.set_scale(5.0);
        assert_eq!(settings.scale(), 2.0);
        settings.set_scale(0.01);
        assert_eq!(settings.scale(), 0.5);
        settings.set_scale(f32::NAN);
        assert_eq!(settings.scale(), 1.0);
    }

    #[test]
    fn slider_scale_snaps_to_steps() {
        let mut settings = ViewSettings::default();
        settings.set_scale_stepped(1.34);
        assert!((settings.scale() - 1.3).abs() < 1e-5);
        settings.set_scale_stepped(0.47);
        assert_eq!(settings.scale(), MIN_SCALE);
        settings.set_scale_stepped(1.96);
        assert_eq!(settings.scale(), MAX_SCALE);
    }

    #[test]
    fn tilt_is_editable_only_when_static() {
        let mut settings = ViewSettings::default();
        assert!(settings.rotation_editable());
        for mode in AnimationMode::ALL {
            settings.animation_mode = mode;
            assert_eq!(settings.rotation_editable(), mode == AnimationMode::Static);
        }
    }

    #[test]
    fn scale_keys_stop_at_bounds() {
        let mut settings = ViewSettings::default();
        for _ in 0..20 {
            settings.apply(ControlCommand::ScaleUp);
        }
        assert_eq!(settings.scale(), MAX_SCALE);
        assert!(!settings.apply(ControlCommand::ScaleUp));
    }

    #[test]
    fn arrows_step_ten_degrees_and_wrap() {
        let mut settings = ViewSettings::default();
        assert!(settings.apply(ControlCommand::YawRight));
        assert_eq!(settings.rotation_y(), 10.0);

        settings.set_rotation(0.0, 175.0);
        settings.apply(ControlCommand::YawRight);
        assert_eq!(settings.rotation_y(), -175.0);

        settings.apply(ControlCommand::PitchUp);
        assert_eq!(settings.rotation_x(), -10.0);
    }

    #[test]
    fn play_toggle_controls_animation() {
        let mut settings = ViewSettings {
            animation_mode: AnimationMode::Rotate,
            ..ViewSettings::default()
        };
        assert!(settings.is_animating());
        settings.apply(ControlCommand::TogglePlay);
        assert!(!settings.is_animating());

        settings.playing = true;
        settings.animation_mode = AnimationMode::Static;
        assert!(!settings.is_animating());

        // Static mode only needs frames while the camera orbits
        settings.auto_rotate = true;
        assert!(settings.is_animating());
    }

    #[test]
    fn key_mapping() {
        assert_eq!(ControlCommand::from_key(KeyCode::KeyD, false), Some(ControlCommand::ExportSnapshot));
        assert_eq!(ControlCommand::from_key(KeyCode::KeyC, false), None);
        assert_eq!(ControlCommand::from_key(KeyCode::KeyC, true), Some(ControlCommand::ResetCamera));
        assert_eq!(ControlCommand::from_key(KeyCode::NumpadAdd, false), Some(ControlCommand::ScaleUp));
        assert_eq!(ControlCommand::from_key(KeyCode::KeyQ, false), None);
    }

    #[test]
    fn tiers_scale_shadow_quality() {
        let sizes: Vec<u32> = PerformanceTier::ALL.iter().map(|t| t.shadow_map_size()).collect();
        assert_eq!(sizes, vec![1024, 2048, 4096]);
        assert_eq!(PerformanceTier::Low.preferred_present_mode(), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn background_is_clamped() {
        let mut settings = ViewSettings::default();
        settings.set_background_color([1.5, -0.2, f32::INFINITY]);
        assert_eq!(settings.background_color, [1.0, 0.0, 0.0]);
    }
}
