//! # Scene/Environment Composer
//!
//! Owns the orbit camera and its controls and assembles everything the
//! renderer needs for one frame into a [`SceneDescription`]: the object's
//! model matrix and material, the light rig, the optional shadow-catching
//! ground and the optional debug grid.

use cgmath::{Matrix, Matrix4, Point3, SquareMatrix, Vector3};
use winit::event::{DeviceEvent, KeyEvent};

use crate::animation::{AnimationMode, Transform};
use crate::config::EngineConfig;
use crate::gfx::camera::{
    camera_utils::convert_matrix4_to_array, CameraController, CameraUniform, DragTarget,
    OrbitCamera, PointerOutcome,
};
use crate::gfx::resources::MaterialParams;
use crate::settings::ViewSettings;

/// Edge length of the code card in world units
pub const CARD_SIZE: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
    pub casts_shadow: bool,
}

impl DirectionalLight {
    /// Unit vector from the scene origin toward the light.
    pub fn direction(&self) -> [f32; 3] {
        let [x, y, z] = self.position;
        let len = (x * x + y * y + z * z).sqrt().max(f32::EPSILON);
        [x / len, y / len, z / len]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightRig {
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
    /// Shadow-casting key light
    pub key: DirectionalLight,
    /// Fill light from the opposite side, no shadows
    pub fill: DirectionalLight,
}

impl Default for LightRig {
    fn default() -> Self {
        Self {
            ambient_color: [1.0, 1.0, 1.0],
            ambient_intensity: 0.5,
            key: DirectionalLight {
                position: [10.0, 10.0, 5.0],
                color: [1.0, 1.0, 1.0],
                intensity: 1.0,
                casts_shadow: true,
            },
            fill: DirectionalLight {
                position: [-10.0, -10.0, -5.0],
                color: [1.0, 1.0, 1.0],
                intensity: 0.5,
                casts_shadow: false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundPlane {
    pub height: f32,
    pub size: f32,
    /// Darkness of the shadow where fully occluded
    pub shadow_opacity: f32,
}

impl Default for GroundPlane {
    fn default() -> Self {
        Self {
            height: -2.0,
            size: 20.0,
            shadow_opacity: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub size: f32,
    pub divisions: u32,
    pub height: f32,
    pub color: [f32; 3],
}

/// Declarative description of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDescription {
    pub camera: CameraUniform,
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of the model matrix for normals
    pub normal_matrix: [[f32; 4]; 4],
    pub material: MaterialParams,
    pub lights: LightRig,
    pub light_view_proj: [[f32; 4]; 4],
    pub ground: Option<GroundPlane>,
    pub grid: Option<GridSpec>,
    pub shadows: bool,
    pub shadow_map_size: u32,
    /// Preferred; the renderer falls back to Fifo when unsupported
    pub present_mode: wgpu::PresentMode,
    pub background: [f32; 3],
}

impl SceneDescription {
    /// Triangles submitted for this description.
    pub fn triangle_count(&self) -> u32 {
        let card = 2;
        let ground = if self.ground.is_some() { 2 } else { 0 };
        let shadow_pass = if self.shadows { 2 } else { 0 };
        card + ground + shadow_pass
    }

    /// Draw calls submitted for this description.
    pub fn draw_calls(&self) -> u32 {
        1 + self.ground.is_some() as u32 + self.grid.is_some() as u32 + self.shadows as u32
    }

    pub fn background_color(&self) -> wgpu::Color {
        let [r, g, b] = self.background;
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        }
    }
}

pub struct SceneComposer {
    camera: OrbitCamera,
    controller: CameraController,
    lights: LightRig,
    ground: GroundPlane,
}

impl SceneComposer {
    pub fn new(config: &EngineConfig) -> Self {
        let (width, height) = config.window_size;
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Self {
            camera: OrbitCamera::with_distance_bounds(
                aspect,
                config.min_camera_distance,
                config.max_camera_distance,
            ),
            controller: CameraController::new(0.005, 0.3),
            lights: LightRig::default(),
            ground: GroundPlane::default(),
        }
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn lights(&self) -> &LightRig {
        &self.lights
    }

    /// Auto-rotation only runs while the object itself stands still and
    /// playback is on.
    pub fn sync_settings(&mut self, settings: &ViewSettings) {
        self.camera.auto_rotate = settings.playing && settings.camera_auto_rotates();
    }

    pub fn handle_pointer(&mut self, event: &DeviceEvent, mode: AnimationMode) -> PointerOutcome {
        let target = if mode == AnimationMode::Interactive {
            DragTarget::Object
        } else {
            DragTarget::Camera
        };
        self.controller.process_events(event, &mut self.camera, target)
    }

    /// Returns whether the camera was reset.
    pub fn handle_key(&mut self, event: &KeyEvent) -> bool {
        self.controller.process_keyed_events(event, &mut self.camera)
    }

    pub fn is_shift_held(&self) -> bool {
        self.controller.is_shift_held()
    }

    pub fn reset_camera(&mut self) {
        self.camera.reset_to_default();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.resize_projection(width, height);
    }

    /// Advances camera auto-rotation, paused while the user drags.
    /// Returns whether the view changed.
    pub fn update(&mut self, delta_seconds: f32) -> bool {
        if self.controller.is_interacting() {
            return false;
        }
        self.camera.advance_auto_rotate(delta_seconds)
    }

    pub fn compose(
        &mut self,
        settings: &ViewSettings,
        transform: &Transform,
        material: MaterialParams,
    ) -> SceneDescription {
        self.camera.update_view_proj();

        let model = transform.to_matrix(settings.scale());
        let normal_matrix = model
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(Matrix4::identity);

        let tier = settings.performance_tier;
        let grid = settings.show_grid.then(|| GridSpec {
            size: self.ground.size,
            divisions: tier.grid_divisions(),
            height: self.ground.height + 0.001,
            color: [0.53, 0.53, 0.53],
        });

        SceneDescription {
            camera: self.camera.uniform,
            model: convert_matrix4_to_array(model),
            normal_matrix: convert_matrix4_to_array(normal_matrix),
            material,
            lights: self.lights,
            light_view_proj: convert_matrix4_to_array(self.light_view_projection()),
            ground: settings.show_shadows.then_some(self.ground),
            grid,
            shadows: settings.show_shadows,
            shadow_map_size: tier.shadow_map_size(),
            present_mode: tier.preferred_present_mode(),
            background: settings.background_color,
        }
    }

    /// Orthographic projection from the key light covering the object and
    /// the ground area it can throw shadows on.
    fn light_view_projection(&self) -> Matrix4<f32> {
        let [x, y, z] = self.lights.key.position;
        let view = Matrix4::look_at_rh(
            Point3::new(x, y, z),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::unit_y(),
        );
        let proj = crate::gfx::camera::orbit_camera::OPENGL_TO_WGPU_MATRIX
            * cgmath::ortho(-6.0, 6.0, -6.0, 6.0, 1.0, 40.0);
        proj * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::resources::MaterialStyle;

    fn compose(settings: &ViewSettings) -> SceneDescription {
        let mut composer = SceneComposer::new(&EngineConfig::default());
        composer.compose(
            settings,
            &Transform::IDENTITY,
            MaterialStyle::Normal.parameters(),
        )
    }

    #[test]
    fn light_rig_matches_studio_setup() {
        let rig = LightRig::default();
        assert_eq!(rig.ambient_intensity, 0.5);
        assert!(rig.key.casts_shadow);
        assert!(!rig.fill.casts_shadow);
        let key = rig.key.direction();
        let fill = rig.fill.direction();
        for i in 0..3 {
            assert!((key[i] + fill[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn same_settings_compose_the_same_scene() {
        let settings = ViewSettings::default();
        let first = compose(&settings);
        assert_eq!(first, compose(&settings));
        assert_eq!(first.camera, compose(&settings).camera);
        assert_ne!(first.camera, CameraUniform::default());
    }

    #[test]
    fn shadows_toggle_ground_plane() {
        let mut settings = ViewSettings::default();
        settings.show_shadows = true;
        let with = compose(&settings);
        assert_eq!(with.ground.map(|g| g.height), Some(-2.0));
        assert_eq!(with.draw_calls(), 3);

        settings.show_shadows = false;
        let without = compose(&settings);
        assert!(without.ground.is_none());
        assert_eq!(without.draw_calls(), 1);
        assert_eq!(without.triangle_count(), 2);
    }

    #[test]
    fn grid_density_follows_tier() {
        let mut settings = ViewSettings::default();
        settings.show_grid = true;
        settings.performance_tier = crate::settings::PerformanceTier::Low;
        assert_eq!(compose(&settings).grid.map(|g| g.divisions), Some(10));
        settings.performance_tier = crate::settings::PerformanceTier::High;
        let scene = compose(&settings);
        assert_eq!(scene.grid.map(|g| g.divisions), Some(20));
        assert_eq!(scene.shadow_map_size, 4096);
    }

    #[test]
    fn user_scale_reaches_model_matrix() {
        let mut settings = ViewSettings::default();
        settings.set_scale(2.0);
        let scene = compose(&settings);
        assert_eq!(scene.model[0][0], 2.0);
        assert_eq!(scene.normal_matrix[0][0], 0.5);
    }

    #[test]
    fn auto_rotate_only_in_static_mode() {
        let mut composer = SceneComposer::new(&EngineConfig::default());
        let mut settings = ViewSettings::default();
        settings.auto_rotate = true;
        settings.animation_mode = AnimationMode::Rotate;
        composer.sync_settings(&settings);
        assert!(!composer.update(1.0));

        settings.animation_mode = AnimationMode::Static;
        composer.sync_settings(&settings);
        assert!(composer.update(1.0));
        assert!(composer.camera().yaw > 0.0);

        settings.playing = false;
        composer.sync_settings(&settings);
        assert!(!composer.update(1.0));
    }
}
