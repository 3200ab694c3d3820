use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
};

use super::orbit_camera::OrbitCamera;

/// What a plain (no shift) drag does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragTarget {
    /// Orbit the camera around its target
    Camera,
    /// Push the object; reported back to the caller as pixel deltas
    Object,
}

/// Result of feeding one device event to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerOutcome {
    /// The camera moved and a frame should be drawn
    pub camera_changed: bool,
    /// Pixel delta of an object drag
    pub object_drag: Option<(f32, f32)>,
    /// The user started or stopped manipulating the camera
    pub interaction_changed: bool,
}

pub struct CameraController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    is_shift_held: bool,
    is_mouse_pressed: bool,
}

impl CameraController {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            pan_speed: 0.01,
            is_shift_held: false,
            is_mouse_pressed: false,
        }
    }

    pub fn process_events(
        &mut self,
        event: &DeviceEvent,
        camera: &mut OrbitCamera,
        drag_target: DragTarget,
    ) -> PointerOutcome {
        let mut outcome = PointerOutcome::default();
        match event {
            DeviceEvent::Button {
                button: 0, // Left Mouse Button
                state,
            } => {
                let pressed = *state == ElementState::Pressed;
                outcome.interaction_changed = pressed != self.is_mouse_pressed;
                self.is_mouse_pressed = pressed;
            }
            DeviceEvent::MouseWheel { delta, .. } => {
                let scroll_amount = -match delta {
                    MouseScrollDelta::LineDelta(_, scroll) => *scroll,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => {
                        *scroll as f32
                    }
                };
                camera.add_distance(scroll_amount * self.zoom_speed);
                outcome.camera_changed = true;
            }
            DeviceEvent::MouseMotion { delta } if self.is_mouse_pressed => {
                let (dx, dy) = (delta.0 as f32, delta.1 as f32);
                if self.is_shift_held {
                    camera.pan((-dx * self.pan_speed, dy * self.pan_speed));
                    outcome.camera_changed = true;
                } else {
                    match drag_target {
                        DragTarget::Camera => {
                            camera.add_yaw(-dx * self.rotate_speed);
                            camera.add_pitch(dy * self.rotate_speed);
                            outcome.camera_changed = true;
                        }
                        DragTarget::Object => outcome.object_drag = Some((dx, dy)),
                    }
                }
            }
            _ => (),
        }
        outcome
    }

    /// Tracks Shift and handles Shift+C. Returns whether the camera was reset.
    pub fn process_keyed_events(&mut self, event: &KeyEvent, camera: &mut OrbitCamera) -> bool {
        match event {
            KeyEvent {
                physical_key: PhysicalKey::Code(KeyCode::ShiftLeft | KeyCode::ShiftRight),
                state,
                ..
            } => {
                self.is_shift_held = *state == ElementState::Pressed;
                false
            }
            KeyEvent {
                physical_key: PhysicalKey::Code(KeyCode::KeyC),
                state: ElementState::Pressed,
                ..
            } if self.is_shift_held => {
                log::info!("resetting camera to default position");
                camera.reset_to_default();
                true
            }
            _ => false,
        }
    }

    pub fn is_shift_held(&self) -> bool {
        self.is_shift_held
    }

    /// True while the user holds the mouse button down
    pub fn is_interacting(&self) -> bool {
        self.is_mouse_pressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(controller: &mut CameraController, camera: &mut OrbitCamera) {
        controller.process_events(
            &DeviceEvent::Button {
                button: 0,
                state: ElementState::Pressed,
            },
            camera,
            DragTarget::Camera,
        );
    }

    #[test]
    fn drag_orbits_camera_outside_interactive_mode() {
        let mut camera = OrbitCamera::with_distance_bounds(1.0, 1.5, 10.0);
        let mut controller = CameraController::new(0.005, 0.3);
        press(&mut controller, &mut camera);

        let outcome = controller.process_events(
            &DeviceEvent::MouseMotion { delta: (-40.0, 0.0) },
            &mut camera,
            DragTarget::Camera,
        );
        assert!(outcome.camera_changed);
        assert!(outcome.object_drag.is_none());
        assert!(camera.yaw > 0.0);
    }

    #[test]
    fn drag_pushes_object_in_interactive_mode() {
        let mut camera = OrbitCamera::with_distance_bounds(1.0, 1.5, 10.0);
        let mut controller = CameraController::new(0.005, 0.3);
        press(&mut controller, &mut camera);

        let outcome = controller.process_events(
            &DeviceEvent::MouseMotion { delta: (12.0, -3.0) },
            &mut camera,
            DragTarget::Object,
        );
        assert_eq!(outcome.object_drag, Some((12.0, -3.0)));
        assert!(!outcome.camera_changed);
        assert_eq!(camera.yaw, 0.0);
    }

    #[test]
    fn motion_without_button_is_ignored() {
        let mut camera = OrbitCamera::with_distance_bounds(1.0, 1.5, 10.0);
        let mut controller = CameraController::new(0.005, 0.3);
        let outcome = controller.process_events(
            &DeviceEvent::MouseMotion { delta: (10.0, 10.0) },
            &mut camera,
            DragTarget::Object,
        );
        assert_eq!(outcome, PointerOutcome::default());
    }

    #[test]
    fn wheel_zooms_in_every_mode() {
        let mut camera = OrbitCamera::with_distance_bounds(1.0, 1.5, 10.0);
        let mut controller = CameraController::new(0.005, 0.3);
        let before = camera.distance;
        let outcome = controller.process_events(
            &DeviceEvent::MouseWheel {
                delta: MouseScrollDelta::LineDelta(0.0, 1.0),
            },
            &mut camera,
            DragTarget::Object,
        );
        assert!(outcome.camera_changed);
        assert!(camera.distance < before);
    }
}
