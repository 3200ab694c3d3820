//! Settings panel
//!
//! Edits a copy of the [`ViewSettings`]; the caller hands the copy back to
//! the viewer when something changed.

use crate::animation::AnimationMode;
use crate::gfx::resources::MaterialStyle;
use crate::settings::{PerformanceTier, ViewSettings, MAX_SCALE, MIN_SCALE};

/// What the user did in the panel this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelActions {
    pub settings_changed: bool,
    pub reset_camera: bool,
    pub export_snapshot: bool,
}

pub fn settings_panel(ui: &imgui::Ui, settings: &mut ViewSettings) -> PanelActions {
    let display_size = ui.io().display_size;
    if display_size[0] <= 0.0 || display_size[1] <= 0.0 {
        return PanelActions::default();
    }

    let mut actions = PanelActions::default();
    ui.window("Settings")
        .size([320.0, 460.0], imgui::Condition::FirstUseEver)
        .position([20.0, 20.0], imgui::Condition::FirstUseEver)
        .collapsible(true)
        .build(|| {
            actions.settings_changed |= animation_controls(ui, settings);
            ui.separator();
            actions.settings_changed |= appearance_controls(ui, settings);
            ui.separator();
            actions.settings_changed |= transform_controls(ui, settings);
            ui.separator();
            actions.settings_changed |= environment_controls(ui, settings);
            ui.separator();

            if ui.button("Reset Camera") {
                actions.reset_camera = true;
            }
            ui.same_line();
            if ui.button("Export PNG") {
                actions.export_snapshot = true;
            }
        });
    actions
}

fn animation_controls(ui: &imgui::Ui, settings: &mut ViewSettings) -> bool {
    let mut changed = false;
    let names: Vec<&str> = AnimationMode::ALL.iter().map(|mode| mode.name()).collect();
    let mut index = settings.animation_mode.index();
    if ui.combo_simple_string("Animation", &mut index, &names) {
        if let Some(mode) = AnimationMode::ALL.get(index) {
            settings.animation_mode = *mode;
            changed = true;
        }
    }
    changed |= ui.checkbox("Playing", &mut settings.playing);
    if settings.animation_mode == AnimationMode::Static {
        changed |= ui.checkbox("Auto-rotate camera", &mut settings.auto_rotate);
    }
    if settings.animation_mode == AnimationMode::Interactive {
        ui.text_disabled("Drag the code to push it around");
    }
    changed
}

fn appearance_controls(ui: &imgui::Ui, settings: &mut ViewSettings) -> bool {
    let names: Vec<&str> = MaterialStyle::ALL.iter().map(|style| style.name()).collect();
    let mut index = MaterialStyle::ALL
        .iter()
        .position(|style| *style == settings.style)
        .unwrap_or(0);
    if ui.combo_simple_string("Style", &mut index, &names) {
        if let Some(style) = MaterialStyle::ALL.get(index) {
            settings.style = *style;
            return true;
        }
    }
    false
}

fn transform_controls(ui: &imgui::Ui, settings: &mut ViewSettings) -> bool {
    let mut changed = false;

    let mut scale = settings.scale();
    if ui.slider("Scale", MIN_SCALE, MAX_SCALE, &mut scale) {
        settings.set_scale_stepped(scale);
        changed = true;
    }

    if !settings.rotation_editable() {
        return changed;
    }
    let (mut x, mut y) = (settings.rotation_x(), settings.rotation_y());
    let x_changed = ui.slider("Tilt X", -180.0, 180.0, &mut x);
    let y_changed = ui.slider("Tilt Y", -180.0, 180.0, &mut y);
    if x_changed || y_changed {
        settings.set_rotation(x, y);
        changed = true;
    }
    changed
}

fn environment_controls(ui: &imgui::Ui, settings: &mut ViewSettings) -> bool {
    let mut changed = false;

    let names: Vec<&str> = PerformanceTier::ALL.iter().map(|tier| tier.name()).collect();
    let mut index = PerformanceTier::ALL
        .iter()
        .position(|tier| *tier == settings.performance_tier)
        .unwrap_or(1);
    if ui.combo_simple_string("Quality", &mut index, &names) {
        if let Some(tier) = PerformanceTier::ALL.get(index) {
            settings.performance_tier = *tier;
            changed = true;
        }
    }

    let mut color = settings.background_color;
    if ui.color_edit3("Background", &mut color) {
        settings.set_background_color(color);
        changed = true;
    }
    changed |= ui.checkbox("Grid", &mut settings.show_grid);
    changed |= ui.checkbox("Shadows", &mut settings.show_shadows);
    changed
}
