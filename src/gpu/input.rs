// pointer capture for the GPU app: mouse button 1 and the first touch both
// drive the single PointerState

use bevy::prelude::*;
use bevy::render::extract_resource::ExtractResource;
use bevy::window::PrimaryWindow;

use crate::config::{SimulationConfig, SimulationControl};
use crate::gpu::buffers::FieldImages;
use crate::injection::{InjectionStage, PointerState, SplatRequest};

/// Splats produced this frame, handed to the render world with the frame.
#[derive(Resource, ExtractResource, Clone, Debug, Default)]
pub struct FrameInjections {
    pub splats: Vec<SplatRequest>,
}

pub fn capture_pointer(
    mouse: Res<ButtonInput<MouseButton>>,
    touches: Res<Touches>,
    windows: Query<&Window, With<PrimaryWindow>>,
    config: Res<SimulationConfig>,
    mut pointer: ResMut<PointerState>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let size = window.size();
    if size.x <= 0.0 || size.y <= 0.0 {
        return;
    }

    let touch = touches.iter().next();
    let held = mouse.pressed(MouseButton::Left) || touch.is_some();
    let pressed = mouse.just_pressed(MouseButton::Left) || touches.iter_just_pressed().next().is_some();
    let cursor = touch.map(|t| t.position()).or_else(|| window.cursor_position());

    if let Some(cursor) = cursor {
        // window space is top-left origin, y down, same as grid rows
        let position = (cursor / size).clamp(Vec2::ZERO, Vec2::ONE);
        if pressed {
            let color = InjectionStage::new(&config).next_color(&mut rand::thread_rng());
            pointer.press(position, color);
        } else if held && position != pointer.position {
            pointer.move_to(position);
        }
    }

    if !held && pointer.active {
        pointer.release();
    }
}

/// Turns pending pointer movement into this frame's splats. Movement made
/// while paused is dropped rather than released as one large impulse.
pub fn queue_injections(
    config: Res<SimulationConfig>,
    control: Res<SimulationControl>,
    fields: Option<Res<FieldImages>>,
    mut pointer: ResMut<PointerState>,
    mut injections: ResMut<FrameInjections>,
) {
    injections.splats.clear();
    let Some(fields) = fields else {
        return;
    };
    let aspect = fields.viewport.x as f32 / fields.viewport.y.max(1) as f32;
    let splats = InjectionStage::new(&config).inject(&mut pointer, aspect);
    if !control.paused {
        injections.splats = splats;
    }
}
