// Drag with the left mouse button (or a finger) to stir the fluid.
// P pauses the solver, the last frame stays on screen.
// Pass --white for full resolution white ink instead of the pastel preset.

use bevy::prelude::*;
use bevy_stable_fluids::config::SimulationControl;
use bevy_stable_fluids::{GpuFluidPlugin, SimulationConfig};

fn main() {
    let config = if std::env::args().any(|arg| arg == "--white") {
        SimulationConfig::demo_viewport()
    } else {
        SimulationConfig::demo_pastel()
    };

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "stable fluids (gpu)".into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(config)
        .add_plugins(GpuFluidPlugin)
        .add_systems(Startup, setup)
        .add_systems(Update, toggle_pause)
        .run();
}

fn setup(mut commands: Commands) {
    commands.spawn(Camera2d);
}

fn toggle_pause(keys: Res<ButtonInput<KeyCode>>, mut control: ResMut<SimulationControl>) {
    if keys.just_pressed(KeyCode::KeyP) {
        control.paused = !control.paused;
        info!("solver {}", if control.paused { "paused" } else { "running" });
    }
}
