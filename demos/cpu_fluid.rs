// CPU reference solver shown through a texture that is rewritten every frame.
// Left mouse drag stirs, Space drops a random splat, P pauses.

use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::window::PrimaryWindow;
use bevy_stable_fluids::SimulationConfig;
use bevy_stable_fluids::config::GridResolution;
use bevy_stable_fluids::cpu::presenter::Surface;
use bevy_stable_fluids::cpu::simulation::FluidSimulation;
use rand::Rng;

const SURFACE_SIZE: u32 = 256;

#[derive(Resource)]
struct CpuFluid {
    sim: FluidSimulation,
    surface: Surface,
    image: Handle<Image>,
}

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        .add_systems(Startup, setup)
        .add_systems(Update, (pointer_input, keyboard_input, fluid_step, upload_surface).chain())
        .run();
}

fn setup(mut commands: Commands, mut images: ResMut<Assets<Image>>) -> Result {
    let config = SimulationConfig {
        velocity_resolution: GridResolution::ShortSide(64),
        dye_resolution: GridResolution::ShortSide(128),
        ..SimulationConfig::demo_pastel()
    };
    let sim = FluidSimulation::new(config, UVec2::splat(SURFACE_SIZE))?;

    let image = Image::new_fill(
        Extent3d {
            width: SURFACE_SIZE,
            height: SURFACE_SIZE,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        &[0, 0, 0, 255],
        TextureFormat::Rgba8Unorm,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    );
    let image = images.add(image);

    commands.spawn(Camera2d);
    commands.spawn(Sprite {
        image: image.clone(),
        custom_size: Some(Vec2::splat(640.0)),
        ..default()
    });
    commands.insert_resource(CpuFluid {
        sim,
        surface: Surface::new(SURFACE_SIZE, SURFACE_SIZE),
        image,
    });
    Ok(())
}

fn pointer_input(
    mut fluid: ResMut<CpuFluid>,
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    // sprite is centered, 640 px wide
    let origin = window.size() * 0.5 - Vec2::splat(320.0);
    let position = ((cursor - origin) / 640.0).clamp(Vec2::ZERO, Vec2::ONE);

    let sim = &mut fluid.sim;
    if buttons.just_pressed(MouseButton::Left) {
        sim.press(position, &mut rand::thread_rng());
    } else if buttons.pressed(MouseButton::Left) {
        if position != sim.pointer.position {
            sim.pointer.move_to(position);
        }
    } else if sim.pointer.active {
        sim.pointer.release();
    }
}

fn keyboard_input(mut fluid: ResMut<CpuFluid>, keys: Res<ButtonInput<KeyCode>>) {
    if keys.just_pressed(KeyCode::KeyP) {
        fluid.sim.paused = !fluid.sim.paused;
    }
    if keys.just_pressed(KeyCode::Space) {
        let mut rng = rand::thread_rng();
        let point = Vec2::new(rng.gen_range(0.2..0.8), rng.gen_range(0.2..0.8));
        let force = Vec2::new(rng.gen_range(-400.0..400.0), rng.gen_range(-400.0..400.0));
        let color = Vec3::new(rng.gen_range(0.3..1.0), rng.gen_range(0.3..1.0), rng.gen_range(0.3..1.0));
        fluid.sim.splat(point, force, color);
    }
}

fn fluid_step(mut fluid: ResMut<CpuFluid>) -> Result {
    fluid.sim.step()?;
    Ok(())
}

fn upload_surface(mut fluid: ResMut<CpuFluid>, mut images: ResMut<Assets<Image>>) -> Result {
    let CpuFluid { sim, surface, image } = &mut *fluid;
    sim.present(surface)?;
    if let Some(image) = images.get_mut(&*image) {
        image.data = Some(surface.as_bytes().to_vec());
    }
    Ok(())
}
