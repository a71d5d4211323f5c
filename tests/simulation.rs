use bevy_stable_fluids::config::GridResolution;
use bevy_stable_fluids::cpu::field::Field;
use bevy_stable_fluids::cpu::presenter::{Presenter, Surface, display};
use bevy_stable_fluids::cpu::simulation::FluidSimulation;
use bevy_stable_fluids::format::{ChannelLayout, FieldDescriptor, FieldFormat, FieldName, FormatSupport, Precision};
use bevy_stable_fluids::{FluidError, SimulationConfig};
use glam::{UVec2, Vec2, Vec3, Vec4};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn small_config() -> SimulationConfig {
    SimulationConfig {
        velocity_resolution: GridResolution::ShortSide(16),
        dye_resolution: GridResolution::ShortSide(32),
        ..Default::default()
    }
}

#[test]
fn grids_follow_the_configured_resolution() {
    let sim = FluidSimulation::new(small_config(), UVec2::new(200, 100)).unwrap();
    assert_eq!(sim.velocity().unwrap().size(), UVec2::new(32, 16));
    assert_eq!(sim.dye().unwrap().size(), UVec2::new(64, 32));
    assert_eq!(sim.pool.get(FieldName::Pressure).unwrap().size(), UVec2::new(32, 16));
    assert_eq!(sim.aspect(), 2.0);
}

#[test]
fn zero_viewport_fails_to_allocate() {
    let err = FluidSimulation::new(small_config(), UVec2::new(0, 100)).err();
    assert!(matches!(err, Some(FluidError::ZeroSized { .. })));
}

#[test]
fn invalid_config_is_rejected() {
    let config = SimulationConfig {
        pressure_iterations: 0,
        ..Default::default()
    };
    let err = FluidSimulation::new(config, UVec2::new(64, 64)).err();
    assert!(matches!(err, Some(FluidError::InvalidConfig(_))));
}

#[test]
fn unsupported_dye_precision_falls_back() {
    let support = FormatSupport::all().without(FieldFormat::new(ChannelLayout::Rgba, Precision::Float16));
    let sim = FluidSimulation::with_support(small_config(), UVec2::new(64, 64), support).unwrap();
    let dye = sim.pool.descriptor(FieldName::Dye).unwrap();
    assert_eq!(dye.format, FieldFormat::new(ChannelLayout::Rgba, Precision::Unorm8));
}

#[test]
fn drag_leaves_dye_behind() {
    let mut sim = FluidSimulation::new(small_config(), UVec2::new(64, 64)).unwrap();
    let mut rng = StdRng::seed_from_u64(1);

    sim.press(Vec2::new(0.48, 0.5), &mut rng);
    sim.pointer.move_to(Vec2::new(0.5, 0.5));
    assert!(sim.step().unwrap());

    assert!(sim.dye().unwrap().max_abs() > 0.1);
    assert!(sim.velocity().unwrap().max_abs() > 0.0);
    assert!(!sim.pointer.moved);
}

#[test]
fn paused_simulation_does_not_advance() {
    let mut sim = FluidSimulation::new(small_config(), UVec2::new(64, 64)).unwrap();
    sim.splat(Vec2::splat(0.5), Vec2::new(100.0, 0.0), Vec3::ONE);
    sim.paused = true;

    assert!(!sim.step().unwrap());
    assert_eq!(sim.dye().unwrap().max_abs(), 0.0);

    sim.paused = false;
    assert!(sim.step().unwrap());
    assert!(sim.dye().unwrap().max_abs() > 0.0);
}

#[test]
fn dye_fades_without_input() {
    let mut sim = FluidSimulation::new(small_config(), UVec2::new(64, 64)).unwrap();
    sim.splat(Vec2::splat(0.5), Vec2::ZERO, Vec3::ONE);
    sim.step().unwrap();
    let first = sim.dye().unwrap().max_abs();
    for _ in 0..10 {
        sim.step().unwrap();
    }
    assert!(sim.dye().unwrap().max_abs() < first);
}

#[test]
fn resize_starts_from_empty_fields() {
    let mut sim = FluidSimulation::new(small_config(), UVec2::new(64, 64)).unwrap();
    sim.splat(Vec2::splat(0.5), Vec2::new(50.0, 0.0), Vec3::ONE);
    sim.step().unwrap();

    sim.resize(128, 64).unwrap();
    assert_eq!(sim.viewport(), UVec2::new(128, 64));
    assert_eq!(sim.velocity().unwrap().size(), UVec2::new(32, 16));
    assert_eq!(sim.dye().unwrap().max_abs(), 0.0);
    assert_eq!(sim.velocity().unwrap().max_abs(), 0.0);
}

#[test]
fn failed_resize_keeps_the_running_simulation() {
    let mut sim = FluidSimulation::new(small_config(), UVec2::new(64, 64)).unwrap();
    sim.splat(Vec2::splat(0.5), Vec2::ZERO, Vec3::ONE);
    sim.step().unwrap();
    let dye = sim.dye().unwrap().clone();

    let err = sim.resize(0, 64).err();
    assert!(matches!(err, Some(FluidError::ZeroSized { .. })));
    assert_eq!(sim.viewport(), UVec2::new(64, 64));
    assert_eq!(sim.velocity().unwrap().size(), UVec2::new(16, 16));
    assert_eq!(sim.dye().unwrap().texels(), dye.texels());
    assert!(sim.step().unwrap());
}

#[test]
fn surface_is_opaque_at_any_extent() {
    let mut sim = FluidSimulation::new(small_config(), UVec2::new(64, 64)).unwrap();
    sim.splat(Vec2::splat(0.5), Vec2::ZERO, Vec3::ONE);
    sim.step().unwrap();

    let mut surface = Surface::new(100, 70);
    sim.present(&mut surface).unwrap();
    assert_eq!(surface.pixels.len(), 100 * 70);
    assert_eq!(surface.as_bytes().len(), 100 * 70 * 4);
    assert!(surface.pixels.iter().all(|p| p[3] == 255));
    // center brighter than the corner
    assert!(surface.pixel(50, 35)[0] > surface.pixel(0, 0)[0]);
}

#[test]
fn presenter_clamps_and_upsamples() {
    let desc = FieldDescriptor::standard(FieldName::Dye, UVec2::new(2, 1));
    // left cell black, right cell over-bright
    let dye = Field::from_fn(&desc, |uv| if uv.x < 0.5 { Vec4::ZERO } else { Vec4::new(2.0, 0.5, -1.0, 0.0) });

    let mut surface = Surface::new(8, 2);
    Presenter.present_field(&dye, &mut surface);
    assert_eq!(surface.pixel(0, 0), [0, 0, 0, 255]);
    assert_eq!(surface.pixel(7, 1), [255, 128, 0, 255]);
    // linear dye blends between the two cells
    let mid = surface.pixel(3, 0)[0];
    assert!(mid > 0 && mid < 255);

    assert_eq!(display(Vec4::new(0.5, 1.0, 0.0, 0.0)), [128, 255, 0, 255]);
}
