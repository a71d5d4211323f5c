use bevy_stable_fluids::SimulationConfig;
use bevy_stable_fluids::config::SplatColorMode;
use bevy_stable_fluids::format::FieldName;
use bevy_stable_fluids::injection::{InjectionStage, PointerState, pick_color};
use bevy_stable_fluids::kernel::Kernel;
use glam::{Vec2, Vec3};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn stage() -> InjectionStage {
    InjectionStage::new(&SimulationConfig::default())
}

#[test]
fn idle_pointer_injects_nothing() {
    let stage = stage();
    let mut pointer = PointerState::default();
    assert!(stage.inject(&mut pointer, 1.0).is_empty());

    // pressed but not moved yet
    pointer.press(Vec2::new(0.2, 0.3), Vec3::ONE);
    assert!(stage.inject(&mut pointer, 1.0).is_empty());
}

#[test]
fn move_without_press_is_ignored() {
    let mut pointer = PointerState::default();
    assert!(!pointer.move_to(Vec2::new(0.5, 0.5)));
    assert_eq!(pointer, PointerState::default());
}

#[test]
fn drag_emits_a_velocity_and_a_dye_splat() {
    let stage = stage();
    let mut pointer = PointerState::default();
    let color = Vec3::new(0.2, 0.4, 0.6);
    pointer.press(Vec2::new(0.5, 0.5), color);
    assert!(pointer.move_to(Vec2::new(0.52, 0.49)));
    assert!(pointer.move_to(Vec2::new(0.53, 0.49)));

    let splats = stage.inject(&mut pointer, 1.5);
    assert_eq!(splats.len(), 2);

    let velocity = &splats[0];
    assert_eq!(velocity.target, FieldName::Velocity);
    let expected = Vec2::new(0.03, -0.01) * stage.force;
    assert!((velocity.params.value.truncate() - expected).abs().max_element() < 1e-2);
    assert_eq!(velocity.params.value.z, 0.0);
    assert_eq!(velocity.params.point, Vec2::new(0.53, 0.49));
    assert_eq!(velocity.params.aspect, 1.5);
    assert_eq!(velocity.params.radius, stage.radius);

    let dye = &splats[1];
    assert_eq!(dye.target, FieldName::Dye);
    assert_eq!(dye.params.value, color);

    let pass = dye.to_pass();
    assert_eq!(pass.output, FieldName::Dye);
    assert_eq!(pass.inputs, vec![FieldName::Dye]);
    assert!(matches!(pass.kernel, Kernel::Splat(_)));
}

#[test]
fn injection_consumes_the_movement() {
    let stage = stage();
    let mut pointer = PointerState::default();
    pointer.press(Vec2::ZERO, Vec3::ONE);
    pointer.move_to(Vec2::new(0.1, 0.0));

    assert_eq!(stage.inject(&mut pointer, 1.0).len(), 2);
    assert!(!pointer.moved);
    assert_eq!(pointer.displacement, Vec2::ZERO);
    assert!(stage.inject(&mut pointer, 1.0).is_empty());
}

#[test]
fn release_stops_injection() {
    let stage = stage();
    let mut pointer = PointerState::default();
    pointer.press(Vec2::ZERO, Vec3::ONE);
    pointer.move_to(Vec2::new(0.1, 0.1));
    pointer.release();

    assert!(stage.inject(&mut pointer, 1.0).is_empty());
    assert!(!pointer.move_to(Vec2::new(0.2, 0.2)));
}

#[test]
fn white_ink_scales_with_intensity() {
    let mut rng = StdRng::seed_from_u64(7);
    assert_eq!(pick_color(SplatColorMode::White, 0.5, &mut rng), Vec3::splat(0.5));
}

#[test]
fn pastel_ink_is_light() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let c = pick_color(SplatColorMode::RandomPastel, 1.0, &mut rng);
        assert!(c.max_element() <= 1.0 + 1e-5);
        assert!(c.min_element() > 0.25, "{c}");
        // value 1.0: the brightest channel is full
        assert!((c.max_element() - 1.0).abs() < 1e-3);
    }
}
