use bevy_stable_fluids::cpu::field::Field;
use bevy_stable_fluids::cpu::kernels::{advect, curl, divergence, gradient_subtract, pressure_relax, splat, vorticity};
use bevy_stable_fluids::format::{FieldDescriptor, FieldName};
use bevy_stable_fluids::kernel::SplatParams;
use glam::{UVec2, Vec2, Vec3, Vec4};

fn velocity(n: u32, f: impl FnMut(Vec2) -> Vec4) -> Field {
    Field::from_fn(&FieldDescriptor::standard(FieldName::Velocity, UVec2::splat(n)), f)
}

fn scalar(name: FieldName, n: u32, f: impl FnMut(Vec2) -> Vec4) -> Field {
    Field::from_fn(&FieldDescriptor::standard(name, UVec2::splat(n)), f)
}

fn white_splat(point: Vec2, radius: f32, aspect: f32) -> SplatParams {
    SplatParams {
        point,
        value: Vec3::ONE,
        radius,
        aspect,
    }
}

#[test]
fn splat_on_4x4_peaks_at_the_central_cells() {
    let dye = Field::new(&FieldDescriptor::standard(FieldName::Dye, UVec2::new(4, 4)));
    let p = white_splat(Vec2::splat(0.5), 0.01, 1.0);

    let out = |x, y| splat(&dye, dye.cell_uv(x, y), &p);
    let center = out(1, 1);
    for (x, y) in [(1, 2), (2, 1), (2, 2)] {
        assert!((out(x, y) - center).abs().max_element() < 1e-6);
    }
    for y in 0..4 {
        for x in 0..4 {
            let v = out(x, y);
            assert_eq!(v.w, 0.0); // alpha untouched
            if !(1..=2).contains(&x) || !(1..=2).contains(&y) {
                assert!(v.x < center.x);
            }
        }
    }
    // d^2 = 2 * 0.125^2 at the central cells
    assert!((center.x - (-3.125f32).exp()).abs() < 1e-5);
    assert!(out(0, 0).x < 1e-6);
    assert!(out(3, 3).x < 1e-6);
}

#[test]
fn splat_on_5x5_has_a_unique_maximum() {
    let dye = Field::new(&FieldDescriptor::standard(FieldName::Dye, UVec2::new(5, 5)));
    let p = white_splat(Vec2::splat(0.5), 0.01, 1.0);

    let peak = splat(&dye, dye.cell_uv(2, 2), &p);
    assert!((peak.truncate() - Vec3::ONE).abs().max_element() < 1e-6);
    for y in 0..5 {
        for x in 0..5 {
            if (x, y) != (2, 2) {
                assert!(splat(&dye, dye.cell_uv(x, y), &p).x < peak.x);
            }
        }
    }
}

#[test]
fn splat_falls_off_as_a_gaussian() {
    let n = 64;
    let radius = 0.001;
    let dye = Field::new(&FieldDescriptor::standard(FieldName::Dye, UVec2::splat(n)));
    let p = white_splat(Vec2::splat(0.5), radius, 1.0);

    for y in 0..n {
        for x in 0..n {
            let uv = dye.cell_uv(x, y);
            let d2 = (uv - p.point).length_squared();
            let v = splat(&dye, uv, &p).x;
            assert!((v - (-d2 / radius).exp()).abs() < 1e-5);
            if d2.sqrt() >= 5.0 * radius.sqrt() {
                assert!(v < 0.01);
            }
        }
    }
}

#[test]
fn splat_aspect_stretches_horizontal_distance() {
    let dye = Field::new(&FieldDescriptor::standard(FieldName::Dye, UVec2::new(32, 16)));
    let p = white_splat(Vec2::splat(0.5), 0.01, 2.0);

    let uv = Vec2::new(0.55, 0.5);
    let v = splat(&dye, uv, &p).x;
    let expected = (-(0.05f32 * 2.0).powi(2) / 0.01).exp();
    assert!((v - expected).abs() < 1e-5);
}

#[test]
fn splat_adds_to_existing_contents() {
    let dye = scalar(FieldName::Dye, 8, |_| Vec4::new(0.25, 0.5, 0.0, 1.0));
    let p = SplatParams {
        point: Vec2::splat(0.5),
        value: Vec3::new(0.0, 0.0, 2.0),
        radius: 0.01,
        aspect: 1.0,
    };
    let far = splat(&dye, dye.cell_uv(0, 0), &p);
    assert!((far - Vec4::new(0.25, 0.5, 0.0, 1.0)).abs().max_element() < 1e-4);
}

#[test]
fn splat_reads_the_target_cell_exactly() {
    let n = 8;
    // checkerboard dye: bilinear filtering would blend neighbors
    let dye = scalar(FieldName::Dye, n, |uv| {
        let cell = (uv * n as f32).floor();
        Vec4::splat(((cell.x + cell.y) as u32 % 2) as f32)
    });
    let p = SplatParams {
        point: Vec2::splat(0.5),
        value: Vec3::ZERO,
        radius: 0.01,
        aspect: 1.0,
    };
    for y in 0..n {
        for x in 0..n {
            assert_eq!(splat(&dye, dye.cell_uv(x, y), &p), dye.get(x, y));
        }
    }
}

#[test]
fn rigid_rotation_has_constant_curl_and_no_divergence() {
    let n = 16;
    let s = 0.75;
    let v = velocity(n, |uv| {
        let p = uv * n as f32 - Vec2::splat(n as f32 * 0.5);
        Vec4::new(-s * p.y, s * p.x, 0.0, 0.0)
    });

    for y in 0..n {
        for x in 0..n {
            let uv = v.cell_uv(x, y);
            assert!(divergence(&v, uv).x.abs() < 1e-5);
            if (1..n - 1).contains(&x) && (1..n - 1).contains(&y) {
                assert!((curl(&v, uv).x - 2.0 * s).abs() < 1e-4);
            }
        }
    }
}

#[test]
fn advection_moves_contents_downstream() {
    let n = 16;
    let v = velocity(n, |_| Vec4::new(1.0, 0.0, 0.0, 0.0));
    // dye value = column index
    let dye = scalar(FieldName::Dye, n, |uv| Vec4::splat((uv.x * n as f32 - 0.5).round()));

    // one cell per unit time, dt = 1
    for x in 1..n {
        let out = advect(&v, &dye, dye.cell_uv(x, 5), 1.0, 1.0);
        assert!((out.x - (x - 1) as f32).abs() < 1e-3);
    }
    let edge = advect(&v, &dye, dye.cell_uv(0, 5), 1.0, 1.0);
    assert!(edge.x.abs() < 1e-3);
}

#[test]
fn advection_applies_dissipation() {
    let v = velocity(8, |_| Vec4::ZERO);
    let dye = scalar(FieldName::Dye, 8, |_| Vec4::new(0.8, 0.4, 0.2, 1.0));
    let out = advect(&v, &dye, Vec2::splat(0.5), 0.016, 0.5);
    assert!((out - Vec4::new(0.4, 0.2, 0.1, 0.5)).abs().max_element() < 1e-6);
}

#[test]
fn vorticity_pushes_across_the_curl_gradient() {
    let n = 16;
    let v = velocity(n, |_| Vec4::ZERO);
    // curl = column + 1, strictly positive and growing along +x
    let c = scalar(FieldName::Curl, n, |uv| Vec4::splat(uv.x * n as f32 + 0.5));
    let strength = 30.0;

    // at column 5: L = 5, R = 7, so N = (1, 0) and w = 6
    let uv = c.cell_uv(5, 7);
    let out = vorticity(&v, &c, uv, strength);
    // force = strength * w * (N_y, -N_x), added without a timestep
    let expected = -strength * 6.0 / (1.0 + 1e-4);
    assert!(out.x.abs() < 1e-4);
    assert!((out.y - expected).abs() < 1e-2, "{}", out.y);
    assert!((out.truncate().length() - strength * 6.0).abs() < 0.1);
}

#[test]
fn vorticity_is_idle_without_curl() {
    let v = velocity(8, |uv| Vec4::new(uv.y, -uv.x, 0.0, 0.0));
    let c = scalar(FieldName::Curl, 8, |_| Vec4::ZERO);
    let uv = v.cell_uv(3, 4);
    assert_eq!(vorticity(&v, &c, uv, 30.0), v.sample(uv));
}

#[test]
fn jacobi_keeps_a_constant_solution() {
    let p = scalar(FieldName::Pressure, 8, |_| Vec4::splat(3.0));
    let d = scalar(FieldName::Divergence, 8, |_| Vec4::ZERO);
    for (x, y) in [(0, 0), (3, 4), (7, 7)] {
        assert!((pressure_relax(&p, &d, p.cell_uv(x, y)).x - 3.0).abs() < 1e-6);
    }
}

#[test]
fn gradient_subtract_removes_a_linear_pressure_slope() {
    let n = 8;
    let v = velocity(n, |_| Vec4::new(2.0, 1.0, 0.0, 0.0));
    let p = scalar(FieldName::Pressure, n, |uv| Vec4::splat(uv.x * n as f32 - 0.5));

    let out = gradient_subtract(&v, &p, v.cell_uv(4, 4));
    assert!((out.x - 1.0).abs() < 1e-5);
    assert!((out.y - 1.0).abs() < 1e-5);
}
