// per-cell evaluation of the kernel catalogue; assets/shaders/fluid_kernels.wgsl
// mirrors these line for line

use glam::{IVec2, Vec2, Vec4};

use crate::cpu::field::Field;
use crate::kernel::{Kernel, SplatParams, VORTICITY_EPSILON};

/// Axis neighbors of `uv` one texel away: (left, right, bottom, top).
#[inline]
fn neighbors(field: &Field, uv: Vec2) -> (Vec4, Vec4, Vec4, Vec4) {
    let t = field.texel_size();
    (
        field.sample(uv - Vec2::new(t.x, 0.0)),
        field.sample(uv + Vec2::new(t.x, 0.0)),
        field.sample(uv - Vec2::new(0.0, t.y)),
        field.sample(uv + Vec2::new(0.0, t.y)),
    )
}

/// Grid cell containing `uv`.
#[inline]
fn cell_of(field: &Field, uv: Vec2) -> IVec2 {
    (uv * field.size().as_vec2()).floor().as_ivec2()
}

pub fn splat(target: &Field, uv: Vec2, p: &SplatParams) -> Vec4 {
    let mut diff = uv - p.point;
    diff.x *= p.aspect;
    let influence = (-diff.length_squared() / p.radius).exp();
    target.fetch(cell_of(target, uv)) + (p.value * influence).extend(0.0)
}

/// Semi-Lagrangian: trace back one step along the velocity and filter the
/// source there.
pub fn advect(velocity: &Field, source: &Field, uv: Vec2, dt: f32, dissipation: f32) -> Vec4 {
    let v = velocity.sample_bilinear(uv).truncate().truncate();
    let coord = uv - dt * v * velocity.texel_size();
    dissipation * source.sample_bilinear(coord)
}

pub fn curl(velocity: &Field, uv: Vec2) -> Vec4 {
    let (l, r, b, t) = neighbors(velocity, uv);
    let w = 0.5 * ((r.y - l.y) - (t.x - b.x));
    Vec4::new(w, 0.0, 0.0, 0.0)
}

pub fn vorticity(velocity: &Field, curl: &Field, uv: Vec2, strength: f32) -> Vec4 {
    let (l, r, b, t) = neighbors(curl, uv);
    let c = curl.sample(uv).x;

    let grad = 0.5 * Vec2::new(r.x.abs() - l.x.abs(), t.x.abs() - b.x.abs());
    let n = grad / (grad.length() + VORTICITY_EPSILON);
    // N x w, with w along the axis out of the plane
    let force = strength * c * Vec2::new(n.y, -n.x);

    let v = velocity.sample(uv).truncate().truncate() + force;
    v.extend(0.0).extend(0.0)
}

pub fn divergence(velocity: &Field, uv: Vec2) -> Vec4 {
    let (l, r, b, t) = neighbors(velocity, uv);
    let d = 0.5 * ((r.x - l.x) + (t.y - b.y));
    Vec4::new(d, 0.0, 0.0, 0.0)
}

/// One Jacobi sweep of lap(p) = div.
pub fn pressure_relax(pressure: &Field, divergence: &Field, uv: Vec2) -> Vec4 {
    let (l, r, b, t) = neighbors(pressure, uv);
    let d = divergence.sample(uv).x;
    Vec4::new((l.x + r.x + b.x + t.x - d) * 0.25, 0.0, 0.0, 0.0)
}

pub fn gradient_subtract(velocity: &Field, pressure: &Field, uv: Vec2) -> Vec4 {
    let (l, r, b, t) = neighbors(pressure, uv);
    let grad = 0.5 * Vec2::new(r.x - l.x, t.x - b.x);
    let v = velocity.sample(uv).truncate().truncate() - grad;
    v.extend(0.0).extend(0.0)
}

impl Kernel {
    /// Output value of the cell at `uv` given the pass inputs, in the order
    /// `Pass` binds them.
    pub fn evaluate(&self, uv: Vec2, inputs: &[&Field]) -> Vec4 {
        match *self {
            Kernel::Splat(ref p) => splat(inputs[0], uv, p),
            Kernel::Advect { dt, dissipation } => advect(inputs[0], inputs[1], uv, dt, dissipation),
            Kernel::Curl => curl(inputs[0], uv),
            Kernel::VorticityConfinement { strength } => vorticity(inputs[0], inputs[1], uv, strength),
            Kernel::Divergence => divergence(inputs[0], uv),
            Kernel::PressureRelax => pressure_relax(inputs[0], inputs[1], uv),
            Kernel::GradientSubtract => gradient_subtract(inputs[0], inputs[1], uv),
        }
    }
}
