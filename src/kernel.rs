// kernel catalogue and the pass description every backend executes

use glam::{Vec2, Vec3};

use crate::format::FieldName;

/// Small divisor floor when normalizing the |curl| gradient.
pub const VORTICITY_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplatParams {
    /// normalized grid coordinate of the impulse center
    pub point: Vec2,
    /// force (velocity) or color (dye) added at the center
    pub value: Vec3,
    pub radius: f32,
    /// viewport width / height, stretches horizontal distances
    pub aspect: f32,
}

/// Pure per-cell transforms. Field inputs are bound by the `Pass`, scalar
/// parameters travel inside the variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    Splat(SplatParams),
    Advect { dt: f32, dissipation: f32 },
    Curl,
    VorticityConfinement { strength: f32 },
    Divergence,
    PressureRelax,
    GradientSubtract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelKind {
    Splat,
    Advect,
    Curl,
    VorticityConfinement,
    Divergence,
    PressureRelax,
    GradientSubtract,
}

impl KernelKind {
    pub const ALL: [KernelKind; 7] = [
        KernelKind::Splat,
        KernelKind::Advect,
        KernelKind::Curl,
        KernelKind::VorticityConfinement,
        KernelKind::Divergence,
        KernelKind::PressureRelax,
        KernelKind::GradientSubtract,
    ];

    pub fn label(self) -> &'static str {
        match self {
            KernelKind::Splat => "splat",
            KernelKind::Advect => "advect",
            KernelKind::Curl => "curl",
            KernelKind::VorticityConfinement => "vorticity",
            KernelKind::Divergence => "divergence",
            KernelKind::PressureRelax => "pressure",
            KernelKind::GradientSubtract => "gradient_subtract",
        }
    }

    pub fn input_count(self) -> usize {
        match self {
            KernelKind::Splat | KernelKind::Curl | KernelKind::Divergence => 1,
            _ => 2,
        }
    }

    /// Fields each kernel may write in the solver pipeline.
    pub fn outputs(self) -> &'static [FieldName] {
        match self {
            KernelKind::Splat | KernelKind::Advect => &[FieldName::Velocity, FieldName::Dye],
            KernelKind::Curl => &[FieldName::Curl],
            KernelKind::VorticityConfinement | KernelKind::GradientSubtract => &[FieldName::Velocity],
            KernelKind::Divergence => &[FieldName::Divergence],
            KernelKind::PressureRelax => &[FieldName::Pressure],
        }
    }
}

impl Kernel {
    pub fn kind(&self) -> KernelKind {
        match self {
            Kernel::Splat(_) => KernelKind::Splat,
            Kernel::Advect { .. } => KernelKind::Advect,
            Kernel::Curl => KernelKind::Curl,
            Kernel::VorticityConfinement { .. } => KernelKind::VorticityConfinement,
            Kernel::Divergence => KernelKind::Divergence,
            Kernel::PressureRelax => KernelKind::PressureRelax,
            Kernel::GradientSubtract => KernelKind::GradientSubtract,
        }
    }
}

/// One kernel invocation over the whole extent of `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pass {
    pub kernel: Kernel,
    pub output: FieldName,
    pub inputs: Vec<FieldName>,
}

impl Pass {
    pub fn splat(target: FieldName, params: SplatParams) -> Self {
        Self {
            kernel: Kernel::Splat(params),
            output: target,
            inputs: vec![target],
        }
    }

    /// Advects `source` by the velocity field into `source`'s write buffer.
    pub fn advect(source: FieldName, dt: f32, dissipation: f32) -> Self {
        Self {
            kernel: Kernel::Advect { dt, dissipation },
            output: source,
            inputs: vec![FieldName::Velocity, source],
        }
    }

    pub fn curl() -> Self {
        Self {
            kernel: Kernel::Curl,
            output: FieldName::Curl,
            inputs: vec![FieldName::Velocity],
        }
    }

    pub fn vorticity(strength: f32) -> Self {
        Self {
            kernel: Kernel::VorticityConfinement { strength },
            output: FieldName::Velocity,
            inputs: vec![FieldName::Velocity, FieldName::Curl],
        }
    }

    pub fn divergence() -> Self {
        Self {
            kernel: Kernel::Divergence,
            output: FieldName::Divergence,
            inputs: vec![FieldName::Velocity],
        }
    }

    pub fn pressure_relax() -> Self {
        Self {
            kernel: Kernel::PressureRelax,
            output: FieldName::Pressure,
            inputs: vec![FieldName::Pressure, FieldName::Divergence],
        }
    }

    pub fn gradient_subtract() -> Self {
        Self {
            kernel: Kernel::GradientSubtract,
            output: FieldName::Velocity,
            inputs: vec![FieldName::Velocity, FieldName::Pressure],
        }
    }
}

/// Runs passes in submission order. Implementations must make each pass's
/// writes visible to the next pass and swap double-buffered outputs once the
/// pass has written them.
pub trait PassExecutor {
    type Error;

    fn execute(&mut self, pass: &Pass) -> Result<(), Self::Error>;
}
