use bytemuck::{Pod, Zeroable};

use crate::format::FilterMode;
use crate::kernel::Kernel;

/// Uniform block bound at binding 3 of every kernel; mirrors `KernelParams`
/// in fluid_kernels.wgsl (48 bytes, vec4 aligned).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuKernelParams {
    // not using glam to make sure WGSL compatibility
    pub point: [f32; 2],
    pub radius: f32,
    pub aspect: f32,
    pub value: [f32; 4],
    pub dt: f32,
    pub dissipation: f32,
    pub strength: f32,
    /// display pass only: 1 = bilinear, 0 = nearest
    pub linear: u32,
}

impl GpuKernelParams {
    pub fn display(filter: FilterMode) -> Self {
        Self {
            linear: (filter == FilterMode::Linear) as u32,
            ..Default::default()
        }
    }
}

impl From<&Kernel> for GpuKernelParams {
    fn from(kernel: &Kernel) -> Self {
        let mut params = Self::default();
        match *kernel {
            Kernel::Splat(ref s) => {
                params.point = s.point.to_array();
                params.radius = s.radius;
                params.aspect = s.aspect;
                params.value = s.value.extend(0.0).to_array();
            }
            Kernel::Advect { dt, dissipation } => {
                params.dt = dt;
                params.dissipation = dissipation;
            }
            Kernel::VorticityConfinement { strength } => params.strength = strength,
            Kernel::Curl | Kernel::Divergence | Kernel::PressureRelax | Kernel::GradientSubtract => {}
        }
        params
    }
}
