// Solver Pipeline: the fixed per-frame pass order, independent of backend.

use crate::config::SimulationConfig;
use crate::format::FieldName;
use crate::injection::SplatRequest;
use crate::kernel::{Pass, PassExecutor};

#[derive(Debug, Clone)]
pub struct SolverPipeline {
    pub config: SimulationConfig,
}

impl SolverPipeline {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// One frame: injection, advection, vorticity confinement, projection.
    /// Later stages read what earlier stages wrote, so the order is fixed.
    pub fn step<E: PassExecutor>(&self, exec: &mut E, splats: &[SplatRequest]) -> Result<(), E::Error> {
        let c = &self.config;

        for splat in splats {
            exec.execute(&splat.to_pass())?;
        }

        // velocity first: dye is carried by the already advected velocity
        exec.execute(&Pass::advect(FieldName::Velocity, c.dt, c.velocity_dissipation))?;
        exec.execute(&Pass::advect(FieldName::Dye, c.dt, c.dye_dissipation))?;

        exec.execute(&Pass::curl())?;
        exec.execute(&Pass::vorticity(c.curl_strength))?;

        self.project(exec)
    }

    /// Divergence, fixed Jacobi sweeps warm-started from last frame's
    /// pressure, then gradient subtraction.
    pub fn project<E: PassExecutor>(&self, exec: &mut E) -> Result<(), E::Error> {
        exec.execute(&Pass::divergence())?;
        self.relax_pressure(exec, self.config.pressure_iterations)?;
        exec.execute(&Pass::gradient_subtract())
    }

    pub fn relax_pressure<E: PassExecutor>(&self, exec: &mut E, iterations: u32) -> Result<(), E::Error> {
        let relax = Pass::pressure_relax();
        for _ in 0..iterations {
            exec.execute(&relax)?;
        }
        Ok(())
    }

    /// Number of passes one frame issues, for budgeting command buffers.
    pub fn passes_per_frame(&self, splats: usize) -> usize {
        splats + 6 + self.config.pressure_iterations as usize
    }
}
