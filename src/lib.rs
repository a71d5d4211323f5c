pub mod config;
pub mod error;
pub mod format;
pub mod injection;
pub mod kernel;
pub mod ping_pong;
pub mod pool;
pub mod solver;

pub mod cpu {
    pub mod executor;
    pub mod field;
    pub mod kernels;
    pub mod presenter;
    pub mod simulation;
}

pub mod gpu {
    pub mod buffers;
    pub mod draw_pass;
    pub mod ffi;
    pub mod input;
    pub mod pipeline;
}

pub use config::SimulationConfig;
pub use error::{FluidError, FluidResult};
pub use gpu::buffers::GpuFluidPlugin;
