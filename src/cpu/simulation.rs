use glam::{UVec2, Vec2};
use rand::Rng;

use crate::config::SimulationConfig;
use crate::cpu::executor::CpuExecutor;
use crate::cpu::field::Field;
use crate::cpu::presenter::{Presenter, Surface};
use crate::error::FluidResult;
use crate::format::{FieldDescriptor, FieldName, FormatSupport};
use crate::injection::{InjectionStage, PointerState, SplatRequest};
use crate::pool::FieldPool;
use crate::solver::SolverPipeline;

/// CPU host for the whole pipeline: owns the pool, the pointer and the
/// solver, and exposes the per-frame entry points.
pub struct FluidSimulation {
    pub pool: FieldPool<Field>,
    pub pointer: PointerState,
    pub paused: bool,
    solver: SolverPipeline,
    injection: InjectionStage,
    presenter: Presenter,
    viewport: UVec2,
    pending: Vec<SplatRequest>,
}

impl FluidSimulation {
    pub fn new(config: SimulationConfig, viewport: UVec2) -> FluidResult<Self> {
        Self::with_support(config, viewport, FormatSupport::all())
    }

    pub fn with_support(config: SimulationConfig, viewport: UVec2, support: FormatSupport) -> FluidResult<Self> {
        config.validate()?;
        let mut sim = Self {
            pool: FieldPool::new(support),
            pointer: PointerState::default(),
            paused: false,
            injection: InjectionStage::new(&config),
            solver: SolverPipeline::new(config),
            presenter: Presenter,
            viewport,
            pending: Vec::new(),
        };
        sim.resize(viewport.x, viewport.y)?;
        Ok(sim)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.solver.config
    }

    pub fn viewport(&self) -> UVec2 {
        self.viewport
    }

    pub fn aspect(&self) -> f32 {
        self.viewport.x as f32 / self.viewport.y.max(1) as f32
    }

    /// Reallocates every field for a new viewport. Contents are discarded.
    /// On error the previous pool and viewport stay in place.
    pub fn resize(&mut self, width: u32, height: u32) -> FluidResult<()> {
        let viewport = UVec2::new(width, height);
        let config = &self.solver.config;
        let velocity = config.velocity_grid(viewport);
        let dye = config.dye_grid(viewport);

        let mut pool = FieldPool::new(*self.pool.support());
        for name in FieldName::ALL {
            let size = if name == FieldName::Dye { dye } else { velocity };
            let desc = FieldDescriptor::standard(name, size);
            pool.allocate_with_fallback(name, desc, Field::new)?;
        }
        self.pool = pool;
        self.viewport = viewport;
        Ok(())
    }

    pub fn press(&mut self, position: Vec2, rng: &mut impl Rng) {
        let color = self.injection.next_color(rng);
        self.pointer.press(position, color);
    }

    /// Queues a splat pair outside of pointer input.
    pub fn splat(&mut self, point: Vec2, force: Vec2, color: glam::Vec3) {
        let aspect = self.aspect();
        self.pending.extend(self.injection.splats_at(point, force, color, aspect));
    }

    /// Runs one frame. Returns false when paused.
    pub fn step(&mut self) -> FluidResult<bool> {
        if self.paused {
            return Ok(false);
        }
        let aspect = self.aspect();
        let mut splats = std::mem::take(&mut self.pending);
        splats.extend(self.injection.inject(&mut self.pointer, aspect));

        let mut exec = CpuExecutor::new(&mut self.pool);
        self.solver.step(&mut exec, &splats)?;
        Ok(true)
    }

    pub fn dye(&self) -> FluidResult<&Field> {
        self.pool.get(FieldName::Dye)
    }

    pub fn velocity(&self) -> FluidResult<&Field> {
        self.pool.get(FieldName::Velocity)
    }

    pub fn present(&self, surface: &mut Surface) -> FluidResult<()> {
        self.presenter.present(&self.pool, surface)
    }
}
