use bevy::prelude::Resource;
use bevy::render::extract_resource::ExtractResource;
use glam::UVec2;

use crate::error::{FluidError, FluidResult};

/// Jacobi sweeps per frame. Fixed, not a convergence loop: changing it
/// changes how incompressible the result is.
pub const DEFAULT_PRESSURE_ITERATIONS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridResolution {
    /// one cell per viewport pixel
    Viewport,
    /// keeps the viewport aspect ratio with the short side at this many cells
    ShortSide(u32),
}

impl GridResolution {
    pub fn grid_size(self, viewport: UVec2) -> UVec2 {
        match self {
            GridResolution::Viewport => viewport,
            GridResolution::ShortSide(n) => {
                if viewport.x == 0 || viewport.y == 0 {
                    return UVec2::ZERO;
                }
                let (w, h) = (viewport.x as f32, viewport.y as f32);
                let aspect = if w > h { w / h } else { h / w };
                let short = n;
                let long = (n as f32 * aspect).round() as u32;
                if w > h { UVec2::new(long, short) } else { UVec2::new(short, long) }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplatColorMode {
    #[default]
    White,
    RandomPastel,
}

/// Process-wide simulation constants, set once at startup.
#[derive(Resource, ExtractResource, Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub dt: f32,
    pub velocity_dissipation: f32,
    pub dye_dissipation: f32,
    pub curl_strength: f32,
    pub pressure_iterations: u32,
    pub splat_radius: f32,
    pub splat_force: f32,
    pub dye_intensity: f32,
    pub color_mode: SplatColorMode,
    pub velocity_resolution: GridResolution,
    pub dye_resolution: GridResolution,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 0.016,
            velocity_dissipation: 0.99,
            dye_dissipation: 0.99,
            curl_strength: 30.0,
            pressure_iterations: DEFAULT_PRESSURE_ITERATIONS,
            splat_radius: 0.01,
            splat_force: 6000.0,
            dye_intensity: 1.0,
            color_mode: SplatColorMode::White,
            velocity_resolution: GridResolution::ShortSide(256),
            dye_resolution: GridResolution::Viewport,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> FluidResult<()> {
        let invalid = |msg: String| Err(FluidError::InvalidConfig(msg));

        if !(self.dt > 0.0) {
            return invalid(format!("dt must be positive, got {}", self.dt));
        }
        for (name, d) in [
            ("velocity_dissipation", self.velocity_dissipation),
            ("dye_dissipation", self.dye_dissipation),
        ] {
            if !(d > 0.0 && d <= 1.0) {
                return invalid(format!("{name} must be in (0, 1], got {d}"));
            }
        }
        if self.pressure_iterations == 0 {
            return invalid("pressure_iterations must be at least 1".to_string());
        }
        if !(self.splat_radius > 0.0) {
            return invalid(format!("splat_radius must be positive, got {}", self.splat_radius));
        }
        if self.curl_strength < 0.0 {
            return invalid(format!("curl_strength must not be negative, got {}", self.curl_strength));
        }
        Ok(())
    }

    pub fn velocity_grid(&self, viewport: UVec2) -> UVec2 {
        self.velocity_resolution.grid_size(viewport)
    }

    pub fn dye_grid(&self, viewport: UVec2) -> UVec2 {
        self.dye_resolution.grid_size(viewport)
    }

    // demo presets ---------------------------------------------------------
    /// Full-resolution white ink, the plain single-canvas setup.
    pub fn demo_viewport() -> Self {
        Self {
            velocity_resolution: GridResolution::Viewport,
            dye_resolution: GridResolution::Viewport,
            ..Default::default()
        }
    }

    /// Coarse velocity grid with a fine dye grid and random pastel ink.
    pub fn demo_pastel() -> Self {
        Self {
            color_mode: SplatColorMode::RandomPastel,
            velocity_resolution: GridResolution::ShortSide(128),
            dye_resolution: GridResolution::ShortSide(512),
            ..Default::default()
        }
    }
    // ----------------------------------------------------------------------
}

/// Runtime switches flipped while the app runs. A paused solver keeps
/// presenting the last dye.
#[derive(Resource, ExtractResource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationControl {
    pub paused: bool,
}
