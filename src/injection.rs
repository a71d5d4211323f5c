// Injection Stage: pointer deltas -> splat passes on velocity and dye

use bevy::color::Color;
use bevy::prelude::Resource;
use glam::{Vec2, Vec3};
use rand::Rng;

use crate::config::{SimulationConfig, SplatColorMode};
use crate::format::FieldName;
use crate::kernel::{Pass, SplatParams};

/// Normalized pointer record. Positions are in [0, 1] grid coordinates.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct PointerState {
    pub position: Vec2,
    pub previous: Vec2,
    /// movement accumulated since the last injection
    pub displacement: Vec2,
    pub active: bool,
    pub moved: bool,
    pub color: Vec3,
}

impl PointerState {
    pub fn press(&mut self, position: Vec2, color: Vec3) {
        self.active = true;
        self.moved = false;
        self.position = position;
        self.previous = position;
        self.displacement = Vec2::ZERO;
        self.color = color;
    }

    /// Returns false (and changes nothing) when no press preceded the move.
    pub fn move_to(&mut self, position: Vec2) -> bool {
        if !self.active {
            return false;
        }
        self.previous = self.position;
        self.position = position;
        self.displacement += position - self.previous;
        self.moved = true;
        true
    }

    pub fn release(&mut self) {
        self.active = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplatRequest {
    pub target: FieldName,
    pub params: SplatParams,
}

impl SplatRequest {
    pub fn to_pass(&self) -> Pass {
        Pass::splat(self.target, self.params)
    }
}

pub fn pick_color(mode: SplatColorMode, intensity: f32, rng: &mut impl Rng) -> Vec3 {
    let rgb = match mode {
        SplatColorMode::White => Vec3::ONE,
        SplatColorMode::RandomPastel => {
            let hue = rng.gen_range(0.0..360.0);
            let c = Color::hsv(hue, 0.4, 1.0).to_linear();
            Vec3::new(c.red, c.green, c.blue)
        }
    };
    rgb * intensity
}

#[derive(Debug, Clone, PartialEq)]
pub struct InjectionStage {
    pub radius: f32,
    pub force: f32,
    pub intensity: f32,
    pub color_mode: SplatColorMode,
}

impl InjectionStage {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            radius: config.splat_radius,
            force: config.splat_force,
            intensity: config.dye_intensity,
            color_mode: config.color_mode,
        }
    }

    pub fn next_color(&self, rng: &mut impl Rng) -> Vec3 {
        pick_color(self.color_mode, self.intensity, rng)
    }

    /// Consumes the pointer's pending movement: one velocity splat along the
    /// displacement and one dye splat in the pointer's color. Nothing is
    /// injected for an inactive or unmoved pointer.
    pub fn inject(&self, pointer: &mut PointerState, aspect: f32) -> Vec<SplatRequest> {
        if !pointer.active || !pointer.moved {
            return Vec::new();
        }
        let force = pointer.displacement * self.force;
        let splats = self.splats_at(pointer.position, force, pointer.color, aspect);

        pointer.moved = false;
        pointer.displacement = Vec2::ZERO;
        splats.to_vec()
    }

    pub fn splats_at(&self, point: Vec2, force: Vec2, color: Vec3, aspect: f32) -> [SplatRequest; 2] {
        let params = |value| SplatParams {
            point,
            value,
            radius: self.radius,
            aspect,
        };
        [
            SplatRequest {
                target: FieldName::Velocity,
                params: params(force.extend(0.0)),
            },
            SplatRequest {
                target: FieldName::Dye,
                params: params(color),
            },
        ]
    }
}
