use glam::{UVec2, Vec2, Vec4};

use crate::cpu::field::Field;
use crate::error::FluidResult;
use crate::format::FieldName;
use crate::pool::FieldPool;

/// An RGBA8 output surface, row 0 first.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub size: UVec2,
    pub pixels: Vec<[u8; 4]>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: UVec2::new(width, height),
            pixels: vec![[0; 4]; width as usize * height as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels[y as usize * self.size.x as usize + x as usize]
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}

/// Writes the current dye into a surface of any extent; upsampling follows
/// the dye field's filter mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct Presenter;

impl Presenter {
    pub fn present(&self, pool: &FieldPool<Field>, surface: &mut Surface) -> FluidResult<()> {
        let dye = pool.get(FieldName::Dye)?;
        self.present_field(dye, surface);
        Ok(())
    }

    pub fn present_field(&self, dye: &Field, surface: &mut Surface) {
        let inv = Vec2::ONE / surface.size.as_vec2();
        for y in 0..surface.size.y {
            for x in 0..surface.size.x {
                let uv = (UVec2::new(x, y).as_vec2() + 0.5) * inv;
                let c = display(dye.sample(uv));
                surface.pixels[y as usize * surface.size.x as usize + x as usize] = c;
            }
        }
    }
}

/// Opaque RGBA8 from a dye texel.
pub fn display(dye: Vec4) -> [u8; 4] {
    let rgb = dye.truncate().clamp(glam::Vec3::ZERO, glam::Vec3::ONE) * 255.0;
    [rgb.x.round() as u8, rgb.y.round() as u8, rgb.z.round() as u8, 255]
}
