// CPU grid storage for one field buffer

use glam::{IVec2, UVec2, Vec2, Vec4};

use crate::format::{FieldDescriptor, FilterMode, Precision};

/// A width x height grid of up to four channels. Row 0 is uv.y = 0.
/// Samples outside the grid clamp to the nearest edge cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    desc: FieldDescriptor,
    texels: Vec<Vec4>,
}

impl Field {
    pub fn new(desc: &FieldDescriptor) -> Self {
        let n = desc.size.x as usize * desc.size.y as usize;
        Self {
            desc: *desc,
            texels: vec![Vec4::ZERO; n],
        }
    }

    /// Builds a field by evaluating `f` at every cell center.
    pub fn from_fn(desc: &FieldDescriptor, mut f: impl FnMut(Vec2) -> Vec4) -> Self {
        let mut field = Self::new(desc);
        for y in 0..desc.size.y {
            for x in 0..desc.size.x {
                let uv = field.cell_uv(x, y);
                field.store(x, y, f(uv));
            }
        }
        field
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.desc.size.x
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.desc.size.y
    }

    pub fn size(&self) -> UVec2 {
        self.desc.size
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.desc
    }

    /// (1 / width, 1 / height): one cell in normalized coordinates
    pub fn texel_size(&self) -> Vec2 {
        Vec2::ONE / self.desc.size.as_vec2()
    }

    pub fn cell_uv(&self, x: u32, y: u32) -> Vec2 {
        (UVec2::new(x, y).as_vec2() + 0.5) * self.texel_size()
    }

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.desc.size.x as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        self.texels[self.index(x, y)]
    }

    /// Cell lookup with clamped integer coordinates.
    pub fn fetch(&self, cell: IVec2) -> Vec4 {
        let max = self.desc.size.as_ivec2() - IVec2::ONE;
        let c = cell.clamp(IVec2::ZERO, max);
        self.get(c.x as u32, c.y as u32)
    }

    /// Writes a cell, keeping only the layout's channels and rounding to
    /// the field's precision.
    pub fn store(&mut self, x: u32, y: u32, value: Vec4) {
        let value = quantize(mask_channels(value, self.desc.format.layout.channels()), self.desc.format.precision);
        let i = self.index(x, y);
        self.texels[i] = value;
    }

    pub fn fill(&mut self, value: Vec4) {
        for y in 0..self.height() {
            for x in 0..self.width() {
                self.store(x, y, value);
            }
        }
    }

    pub fn sample_nearest(&self, uv: Vec2) -> Vec4 {
        let cell = (uv * self.desc.size.as_vec2()).floor().as_ivec2();
        self.fetch(cell)
    }

    /// Bilinear filtering between the four surrounding cell centers.
    pub fn sample_bilinear(&self, uv: Vec2) -> Vec4 {
        let st = uv * self.desc.size.as_vec2() - 0.5;
        let base = st.floor();
        let f = st - base;
        let c = base.as_ivec2();

        let a = self.fetch(c);
        let b = self.fetch(c + IVec2::X);
        let d = self.fetch(c + IVec2::Y);
        let e = self.fetch(c + IVec2::ONE);
        a.lerp(b, f.x).lerp(d.lerp(e, f.x), f.y)
    }

    /// Samples with the field's own filter mode.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        match self.desc.filter {
            FilterMode::Nearest => self.sample_nearest(uv),
            FilterMode::Linear => self.sample_bilinear(uv),
        }
    }

    // diagnostics ------------------------------------------------------------
    pub fn sum_squared_xy(&self) -> f32 {
        self.texels.iter().map(|t| t.truncate().truncate().length_squared()).sum()
    }

    pub fn mean_abs_x(&self) -> f32 {
        self.texels.iter().map(|t| t.x.abs()).sum::<f32>() / self.texels.len() as f32
    }

    pub fn max_abs(&self) -> f32 {
        self.texels.iter().map(|t| t.abs().max_element()).fold(0.0, f32::max)
    }
}

fn mask_channels(v: Vec4, channels: usize) -> Vec4 {
    match channels {
        1 => Vec4::new(v.x, 0.0, 0.0, 0.0),
        2 => Vec4::new(v.x, v.y, 0.0, 0.0),
        _ => v,
    }
}

// half floats are kept at full precision on the CPU
fn quantize(v: Vec4, precision: Precision) -> Vec4 {
    match precision {
        Precision::Float32 | Precision::Float16 => v,
        Precision::Unorm8 => (v.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round() / 255.0,
    }
}
