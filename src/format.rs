// field naming and storage format policy, shared by the CPU and GPU backends

use glam::UVec2;

use crate::error::{FluidError, FluidResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldName {
    Velocity,
    Dye,
    Pressure,
    Divergence,
    Curl,
}

impl FieldName {
    pub const COUNT: usize = 5;
    pub const ALL: [FieldName; Self::COUNT] = [
        FieldName::Velocity,
        FieldName::Dye,
        FieldName::Pressure,
        FieldName::Divergence,
        FieldName::Curl,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// velocity, dye and pressure ping-pong; divergence and curl are written
    /// once and then only read for the rest of the frame
    pub fn is_double_buffered(self) -> bool {
        matches!(self, FieldName::Velocity | FieldName::Dye | FieldName::Pressure)
    }

    /// Whether stored values can be negative. Dye is a color.
    pub fn is_signed(self) -> bool {
        !matches!(self, FieldName::Dye)
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldName::Velocity => "velocity",
            FieldName::Dye => "dye",
            FieldName::Pressure => "pressure",
            FieldName::Divergence => "divergence",
            FieldName::Curl => "curl",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelLayout {
    R,
    Rg,
    Rgba,
}

impl ChannelLayout {
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::R => 1,
            ChannelLayout::Rg => 2,
            ChannelLayout::Rgba => 4,
        }
    }

    fn widened(self) -> Option<ChannelLayout> {
        match self {
            ChannelLayout::R => Some(ChannelLayout::Rg),
            ChannelLayout::Rg => Some(ChannelLayout::Rgba),
            ChannelLayout::Rgba => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    Float32,
    Float16,
    /// normalized 8 bits per channel, values clamp to [0, 1]
    Unorm8,
}

impl Precision {
    /// next lower precision that keeps the field's sign range
    fn lowered(self, needs_sign: bool) -> Option<Precision> {
        match self {
            Precision::Float32 => Some(Precision::Float16),
            Precision::Float16 if !needs_sign => Some(Precision::Unorm8),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldFormat {
    pub layout: ChannelLayout,
    pub precision: Precision,
}

impl FieldFormat {
    pub const fn new(layout: ChannelLayout, precision: Precision) -> Self {
        Self { layout, precision }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    pub size: UVec2,
    pub format: FieldFormat,
    pub filter: FilterMode,
}

impl FieldDescriptor {
    pub fn new(width: u32, height: u32, layout: ChannelLayout, precision: Precision, filter: FilterMode) -> Self {
        Self {
            size: UVec2::new(width, height),
            format: FieldFormat::new(layout, precision),
            filter,
        }
    }

    /// Default storage policy per field: signed floats for the physical
    /// quantities (nearest sampled), half-float dye sampled linearly.
    pub fn standard(name: FieldName, size: UVec2) -> Self {
        let (layout, precision, filter) = match name {
            FieldName::Velocity => (ChannelLayout::Rg, Precision::Float32, FilterMode::Nearest),
            FieldName::Dye => (ChannelLayout::Rgba, Precision::Float16, FilterMode::Linear),
            FieldName::Pressure | FieldName::Divergence | FieldName::Curl => {
                (ChannelLayout::R, Precision::Float32, FilterMode::Nearest)
            }
        };
        Self::new(size.x, size.y, layout, precision, filter)
    }

    pub fn with_size(mut self, size: UVec2) -> Self {
        self.size = size;
        self
    }

    pub fn check_size(&self, name: FieldName) -> FluidResult<()> {
        if self.size.x == 0 || self.size.y == 0 {
            return Err(FluidError::ZeroSized {
                field: name,
                width: self.size.x,
                height: self.size.y,
            });
        }
        Ok(())
    }

    /// Formats to try in order when the requested one is unsupported: first
    /// the requested layout at lower precisions, then wider layouts.
    /// Signed fields never fall back to an unsigned format.
    pub fn candidates(&self, needs_sign: bool) -> Vec<FieldDescriptor> {
        let mut out = Vec::new();
        let mut layout = Some(self.format.layout);
        while let Some(l) = layout {
            let mut precision = Some(self.format.precision);
            while let Some(p) = precision {
                out.push(FieldDescriptor {
                    format: FieldFormat::new(l, p),
                    ..*self
                });
                precision = p.lowered(needs_sign);
            }
            layout = l.widened();
        }
        out
    }
}

/// The set of storage formats a runtime can both sample from and write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSupport {
    // [layout][precision]
    supported: [[bool; 3]; 3],
}

impl FormatSupport {
    pub fn all() -> Self {
        Self { supported: [[true; 3]; 3] }
    }

    pub fn from_fn(mut f: impl FnMut(FieldFormat) -> bool) -> Self {
        let mut supported = [[false; 3]; 3];
        for (li, layout) in [ChannelLayout::R, ChannelLayout::Rg, ChannelLayout::Rgba].into_iter().enumerate() {
            for (pi, precision) in [Precision::Float32, Precision::Float16, Precision::Unorm8].into_iter().enumerate() {
                supported[li][pi] = f(FieldFormat::new(layout, precision));
            }
        }
        Self { supported }
    }

    pub fn without(mut self, format: FieldFormat) -> Self {
        let (l, p) = Self::slot(format);
        self.supported[l][p] = false;
        self
    }

    pub fn supports(&self, format: FieldFormat) -> bool {
        let (l, p) = Self::slot(format);
        self.supported[l][p]
    }

    pub fn resolve(&self, name: FieldName, desc: &FieldDescriptor) -> FluidResult<FieldDescriptor> {
        desc.candidates(name.is_signed())
            .into_iter()
            .find(|c| self.supports(c.format))
            .ok_or(FluidError::UnsupportedFormat {
                field: name,
                format: desc.format,
            })
    }

    fn slot(format: FieldFormat) -> (usize, usize) {
        let l = match format.layout {
            ChannelLayout::R => 0,
            ChannelLayout::Rg => 1,
            ChannelLayout::Rgba => 2,
        };
        let p = match format.precision {
            Precision::Float32 => 0,
            Precision::Float16 => 1,
            Precision::Unorm8 => 2,
        };
        (l, p)
    }
}

impl Default for FormatSupport {
    fn default() -> Self {
        Self::all()
    }
}
