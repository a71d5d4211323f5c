// Field Buffer Pool: the one owner of every named field, its size and its format.
// Generic over the storage so the CPU grids and the GPU images share the
// same lifetime, ping-pong and binding rules.

use bevy::log::{info, warn};
use glam::UVec2;

use crate::error::{FluidError, FluidResult};
use crate::format::{FieldDescriptor, FieldName, FormatSupport};
use crate::ping_pong::{FieldBuffers, PingPong};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHandle {
    pub name: FieldName,
    pub size: UVec2,
}

#[derive(Debug, Clone)]
struct Slot<T> {
    desc: FieldDescriptor,
    buffers: FieldBuffers<T>,
}

/// Storage borrowed for one pass: the write target plus the read side of
/// every input, in the order the pass listed them.
pub struct PassBinding<'a, T> {
    pub output: &'a mut T,
    pub output_desc: FieldDescriptor,
    pub inputs: Vec<&'a T>,
}

#[derive(Debug, Clone)]
pub struct FieldPool<T> {
    slots: [Option<Slot<T>>; FieldName::COUNT],
    support: FormatSupport,
}

impl<T> FieldPool<T> {
    pub fn new(support: FormatSupport) -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            support,
        }
    }

    pub fn support(&self) -> &FormatSupport {
        &self.support
    }

    /// Allocates (or replaces) `name` with storage built by `make`; double
    /// buffered fields call it twice. Fails on a zero-sized grid or a format
    /// the runtime cannot provide.
    pub fn allocate_with(
        &mut self,
        name: FieldName,
        desc: FieldDescriptor,
        mut make: impl FnMut(&FieldDescriptor) -> T,
    ) -> FluidResult<FieldHandle> {
        desc.check_size(name)?;
        if !self.support.supports(desc.format) {
            return Err(FluidError::UnsupportedFormat {
                field: name,
                format: desc.format,
            });
        }

        let buffers = if name.is_double_buffered() {
            FieldBuffers::Double(PingPong::new(make(&desc), make(&desc)))
        } else {
            FieldBuffers::Single(make(&desc))
        };
        self.slots[name.index()] = Some(Slot { desc, buffers });

        info!(
            "allocated {} field {}x{} as {:?}",
            name.label(),
            desc.size.x,
            desc.size.y,
            desc.format
        );
        Ok(FieldHandle { name, size: desc.size })
    }

    /// Like `allocate_with`, but walks the descriptor's fallback formats
    /// before giving up.
    pub fn allocate_with_fallback(
        &mut self,
        name: FieldName,
        desc: FieldDescriptor,
        make: impl FnMut(&FieldDescriptor) -> T,
    ) -> FluidResult<FieldHandle> {
        desc.check_size(name)?;
        let resolved = self.support.resolve(name, &desc)?;
        if resolved.format != desc.format {
            warn!(
                "{} field: {:?} unsupported, falling back to {:?}",
                name.label(),
                desc.format,
                resolved.format
            );
        }
        self.allocate_with(name, resolved, make)
    }

    /// Reallocates `name` at a new size with its current format. Prior
    /// contents are discarded.
    pub fn resize_with(
        &mut self,
        name: FieldName,
        size: UVec2,
        make: impl FnMut(&FieldDescriptor) -> T,
    ) -> FluidResult<FieldHandle> {
        let desc = self.descriptor(name)?.with_size(size);
        self.allocate_with(name, desc, make)
    }

    pub fn contains(&self, name: FieldName) -> bool {
        self.slots[name.index()].is_some()
    }

    pub fn descriptor(&self, name: FieldName) -> FluidResult<&FieldDescriptor> {
        self.slot(name).map(|s| &s.desc)
    }

    /// Current read buffer of `name`.
    pub fn get(&self, name: FieldName) -> FluidResult<&T> {
        self.slot(name).map(|s| s.buffers.read())
    }

    pub fn buffers(&self, name: FieldName) -> FluidResult<&FieldBuffers<T>> {
        self.slot(name).map(|s| &s.buffers)
    }

    pub fn swap(&mut self, name: FieldName) -> FluidResult<()> {
        let slot = self.slots[name.index()]
            .as_mut()
            .ok_or(FluidError::NotAllocated(name))?;
        slot.buffers.swap();
        Ok(())
    }

    pub fn release(&mut self, name: FieldName) -> Option<FieldBuffers<T>> {
        self.slots[name.index()].take().map(|s| s.buffers)
    }

    /// Borrows the write target of `output` and the read side of `inputs`.
    /// A double-buffered output may also be an input (its read half is
    /// bound); a single-buffered one may not.
    pub fn bind(&mut self, output: FieldName, inputs: &[FieldName]) -> FluidResult<PassBinding<'_, T>> {
        for &name in inputs.iter().chain(std::iter::once(&output)) {
            if !self.contains(name) {
                return Err(FluidError::NotAllocated(name));
            }
        }
        if !output.is_double_buffered() && inputs.contains(&output) {
            return Err(FluidError::FeedbackHazard(output));
        }

        let mut reads: [Option<&T>; FieldName::COUNT] = [None; FieldName::COUNT];
        let mut target = None;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(slot) = slot else { continue };
            if index == output.index() {
                let desc = slot.desc;
                match &mut slot.buffers {
                    FieldBuffers::Single(t) => target = Some((t, desc)),
                    FieldBuffers::Double(pp) => {
                        let (r, w) = pp.split_mut();
                        reads[index] = Some(r);
                        target = Some((w, desc));
                    }
                }
            } else {
                reads[index] = Some(slot.buffers.read());
            }
        }

        let (output_ref, output_desc) = target.ok_or(FluidError::NotAllocated(output))?;
        let inputs = inputs
            .iter()
            .map(|name| reads[name.index()].ok_or(FluidError::FeedbackHazard(*name)))
            .collect::<FluidResult<Vec<_>>>()?;

        Ok(PassBinding {
            output: output_ref,
            output_desc,
            inputs,
        })
    }

    fn slot(&self, name: FieldName) -> FluidResult<&Slot<T>> {
        self.slots[name.index()]
            .as_ref()
            .ok_or(FluidError::NotAllocated(name))
    }
}
