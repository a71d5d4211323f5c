use crate::cpu::field::Field;
use crate::error::{FluidError, FluidResult};
use crate::kernel::{Pass, PassExecutor};
use crate::pool::FieldPool;

/// Pass Executor over CPU grids: evaluates the kernel at every cell of the
/// output's write buffer, then swaps it if double buffered.
pub struct CpuExecutor<'a> {
    pub pool: &'a mut FieldPool<Field>,
    passes_run: usize,
}

impl<'a> CpuExecutor<'a> {
    pub fn new(pool: &'a mut FieldPool<Field>) -> Self {
        Self { pool, passes_run: 0 }
    }

    pub fn passes_run(&self) -> usize {
        self.passes_run
    }
}

impl PassExecutor for CpuExecutor<'_> {
    type Error = FluidError;

    fn execute(&mut self, pass: &Pass) -> FluidResult<()> {
        {
            let binding = self.pool.bind(pass.output, &pass.inputs)?;
            let out = binding.output;
            for y in 0..out.height() {
                for x in 0..out.width() {
                    let uv = out.cell_uv(x, y);
                    let value = pass.kernel.evaluate(uv, &binding.inputs);
                    out.store(x, y, value);
                }
            }
        }
        if pass.output.is_double_buffered() {
            self.pool.swap(pass.output)?;
        }
        self.passes_run += 1;
        Ok(())
    }
}
