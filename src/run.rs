//! Executes lowered programs on a chosen executor.
use core::marker::PhantomData;
use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;

use crate::buffer::{ImageBuffer, LayerLayout};
use crate::command::Register;
use crate::kernels::{Gather, Kernel};
use crate::pool::{Pool, PoolImage};
use crate::program::{Buffer, Low};

/// The strategy evaluating point kernels over an index space.
///
/// Every kernel is pure per index and every target slot is written exactly once, so the
/// strategies are observably equivalent. The parallel executor runs on rayon's global thread
/// pool.
#[derive(Clone, Copy, Debug)]
pub enum Executor {
    /// Evaluate the index space in a plain loop on the calling thread.
    Sequential,
    /// Evaluate the index space on the thread pool.
    Parallel,
}

/// A running program.
///
/// Stepping executes one lowered instruction at a time. The struct owns copies of all input
/// data, so neither the program nor the pool are borrowed while it runs.
pub struct Execution {
    instructions: Arc<[Low]>,
    /// The layout of every virtual buffer.
    layouts: Vec<LayerLayout>,
    /// The data of every virtual buffer, present once its defining instruction ran.
    buffers: Vec<Option<Vec<u32>>>,
    /// Snapshots taken by read-back instructions, keyed by output register.
    outputs: HashMap<Register, Vec<u32>>,
    next_instruction: usize,
    executor: Executor,
    io_map: Arc<IoMap>,
}

pub(crate) struct InitialState {
    pub(crate) instructions: Arc<[Low]>,
    pub(crate) layouts: Vec<LayerLayout>,
    pub(crate) buffers: Vec<Option<Vec<u32>>>,
    pub(crate) io_map: Arc<IoMap>,
    pub(crate) executor: Executor,
}

#[derive(Debug, Default)]
pub(crate) struct IoMap {
    /// Map input registers to their index in `buffers`.
    pub(crate) inputs: HashMap<Register, usize>,
    /// Map output registers to their index in `buffers`.
    pub(crate) outputs: HashMap<Register, usize>,
}

/// One host-visible point of progress within a running execution.
#[derive(Debug)]
pub struct SyncPoint<'exec> {
    instruction: usize,
    execution: PhantomData<&'exec Execution>,
}

/// An instruction could not be performed.
#[derive(Debug)]
pub struct StepError {
    inner: StepErrorKind,
}

#[derive(Debug)]
enum StepErrorKind {
    /// Every instruction has already been performed.
    ProgramEnd,
    /// An internal consistency check failed on the given source line.
    InvalidInstruction(u32),
}

/// An output could not be collected from a retired execution.
#[derive(Debug)]
pub struct RetireError {
    inner: RetireErrorKind,
}

#[derive(Debug)]
enum RetireErrorKind {
    /// The register does not describe an output of the program.
    NoSuchOutput,
    /// The output was not produced, or was already collected.
    Incomplete,
    /// An internal consistency check failed on the given source line.
    InvalidImage(u32),
}

/// A retired execution from which outputs are moved back into a pool.
pub struct Retire<'pool> {
    io_map: Arc<IoMap>,
    layouts: Vec<LayerLayout>,
    outputs: HashMap<Register, Vec<u32>>,
    pool: &'pool mut Pool,
}

impl Default for Executor {
    fn default() -> Self {
        Executor::Parallel
    }
}

impl Execution {
    pub(crate) fn new(init: InitialState) -> Self {
        Execution {
            instructions: init.instructions,
            layouts: init.layouts,
            buffers: init.buffers,
            outputs: HashMap::default(),
            next_instruction: 0,
            executor: init.executor,
            io_map: init.io_map,
        }
    }

    /// Check if instructions are left to run.
    pub fn is_running(&self) -> bool {
        self.next_instruction < self.instructions.len()
    }

    /// Perform the next instruction.
    pub fn step(&mut self) -> Result<SyncPoint<'_>, StepError> {
        let index = self.next_instruction;
        let instruction = self
            .instructions
            .get(index)
            .ok_or(StepError::PROGRAM_END)?;

        match instruction {
            Low::Fill { dst, texel } => {
                let layout = self
                    .layouts
                    .get(dst.0)
                    .ok_or_else(|| StepError::InvalidInstruction(line!()))?;
                log::debug!("fill {:?} with {:#010x}", dst, texel);
                self.buffers[dst.0] = Some(vec![*texel; layout.len()]);
            }
            Low::Dispatch {
                kernel,
                sources,
                dst,
            } => {
                let target = dispatch(kernel, sources, *dst, self)?;
                self.buffers[dst.0] = Some(target);
            }
            Low::ReadBack { src, register } => {
                let data = self
                    .buffers
                    .get(src.0)
                    .and_then(|buffer| buffer.as_ref())
                    .ok_or_else(|| StepError::InvalidInstruction(line!()))?;
                log::debug!("read back {:?} into {:?}", src, register);
                self.outputs.insert(*register, data.clone());
            }
        }

        self.next_instruction += 1;
        Ok(SyncPoint {
            instruction: index,
            execution: PhantomData,
        })
    }

    /// Stop the execution and offer all collected outputs to the pool.
    pub fn retire_gracefully(self, pool: &mut Pool) -> Retire<'_> {
        log::debug!(
            "retiring after {} of {} instructions",
            self.next_instruction,
            self.instructions.len(),
        );

        Retire {
            io_map: self.io_map,
            layouts: self.layouts,
            outputs: self.outputs,
            pool,
        }
    }
}

/// Evaluate one kernel over the full index space of its target buffer.
fn dispatch(
    kernel: &Kernel,
    sources: &[Buffer],
    dst: Buffer,
    execution: &Execution,
) -> Result<Vec<u32>, StepError> {
    let layout = execution
        .layouts
        .get(dst.0)
        .ok_or_else(|| StepError::InvalidInstruction(line!()))?;
    let mut target = vec![0; layout.len()];

    let mut gathered = Vec::with_capacity(sources.len());
    for buffer in sources {
        let data = execution
            .buffers
            .get(buffer.0)
            .and_then(|buffer| buffer.as_deref())
            .ok_or_else(|| StepError::InvalidInstruction(line!()))?;
        if data.len() != target.len() {
            return Err(StepError::InvalidInstruction(line!()));
        }
        gathered.push(data);
    }

    let point = kernel.kernel();
    log::debug!("dispatch {:?} over {} texels", point.key(), target.len());

    match execution.executor {
        Executor::Sequential => {
            for (index, out) in target.iter_mut().enumerate() {
                *out = point.evaluate(Gather {
                    sources: &gathered,
                    index,
                });
            }
        }
        Executor::Parallel => {
            target.par_iter_mut().enumerate().for_each(|(index, out)| {
                *out = point.evaluate(Gather {
                    sources: &gathered,
                    index,
                });
            });
        }
    }

    Ok(target)
}

impl SyncPoint<'_> {
    /// The index of the instruction this point of progress belongs to.
    pub fn instruction(&self) -> usize {
        self.instruction
    }
}

impl Retire<'_> {
    /// Move one output into the pool, returning its new entry.
    ///
    /// Each output can be collected exactly once.
    pub fn output(&mut self, register: Register) -> Result<PoolImage<'_>, RetireError> {
        let &index = self.io_map.outputs.get(&register).ok_or(RetireError {
            inner: RetireErrorKind::NoSuchOutput,
        })?;

        let texels = self.outputs.remove(&register).ok_or(RetireError {
            inner: RetireErrorKind::Incomplete,
        })?;

        let layout = self
            .layouts
            .get(index)
            .ok_or_else(|| RetireError::InvalidImage(line!()))?;
        let image = ImageBuffer::with_texels(layout, texels)
            .ok_or_else(|| RetireError::InvalidImage(line!()))?;

        Ok(self.pool.insert(image))
    }

    /// End the retirement.
    pub fn finish(self) {
        if !self.outputs.is_empty() {
            log::debug!("{} outputs were never collected", self.outputs.len());
        }
    }
}

impl StepError {
    pub(crate) const PROGRAM_END: Self = StepError {
        inner: StepErrorKind::ProgramEnd,
    };

    #[allow(non_snake_case)]
    pub(crate) fn InvalidInstruction(line: u32) -> Self {
        StepError {
            inner: StepErrorKind::InvalidInstruction(line),
        }
    }

    /// Return true when stepping was attempted past the last instruction.
    pub fn is_program_end(&self) -> bool {
        matches!(self.inner, StepErrorKind::ProgramEnd)
    }
}

impl RetireError {
    #[allow(non_snake_case)]
    pub(crate) fn InvalidImage(line: u32) -> Self {
        RetireError {
            inner: RetireErrorKind::InvalidImage(line),
        }
    }

    /// Return true when the output exists but was not (or no longer is) available.
    pub fn is_incomplete(&self) -> bool {
        matches!(self.inner, RetireErrorKind::Incomplete)
    }
}
