use std::sync::Arc;

use crate::buffer::LayerLayout;
use crate::command::Register;
use crate::kernels::Kernel;
use crate::pool::{Pool, PoolKey};
use crate::run::{Execution, Executor, InitialState, IoMap};

/// Planned out and intrinsically validated command buffer.
///
/// The program owns a table of virtual buffers, one per intermediate value, with layouts that
/// were determined statically. Launching assigns host memory to the input slots and hands the
/// instruction list to an execution.
pub struct Program {
    /// The list of instructions to perform.
    pub(crate) instructions: Arc<[Low]>,
    /// The layout of every virtual buffer, indexed by `Buffer`.
    pub(crate) buffers: Vec<LayerLayout>,
    /// The map from input/output registers to their virtual buffer.
    pub(crate) io_map: Arc<IoMap>,
}

/// One lowered instruction of the execution machine.
#[derive(Debug)]
pub(crate) enum Low {
    /// Fill the target buffer with one repeated texel word.
    Fill { dst: Buffer, texel: u32 },
    /// Evaluate a point kernel at every index of the target buffer.
    Dispatch {
        kernel: Kernel,
        sources: Vec<Buffer>,
        dst: Buffer,
    },
    /// Snapshot a buffer as the value of an output register.
    ReadBack { src: Buffer, register: Register },
}

/// Identifies one virtual buffer of the execution machine, by an index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Buffer(pub(crate) usize);

/// The command buffer could not be made into a program.
#[derive(Debug)]
pub struct CompileError {
    inner: CompileErrorKind,
}

#[derive(Debug)]
enum CompileErrorKind {
    /// There are no operations to lower.
    NoCommands,
    /// An internal consistency check failed on the given source line.
    Bug(u32),
}

/// Something about a launch does not work with this program and pool combination.
#[derive(Debug)]
pub struct LaunchError {
    kind: LaunchErrorKind,
}

#[derive(Debug)]
pub enum LaunchErrorKind {
    /// The register does not describe an input of the program.
    NotAnInput(Register),
    /// The pool has no image under the given key.
    NoSuchPoolImage,
    /// The pool image has no host data that could be read.
    NoHostData,
    /// The bound image's layout differs from the declared input layout.
    ConflictingLayout {
        expected: LayerLayout,
        found: LayerLayout,
    },
    /// An input was never bound before launch.
    UnboundInput(Register),
}

/// Prepare program execution with a specific pool.
///
/// The launcher is merely a configuration structure. It does not modify the pool passed in;
/// input data is copied out of it when bound.
pub struct Launcher<'program> {
    program: &'program Program,
    pool: &'program mut Pool,
    /// The host data for each virtual buffer, where already bound.
    binds: Vec<Option<Vec<u32>>>,
}

impl Program {
    /// Prepare launching with a pool that will provide the inputs.
    pub fn launch<'pool>(&'pool self, pool: &'pool mut Pool) -> Launcher<'pool> {
        Launcher {
            binds: vec![None; self.buffers.len()],
            program: self,
            pool,
        }
    }
}

impl Launcher<'_> {
    /// Bind an input register to an image in the pool.
    ///
    /// The image's texels are copied out, the pool entry stays untouched.
    pub fn bind(mut self, register: Register, img: PoolKey) -> Result<Self, LaunchError> {
        let &index = self
            .program
            .io_map
            .inputs
            .get(&register)
            .ok_or(LaunchError {
                kind: LaunchErrorKind::NotAnInput(register),
            })?;

        let entry = self.pool.entry(img).ok_or(LaunchError {
            kind: LaunchErrorKind::NoSuchPoolImage,
        })?;

        let found = entry.layout();
        let expected = self.program.buffers[index];
        if found != expected {
            return Err(LaunchError {
                kind: LaunchErrorKind::ConflictingLayout { expected, found },
            });
        }

        let texels = entry.texels().ok_or(LaunchError {
            kind: LaunchErrorKind::NoHostData,
        })?;

        self.binds[index] = Some(texels.to_vec());
        Ok(self)
    }

    /// Turn the configuration into a running execution on the given executor.
    pub fn launch(self, executor: &Executor) -> Result<Execution, LaunchError> {
        for (&register, &index) in self.program.io_map.inputs.iter() {
            if self.binds[index].is_none() {
                return Err(LaunchError {
                    kind: LaunchErrorKind::UnboundInput(register),
                });
            }
        }

        log::info!(
            "launching {} instructions over {} buffers on {:?}",
            self.program.instructions.len(),
            self.program.buffers.len(),
            executor,
        );

        Ok(Execution::new(InitialState {
            instructions: Arc::clone(&self.program.instructions),
            layouts: self.program.buffers.clone(),
            buffers: self.binds,
            io_map: Arc::clone(&self.program.io_map),
            executor: *executor,
        }))
    }
}

impl CompileError {
    pub(crate) const NO_COMMANDS: Self = CompileError {
        inner: CompileErrorKind::NoCommands,
    };

    #[allow(non_snake_case)]
    pub(crate) fn Bug(line: u32) -> Self {
        CompileError {
            inner: CompileErrorKind::Bug(line),
        }
    }

    /// Return true when compilation failed due to an empty command buffer.
    pub fn is_empty_err(&self) -> bool {
        matches!(self.inner, CompileErrorKind::NoCommands)
    }
}
