use std::sync::Arc;

use crate::buffer::LayerLayout;
use crate::kernels::{self, Kernel};
use crate::program::{Buffer, CompileError, Low, Program};
use crate::run::IoMap;

/// A reference to one particular value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Register(pub(crate) usize);

/// One linear sequence of operations.
///
/// The machine model is a single basic block in SSA form where registers are strongly typed with
/// their layer layouts. Each register is assigned by exactly one operation and never mutated,
/// which keeps the analysis of temporary buffers trivial: the layout of every intermediate result
/// is known before anything runs, and a dispatch can never alias its own target.
#[derive(Default)]
pub struct CommandBuffer {
    ops: Vec<Op>,
}

#[derive(Debug)]
enum Op {
    /// i := in()
    Input { layout: LayerLayout },
    /// out(src)
    Output { src: Register },
    /// i := op()
    /// where type(i) = layout
    Construct {
        layout: LayerLayout,
        op: ConstructOp,
    },
    /// i := kernel(sources..)
    /// where type(i) = type(sources[0]) = .. = type(sources[n-1])
    Point {
        sources: Vec<Register>,
        kernel: Kernel,
    },
}

#[derive(Debug)]
enum ConstructOp {
    Solid(u32),
}

/// An operation could not be recorded.
#[derive(Debug)]
pub struct CommandError {
    inner: CommandErrorKind,
}

#[derive(Debug)]
enum CommandErrorKind {
    /// The register does not name a prior value-producing operation.
    BadRegister(Register),
    /// Two registers that must agree on their layout do not.
    ConflictingLayout {
        expected: LayerLayout,
        found: LayerLayout,
    },
    /// A stack operation was recorded without any layer.
    EmptyStack,
}

impl CommandBuffer {
    /// Declare an input.
    ///
    /// Inputs MUST later be bound from the pool during launch.
    pub fn input(&mut self, layout: LayerLayout) -> Result<Register, CommandError> {
        Ok(self.push(Op::Input { layout }))
    }

    /// A solid image, from a layout and a single texel word.
    pub fn solid(&mut self, layout: LayerLayout, texel: u32) -> Result<Register, CommandError> {
        Ok(self.push(Op::Construct {
            layout,
            op: ConstructOp::Solid(texel),
        }))
    }

    /// Flatten a stack of layers into one opaque image, in stacking order.
    ///
    /// All layers must share one layout, which is also the layout of the result.
    pub fn combine(&mut self, layers: &[Register]) -> Result<Register, CommandError> {
        let kernel = Kernel::Combine(kernels::combine::Kernel);
        self.point(layers.to_vec(), kernel)
    }

    /// Add two images element-wise over whole words, wrapping on overflow.
    pub fn add(&mut self, lhs: Register, rhs: Register) -> Result<Register, CommandError> {
        let kernel = Kernel::Add(kernels::add::Kernel);
        self.point(vec![lhs, rhs], kernel)
    }

    /// Declare an output.
    ///
    /// Outputs are collected from the retired execution after launch.
    pub fn output(&mut self, src: Register) -> Result<(Register, LayerLayout), CommandError> {
        let layout = self.layout(src)?;
        let register = self.push(Op::Output { src });
        Ok((register, layout))
    }

    /// Validate the buffer and lower it into a runnable program.
    pub fn compile(&self) -> Result<Program, CompileError> {
        if self.ops.is_empty() {
            return Err(CompileError::NO_COMMANDS);
        }

        let mut buffers = Vec::new();
        let mut by_register: Vec<Option<Buffer>> = Vec::with_capacity(self.ops.len());
        let mut instructions = Vec::new();
        let mut io_map = IoMap::default();

        for (index, op) in self.ops.iter().enumerate() {
            let assigned = match op {
                Op::Input { layout } => {
                    let buffer = Buffer(buffers.len());
                    buffers.push(*layout);
                    io_map.inputs.insert(Register(index), buffer.0);
                    Some(buffer)
                }
                Op::Construct { layout, op } => {
                    let buffer = Buffer(buffers.len());
                    buffers.push(*layout);
                    let ConstructOp::Solid(texel) = op;
                    instructions.push(Low::Fill {
                        dst: buffer,
                        texel: *texel,
                    });
                    Some(buffer)
                }
                Op::Point { sources, kernel } => {
                    let sources = sources
                        .iter()
                        .map(|register| {
                            by_register
                                .get(register.0)
                                .copied()
                                .flatten()
                                .ok_or_else(|| CompileError::Bug(line!()))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    let first = sources.first().ok_or_else(|| CompileError::Bug(line!()))?;

                    let buffer = Buffer(buffers.len());
                    buffers.push(buffers[first.0]);
                    instructions.push(Low::Dispatch {
                        kernel: kernel.clone(),
                        sources,
                        dst: buffer,
                    });
                    Some(buffer)
                }
                Op::Output { src } => {
                    let buffer = by_register
                        .get(src.0)
                        .copied()
                        .flatten()
                        .ok_or_else(|| CompileError::Bug(line!()))?;
                    io_map.outputs.insert(Register(index), buffer.0);
                    instructions.push(Low::ReadBack {
                        src: buffer,
                        register: Register(index),
                    });
                    None
                }
            };

            by_register.push(assigned);
        }

        Ok(Program {
            instructions: instructions.into(),
            buffers,
            io_map: Arc::new(io_map),
        })
    }

    /// The layout of the value in a register.
    pub(crate) fn layout(&self, register: Register) -> Result<LayerLayout, CommandError> {
        match self.ops.get(register.0) {
            Some(Op::Input { layout }) => Ok(*layout),
            Some(Op::Construct { layout, .. }) => Ok(*layout),
            Some(Op::Point { sources, .. }) => {
                // The layout of a point result is that of its sources, an invariant established
                // when the operation was recorded.
                let first = *sources.first().ok_or(CommandError {
                    inner: CommandErrorKind::BadRegister(register),
                })?;
                self.layout(first)
            }
            Some(Op::Output { .. }) | None => Err(CommandError {
                inner: CommandErrorKind::BadRegister(register),
            }),
        }
    }

    fn point(&mut self, sources: Vec<Register>, kernel: Kernel) -> Result<Register, CommandError> {
        let first = *sources.first().ok_or(CommandError {
            inner: CommandErrorKind::EmptyStack,
        })?;

        if let Some(expected) = kernel.kernel().num_sources() {
            if sources.len() != expected {
                return Err(CommandError {
                    inner: CommandErrorKind::BadRegister(first),
                });
            }
        }

        let expected = self.layout(first)?;
        for &source in &sources[1..] {
            let found = self.layout(source)?;
            if found != expected {
                return Err(CommandError {
                    inner: CommandErrorKind::ConflictingLayout { expected, found },
                });
            }
        }

        Ok(self.push(Op::Point { sources, kernel }))
    }

    fn push(&mut self, op: Op) -> Register {
        let register = Register(self.ops.len());
        self.ops.push(op);
        register
    }
}

impl CommandError {
    /// Return true when the error was caused by disagreeing layer shapes.
    pub fn is_shape_err(&self) -> bool {
        matches!(
            self.inner,
            CommandErrorKind::ConflictingLayout { .. } | CommandErrorKind::EmptyStack
        )
    }
}
