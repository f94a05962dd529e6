//! The per-texel functions a program can dispatch.
//!
//! This is the counterpart of a shader directory. Each kernel computes one output word from the
//! source words gathered at a single index, and nothing else. That contract is what makes the
//! executor free to evaluate the index space in any order, or in parallel.

pub mod add;
pub mod combine;

/// A simplification of a point kernel interface.
///
/// Implementations must be pure: the result may depend only on the gathered source words, never
/// on the index itself or any outside state.
pub(crate) trait PointKernel: core::fmt::Debug + Sync {
    /// The unique key identifying this kernel.
    fn key(&self) -> KernelKey;

    /// The number of source images consumed per invocation, if fixed.
    fn num_sources(&self) -> Option<usize>;

    /// Compute the output word for the gather's index.
    fn evaluate(&self, gather: Gather<'_>) -> u32;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum KernelKey {
    /// The layer combination of a stack of sources.
    Combine,
    /// Element-wise addition of two sources.
    Add,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Kernel {
    Combine(combine::Kernel),
    Add(add::Kernel),
}

impl Kernel {
    pub(crate) fn kernel(&self) -> &dyn PointKernel {
        match self {
            Kernel::Combine(combine) => combine,
            Kernel::Add(add) => add,
        }
    }
}

/// The source words visible to one kernel invocation.
///
/// All source slices have the same length and `index` is in bounds for each, an invariant
/// established when the dispatch instruction was lowered.
#[derive(Clone, Copy)]
pub(crate) struct Gather<'data> {
    pub(crate) sources: &'data [&'data [u32]],
    pub(crate) index: usize,
}

impl Gather<'_> {
    /// The number of gathered sources.
    pub(crate) fn len(&self) -> usize {
        self.sources.len()
    }

    /// The word of one source at this invocation's index.
    pub(crate) fn word(&self, source: usize) -> u32 {
        self.sources[source][self.index]
    }
}
