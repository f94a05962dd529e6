//! Element-wise addition over whole words.
use super::{Gather, KernelKey, PointKernel};

/// Adds the words of exactly two sources, wrapping on overflow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Kernel;

impl PointKernel for Kernel {
    fn key(&self) -> KernelKey {
        KernelKey::Add
    }

    fn num_sources(&self) -> Option<usize> {
        Some(2)
    }

    fn evaluate(&self, gather: Gather<'_>) -> u32 {
        gather.word(0).wrapping_add(gather.word(1))
    }
}
