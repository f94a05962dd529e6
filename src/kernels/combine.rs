//! Flattens a stack of layers into a single opaque image.
use super::{Gather, KernelKey, PointKernel};

/// The maximum value of a single 8-bit channel.
const CHANNEL_MAX: u32 = 0xff;

/// The layer combination rule.
///
/// Each color channel is the floor-average over the stack, scaled by the union coverage of all
/// layers. Coverage is accumulated as the complement of the product of alpha complements,
/// `cover = 255 - fold(miss * (255 - alpha) / 255)`, in integer arithmetic throughout so that
/// results are exact and identical on every backend. The flattened image is opaque, its alpha
/// channel is always `0xff`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Kernel;

impl PointKernel for Kernel {
    fn key(&self) -> KernelKey {
        KernelKey::Combine
    }

    fn num_sources(&self) -> Option<usize> {
        None
    }

    fn evaluate(&self, gather: Gather<'_>) -> u32 {
        let count = gather.len() as u32;

        let mut red = 0;
        let mut green = 0;
        let mut blue = 0;
        let mut miss = CHANNEL_MAX;

        for source in 0..gather.len() {
            let texel = gather.word(source);
            red += texel >> 24 & CHANNEL_MAX;
            green += texel >> 16 & CHANNEL_MAX;
            blue += texel >> 8 & CHANNEL_MAX;
            miss = miss * (CHANNEL_MAX - (texel & CHANNEL_MAX)) / CHANNEL_MAX;
        }

        let cover = CHANNEL_MAX - miss;

        let red = (red / count) * cover / CHANNEL_MAX;
        let green = (green / count) * cover / CHANNEL_MAX;
        let blue = (blue / count) * cover / CHANNEL_MAX;

        red << 24 | green << 16 | blue << 8 | CHANNEL_MAX
    }
}
