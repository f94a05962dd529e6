use slotmap::{DefaultKey, SlotMap};

use crate::buffer::{ImageBuffer, LayerLayout};

/// Holds a number of image buffers and their layouts.
#[derive(Default)]
pub struct Pool {
    items: SlotMap<DefaultKey, Image>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolKey(DefaultKey);

/// A handle on an image inside the pool.
pub struct PoolImage<'pool> {
    /// The key of the slot map referring to this entry.
    key: DefaultKey,
    /// The image inside the pool.
    image: &'pool mut Image,
}

struct Image {
    data: ImageData,
}

enum ImageData {
    Host(ImageBuffer),
    /// The image data will be provided by the caller at a later point.
    /// Such an entry reserves a layout but can not be bound as a launch input.
    LateBound(LayerLayout),
}

impl Pool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Pool::default()
    }

    /// Get a mutable handle of an image in the pool.
    pub fn entry(&mut self, PoolKey(key): PoolKey) -> Option<PoolImage<'_>> {
        Some(PoolImage {
            key,
            image: self.items.get_mut(key)?,
        })
    }

    /// Gift the pool an image allocated on the host.
    pub fn insert(&mut self, image: ImageBuffer) -> PoolImage<'_> {
        self.new_with_data(ImageData::Host(image))
    }

    /// Insert the packed equivalent of an 8-bit sRGB image.
    ///
    /// Returns `None` for images with a zero dimension.
    pub fn insert_srgb(&mut self, image: &image::DynamicImage) -> Option<PoolImage<'_>> {
        let buffer = ImageBuffer::with_srgb_image(image)?;
        Some(self.insert(buffer))
    }

    /// Reserve an entry whose data is provided later.
    pub fn declare(&mut self, layout: LayerLayout) -> PoolImage<'_> {
        self.new_with_data(ImageData::LateBound(layout))
    }

    fn new_with_data(&mut self, data: ImageData) -> PoolImage<'_> {
        let key = self.items.insert(Image { data });

        PoolImage {
            key,
            image: &mut self.items[key],
        }
    }
}

impl PoolImage<'_> {
    pub fn key(&self) -> PoolKey {
        PoolKey(self.key)
    }

    pub fn layout(&self) -> LayerLayout {
        match &self.image.data {
            ImageData::Host(buffer) => *buffer.layout(),
            ImageData::LateBound(layout) => *layout,
        }
    }

    /// The host texel words, if any were allocated.
    pub fn texels(&self) -> Option<&[u32]> {
        match &self.image.data {
            ImageData::Host(buffer) => Some(buffer.as_texels()),
            ImageData::LateBound(_) => None,
        }
    }

    /// Replace a reserved entry with actual host data.
    ///
    /// Returns `None`, leaving the entry untouched, when the layouts disagree.
    pub fn upload(&mut self, image: ImageBuffer) -> Option<()> {
        if *image.layout() != self.layout() {
            return None;
        }

        self.image.data = ImageData::Host(image);
        Some(())
    }

    /// Unpack the image into an 8-bit `image` buffer, if host data exists.
    pub fn to_image(&self) -> Option<image::RgbaImage> {
        match &self.image.data {
            ImageData::Host(buffer) => buffer.to_image(),
            ImageData::LateBound(_) => None,
        }
    }
}
