//! Defines layout and buffer of our layer images.

/// The grid layout of one layer of packed texel words.
///
/// An inner invariant is that the layout fits in memory and in particular into a `usize`, and
/// that both dimensions are non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerLayout {
    pub(crate) width: u32,
    pub(crate) height: u32,
}

/// A host allocation of one layer, `width*height` packed words in row-major order.
///
/// Each word encodes four 8-bit channels as `0xRRGGBBAA`.
pub struct ImageBuffer {
    layout: LayerLayout,
    texels: Vec<u32>,
}

/// The number of bytes of a single packed texel word.
pub(crate) const BYTES_PER_TEXEL: usize = 4;

impl LayerLayout {
    /// Describe a row-major grid of packed words.
    ///
    /// Returns `None` when either dimension is zero or when the buffer would not fit into the
    /// address space.
    pub fn with_width_height(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        let len = u128::from(width) * u128::from(height) * BYTES_PER_TEXEL as u128;
        if len > usize::MAX as u128 {
            return None;
        }

        Some(LayerLayout { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The number of texel words in a buffer of this layout.
    pub fn len(&self) -> usize {
        // No overflow due to inner invariant.
        (self.width as usize) * (self.height as usize)
    }

    pub fn byte_len(&self) -> usize {
        // No overflow due to inner invariant.
        self.len() * BYTES_PER_TEXEL
    }

    pub fn u64_len(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl ImageBuffer {
    /// Allocate a new, zeroed image buffer given its layout.
    pub fn with_layout(layout: &LayerLayout) -> Self {
        ImageBuffer {
            layout: *layout,
            texels: vec![0; layout.len()],
        }
    }

    /// Wrap an existing vector of words as an image buffer.
    ///
    /// Returns `None` when the vector length does not match the layout.
    pub fn with_texels(layout: &LayerLayout, texels: Vec<u32>) -> Option<Self> {
        if texels.len() != layout.len() {
            return None;
        }

        Some(ImageBuffer {
            layout: *layout,
            texels,
        })
    }

    /// Convert the 8-bit sRGB contents of an `image` buffer into packed words.
    ///
    /// Returns `None` for images with a zero dimension.
    pub fn with_srgb_image(image: &image::DynamicImage) -> Option<Self> {
        let rgba = image.to_rgba8();
        let layout = LayerLayout::with_width_height(rgba.width(), rgba.height())?;

        let texels = rgba
            .chunks_exact(BYTES_PER_TEXEL)
            .map(|ch| pack([ch[0], ch[1], ch[2], ch[3]]))
            .collect();

        Some(ImageBuffer { layout, texels })
    }

    /// Unpack the words into an 8-bit `image` buffer.
    pub fn to_image(&self) -> Option<image::RgbaImage> {
        let bytes = self.texels.iter().flat_map(|&texel| unpack(texel)).collect();
        image::RgbaImage::from_raw(self.layout.width, self.layout.height, bytes)
    }

    pub fn layout(&self) -> &LayerLayout {
        &self.layout
    }

    pub fn as_texels(&self) -> &[u32] {
        &self.texels
    }

    pub fn as_texels_mut(&mut self) -> &mut [u32] {
        &mut self.texels
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }
}

fn pack([r, g, b, a]: [u8; 4]) -> u32 {
    u32::from(r) << 24 | u32::from(g) << 16 | u32::from(b) << 8 | u32::from(a)
}

fn unpack(texel: u32) -> [u8; 4] {
    [
        (texel >> 24) as u8,
        (texel >> 16) as u8,
        (texel >> 8) as u8,
        texel as u8,
    ]
}
