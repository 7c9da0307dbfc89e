//! Device resource handles and descriptors shared by every backend.

/// Opaque handle to a device buffer owned by a [`crate::ComputeBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

/// Opaque handle to a 2D image owned by a [`crate::ComputeBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub(crate) u64);

/// Pixel formats understood by the backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Four 32-bit float channels. The only format the raymarch kernel writes.
    Rgba32Float,
    /// Four 8-bit normalized channels, the usual presentation format.
    Rgba8Unorm,
}

impl ImageFormat {
    #[must_use]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            ImageFormat::Rgba32Float => 16,
            ImageFormat::Rgba8Unorm => 4,
        }
    }

    /// Rounds a pixel to what this format can actually store.
    #[must_use]
    pub fn quantize(self, pixel: [f32; 4]) -> [f32; 4] {
        match self {
            ImageFormat::Rgba32Float => pixel,
            ImageFormat::Rgba8Unorm => pixel.map(|c| f32::from(unorm8(c)) / 255.0),
        }
    }

    /// Appends the encoded bytes of `pixel` to `out`.
    pub fn encode_into(self, pixel: [f32; 4], out: &mut Vec<u8>) {
        match self {
            ImageFormat::Rgba32Float => out.extend_from_slice(bytemuck::bytes_of(&pixel)),
            ImageFormat::Rgba8Unorm => out.extend(pixel.map(unorm8)),
        }
    }

    /// Decodes one pixel. `bytes` must be exactly [`Self::bytes_per_pixel`] long.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> [f32; 4] {
        match self {
            ImageFormat::Rgba32Float => bytemuck::pod_read_unaligned(bytes),
            ImageFormat::Rgba8Unorm => [bytes[0], bytes[1], bytes[2], bytes[3]].map(|c| f32::from(c) / 255.0),
        }
    }
}

fn unorm8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Describes an image to allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// Whether kernels may write to the image (storage access).
    pub random_write: bool,
}

impl ImageDesc {
    #[must_use]
    pub const fn new(width: u32, height: u32, format: ImageFormat) -> Self {
        Self { width, height, format, random_write: false }
    }

    #[must_use]
    pub const fn with_random_write(mut self) -> Self {
        self.random_write = true;
        self
    }

    #[must_use]
    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Running totals of backend activity, used to check resource lifetimes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResourceStats {
    pub buffers_allocated: u64,
    pub buffers_released: u64,
    pub bytes_uploaded: u64,
    pub images_allocated: u64,
    pub images_released: u64,
    pub dispatches: u64,
    pub blits: u64,
}

impl ResourceStats {
    #[must_use]
    pub const fn live_buffers(&self) -> u64 {
        self.buffers_allocated - self.buffers_released
    }

    #[must_use]
    pub const fn live_images(&self) -> u64 {
        self.images_allocated - self.images_released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba8_quantizes_to_byte_steps() {
        let px = ImageFormat::Rgba8Unorm.quantize([0.5, 1.5, -1.0, 1.0]);
        assert_eq!(px, [128.0 / 255.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn encode_decode_agree_per_format() {
        for format in [ImageFormat::Rgba32Float, ImageFormat::Rgba8Unorm] {
            let pixel = format.quantize([0.25, 0.5, 0.75, 1.0]);
            let mut bytes = Vec::new();
            format.encode_into(pixel, &mut bytes);
            assert_eq!(bytes.len(), format.bytes_per_pixel() as usize);
            assert_eq!(format.decode(&bytes), pixel, "{format:?}");
        }
    }

    #[test]
    fn live_counts_follow_allocations() {
        let stats = ResourceStats {
            buffers_allocated: 5,
            buffers_released: 3,
            images_allocated: 2,
            images_released: 2,
            ..Default::default()
        };
        assert_eq!(stats.live_buffers(), 2);
        assert_eq!(stats.live_images(), 0);
    }
}
