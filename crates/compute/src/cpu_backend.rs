//! Reference backend that runs kernels on the calling thread.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::kernels::{self, raymarch::ImageView};
use crate::layout::{names, FrameBlock, ShapeRecord};
use crate::{
    reflect, BufferHandle, BufferView, ComputeBackend, ComputeError, ImageDesc, ImageFormat,
    ImageHandle, Kernel, KernelParams, ResourceStats,
};

struct CpuImage {
    desc: ImageDesc,
    pixels: Vec<[f32; 4]>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    buffers: HashMap<u64, Vec<u8>>,
    images: HashMap<u64, CpuImage>,
    stats: ResourceStats,
}

impl State {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn image(&self, handle: ImageHandle) -> Result<&CpuImage, ComputeError> {
        self.images.get(&handle.0).ok_or(ComputeError::UnknownImage(handle))
    }
}

#[derive(Default)]
pub struct CpuBackend {
    state: Mutex<State>,
}

impl CpuBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn dispatch_raymarch(&self, params: &KernelParams, groups: [u32; 3]) -> Result<(), ComputeError> {
        let frame = FrameBlock::from_params(params)?;
        let source = params.image(names::SOURCE)?;
        let destination = params.image(names::DESTINATION)?;
        let shapes = params.buffer(names::SHAPES)?;
        let group_size = reflect::workgroup_size(&Kernel::Raymarch)?;

        let mut state = self.state.lock();
        let records = ShapeRecord::decode_all(
            state.buffers.get(&shapes.0).ok_or(ComputeError::UnknownBuffer(shapes))?,
        )?;

        let dest_desc = state.image(destination)?.desc;
        if !dest_desc.random_write {
            return Err(ComputeError::NotWritable(destination));
        }
        if dest_desc.format != ImageFormat::Rgba32Float {
            return Err(ComputeError::FormatMismatch { expected: ImageFormat::Rgba32Float, actual: dest_desc.format });
        }

        let src = state.image(source)?;
        if src.desc.size() != dest_desc.size() {
            return Err(ComputeError::ImageSizeMismatch { expected: dest_desc.size(), actual: src.desc.size() });
        }
        let view = ImageView { pixels: &src.pixels, width: src.desc.width, height: src.desc.height };
        let mut output = state.image(destination)?.pixels.clone();
        kernels::handle_raymarch(&frame, &records, view, &mut output, dest_desc.size(), groups, group_size);

        if let Some(dest) = state.images.get_mut(&destination.0) {
            dest.pixels = output;
        }
        state.stats.dispatches += 1;
        tracing::trace!("raymarch over {} shapes, groups {groups:?}", records.len());
        Ok(())
    }
}

impl ComputeBackend for CpuBackend {
    fn kernel_thread_group_size(&self, kernel: &Kernel) -> Result<[u32; 3], ComputeError> {
        reflect::workgroup_size(kernel)
    }

    fn create_buffer(&self, label: &str, view: &BufferView<'_>) -> Result<BufferHandle, ComputeError> {
        view.validate()?;
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.buffers.insert(id, view.data.to_vec());
        state.stats.buffers_allocated += 1;
        state.stats.bytes_uploaded += view.data.len() as u64;
        tracing::trace!("buffer `{label}` #{id}: {} elements", view.element_count());
        Ok(BufferHandle(id))
    }

    fn release_buffer(&self, buffer: BufferHandle) {
        let mut state = self.state.lock();
        if state.buffers.remove(&buffer.0).is_some() {
            state.stats.buffers_released += 1;
        } else {
            tracing::warn!("release of unknown buffer {buffer:?}");
        }
    }

    fn create_image(&self, label: &str, desc: ImageDesc) -> Result<ImageHandle, ComputeError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(ComputeError::Allocation(format!("image `{label}` has zero area")));
        }
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.images.insert(id, CpuImage { desc, pixels: vec![[0.0; 4]; desc.pixel_count()] });
        state.stats.images_allocated += 1;
        tracing::debug!("image `{label}` #{id}: {}x{} {:?}", desc.width, desc.height, desc.format);
        Ok(ImageHandle(id))
    }

    fn write_image(&self, image: ImageHandle, pixels: &[[f32; 4]]) -> Result<(), ComputeError> {
        let mut state = self.state.lock();
        let target = state.images.get_mut(&image.0).ok_or(ComputeError::UnknownImage(image))?;
        if pixels.len() != target.desc.pixel_count() {
            return Err(ComputeError::ShapeMismatch("pixel count does not match image size"));
        }
        let format = target.desc.format;
        target.pixels.iter_mut().zip(pixels).for_each(|(dst, src)| *dst = format.quantize(*src));
        Ok(())
    }

    fn read_image(&self, image: ImageHandle) -> Result<Vec<[f32; 4]>, ComputeError> {
        Ok(self.state.lock().image(image)?.pixels.clone())
    }

    fn release_image(&self, image: ImageHandle) {
        let mut state = self.state.lock();
        if state.images.remove(&image.0).is_some() {
            state.stats.images_released += 1;
        } else {
            tracing::warn!("release of unknown image {image:?}");
        }
    }

    fn image_desc(&self, image: ImageHandle) -> Result<ImageDesc, ComputeError> {
        Ok(self.state.lock().image(image)?.desc)
    }

    fn dispatch(&self, kernel: &Kernel, params: &KernelParams, groups: [u32; 3]) -> Result<(), ComputeError> {
        match kernel {
            Kernel::Raymarch => self.dispatch_raymarch(params, groups),
        }
    }

    fn blit(&self, source: ImageHandle, destination: ImageHandle) -> Result<(), ComputeError> {
        if source == destination {
            return Err(ComputeError::SameImage(source));
        }
        let mut state = self.state.lock();
        let src = state.image(source)?;
        let dst_desc = state.image(destination)?.desc;
        let (sw, sh) = src.desc.size();
        let (dw, dh) = dst_desc.size();

        // sample at destination pixel centres, like the fragment shader
        let mut resampled = Vec::with_capacity(dst_desc.pixel_count());
        for y in 0..dh {
            let sy = ((2 * u64::from(y) + 1) * u64::from(sh) / (2 * u64::from(dh))) as u32;
            for x in 0..dw {
                let sx = ((2 * u64::from(x) + 1) * u64::from(sw) / (2 * u64::from(dw))) as u32;
                let pixel = src.pixels[(sy * sw + sx) as usize];
                resampled.push(dst_desc.format.quantize(pixel));
            }
        }

        if let Some(dst) = state.images.get_mut(&destination.0) {
            dst.pixels = resampled;
        }
        state.stats.blits += 1;
        Ok(())
    }

    fn stats(&self) -> ResourceStats {
        self.state.lock().stats
    }
}
