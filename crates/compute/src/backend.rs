use crate::{
    BufferHandle, BufferView, ComputeError, ImageDesc, ImageHandle, Kernel, KernelParams,
    ResourceStats,
};

/// The compute-dispatch runtime a renderer drives once per frame.
///
/// Work submitted through one backend executes in submission order, so a
/// blit issued after a dispatch observes the dispatch's writes without the
/// host waiting in between.
pub trait ComputeBackend: Send + Sync + 'static {
    /// Thread-group size the kernel declares, in invocations per axis.
    fn kernel_thread_group_size(&self, kernel: &Kernel) -> Result<[u32; 3], ComputeError>;

    /// Allocates a read-only storage buffer holding exactly `view.data`.
    ///
    /// Zero-length views are valid and produce a logically empty buffer.
    fn create_buffer(&self, label: &str, view: &BufferView<'_>) -> Result<BufferHandle, ComputeError>;

    fn release_buffer(&self, buffer: BufferHandle);

    fn create_image(&self, label: &str, desc: ImageDesc) -> Result<ImageHandle, ComputeError>;

    /// Replaces the full contents of `image` with `pixels`, row 0 at the top.
    fn write_image(&self, image: ImageHandle, pixels: &[[f32; 4]]) -> Result<(), ComputeError>;

    /// Reads the full contents of `image` back to the host. Blocks until all
    /// previously submitted work has finished.
    fn read_image(&self, image: ImageHandle) -> Result<Vec<[f32; 4]>, ComputeError>;

    fn release_image(&self, image: ImageHandle);

    fn image_desc(&self, image: ImageHandle) -> Result<ImageDesc, ComputeError>;

    /// Dispatches `kernel` over `groups` thread groups with named parameters.
    ///
    /// Returns once the work is queued.
    ///
    /// # Errors
    ///
    /// Returns `ComputeError::MissingParam` or `ComputeError::ParamType` for an
    /// incomplete parameter set, and `ComputeError::UnknownBuffer` or
    /// `ComputeError::UnknownImage` for handles this backend does not own.
    fn dispatch(&self, kernel: &Kernel, params: &KernelParams, groups: [u32; 3]) -> Result<(), ComputeError>;

    /// Copies `source` onto `destination`, resampling to the destination size
    /// and converting to its format. `source` and `destination` must be
    /// different images.
    fn blit(&self, source: ImageHandle, destination: ImageHandle) -> Result<(), ComputeError>;

    fn stats(&self) -> ResourceStats;
}
