mod config;
mod error;

pub use config::{ModelConfig, PipelineConfig, Variant};
pub use error::{EnhanceError, EnhanceResult};

/// Row-major 8-bit RGB image
pub type Image = image::RgbImage;

/// Single 8-bit plane (luminance, chroma or saturation)
pub type Channel = image::GrayImage;

/// Anything that turns one image into another image of the same size.
///
/// Implementors must be stateless across calls (or synchronise internally),
/// borrow the input immutably and return a freshly allocated image.
pub trait Enhancer: Send + Sync {
    /// Short name used in logs and reports
    fn name(&self) -> &str;

    fn enhance(&self, image: &Image) -> EnhanceResult<Image>;
}

/// Build a bounded Rayon pool for batch work
pub fn build_worker_pool(
    n_threads: usize,
) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads.max(1))
        .thread_name(|i| format!("lowlight-worker-{}", i))
        .build()
}

/// Default worker count: one per logical CPU
pub fn default_worker_count() -> usize {
    num_cpus::get().max(1)
}
