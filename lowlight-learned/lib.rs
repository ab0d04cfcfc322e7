//! Learned illumination enhancement with a transparent traditional fallback.
//!
//! [`LearnedEnhancer`] loads its model lazily on first use. A load failure
//! (missing weights, corrupt file, no backend compiled in) disables the
//! learned path for the lifetime of the handle and every call is served by
//! the traditional Enhanced chain. Per-call failures fall back for that call
//! only.

pub mod backend;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod tensor;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use lowlight_core::{
    EnhanceError, EnhanceResult, Enhancer, Image, ModelConfig, PipelineConfig, Variant,
};
use image::imageops::{self, FilterType};
use lowlight_enhance::TraditionalPipeline;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

pub use backend::{default_loader, InferenceSession, SessionLoader, UnsupportedLoader};

type SessionSlot = Arc<Mutex<Box<dyn InferenceSession>>>;

enum ModelState {
    /// One session per worker slot
    Ready(Vec<SessionSlot>),
    Disabled(String),
}

/// Observable lifecycle of the model handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    Unloaded,
    Ready,
    Disabled,
}

pub struct LearnedEnhancer {
    config: ModelConfig,
    loader: Box<dyn SessionLoader>,
    fallback: TraditionalPipeline,
    state: OnceLock<ModelState>,
    learned_calls: AtomicUsize,
    fallback_calls: AtomicUsize,
}

impl LearnedEnhancer {
    /// Adapter using the compiled-in backend
    pub fn new(config: ModelConfig, pipeline: PipelineConfig) -> EnhanceResult<Self> {
        Self::with_loader(config, pipeline, default_loader())
    }

    /// Adapter with an explicit session loader. The fallback always runs the
    /// Enhanced variant of `pipeline`.
    pub fn with_loader(
        config: ModelConfig,
        pipeline: PipelineConfig,
        loader: Box<dyn SessionLoader>,
    ) -> EnhanceResult<Self> {
        config.validate()?;
        let fallback = TraditionalPipeline::new(PipelineConfig {
            variant: Variant::Enhanced,
            ..pipeline
        })?;
        Ok(Self {
            config,
            loader,
            fallback,
            state: OnceLock::new(),
            learned_calls: AtomicUsize::new(0),
            fallback_calls: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn fallback(&self) -> &TraditionalPipeline {
        &self.fallback
    }

    pub fn status(&self) -> ModelStatus {
        match self.state.get() {
            None => ModelStatus::Unloaded,
            Some(ModelState::Ready(_)) => ModelStatus::Ready,
            Some(ModelState::Disabled(_)) => ModelStatus::Disabled,
        }
    }

    /// Why the learned path is off, once it is
    pub fn disabled_reason(&self) -> Option<&str> {
        match self.state.get() {
            Some(ModelState::Disabled(reason)) => Some(reason),
            _ => None,
        }
    }

    /// Calls served by the model
    pub fn learned_calls(&self) -> usize {
        self.learned_calls.load(Ordering::Relaxed)
    }

    /// Calls served by the traditional chain
    pub fn fallback_calls(&self) -> usize {
        self.fallback_calls.load(Ordering::Relaxed)
    }

    /// Force the one-time load now instead of on the first image
    pub fn warm_up(&self) -> ModelStatus {
        self.state();
        self.status()
    }

    fn state(&self) -> &ModelState {
        self.state.get_or_init(|| self.load_sessions())
    }

    fn load_sessions(&self) -> ModelState {
        let path = &self.config.model_path;
        if !path.is_file() {
            let err = EnhanceError::model_load(path, "file not found");
            warn!(error = %err, "learned model unavailable; using traditional enhancement");
            return ModelState::Disabled(err.to_string());
        }

        let mut slots = Vec::with_capacity(self.config.sessions);
        for _ in 0..self.config.sessions {
            match self.loader.load(path) {
                Ok(session) => slots.push(Arc::new(Mutex::new(session))),
                Err(err) => {
                    warn!(error = %err, "learned model unavailable; using traditional enhancement");
                    return ModelState::Disabled(err.to_string());
                }
            }
        }

        info!(
            model = %path.display(),
            sessions = slots.len(),
            input = %format!("{}x{}", self.config.input_width, self.config.input_height),
            "learned model loaded"
        );
        ModelState::Ready(slots)
    }

    /// Learned path only. Errors instead of falling back.
    pub fn try_learned(&self, image: &Image) -> EnhanceResult<Image> {
        match self.state() {
            ModelState::Ready(slots) => self.infer(slots, image),
            ModelState::Disabled(reason) => {
                Err(EnhanceError::model_load(&self.config.model_path, reason.clone()))
            }
        }
    }

    /// Learned path when available, traditional Enhanced chain otherwise
    pub fn process(&self, image: &Image) -> EnhanceResult<Image> {
        if let ModelState::Ready(slots) = self.state() {
            match self.infer(slots, image) {
                Ok(out) => {
                    self.learned_calls.fetch_add(1, Ordering::Relaxed);
                    return Ok(out);
                }
                Err(err) => {
                    warn!(error = %err, "learned enhancement failed; falling back for this image");
                }
            }
        }

        self.fallback_calls.fetch_add(1, Ordering::Relaxed);
        self.fallback.enhanced(image)
    }

    fn infer(&self, slots: &[SessionSlot], image: &Image) -> EnhanceResult<Image> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(EnhanceError::DegenerateInput {
                reason: "empty image".to_string(),
            });
        }
        let (in_w, in_h) = (self.config.input_width, self.config.input_height);

        let resized = imageops::resize(image, in_w, in_h, FilterType::Triangle);
        let input = tensor::to_tensor(&resized);

        // Pool workers keep to their own session; outside callers share slot 0
        let index = rayon::current_thread_index().unwrap_or(0) % slots.len();
        debug!(slot = index, "running learned model");

        let output = run_session(&slots[index], input, self.config.timeout())?;
        let enhanced = tensor::from_tensor(&output, in_w, in_h)?;
        Ok(imageops::resize(&enhanced, width, height, FilterType::Triangle))
    }
}

fn run_session(
    slot: &SessionSlot,
    input: ndarray::Array4<f32>,
    timeout: Option<Duration>,
) -> EnhanceResult<ndarray::Array4<f32>> {
    let Some(timeout) = timeout else {
        return slot.lock().run(input);
    };

    // A call that timed out earlier may still hold the session. Waiting for
    // the lock here keeps at most one detached thread per slot.
    let Some(mut session) = slot.try_lock_arc_for(timeout) else {
        return Err(EnhanceError::inference(format!(
            "session still busy with a timed-out call after {} ms",
            timeout.as_millis()
        )));
    };

    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("lowlight-infer".to_string())
        .spawn(move || {
            let result = session.run(input);
            // Receiver is gone after a timeout
            let _ = tx.send(result);
        })
        .map_err(|e| EnhanceError::inference(format!("cannot spawn inference thread: {}", e)))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(EnhanceError::inference(format!(
            "inference timed out after {} ms",
            timeout.as_millis()
        ))),
        Err(RecvTimeoutError::Disconnected) => {
            Err(EnhanceError::inference("inference thread panicked"))
        }
    }
}

impl Enhancer for LearnedEnhancer {
    fn name(&self) -> &str {
        "learned"
    }

    fn enhance(&self, image: &Image) -> EnhanceResult<Image> {
        self.process(image)
    }
}
