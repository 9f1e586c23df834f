// ONNX Runtime session construction and pooling for the detection models

use anyhow::{Context, Result};
use crossbeam::channel::{bounded, Receiver, Sender};
use ort::execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::core::config::InferenceBackend;

#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;

#[cfg(feature = "tensorrt")]
use ort::execution_providers::TensorRTExecutionProvider;

#[cfg(feature = "coreml")]
use ort::execution_providers::CoreMLExecutionProvider;

#[cfg(feature = "directml")]
use ort::execution_providers::DirectMLExecutionProvider;

#[cfg(feature = "openvino")]
use ort::execution_providers::OpenVINOExecutionProvider;

/// Intra-op thread count for one session.
///
/// Several sessions run side by side in the pool, so each one gets a
/// share of the cores rather than all of them.
fn intra_op_threads(pool_size: usize) -> usize {
    let cores = num_cpus::get();
    let threads = (cores / pool_size.max(1)).max(1);

    #[cfg(target_os = "windows")]
    let threads = threads.min(6);

    debug!("{} cores, {} sessions per model → {} intra-op threads", cores, pool_size, threads);
    threads
}

/// Providers compiled into this build, in preference order
fn accelerated_providers() -> Vec<(&'static str, ExecutionProviderDispatch)> {
    #[allow(unused_mut)]
    let mut providers = Vec::new();

    #[cfg(feature = "tensorrt")]
    providers.push(("TensorRT", TensorRTExecutionProvider::default().build()));

    #[cfg(feature = "cuda")]
    providers.push(("CUDA", CUDAExecutionProvider::default().build()));

    #[cfg(feature = "coreml")]
    providers.push(("CoreML", CoreMLExecutionProvider::default().build()));

    #[cfg(feature = "directml")]
    providers.push(("DirectML", DirectMLExecutionProvider::default().build()));

    #[cfg(feature = "openvino")]
    providers.push((
        "OpenVINO",
        OpenVINOExecutionProvider::default().with_device_type("CPU").build(),
    ));

    providers
}

/// Execution providers to register for `backend`, plus a name for logging.
///
/// `Auto` registers every compiled-in provider ahead of the CPU so ONNX
/// Runtime falls through to the first one that initialises. A forced
/// backend must be compiled in and must initialise.
fn execution_providers(
    backend: InferenceBackend,
) -> Result<(String, Vec<ExecutionProviderDispatch>)> {
    let wanted = match backend {
        InferenceBackend::Auto => {
            let accelerated = accelerated_providers();
            let mut names: Vec<&str> = accelerated.iter().map(|(name, _)| *name).collect();
            names.push("CPU");

            let mut providers: Vec<_> = accelerated.into_iter().map(|(_, ep)| ep).collect();
            providers.push(CPUExecutionProvider::default().build());
            return Ok((names.join(" → "), providers));
        }
        InferenceBackend::Cpu => {
            return Ok((
                "CPU".to_string(),
                vec![CPUExecutionProvider::default().build().error_on_failure()],
            ));
        }
        InferenceBackend::Cuda => ("CUDA", "cuda"),
        InferenceBackend::TensorRt => ("TensorRT", "tensorrt"),
        InferenceBackend::CoreMl => ("CoreML", "coreml"),
        InferenceBackend::DirectMl => ("DirectML", "directml"),
        InferenceBackend::OpenVino => ("OpenVINO", "openvino"),
    };

    let (name, feature) = wanted;
    accelerated_providers()
        .into_iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(name, ep)| (format!("{} (forced)", name), vec![ep.error_on_failure()]))
        .with_context(|| {
            format!(
                "{} backend not available. Rebuild with: cargo build --features {}",
                name, feature
            )
        })
}

/// Build one ONNX Runtime session for the model at `model_path`.
///
/// Returns the provider description alongside the session.
pub fn build_session(
    model_path: &Path,
    model_name: &str,
    backend: InferenceBackend,
    pool_size: usize,
) -> Result<(String, Session)> {
    let (provider_name, providers) = execution_providers(backend)?;

    let session = Session::builder()
        .context(format!("Failed to create ONNX session builder for {}", model_name))?
        .with_execution_providers(providers)
        .context(format!("Failed to configure {} for {}", provider_name, model_name))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set graph optimization level")?
        .with_intra_threads(intra_op_threads(pool_size))
        .context("Failed to configure intra-op threads")?
        .with_inter_threads(1)
        .context("Failed to configure inter-op threads")?
        .commit_from_file(model_path)
        .with_context(|| {
            format!(
                "Failed to load {} ONNX model from {}. \
                Check that the file is an ONNX export and matches this ONNX Runtime version",
                model_name,
                model_path.display()
            )
        })?;

    Ok((provider_name, session))
}

/// Fixed-size pool of sessions for one model.
///
/// `Session::run` needs exclusive access, so concurrent requests each
/// check out their own session and hand it back when done.
pub struct OnnxSessionPool {
    sender: Sender<Session>,
    receiver: Receiver<Session>,
    capacity: usize,
}

impl OnnxSessionPool {
    /// Build `size` sessions for the model at `model_path`
    pub fn build(
        model_path: &Path,
        model_name: &str,
        backend: InferenceBackend,
        size: usize,
    ) -> Result<(String, Self)> {
        let size = size.max(1);
        let (sender, receiver) = bounded(size);
        let mut provider_name = String::new();

        for i in 0..size {
            debug!("Creating {} session {} of {}", model_name, i + 1, size);
            let (name, session) = build_session(model_path, model_name, backend, size)?;
            provider_name = name;
            sender
                .send(session)
                .context("Session pool closed during construction")?;
        }

        if provider_name == "CPU" && backend == InferenceBackend::Auto {
            warn!("⚠️  Using CPU-only inference for {} (no GPU acceleration compiled in)", model_name);
        }

        info!("✓ {}: {} ({} sessions)", model_name, provider_name, size);

        Ok((
            provider_name,
            Self {
                sender,
                receiver,
                capacity: size,
            },
        ))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check out a session, blocking until one is free.
    /// Returns `None` only if the pool has been torn down.
    pub fn acquire(&self) -> Option<PooledSession<'_>> {
        self.receiver.recv().ok().map(|session| PooledSession {
            session: Some(session),
            pool: self,
        })
    }
}

/// Session checked out of an [`OnnxSessionPool`]; returned on drop
pub struct PooledSession<'a> {
    session: Option<Session>,
    pool: &'a OnnxSessionPool,
}

impl Deref for PooledSession<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session.as_ref().expect("session present until drop")
    }
}

impl DerefMut for PooledSession<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        self.session.as_mut().expect("session present until drop")
    }
}

impl Drop for PooledSession<'_> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            // Capacity matches the number of sessions, so this never blocks
            let _ = self.pool.sender.send(session);
        }
    }
}
