//! Bootstrap loader: capability resolution, module fetch, compile,
//! instantiate, run.
//!
//! Boot is a strict stage pipeline. Any stage failing aborts the boot, the
//! failure is reported through the error sink, and the error names the stage
//! that failed. There is no retry.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    assets::{AssetCache, AssetFetcher, FetchError},
    audio::{AudioRegistry, AudioSink},
    errors::ErrorSink,
    loader::{self, LoadError},
    runtime::BridgeRuntime,
    state::BridgeState,
    surface::{Surface, SurfaceBackend},
    Bridge,
};

/// Module path used when the embedder does not name one, relative to the
/// fetcher root (not the assets root).
pub const DEFAULT_MODULE_PATH: &str = "main.wasm";

/// Host capabilities, resolved once by the embedding layer before boot.
///
/// Nothing is re-probed mid-run; a capability observed at boot holds for the
/// lifetime of the bridge.
#[derive(Debug, Clone, Copy)]
pub struct HostCaps {
    /// Compile the module from a chunked fetch when the fetcher can stream.
    pub streaming_instantiation: bool,
}

impl Default for HostCaps {
    fn default() -> Self {
        Self {
            streaming_instantiation: true,
        }
    }
}

/// Everything the embedding layer provides: the surface backend, the asset
/// fetcher, the audio output sink, and the resolved capabilities.
pub struct Platform {
    /// `None` means the embedding has no visual surface; boot refuses it.
    pub surface: Option<Box<dyn SurfaceBackend>>,
    pub fetcher: Arc<dyn AssetFetcher>,
    pub audio_sink: Box<dyn AudioSink>,
    pub caps: HostCaps,
}

/// A boot stage failure. The variant names the stage.
#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error("no surface backend available")]
    SurfaceMissing,
    #[error("module fetch failed: {0}")]
    ModuleFetch(#[from] FetchError),
    #[error("module load failed: {0}")]
    ModuleLoad(#[from] LoadError),
    #[error("instantiation failed: {0}")]
    Instantiate(#[source] anyhow::Error),
    #[error("guest entry point failed: {0}")]
    Run(#[source] anyhow::Error),
}

/// Boot the bridge: resolve the platform, fetch and compile the module at
/// `module_path`, instantiate it against the host imports, and run the
/// guest's entry point. On success the returned [`Bridge`] is live and ready
/// to be pumped.
pub fn boot(platform: Platform, module_path: &str) -> Result<Bridge, BootError> {
    let errors = ErrorSink::default();
    let result = boot_stages(platform, module_path, errors.clone());
    if let Err(e) = &result {
        errors.show_error(e);
    }
    result
}

fn boot_stages(
    platform: Platform,
    module_path: &str,
    errors: ErrorSink,
) -> Result<Bridge, BootError> {
    let Platform {
        surface,
        fetcher,
        audio_sink,
        caps,
    } = platform;
    let backend = surface.ok_or(BootError::SurfaceMissing)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let state = BridgeState {
        surface: Surface::new(backend),
        assets: AssetCache::default(),
        audio: AudioRegistry::new(audio_sink),
        fetcher: Arc::clone(&fetcher),
        completions: tx,
        errors: errors.clone(),
    };

    let mut runtime = BridgeRuntime::new(state).map_err(BootError::Instantiate)?;
    runtime.define_imports().map_err(BootError::Instantiate)?;

    let bytes = fetch_module(fetcher.as_ref(), &caps, module_path)?;
    tracing::info!(
        target: "wasmport",
        path = module_path,
        len = bytes.len(),
        "module fetched"
    );

    let module = loader::compile_module(&runtime.engine, &bytes)?;
    let (instance, entrypoints) = runtime.instantiate(&module).map_err(BootError::Instantiate)?;
    tracing::info!(target: "wasmport", "module instantiated");

    entrypoints
        .main
        .call(&mut runtime.store, ())
        .map_err(BootError::Run)?;
    tracing::info!(target: "wasmport", "guest entry point returned");

    Ok(Bridge::new(runtime.store, instance, entrypoints, rx, errors))
}

/// Fetch the module bytes: chunked when both the capability and the fetcher
/// allow it, whole-buffer otherwise. Either path applies the empty-body rule.
fn fetch_module(
    fetcher: &dyn AssetFetcher,
    caps: &HostCaps,
    path: &str,
) -> Result<Vec<u8>, FetchError> {
    if caps.streaming_instantiation
        && fetcher.supports_streaming()
        && let Some(mut rx) = fetcher.fetch_chunked(path)
    {
        tracing::debug!(target: "wasmport", path, "streaming module fetch");
        return crate::rt::block_on(async move {
            let mut bytes = Vec::new();
            while let Some(chunk) = rx.recv().await {
                bytes.extend_from_slice(&chunk?);
            }
            if bytes.is_empty() {
                return Err(FetchError::EmptyContent);
            }
            Ok(bytes)
        });
    }

    tracing::debug!(target: "wasmport", path, "whole-buffer module fetch");
    let bytes = crate::rt::block_on(fetcher.fetch(path))?;
    if bytes.is_empty() {
        return Err(FetchError::EmptyContent);
    }
    Ok(bytes)
}
