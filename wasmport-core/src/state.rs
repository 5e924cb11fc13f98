//! Bridge-side shared state.
//!
//! All mutable bridge state lives here and is carried as the wasmtime
//! `Store` data, so host imports reach it through `Caller::data_mut` and
//! nothing is process-global. Constructed once at boot, torn down never in
//! this scope.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::assets::{AssetCache, AssetFetcher};
use crate::audio::AudioRegistry;
use crate::completion::Completion;
use crate::errors::ErrorSink;
use crate::surface::Surface;

pub struct BridgeState {
    /// Surface Controller state plus its platform backend.
    pub surface: Surface,

    /// Path -> bytes, populated by size probes, drained by consume-once loads.
    pub assets: AssetCache,

    /// Decoded audio buffers, media elements, and the output sink.
    pub audio: AudioRegistry,

    /// Retrieval seam resolved once by the embedding layer.
    pub fetcher: Arc<dyn AssetFetcher>,

    /// Producer side of the completion queue; tasks on the shared runtime
    /// send here, `Bridge::pump` drains the receiver.
    pub completions: mpsc::UnboundedSender<Completion>,

    /// The single reporting funnel.
    pub errors: ErrorSink,
}
