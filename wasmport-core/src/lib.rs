//! wasmport-core: host-environment bridge for wasmport guest modules.
//!
//! The bridge gives a wasm guest application access to the embedding
//! environment behind a small, stable call surface:
//! - a **surface controller** owning the single visual-output element,
//! - a **consume-once asset cache** fed by asynchronous size probes,
//! - an **audio bridge** decoding fetched WAV/QOA into playable buffers,
//! - a **bootstrap loader** that fetches, compiles, instantiates, and runs
//!   the guest module,
//! - an **error sink** every component reports through.
//!
//! The embedder supplies a [`boot::Platform`] (surface backend, asset
//! fetcher, audio sink, resolved capabilities), calls [`boot::boot`], and
//! then pumps the returned [`Bridge`] from its event loop. Completions of
//! the asynchronous pipelines are delivered to the guest only from
//! [`Bridge::pump`], never from inside the requesting call.

pub mod abi;
pub mod assets;
pub mod audio;
pub mod boot;
pub mod completion;
pub mod errors;
pub mod loader;
pub mod rt;
pub mod runtime;
pub mod state;
pub mod surface;

use wasmtime::{Instance, Store};

use tokio::sync::mpsc;

use crate::abi::{err_code, GuestEntrypoints};
use crate::completion::Completion;
use crate::errors::ErrorSink;
use crate::state::BridgeState;
use crate::surface::Surface;

pub use boot::{boot, BootError, HostCaps, Platform, DEFAULT_MODULE_PATH};

/// A live, booted bridge: the instantiated guest plus the completion queue.
///
/// The embedder owns this and calls [`Bridge::pump`] from its event loop;
/// everything else happens through the guest's imports.
pub struct Bridge {
    store: Store<BridgeState>,
    instance: Instance,
    entrypoints: GuestEntrypoints,
    completions: mpsc::UnboundedReceiver<Completion>,
    errors: ErrorSink,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge").finish_non_exhaustive()
    }
}

impl Bridge {
    pub(crate) fn new(
        store: Store<BridgeState>,
        instance: Instance,
        entrypoints: GuestEntrypoints,
        completions: mpsc::UnboundedReceiver<Completion>,
        errors: ErrorSink,
    ) -> Self {
        Self {
            store,
            instance,
            entrypoints,
            completions,
            errors,
        }
    }

    /// Drain the completion queue and deliver each completion to the guest.
    ///
    /// Returns the number of completions delivered. Side effects land before
    /// the guest callback runs: probed bytes are parked in the asset cache,
    /// decoded buffers are registered with the audio registry. A guest
    /// without the matching callback export drops the completion (reported to
    /// the sink); a callback trap is reported and pumping continues.
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.deliver(completion);
            delivered += 1;
        }
        delivered
    }

    fn deliver(&mut self, completion: Completion) {
        match completion {
            Completion::AssetSize {
                request_id,
                path,
                result,
            } => {
                let (size, err) = match result {
                    Ok(bytes) => {
                        let len = bytes.len() as u32;
                        self.store.data_mut().assets.insert(path, bytes);
                        (len, err_code::NONE)
                    }
                    Err(e) => {
                        self.errors
                            .show_error(&format!("asset probe '{path}': {e}"));
                        (0, e.code())
                    }
                };
                match &self.entrypoints.on_asset_size {
                    Some(cb) => {
                        if let Err(trap) = cb.call(&mut self.store, (request_id, size, err)) {
                            self.errors.show_error(&trap);
                        }
                    }
                    None => self.errors.show_error(
                        &"asset size completion dropped: guest exports no callback",
                    ),
                }
            }
            Completion::AudioBuffer {
                request_id,
                path,
                result,
            } => {
                let (handle, err) = match result {
                    Ok(buffer) => {
                        let handle = self.store.data_mut().audio.insert_buffer(buffer);
                        (handle, err_code::NONE)
                    }
                    Err(e) => {
                        self.errors
                            .show_error(&format!("audio buffer '{path}': {e}"));
                        (0, e.code())
                    }
                };
                match &self.entrypoints.on_audio_buffer {
                    Some(cb) => {
                        if let Err(trap) = cb.call(&mut self.store, (request_id, handle, err)) {
                            self.errors.show_error(&trap);
                        }
                    }
                    None => self.errors.show_error(
                        &"audio buffer completion dropped: guest exports no callback",
                    ),
                }
            }
        }
    }

    /// The instantiated guest, for embedders that need direct export access.
    pub fn instance(&self) -> Instance {
        self.instance
    }

    pub fn surface(&self) -> &Surface {
        &self.store.data().surface
    }

    pub fn state(&self) -> &BridgeState {
        self.store.data()
    }

    pub fn state_mut(&mut self) -> &mut BridgeState {
        self.store.data_mut()
    }
}
