//! wasmport ABI module
//!
//! This module defines the ABI contract between:
//! - **Host**: `wasmport-core` (the bridge runtime)
//! - **Guest**: the loaded WASM module (the application)
//!
//! ## High-level model
//! The host exposes the bridge call surface as imports under module `"env"`:
//! surface control, the consume-once asset cache, and the audio bridge. The
//! two asynchronous pipelines (asset size probe, audio buffer decode) carry a
//! guest-chosen `request_id`; their results come back through optional guest
//! callback exports on a later turn of the embedder's pump loop, never
//! synchronously inside the requesting call.
//!
//! ## Imports (guest -> host)
//! Imported from module `"env"`.
//!
//! ### ABI / lifecycle
//! - `wasmport_abi_version() -> u32`
//!
//! ### Surface
//! - `wasmport_surface_init() -> u32` — stopped -> running, focus; returns surface handle.
//! - `wasmport_set_fullscreen(enabled: u32)`
//! - `wasmport_resize(width: u32, height: u32)`
//! - `wasmport_surface_width() -> u32` / `wasmport_surface_height() -> u32`
//! - `wasmport_stop()`
//!
//! ### Assets
//! - `wasmport_asset_size_request(path_ptr: u32, path_len: u32, request_id: u32)`
//!     - Async probe; on success the bytes are cached under the path, and the
//!       byte length is delivered via `wasmport_on_asset_size`.
//! - `wasmport_asset_load(path_ptr: u32, path_len: u32, dst_ptr: u32, dst_len: u32) -> u32`
//!     - Synchronous consume-once copy into guest memory; see `load_status`.
//!
//! ### Audio
//! - `wasmport_audio_buffer_request(path_ptr: u32, path_len: u32, request_id: u32)`
//!     - Async fetch + decode; handle delivered via `wasmport_on_audio_buffer`.
//! - `wasmport_audio_buffer_play(handle: u32)`
//! - `wasmport_media_audio_create(path_ptr: u32, path_len: u32) -> u64`
//!     - Returns `(element_handle << 32) | source_node_handle`.
//!
//! ### Diagnostics
//! - `wasmport_show_error(msg_ptr: u32, msg_len: u32)`
//! - `wasmport_log(msg_ptr: u32, msg_len: u32)`
//!
//! ## Exports (host -> guest)
//! Required:
//! - `wasmport_main()` — called once after instantiation; the application's
//!   execution entry point.
//!
//! Optional completion callbacks:
//! - `wasmport_on_asset_size(request_id: u32, size: u32, err: u32)`
//! - `wasmport_on_audio_buffer(request_id: u32, handle: u32, err: u32)`
//!
//! ## ABI Stability
//! We version this ABI with a single integer. Incompatible changes bump the number.

use wasmtime::{AsContextMut, Instance, TypedFunc};

/// Current ABI version expected by the host.
///
/// Bump this only for breaking ABI changes.
pub const ABI_VERSION: u32 = 1;

/// Import module name used by the guest.
pub const IMPORT_MODULE: &str = "env";

/// Guest export names (entrypoints).
///
/// The guest must export at least `MAIN`.
pub mod guest_exports {
    /// Execution entry point, called once after instantiation (required).
    pub const MAIN: &str = "wasmport_main";
    /// Completion callback for `wasmport_asset_size_request` (optional).
    pub const ON_ASSET_SIZE: &str = "wasmport_on_asset_size";
    /// Completion callback for `wasmport_audio_buffer_request` (optional).
    pub const ON_AUDIO_BUFFER: &str = "wasmport_on_audio_buffer";
}

/// Host import names provided to the guest.
///
/// These are the string names under module [`IMPORT_MODULE`].
pub mod host_imports {
    // ABI
    pub const ABI_VERSION: &str = "wasmport_abi_version";

    // Surface
    pub const SURFACE_INIT: &str = "wasmport_surface_init";
    pub const SET_FULLSCREEN: &str = "wasmport_set_fullscreen";
    pub const RESIZE: &str = "wasmport_resize";
    pub const SURFACE_WIDTH: &str = "wasmport_surface_width";
    pub const SURFACE_HEIGHT: &str = "wasmport_surface_height";
    pub const STOP: &str = "wasmport_stop";

    // Assets
    pub const ASSET_SIZE_REQUEST: &str = "wasmport_asset_size_request";
    pub const ASSET_LOAD: &str = "wasmport_asset_load";

    // Audio
    pub const AUDIO_BUFFER_REQUEST: &str = "wasmport_audio_buffer_request";
    pub const AUDIO_BUFFER_PLAY: &str = "wasmport_audio_buffer_play";
    pub const MEDIA_AUDIO_CREATE: &str = "wasmport_media_audio_create";

    // Diagnostics
    pub const SHOW_ERROR: &str = "wasmport_show_error";
    pub const LOG: &str = "wasmport_log";
}

/// Error codes delivered through the async completion callbacks.
///
/// Keep these stable; they are part of the ABI.
pub mod err_code {
    /// No error.
    pub const NONE: u32 = 0;
    /// Resource not found at the assets root.
    pub const NOT_FOUND: u32 = 1;
    /// The fetch completed with a failure status.
    pub const STATUS: u32 = 2;
    /// I/O failure while fetching.
    pub const IO: u32 = 3;
    /// The fetch succeeded but the body was empty.
    pub const EMPTY_CONTENT: u32 = 4;
    /// Audio decode rejected the fetched bytes.
    pub const DECODE: u32 = 5;
}

/// Status codes returned by `wasmport_asset_load`.
pub mod load_status {
    /// Bytes were copied and the cache entry consumed.
    pub const OK: u32 = 0;
    /// No cache entry for the path (never probed, or already consumed).
    pub const MISS: u32 = 1;
    /// Destination buffer smaller than the cached entry; entry retained.
    pub const TOO_SMALL: u32 = 2;
    /// Guest memory access failed for the destination range.
    pub const MEM_FAULT: u32 = 3;
}

/// Helpers for validating guest exports.
pub mod validate {
    use super::guest_exports;
    use wasmtime::{AsContextMut, Instance};

    /// Validate that a guest instance exports the required entrypoints for this ABI.
    ///
    /// Currently required:
    /// - `wasmport_main`
    pub fn required_exports_present(
        instance: &Instance,
        mut store: impl AsContextMut,
    ) -> Result<(), MissingExport> {
        if instance
            .get_typed_func::<(), ()>(&mut store, guest_exports::MAIN)
            .is_err()
        {
            return Err(MissingExport::Main);
        }
        Ok(())
    }

    #[derive(Debug)]
    pub enum MissingExport {
        Main,
    }
}

/// A small view of a guest's entrypoints as typed wasmtime functions.
///
/// The host resolves these once after instantiation: `main` is called at the
/// Run stage, the callbacks whenever the pump delivers a completion.
#[derive(Clone)]
pub struct GuestEntrypoints {
    pub main: TypedFunc<(), ()>,
    pub on_asset_size: Option<TypedFunc<(u32, u32, u32), ()>>,
    pub on_audio_buffer: Option<TypedFunc<(u32, u32, u32), ()>>,
}

impl GuestEntrypoints {
    /// Resolve entrypoint exports from an instance.
    pub fn resolve(
        instance: &Instance,
        mut store: impl AsContextMut,
    ) -> Result<Self, anyhow::Error> {
        let main = instance.get_typed_func::<(), ()>(&mut store, guest_exports::MAIN)?;

        let on_asset_size = instance
            .get_typed_func::<(u32, u32, u32), ()>(&mut store, guest_exports::ON_ASSET_SIZE)
            .ok();
        let on_audio_buffer = instance
            .get_typed_func::<(u32, u32, u32), ()>(&mut store, guest_exports::ON_AUDIO_BUFFER)
            .ok();

        Ok(Self {
            main,
            on_asset_size,
            on_audio_buffer,
        })
    }
}
