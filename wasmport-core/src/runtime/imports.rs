//! Host import definitions for the bridge runtime.
//!
//! This module defines all the host functions imported by guest modules
//! under the "env" module. Each import reaches the bridge state through the
//! `Caller`; the two asynchronous entry points clone the fetcher and the
//! completion sender out of it and spawn onto the shared runtime.

use std::sync::Arc;

use crate::{
    abi::{ABI_VERSION, host_imports, load_status, IMPORT_MODULE},
    assets::{self, ConsumeError, FetchError},
    audio,
    completion::Completion,
    state::BridgeState,
};

use wasmtime::{Caller, Linker, Memory};

fn guest_memory(caller: &mut Caller<'_, BridgeState>) -> Option<Memory> {
    caller.get_export("memory").and_then(|e| e.into_memory())
}

fn read_guest_bytes(caller: &mut Caller<'_, BridgeState>, ptr: u32, len: u32) -> Option<Vec<u8>> {
    let memory = guest_memory(caller)?;
    let mut buf = vec![0u8; len as usize];
    memory.read(&mut *caller, ptr as usize, &mut buf).ok()?;
    Some(buf)
}

fn read_guest_str(caller: &mut Caller<'_, BridgeState>, ptr: u32, len: u32) -> Option<String> {
    read_guest_bytes(caller, ptr, len).and_then(|b| String::from_utf8(b).ok())
}

/// An async request whose path could not be read still completes through the
/// callback channel, with an I/O error, so the guest is never left waiting.
fn send_unreadable_path(caller: &mut Caller<'_, BridgeState>, request_id: u32, audio: bool) {
    let state = caller.data_mut();
    state
        .errors
        .show_error(&"unreadable path passed to async request");
    let err = FetchError::Io("unreadable request path".into());
    let completion = if audio {
        Completion::AudioBuffer {
            request_id,
            path: String::new(),
            result: Err(err.into()),
        }
    } else {
        Completion::AssetSize {
            request_id,
            path: String::new(),
            result: Err(err),
        }
    };
    let _ = state.completions.send(completion);
}

/// Define all host imports expected by guests under module `"env"`.
///
/// Must be called before instantiating the module.
pub fn define_imports(linker: &mut Linker<BridgeState>) -> Result<(), anyhow::Error> {
    // --- ABI ---
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::ABI_VERSION,
        |_caller: Caller<'_, BridgeState>| -> u32 { ABI_VERSION },
    )?;

    // --- Surface ---
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::SURFACE_INIT,
        |mut caller: Caller<'_, BridgeState>| -> u32 { caller.data_mut().surface.init() },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::SET_FULLSCREEN,
        |mut caller: Caller<'_, BridgeState>, enabled: u32| {
            caller.data_mut().surface.set_fullscreen(enabled != 0);
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::RESIZE,
        |mut caller: Caller<'_, BridgeState>, width: u32, height: u32| {
            caller.data_mut().surface.resize(width, height);
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::SURFACE_WIDTH,
        |caller: Caller<'_, BridgeState>| -> u32 { caller.data().surface.pixel_width() },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::SURFACE_HEIGHT,
        |caller: Caller<'_, BridgeState>| -> u32 { caller.data().surface.pixel_height() },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::STOP,
        |mut caller: Caller<'_, BridgeState>| {
            caller.data_mut().surface.stop();
        },
    )?;

    // --- Assets ---
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::ASSET_SIZE_REQUEST,
        |mut caller: Caller<'_, BridgeState>, path_ptr: u32, path_len: u32, request_id: u32| {
            let Some(path) = read_guest_str(&mut caller, path_ptr, path_len) else {
                send_unreadable_path(&mut caller, request_id, false);
                return;
            };

            let state = caller.data();
            let fetcher = Arc::clone(&state.fetcher);
            let tx = state.completions.clone();
            assets::spawn_size_probe(fetcher, tx, path, request_id);
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::ASSET_LOAD,
        |mut caller: Caller<'_, BridgeState>,
         path_ptr: u32,
         path_len: u32,
         dst_ptr: u32,
         dst_len: u32|
         -> u32 {
            let Some(path) = read_guest_str(&mut caller, path_ptr, path_len) else {
                return load_status::MEM_FAULT;
            };
            let Some(memory) = guest_memory(&mut caller) else {
                return load_status::MEM_FAULT;
            };

            // Single borrow of both the linear memory and the bridge state.
            let (mem, state) = memory.data_and_store_mut(&mut caller);

            let start = dst_ptr as usize;
            let Some(end) = start.checked_add(dst_len as usize) else {
                return load_status::MEM_FAULT;
            };
            let Some(dst) = mem.get_mut(start..end) else {
                return load_status::MEM_FAULT;
            };

            match state.assets.consume_into(&path, dst) {
                Ok(_) => load_status::OK,
                Err(ConsumeError::Miss) => load_status::MISS,
                Err(e @ ConsumeError::TooSmall { .. }) => {
                    state.errors.show_error(&e);
                    load_status::TOO_SMALL
                }
            }
        },
    )?;

    // --- Audio ---
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::AUDIO_BUFFER_REQUEST,
        |mut caller: Caller<'_, BridgeState>, path_ptr: u32, path_len: u32, request_id: u32| {
            let Some(path) = read_guest_str(&mut caller, path_ptr, path_len) else {
                send_unreadable_path(&mut caller, request_id, true);
                return;
            };

            let state = caller.data();
            let fetcher = Arc::clone(&state.fetcher);
            let tx = state.completions.clone();
            audio::spawn_buffer_request(fetcher, tx, path, request_id);
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::AUDIO_BUFFER_PLAY,
        |mut caller: Caller<'_, BridgeState>, handle: u32| {
            let state = caller.data_mut();
            if !state.audio.play(handle) {
                state
                    .errors
                    .show_error(&format!("play of unknown audio buffer handle {handle}"));
            }
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::MEDIA_AUDIO_CREATE,
        |mut caller: Caller<'_, BridgeState>, path_ptr: u32, path_len: u32| -> u64 {
            let Some(path) = read_guest_str(&mut caller, path_ptr, path_len) else {
                return 0;
            };
            let (element, source_node) = caller
                .data_mut()
                .audio
                .create_media(assets::asset_url(&path));
            audio::pack_media_handles(element, source_node)
        },
    )?;

    // --- Diagnostics ---
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::SHOW_ERROR,
        |mut caller: Caller<'_, BridgeState>, msg_ptr: u32, msg_len: u32| {
            let Some(bytes) = read_guest_bytes(&mut caller, msg_ptr, msg_len) else {
                return;
            };
            let msg = String::from_utf8_lossy(&bytes).into_owned();
            caller.data().errors.show_guest_error(&msg);
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::LOG,
        |mut caller: Caller<'_, BridgeState>, msg_ptr: u32, msg_len: u32| {
            if let Some(bytes) = read_guest_bytes(&mut caller, msg_ptr, msg_len)
                && let Ok(msg) = core::str::from_utf8(&bytes)
            {
                tracing::info!(target: "wasmport::guest", "{msg}");
            }
        },
    )?;

    Ok(())
}
