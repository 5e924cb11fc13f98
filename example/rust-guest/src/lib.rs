#![no_std]

// Minimal wasmport Rust guest example.
//
// This crate is meant to be compiled to `wasm32-unknown-unknown` and loaded by `wasmport-core`.
//
// The host calls:
// - `wasmport_main()` once after instantiation.
// - `wasmport_on_asset_size(request_id, size, err)` when a size probe completes.
// - `wasmport_on_audio_buffer(request_id, handle, err)` when an audio decode completes.
//
// Both callbacks fire on later turns of the host's pump loop, never inside
// the requesting call.

use wasmport_sdk::prelude::*;

const LEVEL_PATH: &str = "level1.bin";
const JUMP_PATH: &str = "jump.wav";
const MUSIC_PATH: &str = "music.ogg";

const REQ_LEVEL: u32 = 1;
const REQ_JUMP: u32 = 2;

// Fixed staging buffer for the level: this guest carries no allocator.
const LEVEL_MAX: usize = 64 * 1024;
static mut LEVEL_BYTES: [u8; LEVEL_MAX] = [0; LEVEL_MAX];
static mut LEVEL_LEN: usize = 0;
static mut JUMP_HANDLE: u32 = 0;

#[unsafe(no_mangle)]
pub extern "C" fn wasmport_main() {
    surface::init();
    surface::resize(320, 240);

    // Kick off both async pipelines; results arrive in the callbacks below.
    assets::size_request(LEVEL_PATH, REQ_LEVEL);
    audio::buffer_request(JUMP_PATH, REQ_JUMP);

    // Long-form audio goes through a media element instead of a decoded buffer.
    let music = audio::media_create(MUSIC_PATH);
    if !music.is_valid() {
        system::show_error("could not create music element");
    }

    system::log("guest started");
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmport_on_asset_size(request_id: u32, size: u32, err: u32) {
    if request_id != REQ_LEVEL {
        return;
    }
    if !ErrCode::from_raw(err).is_ok() {
        system::show_error("level fetch failed");
        return;
    }

    let size = size as usize;
    if size > LEVEL_MAX {
        system::show_error("level larger than staging buffer");
        return;
    }

    // The probe parked the bytes host-side; this copies and consumes them.
    let dst = unsafe { core::slice::from_raw_parts_mut((&raw mut LEVEL_BYTES) as *mut u8, size) };
    match assets::load(LEVEL_PATH, dst) {
        LoadStatus::Ok => {
            unsafe { LEVEL_LEN = size };
            system::log("level loaded");
        }
        _ => system::show_error("level load failed"),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn wasmport_on_audio_buffer(request_id: u32, handle: u32, err: u32) {
    if request_id != REQ_JUMP {
        return;
    }
    if !ErrCode::from_raw(err).is_ok() {
        system::show_error("jump sound decode failed");
        return;
    }

    unsafe { JUMP_HANDLE = handle };
    // Legal now that the handle exists; a real game would play on input.
    audio::buffer_play(handle);
}
