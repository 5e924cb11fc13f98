#![cfg_attr(not(feature = "std"), no_std)]

//! wasmport-sdk (handwritten)
//!
//! This crate is used by **guest** WASM apps that run under the wasmport
//! bridge.
//!
//! ABI model:
//! - Host owns the surface, the asset store, and the audio output.
//! - Guest exports `wasmport_main` plus optional completion callbacks
//!   (`wasmport_on_asset_size`, `wasmport_on_audio_buffer`).
//! - Asynchronous requests carry a guest-chosen `request_id`; the matching
//!   callback fires on a later turn of the host's pump loop, never inside
//!   the requesting call.
//!
//! This file intentionally contains **no WIT** and **no codegen**.

/// Status returned by [`assets::load`].
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LoadStatus {
    /// Bytes were copied and the cache entry consumed.
    Ok = 0,
    /// No cache entry for the path (never probed, or already consumed).
    Miss = 1,
    /// Destination buffer smaller than the cached entry; entry retained.
    TooSmall = 2,
    /// The destination range was not valid guest memory.
    MemFault = 3,
}

impl LoadStatus {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => LoadStatus::Ok,
            1 => LoadStatus::Miss,
            2 => LoadStatus::TooSmall,
            _ => LoadStatus::MemFault,
        }
    }
}

/// Error code delivered through the completion callbacks.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrCode {
    None = 0,
    NotFound = 1,
    Status = 2,
    Io = 3,
    EmptyContent = 4,
    Decode = 5,
}

impl ErrCode {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => ErrCode::None,
            1 => ErrCode::NotFound,
            2 => ErrCode::Status,
            4 => ErrCode::EmptyContent,
            5 => ErrCode::Decode,
            _ => ErrCode::Io,
        }
    }

    pub fn is_ok(self) -> bool {
        self == ErrCode::None
    }
}

/// The two handles backing a media-audio element, unpacked from the host's
/// `u64` return value.
#[repr(C)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MediaHandles {
    pub element: u32,
    pub source_node: u32,
}

impl MediaHandles {
    pub fn from_packed(packed: u64) -> Self {
        Self {
            element: (packed >> 32) as u32,
            source_node: (packed & 0xFFFF_FFFF) as u32,
        }
    }

    /// The host returns zero handles when the path could not be read.
    pub fn is_valid(self) -> bool {
        self.element != 0
    }
}

/// Low-level raw ABI imports.
pub mod sys {
    unsafe extern "C" {
        // ABI
        #[link_name = "wasmport_abi_version"]
        pub fn abi_version() -> u32;

        // Surface
        #[link_name = "wasmport_surface_init"]
        pub fn surface_init() -> u32;
        #[link_name = "wasmport_set_fullscreen"]
        pub fn set_fullscreen(enabled: u32);
        #[link_name = "wasmport_resize"]
        pub fn resize(width: u32, height: u32);
        #[link_name = "wasmport_surface_width"]
        pub fn surface_width() -> u32;
        #[link_name = "wasmport_surface_height"]
        pub fn surface_height() -> u32;
        #[link_name = "wasmport_stop"]
        pub fn stop();

        // Assets
        #[link_name = "wasmport_asset_size_request"]
        pub fn asset_size_request(path_ptr: u32, path_len: u32, request_id: u32);
        #[link_name = "wasmport_asset_load"]
        pub fn asset_load(path_ptr: u32, path_len: u32, dst_ptr: u32, dst_len: u32) -> u32;

        // Audio
        #[link_name = "wasmport_audio_buffer_request"]
        pub fn audio_buffer_request(path_ptr: u32, path_len: u32, request_id: u32);
        #[link_name = "wasmport_audio_buffer_play"]
        pub fn audio_buffer_play(handle: u32);
        #[link_name = "wasmport_media_audio_create"]
        pub fn media_audio_create(path_ptr: u32, path_len: u32) -> u64;

        // Diagnostics
        #[link_name = "wasmport_show_error"]
        pub fn show_error(msg_ptr: u32, msg_len: u32);
        #[link_name = "wasmport_log"]
        pub fn log(msg_ptr: u32, msg_len: u32);
    }
}

/// Surface API.
pub mod surface {
    use super::sys;

    /// Start the surface (stopped -> running) and take input focus.
    /// Returns the surface handle.
    pub fn init() -> u32 {
        unsafe { sys::surface_init() }
    }

    /// Enter or leave fullscreen. The backing pixel size is recomputed from
    /// the rendered box either way.
    pub fn set_fullscreen(enabled: bool) {
        unsafe { sys::set_fullscreen(enabled as u32) }
    }

    /// Request an explicit surface size in pixels. Ignored while fullscreen.
    pub fn resize(width: u32, height: u32) {
        unsafe { sys::resize(width, height) }
    }

    /// Current backing pixel-buffer width.
    pub fn width() -> u32 {
        unsafe { sys::surface_width() }
    }

    /// Current backing pixel-buffer height.
    pub fn height() -> u32 {
        unsafe { sys::surface_height() }
    }

    /// Stop the surface (running -> stopped).
    pub fn stop() {
        unsafe { sys::stop() }
    }
}

/// Asset API: async size probe + consume-once load.
pub mod assets {
    use super::{LoadStatus, sys};

    /// Ask the host to fetch `path` (relative to the assets root) and report
    /// its byte length through `wasmport_on_asset_size` with `request_id`.
    /// On success the bytes are cached host-side until [`load`] consumes them.
    pub fn size_request(path: &str, request_id: u32) {
        unsafe { sys::asset_size_request(path.as_ptr() as u32, path.len() as u32, request_id) }
    }

    /// Copy the cached entry for `path` into `dst` and consume it.
    ///
    /// Call only after the size callback reported success; size `dst`
    /// accordingly. A second load without a new probe reports
    /// [`LoadStatus::Miss`].
    pub fn load(path: &str, dst: &mut [u8]) -> LoadStatus {
        let raw = unsafe {
            sys::asset_load(
                path.as_ptr() as u32,
                path.len() as u32,
                dst.as_mut_ptr() as u32,
                dst.len() as u32,
            )
        };
        LoadStatus::from_raw(raw)
    }
}

/// Audio API.
pub mod audio {
    use super::{MediaHandles, sys};

    /// Ask the host to fetch and decode `path` (WAV or QOA, relative to the
    /// assets root). The buffer handle arrives through
    /// `wasmport_on_audio_buffer` with `request_id`.
    pub fn buffer_request(path: &str, request_id: u32) {
        unsafe { sys::audio_buffer_request(path.as_ptr() as u32, path.len() as u32, request_id) }
    }

    /// Play a decoded buffer by handle. Unknown handles are reported on the
    /// host side and otherwise ignored.
    pub fn buffer_play(handle: u32) {
        unsafe { sys::audio_buffer_play(handle) }
    }

    /// Create a media-audio element for long-form audio at `path` (relative
    /// to the assets root). Creation is eager; nothing is fetched until the
    /// element is played.
    pub fn media_create(path: &str) -> MediaHandles {
        let packed = unsafe { sys::media_audio_create(path.as_ptr() as u32, path.len() as u32) };
        MediaHandles::from_packed(packed)
    }
}

/// System API.
pub mod system {
    use super::sys;

    /// ABI version implemented by the host.
    pub fn abi_version() -> u32 {
        unsafe { sys::abi_version() }
    }

    /// Report an application error to the host's error sink.
    pub fn show_error(message: &str) {
        unsafe { sys::show_error(message.as_ptr() as u32, message.len() as u32) }
    }

    /// Log a message to the host console.
    pub fn log(message: &str) {
        unsafe { sys::log(message.as_ptr() as u32, message.len() as u32) }
    }
}

/// Convenience prelude for guest apps.
pub mod prelude {
    pub use crate::ErrCode;
    pub use crate::LoadStatus;
    pub use crate::MediaHandles;
    pub use crate::assets;
    pub use crate::audio;
    pub use crate::surface;
    pub use crate::system;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_status_round_trips_known_values() {
        assert_eq!(LoadStatus::from_raw(0), LoadStatus::Ok);
        assert_eq!(LoadStatus::from_raw(1), LoadStatus::Miss);
        assert_eq!(LoadStatus::from_raw(2), LoadStatus::TooSmall);
        assert_eq!(LoadStatus::from_raw(3), LoadStatus::MemFault);
    }

    #[test]
    fn media_handles_unpack() {
        let handles = MediaHandles::from_packed((5u64 << 32) | 6);
        assert_eq!(handles.element, 5);
        assert_eq!(handles.source_node, 6);
        assert!(handles.is_valid());
        assert!(!MediaHandles::from_packed(0).is_valid());
    }
}
