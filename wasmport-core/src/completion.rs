//! Results of the asynchronous pipelines, queued until the embedder pumps.
//!
//! Tasks on the shared runtime send these over an unbounded channel; the
//! bridge drains them in `Bridge::pump` and invokes the guest callbacks
//! there. Completions for independent requests arrive in whatever order
//! their underlying fetches finish.

use crate::assets::FetchResult;
use crate::audio::{AudioError, PcmBuffer};

pub enum Completion {
    /// Size probe finished; on success the bytes are parked in the cache
    /// before the guest callback sees the length.
    AssetSize {
        request_id: u32,
        path: String,
        result: FetchResult,
    },
    /// Audio fetch + decode finished; on success the buffer is registered
    /// before the guest callback sees the handle.
    AudioBuffer {
        request_id: u32,
        path: String,
        result: Result<PcmBuffer, AudioError>,
    },
}
