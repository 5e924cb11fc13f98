//! The error sink: the single reporting funnel for bridge failures.
//!
//! Every component routes its failures here. Reporting is terminal — it never
//! panics, never returns a value, and has no further effect on bridge state.
//! The diagnostic channel is `tracing`; embedders choose the subscriber.

use std::fmt::Display;

/// Diagnostic funnel shared by all bridge components.
///
/// Constructed once at boot and carried inside the bridge state; there is no
/// user-facing error UI, only the diagnostic channel.
#[derive(Debug, Default, Clone)]
pub struct ErrorSink;

impl ErrorSink {
    /// Report an error to the diagnostic channel.
    pub fn show_error(&self, err: &dyn Display) {
        tracing::error!(target: "wasmport", %err, "bridge error");
    }

    /// Report an error raised by the guest itself (`wasmport_show_error`).
    pub fn show_guest_error(&self, msg: &str) {
        tracing::error!(target: "wasmport", guest = true, "{msg}");
    }
}
