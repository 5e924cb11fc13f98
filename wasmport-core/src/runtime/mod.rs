//! Wasmtime-backed runtime glue for wasmport-core.
//!
//! Responsibilities:
//! - Create a Wasmtime `Engine`/`Store` carrying the bridge state.
//! - Define host imports under module `"env"` matching the guest ABI.
//! - Instantiate a compiled `wasmtime::Module`.
//! - Validate and resolve the guest entrypoints.
//!
//! Entrypoint resolution (`wasmport_main` + optional completion callbacks)
//! lives in `crate::abi::GuestEntrypoints::resolve`.

pub mod imports;
pub mod runtime;

pub use runtime::BridgeRuntime;
