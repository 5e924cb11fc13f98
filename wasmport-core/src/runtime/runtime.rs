//! Engine/Store/Linker construction and instantiation.

use crate::{abi, state::BridgeState};

use wasmtime::{Engine, Instance, Linker, Module, Store};

/// Host-side runtime container.
pub struct BridgeRuntime {
    pub engine: Engine,
    pub store: Store<BridgeState>,
    pub linker: Linker<BridgeState>,
}

impl BridgeRuntime {
    /// Create a new Wasmtime runtime with a broad set of WebAssembly features
    /// enabled, so guests built by modern toolchains validate without fuss.
    pub fn new(state: BridgeState) -> Result<Self, anyhow::Error> {
        let mut cfg = wasmtime::Config::new();

        // Broadly supported/expected features for "modern" Wasm modules.
        cfg.wasm_multi_value(true);
        cfg.wasm_bulk_memory(true);
        cfg.wasm_reference_types(true);
        cfg.wasm_simd(true);

        let engine = Engine::new(&cfg)?;
        let store = Store::new(&engine, state);
        let linker = Linker::new(&engine);

        Ok(Self {
            engine,
            store,
            linker,
        })
    }

    /// Define all host imports expected by guests under module `"env"`.
    ///
    /// Must be called before `instantiate`.
    pub fn define_imports(&mut self) -> Result<(), anyhow::Error> {
        super::imports::define_imports(&mut self.linker)
    }

    /// Instantiate a module, validate required exports, and resolve the
    /// guest entrypoints.
    pub fn instantiate(
        &mut self,
        module: &Module,
    ) -> Result<(Instance, abi::GuestEntrypoints), anyhow::Error> {
        let instance = self.linker.instantiate(&mut self.store, module)?;

        abi::validate::required_exports_present(&instance, &mut self.store)
            .map_err(|e| anyhow::anyhow!("guest missing required export: {e:?}"))?;
        let entrypoints = abi::GuestEntrypoints::resolve(&instance, &mut self.store)?;

        Ok((instance, entrypoints))
    }
}
