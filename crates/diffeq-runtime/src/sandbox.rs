//! Isolated execution of compiled model binaries.

use diffeq_config::SandboxConfig;
use diffeq_core::{DiffeqError, Result};
use wasmtime::{Engine, Linker, Module, Store};
use wasmtime_wasi::pipe::MemoryInputPipe;
use wasmtime_wasi::preview1::{self, WasiP1Ctx};
use wasmtime_wasi::WasiCtxBuilder;

use crate::capability::Capabilities;
use crate::ledger::HandleLedger;
use crate::model::ModelInstance;
use crate::stream::CapturedStream;

/// Per-instance state owned by the wasmtime store.
pub struct HostState {
    pub(crate) wasi: WasiP1Ctx,
    pub(crate) stdout: CapturedStream,
    pub(crate) stderr: CapturedStream,
    pub(crate) ledger: HandleLedger,
}

/// Compiles and instantiates model binaries.
///
/// Every instance gets its own store and linear memory, an empty stdin, and
/// in-memory stdout/stderr. Nothing from the host environment is visible to the
/// module: no preopened directories, no environment variables or arguments,
/// and no sockets.
pub struct Sandbox {
    engine: Engine,
    config: SandboxConfig,
}

impl Sandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            engine: Engine::default(),
            config,
        }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Loads `binary` and binds its exports.
    ///
    /// # Errors
    ///
    /// `ModuleLoad` if the binary does not parse, link or instantiate, or if
    /// complete capabilities are required and a required export is missing.
    pub fn instantiate(&self, binary: &[u8], id: Option<String>) -> Result<ModelInstance> {
        let module = Module::new(&self.engine, binary)
            .map_err(|e| DiffeqError::ModuleLoad(format!("invalid module: {e:#}")))?;

        let stdout = CapturedStream::new(self.config.stdout_capacity);
        let stderr = CapturedStream::new(self.config.stderr_capacity);
        let wasi = WasiCtxBuilder::new()
            .stdin(MemoryInputPipe::new(Vec::<u8>::new()))
            .stdout(stdout.pipe())
            .stderr(stderr.pipe())
            .allow_tcp(false)
            .allow_udp(false)
            .allow_ip_name_lookup(false)
            .build_p1();

        let mut store = Store::new(
            &self.engine,
            HostState {
                wasi,
                stdout,
                stderr,
                ledger: HandleLedger::default(),
            },
        );

        let mut linker: Linker<HostState> = Linker::new(&self.engine);
        preview1::add_to_linker_sync(&mut linker, |state| &mut state.wasi)
            .map_err(|e| DiffeqError::ModuleLoad(format!("failed to link WASI: {e:#}")))?;

        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| DiffeqError::ModuleLoad(format!("failed to instantiate: {e:#}")))?;

        if let Some(initialize) = instance.get_func(&mut store, "_initialize") {
            let initialize = initialize
                .typed::<(), ()>(&store)
                .map_err(|e| DiffeqError::ModuleLoad(format!("invalid _initialize: {e:#}")))?;
            initialize
                .call(&mut store, ())
                .map_err(|e| DiffeqError::ModuleLoad(format!("_initialize failed: {e:#}")))?;
        }

        let (capabilities, report) = Capabilities::extract(instance, &mut store);
        if self.config.require_complete_capabilities && !report.is_complete() {
            let missing: Vec<&str> = report.required_gaps().map(|gap| gap.name).collect();
            return Err(DiffeqError::ModuleLoad(format!(
                "module lacks required exports: {}",
                missing.join(", ")
            )));
        }

        let model = ModelInstance::new(id, store, capabilities, report);
        tracing::info!(
            event = "model_loaded",
            model = model.display_id(),
            instance = %model.instance_id(),
            bytes = binary.len(),
            complete = model.capability_report().is_complete(),
            "Instantiated model module"
        );
        Ok(model)
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new(SandboxConfig::default())
    }
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox").field("config", &self.config).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assembles a module whose `_initialize` runs `body`. `$report` writes a
    /// single digit to stdout, so results can be read back from the session.
    fn reporting_module(decls: &str, body: &str) -> Vec<u8> {
        let wat = format!(
            r#"(module
  (import "wasi_snapshot_preview1" "fd_write" (func $fd_write (param i32 i32 i32 i32) (result i32)))
  {decls}
  (memory (export "memory") 1)
  (data (i32.const 300) "etc")
  (func $report (param $value i32)
    (i32.store8 (i32.const 200) (i32.add (i32.const 48) (local.get $value)))
    (i32.store (i32.const 100) (i32.const 200))
    (i32.store (i32.const 104) (i32.const 1))
    (drop (call $fd_write (i32.const 1) (i32.const 100) (i32.const 1) (i32.const 108))))
  (func (export "_initialize")
    {body}))"#
        );
        wat::parse_str(wat).unwrap()
    }

    fn initial_stdout(binary: &[u8]) -> String {
        let model = Sandbox::default().instantiate(binary, None).unwrap();
        let mut s = model.session();
        s.read_stdout()
    }

    #[test]
    fn test_stdin_is_empty() {
        let binary = reporting_module(
            r#"(import "wasi_snapshot_preview1" "fd_read" (func $fd_read (param i32 i32 i32 i32) (result i32)))"#,
            r#"(i32.store (i32.const 0) (i32.const 64))
    (i32.store (i32.const 4) (i32.const 16))
    (i32.store (i32.const 32) (i32.const 7))
    (call $report (call $fd_read (i32.const 0) (i32.const 0) (i32.const 1) (i32.const 32)))
    (call $report (i32.load (i32.const 32)))"#,
        );
        // Success, zero bytes read.
        assert_eq!(initial_stdout(&binary), "00");
    }

    #[test]
    fn test_no_preopened_directories() {
        let binary = reporting_module(
            r#"(import "wasi_snapshot_preview1" "path_open" (func $path_open (param i32 i32 i32 i32 i32 i64 i64 i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "fd_prestat_get" (func $fd_prestat_get (param i32 i32) (result i32)))"#,
            r#"(call $report (call $path_open (i32.const 3) (i32.const 0) (i32.const 300) (i32.const 3)
      (i32.const 0) (i64.const 0) (i64.const 0) (i32.const 0) (i32.const 40)))
    (call $report (call $fd_prestat_get (i32.const 3) (i32.const 56)))"#,
        );
        // EBADF is errno 8 in WASI preview 1.
        assert_eq!(initial_stdout(&binary), "88");
    }

    #[test]
    fn test_no_environment_or_arguments() {
        let binary = reporting_module(
            r#"(import "wasi_snapshot_preview1" "environ_sizes_get" (func $environ_sizes_get (param i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "args_sizes_get" (func $args_sizes_get (param i32 i32) (result i32)))"#,
            r#"(i32.store (i32.const 48) (i32.const 7))
    (i32.store (i32.const 56) (i32.const 7))
    (call $report (call $environ_sizes_get (i32.const 48) (i32.const 52)))
    (call $report (i32.load (i32.const 48)))
    (call $report (call $args_sizes_get (i32.const 56) (i32.const 60)))
    (call $report (i32.load (i32.const 56)))"#,
        );
        assert_eq!(initial_stdout(&binary), "0000");
    }

    #[test]
    fn test_initialize_runs_once_per_instance() {
        let binary = reporting_module(
            "(global $runs (mut i32) (i32.const 0))",
            "(global.set $runs (i32.add (global.get $runs) (i32.const 1)))
    (call $report (global.get $runs))",
        );
        let sandbox = Sandbox::default();
        let first = sandbox.instantiate(&binary, None).unwrap();
        let second = sandbox.instantiate(&binary, None).unwrap();

        assert_eq!(first.session().read_stdout(), "1");
        assert_eq!(second.session().read_stdout(), "1");
        assert_eq!(first.session().read_stdout(), "");
    }

    #[test]
    fn test_trapping_initialize_is_module_load() {
        let binary = reporting_module("", "unreachable");
        match Sandbox::default().instantiate(&binary, None) {
            Err(DiffeqError::ModuleLoad(message)) => assert!(message.contains("_initialize")),
            other => panic!("expected ModuleLoad, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_binary_is_module_load() {
        assert!(matches!(
            Sandbox::default().instantiate(b"not wasm", None),
            Err(DiffeqError::ModuleLoad(_))
        ));
    }

    #[test]
    fn test_strict_mode_rejects_partial_module() {
        let binary = reporting_module("", "");
        let config = SandboxConfig {
            require_complete_capabilities: true,
            ..SandboxConfig::default()
        };
        match Sandbox::new(config).instantiate(&binary, None) {
            Err(DiffeqError::ModuleLoad(message)) => {
                assert!(message.contains("Vector_push"), "{message}")
            }
            other => panic!("expected ModuleLoad, got {other:?}"),
        }
        assert!(Sandbox::default().instantiate(&binary, None).is_ok());
    }
}
