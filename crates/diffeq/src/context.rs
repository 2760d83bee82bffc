//! The host context: compile service, sandbox and registry.

use std::sync::Arc;

use diffeq_config::HostConfig;
use diffeq_core::{CompileService, OptionsConfig, Result};
use diffeq_runtime::{ModelInstance, Sandbox};

use crate::compile::HttpCompileService;
use crate::registry::ModelRegistry;

/// Compiles models and keeps them available by id.
///
/// There is no global state: every model lives in the registry of the
/// `Diffeq` value that loaded it.
#[derive(Debug)]
pub struct Diffeq<C = HttpCompileService> {
    config: HostConfig,
    sandbox: Sandbox,
    service: C,
    registry: ModelRegistry,
}

impl Diffeq<HttpCompileService> {
    /// Creates a host that compiles through the configured HTTP service.
    ///
    /// # Errors
    ///
    /// `Config` if the configuration is invalid, `Transport` if the HTTP
    /// client cannot be built.
    pub fn new(config: HostConfig) -> Result<Self> {
        config.validate()?;
        let service = HttpCompileService::new(&config.compiler)?;
        Ok(Self::with_service(config, service))
    }
}

impl<C: CompileService> Diffeq<C> {
    /// Creates a host that compiles through `service`.
    pub fn with_service(config: HostConfig, service: C) -> Self {
        Self {
            sandbox: Sandbox::new(config.sandbox.clone()),
            config,
            service,
            registry: ModelRegistry::new(),
        }
    }

    /// Compiles `source` and registers the resulting model under `id`.
    ///
    /// Any model already registered under `id` is replaced. On failure
    /// nothing is registered.
    ///
    /// # Errors
    ///
    /// `Compilation` or `Transport` from the compile service, `ModuleLoad`
    /// if the returned binary cannot be instantiated.
    pub async fn compile(&self, source: &str, id: Option<&str>) -> Result<Arc<ModelInstance>> {
        let binary = match self.service.compile(source).await {
            Ok(binary) => binary,
            Err(e) => {
                tracing::warn!(
                    event = "compile_failed",
                    model = id.unwrap_or(diffeq_runtime::DEFAULT_MODEL_ID),
                    error = %e
                );
                return Err(e);
            }
        };
        self.load(&binary, id)
    }

    /// Instantiates an already compiled binary and registers it under `id`.
    pub fn load(&self, binary: &[u8], id: Option<&str>) -> Result<Arc<ModelInstance>> {
        let model = Arc::new(self.sandbox.instantiate(binary, id.map(str::to_owned))?);
        self.registry.register(Arc::clone(&model));
        Ok(model)
    }

    /// Returns the model registered under `id`, if any.
    pub fn lookup(&self, id: Option<&str>) -> Option<Arc<ModelInstance>> {
        self.registry.get(id)
    }

    /// Returns the model registered under `id`.
    ///
    /// # Errors
    ///
    /// `ModelNotFound` if nothing is registered under `id`.
    pub fn require(&self, id: Option<&str>) -> Result<Arc<ModelInstance>> {
        self.registry.require(id)
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Solver options from the host configuration.
    pub fn default_options(&self) -> &OptionsConfig {
        &self.config.options
    }

    pub fn service(&self) -> &C {
        &self.service
    }
}
