use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::description::{EndpointDescriptor, InstanceMode, ServiceDescriptor};
use crate::dispatcher::{EndpointDispatcher, ServiceDispatcher};
use crate::fault::{ConfigurationError, ErrorHandler};
use crate::policy::ServiceBehavior;
use crate::runtime_config::RuntimeConfig;

/// A hosted service: configured, started and stopped as a unit.
pub struct RestService {
    descriptor: ServiceDescriptor,
    runtime: RuntimeConfig,
    compiled: Vec<EndpointDispatcher>,
    error_handlers: Vec<Arc<dyn ErrorHandler>>,
    running: Option<Arc<ServiceDispatcher>>,
}

impl RestService {
    /// Host `instance` as a singleton.
    pub fn singleton<S: Any + Send + Sync>(name: &str, instance: S) -> Self {
        Self::from_descriptor(ServiceDescriptor::singleton(name, instance))
    }

    /// Host a service built fresh by `factory` for every request.
    pub fn per_call<S, F>(name: &str, factory: F) -> Self
    where
        S: Any + Send + Sync,
        F: Fn() -> S + Send + Sync + 'static,
    {
        Self::from_descriptor(ServiceDescriptor::per_call(name, factory))
    }

    fn from_descriptor(descriptor: ServiceDescriptor) -> Self {
        Self {
            descriptor,
            runtime: RuntimeConfig::default(),
            compiled: Vec::new(),
            error_handlers: Vec::new(),
            running: None,
        }
    }

    pub fn with_runtime_config(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn instancing(&self) -> InstanceMode {
        self.descriptor.instancing()
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// Compiled endpoints, in registration order.
    pub fn endpoints(&self) -> &[EndpointDispatcher] {
        &self.compiled
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// The live dispatcher while running.
    pub fn dispatcher(&self) -> Option<Arc<ServiceDispatcher>> {
        self.running.as_ref().map(Arc::clone)
    }

    pub fn add_service_behavior(
        &mut self,
        behavior: Arc<dyn ServiceBehavior>,
    ) -> Result<(), ConfigurationError> {
        self.ensure_stopped()?;
        self.descriptor.push_behavior(behavior);
        Ok(())
    }

    /// Register an error handler consulted before the default one.
    pub fn add_error_handler(
        &mut self,
        handler: Arc<dyn ErrorHandler>,
    ) -> Result<(), ConfigurationError> {
        self.ensure_stopped()?;
        self.error_handlers.push(handler);
        Ok(())
    }

    /// Register and compile an endpoint.
    ///
    /// Fails on a base URI already in use by this service, on an operation
    /// whose handler targets a different service type, or on any route
    /// compilation error.
    pub fn add_service_endpoint(
        &mut self,
        endpoint: EndpointDescriptor,
    ) -> Result<(), ConfigurationError> {
        self.ensure_stopped()?;

        let base = endpoint.parsed_base_uri()?.to_string();
        let duplicate = self
            .descriptor
            .endpoints()
            .iter()
            .filter_map(|existing| existing.parsed_base_uri().ok())
            .any(|existing| existing.to_string().eq_ignore_ascii_case(&base));
        if duplicate {
            return Err(ConfigurationError::DuplicateBaseUri(endpoint.base_uri().to_string()));
        }

        for operation in endpoint.contract().operations() {
            if let Some(handler) = operation.handler_ref() {
                if handler.service_type() != self.descriptor.service_type() {
                    return Err(ConfigurationError::ContractMismatch {
                        contract: endpoint.contract().name().to_string(),
                        operation: operation.name().to_string(),
                        expected: self.descriptor.service_type_name(),
                        actual: handler.service_type_name(),
                    });
                }
            }
        }

        let compiled = EndpointDispatcher::new(&endpoint)?;
        info!(
            service = %self.descriptor.name(),
            base_uri = %compiled.base_uri(),
            contract = %compiled.contract_name(),
            operations = compiled.operations().len(),
            "Endpoint registered"
        );
        self.compiled.push(compiled);
        self.descriptor.push_endpoint(endpoint);
        Ok(())
    }

    /// Apply behaviors, freeze the dispatcher and attach bindings.
    pub fn start(&mut self) -> Result<Arc<ServiceDispatcher>, ConfigurationError> {
        if self.running.is_some() {
            return Err(ConfigurationError::AlreadyRunning(self.name().to_string()));
        }
        if self.compiled.is_empty() {
            return Err(ConfigurationError::NoEndpoints(self.name().to_string()));
        }

        let mut dispatcher = ServiceDispatcher::new(
            Arc::clone(self.descriptor.name()),
            self.descriptor.instance().clone(),
            self.compiled.clone(),
            self.runtime.expose_diagnostics,
        );
        for handler in &self.error_handlers {
            dispatcher.add_error_handler(Arc::clone(handler));
        }
        for behavior in self.descriptor.behaviors() {
            behavior.apply_service_behavior(&mut dispatcher);
        }
        for (endpoint, compiled) in self
            .descriptor
            .endpoints()
            .iter()
            .zip(dispatcher.endpoints_mut())
        {
            for behavior in endpoint.behaviors() {
                behavior.apply_endpoint_behavior(endpoint, compiled);
            }
            for (operation, op_dispatcher) in endpoint
                .contract()
                .operations()
                .iter()
                .zip(compiled.operations_mut())
            {
                for behavior in operation.behaviors() {
                    behavior.apply_operation_behavior(operation, op_dispatcher);
                }
            }
        }
        let dispatcher = Arc::new(dispatcher);

        let mut attached: Vec<&EndpointDescriptor> = Vec::new();
        for endpoint in self.descriptor.endpoints() {
            let Some(binding) = endpoint.binding() else {
                continue;
            };
            if let Err(e) = binding.attach_endpoint(Arc::clone(&dispatcher), endpoint) {
                warn!(
                    service = %self.descriptor.name(),
                    base_uri = %endpoint.base_uri(),
                    error = %e,
                    "Endpoint attach failed - rolling back start"
                );
                for done in attached {
                    if let Some(binding) = done.binding() {
                        binding.detach_endpoint(done);
                    }
                }
                return Err(e);
            }
            attached.push(endpoint);
        }

        info!(
            service = %self.descriptor.name(),
            instancing = ?self.descriptor.instancing(),
            endpoints = self.compiled.len(),
            bound = attached.len(),
            "Service started"
        );
        self.running = Some(Arc::clone(&dispatcher));
        Ok(dispatcher)
    }

    /// Detach every binding. Requests already in flight finish normally.
    pub fn stop(&mut self) {
        if self.running.take().is_none() {
            return;
        }
        for endpoint in self.descriptor.endpoints() {
            if let Some(binding) = endpoint.binding() {
                binding.detach_endpoint(endpoint);
            }
        }
        info!(service = %self.descriptor.name(), "Service stopped");
    }

    fn ensure_stopped(&self) -> Result<(), ConfigurationError> {
        match self.running {
            Some(_) => Err(ConfigurationError::AlreadyRunning(self.name().to_string())),
            None => Ok(()),
        }
    }
}

impl Drop for RestService {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for RestService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestService")
            .field("descriptor", &self.descriptor)
            .field("running", &self.running.is_some())
            .finish()
    }
}
