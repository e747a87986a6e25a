use serde::{Deserialize, Serialize};
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use super::endpoint::EndpointDescriptor;
use crate::policy::ServiceBehavior;

/// How service instances are provided to handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceMode {
    /// One shared instance serves every request.
    #[default]
    Singleton,
    /// A fresh instance per dispatched request.
    PerCall,
}

type Factory = dyn Fn() -> Box<dyn Any + Send + Sync> + Send + Sync;

/// Source of service instances.
#[derive(Clone)]
pub enum InstanceProvider {
    Singleton(Arc<dyn Any + Send + Sync>),
    PerCall(Arc<Factory>),
}

impl InstanceProvider {
    pub fn mode(&self) -> InstanceMode {
        match self {
            InstanceProvider::Singleton(_) => InstanceMode::Singleton,
            InstanceProvider::PerCall(_) => InstanceMode::PerCall,
        }
    }

    /// The instance for one dispatch.
    pub fn resolve(&self) -> ServiceInstance {
        match self {
            InstanceProvider::Singleton(shared) => ServiceInstance::Shared(Arc::clone(shared)),
            InstanceProvider::PerCall(factory) => ServiceInstance::Owned(factory()),
        }
    }
}

/// An instance resolved for one dispatch.
pub enum ServiceInstance {
    Shared(Arc<dyn Any + Send + Sync>),
    Owned(Box<dyn Any + Send + Sync>),
}

impl ServiceInstance {
    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        match self {
            ServiceInstance::Shared(shared) => shared.as_ref(),
            ServiceInstance::Owned(owned) => owned.as_ref(),
        }
    }
}

/// The hosted service: its name, instancing, behaviors and endpoints.
#[derive(Clone)]
pub struct ServiceDescriptor {
    name: Arc<str>,
    instance: InstanceProvider,
    service_type: TypeId,
    service_type_name: &'static str,
    behaviors: Vec<Arc<dyn ServiceBehavior>>,
    endpoints: Vec<EndpointDescriptor>,
}

impl ServiceDescriptor {
    /// Serve every request from `instance`.
    pub fn singleton<S: Any + Send + Sync>(name: &str, instance: S) -> Self {
        Self::with_provider::<S>(name, InstanceProvider::Singleton(Arc::new(instance)))
    }

    /// Build a fresh instance with `factory` for every request.
    pub fn per_call<S, F>(name: &str, factory: F) -> Self
    where
        S: Any + Send + Sync,
        F: Fn() -> S + Send + Sync + 'static,
    {
        let factory = move || Box::new(factory()) as Box<dyn Any + Send + Sync>;
        Self::with_provider::<S>(name, InstanceProvider::PerCall(Arc::new(factory)))
    }

    fn with_provider<S: Any>(name: &str, instance: InstanceProvider) -> Self {
        Self {
            name: Arc::from(name),
            instance,
            service_type: TypeId::of::<S>(),
            service_type_name: type_name::<S>(),
            behaviors: Vec::new(),
            endpoints: Vec::new(),
        }
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn instancing(&self) -> InstanceMode {
        self.instance.mode()
    }

    pub fn instance(&self) -> &InstanceProvider {
        &self.instance
    }

    pub fn service_type(&self) -> TypeId {
        self.service_type
    }

    pub fn service_type_name(&self) -> &'static str {
        self.service_type_name
    }

    pub fn behaviors(&self) -> &[Arc<dyn ServiceBehavior>] {
        &self.behaviors
    }

    pub fn endpoints(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }

    pub(crate) fn push_behavior(&mut self, behavior: Arc<dyn ServiceBehavior>) {
        self.behaviors.push(behavior);
    }

    pub(crate) fn push_endpoint(&mut self, endpoint: EndpointDescriptor) {
        self.endpoints.push(endpoint);
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("name", &self.name)
            .field("instancing", &self.instancing())
            .field("service_type", &self.service_type_name)
            .field("behaviors", &self.behaviors.len())
            .field("endpoints", &self.endpoints)
            .finish()
    }
}
