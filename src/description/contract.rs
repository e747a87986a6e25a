use std::sync::Arc;

use super::operation::OperationDescriptor;

/// A named set of operations served together at an endpoint.
#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    name: Arc<str>,
    operations: Vec<OperationDescriptor>,
}

impl ContractDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            operations: Vec::new(),
        }
    }

    /// Append an operation. Declaration order is match order.
    pub fn operation(mut self, operation: OperationDescriptor) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operations(&self) -> &[OperationDescriptor] {
        &self.operations
    }
}
