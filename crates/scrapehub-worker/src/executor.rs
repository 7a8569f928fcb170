//! Operation registry — resolves task operation names to implementations.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use scrapehub_core::traits::driver::PortalDriver;
use scrapehub_core::traits::operation::Operation;

/// Registered operations keyed by name.
///
/// Workers resolve the operation named by a claimed task here before
/// handing it to the supervisor. Registration happens once at startup;
/// the registry is shared read-only afterwards.
#[derive(Debug)]
pub struct OperationRegistry<D: PortalDriver> {
    operations: HashMap<String, Arc<dyn Operation<D>>>,
}

impl<D: PortalDriver> OperationRegistry<D> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            operations: HashMap::new(),
        }
    }

    /// Register an operation under its own name.
    pub fn register(&mut self, operation: Arc<dyn Operation<D>>) {
        let name = operation.name().to_string();
        info!(operation = %name, "Registered operation");
        self.operations.insert(name, operation);
    }

    /// Look up an operation by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation<D>>> {
        self.operations.get(name).cloned()
    }

    /// Whether an operation is registered under `name`.
    pub fn has_operation(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Names of all registered operations.
    pub fn registered_names(&self) -> Vec<String> {
        self.operations.keys().cloned().collect()
    }
}

impl<D: PortalDriver> Default for OperationRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scrapehub_core::result::AppResult;
    use scrapehub_core::traits::driver::ProbeOutcome;
    use scrapehub_core::traits::operation::OperationError;
    use serde_json::{Value, json};

    #[derive(Debug)]
    struct NullDriver;

    #[async_trait]
    impl PortalDriver for NullDriver {
        type Handle = ();

        async fn connect(&self) -> AppResult<()> {
            Ok(())
        }
        async fn login(&self, _handle: &()) -> AppResult<()> {
            Ok(())
        }
        async fn probe(&self, _handle: &()) -> ProbeOutcome {
            ProbeOutcome::Healthy
        }
        async fn refresh(&self, _handle: &()) -> AppResult<()> {
            Ok(())
        }
        async fn teardown(&self, _handle: &()) {}
    }

    #[derive(Debug)]
    struct EchoOperation;

    #[async_trait]
    impl Operation<NullDriver> for EchoOperation {
        fn name(&self) -> &str {
            "echo"
        }

        async fn execute(&self, _handle: &(), payload: &Value) -> Result<Value, OperationError> {
            Ok(payload.clone())
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = OperationRegistry::<NullDriver>::new();
        registry.register(Arc::new(EchoOperation));

        assert!(registry.has_operation("echo"));
        assert!(registry.get("echo").is_some());
        assert_eq!(registry.registered_names(), vec!["echo".to_string()]);
    }

    #[test]
    fn test_unknown_operation_is_absent() {
        let registry = OperationRegistry::<NullDriver>::new();
        assert!(registry.get("raw_fetch").is_none());
        assert!(!registry.has_operation("raw_fetch"));
    }

    #[tokio::test]
    async fn test_registered_operation_executes() {
        let mut registry = OperationRegistry::<NullDriver>::new();
        registry.register(Arc::new(EchoOperation));

        let op = registry.get("echo").expect("registered");
        let out = op.execute(&(), &json!({"x": 1})).await.expect("echo");
        assert_eq!(out, json!({"x": 1}));
    }
}
