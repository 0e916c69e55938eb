//! Named RPC methods invocable by the remote agent.

use crate::error::RpcError;
use async_trait::async_trait;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};
use tracing::{info, warn};

/// A handler the remote agent can invoke by name.
///
/// The result is always a string; handlers report failures in-band.
#[async_trait]
pub trait RpcMethod: Send + Sync {
    async fn invoke(&self, data: Option<Value>) -> String;
}

/// The table of methods currently registered against a transport.
#[derive(Clone, Default)]
pub struct RpcRegistry {
    methods: Arc<RwLock<HashMap<String, Arc<dyn RpcMethod>>>>,
}

impl RpcRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `method` under `name`, replacing any previous handler.
    pub fn register(&self, name: &str, method: Arc<dyn RpcMethod>) {
        let previous = self
            .methods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), method);
        if previous.is_some() {
            warn!(method = name, "Replaced an existing RPC method registration");
        } else {
            info!(method = name, "Registered RPC method");
        }
    }

    /// Removes the handler for `name`. Returns whether one was registered.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self
            .methods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some();
        if removed {
            info!(method = name, "Unregistered RPC method");
        }
        removed
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.methods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Invokes the handler registered under `name`.
    pub async fn invoke(&self, name: &str, data: Option<Value>) -> Result<String, RpcError> {
        let method = self
            .methods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| RpcError::UnsupportedMethod(name.to_string()))?;
        Ok(method.invoke(data).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl RpcMethod for Echo {
        async fn invoke(&self, data: Option<Value>) -> String {
            data.map(|v| v.to_string()).unwrap_or_default()
        }
    }

    #[tokio::test]
    async fn test_register_invoke_unregister() {
        let registry = RpcRegistry::new();
        registry.register("echo", Arc::new(Echo));
        assert!(registry.is_registered("echo"));

        let result = registry.invoke("echo", Some(json!({ "a": 1 }))).await;
        assert_eq!(result, Ok(r#"{"a":1}"#.to_string()));

        assert!(registry.unregister("echo"));
        assert!(!registry.unregister("echo"));
        assert_eq!(
            registry.invoke("echo", None).await,
            Err(RpcError::UnsupportedMethod("echo".into()))
        );
    }
}
