//! Server configuration and the startup document.

use crate::error::{BindingError, BindingResult};
use serde::{Deserialize, Serialize};

/// Storage section of the server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for namespace storage.
    pub path: String,
    /// Storage engine backing namespaces.
    pub engine: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "/tmp/veldb".into(),
            engine: "leveldb".into(),
        }
    }
}

/// Network section of the server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetConfig {
    /// HTTP API bind address.
    pub http_addr: String,
    /// Binary RPC bind address.
    pub rpc_addr: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:9088".into(),
            rpc_addr: "0.0.0.0:6534".into(),
        }
    }
}

/// Logging section of the server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Engine core log sink.
    pub core_log: String,
    /// Server lifecycle log sink.
    pub server_log: String,
    /// HTTP access log sink.
    pub http_log: String,
    /// RPC access log sink, empty to disable.
    pub rpc_log: String,
    /// Minimum level written to the sinks.
    pub log_level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            core_log: "stdout".into(),
            server_log: "stdout".into(),
            http_log: "stdout".into(),
            rpc_log: String::new(),
            log_level: "info".into(),
        }
    }
}

/// Metrics section of the server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Expose a Prometheus endpoint on the HTTP listener.
    pub enable_prometheus: bool,
    /// Collection period in milliseconds.
    pub collect_period_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enable_prometheus: false,
            collect_period_ms: 1000,
        }
    }
}

/// Fully resolved server configuration.
///
/// A caller-supplied configuration replaces the default as a whole
/// document; there is no field-level merging. Once resolved it is
/// serialized to the JSON startup document and never mutated again.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Storage section.
    pub storage: StorageConfig,
    /// Network section.
    pub net: NetConfig,
    /// Logging section.
    pub logger: LoggerConfig,
    /// Metrics section.
    pub metrics: MetricsConfig,
}

impl ServerConfig {
    /// Creates the built-in default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the storage root directory.
    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<String>) -> Self {
        self.storage.path = path.into();
        self
    }

    /// Sets the HTTP API bind address.
    #[must_use]
    pub fn with_http_addr(mut self, addr: impl Into<String>) -> Self {
        self.net.http_addr = addr.into();
        self
    }

    /// Sets the binary RPC bind address.
    #[must_use]
    pub fn with_rpc_addr(mut self, addr: impl Into<String>) -> Self {
        self.net.rpc_addr = addr.into();
        self
    }

    /// Sets the minimum log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logger.log_level = level.into();
        self
    }

    /// Validates the configuration and serializes it to the JSON
    /// startup document the engine expects.
    ///
    /// Fails before any start attempt, so a configuration problem
    /// never leaves a half-started engine behind.
    pub fn to_document(&self) -> BindingResult<String> {
        if self.storage.path.is_empty() {
            return Err(BindingError::ConfigInvalid("storage.path is empty".into()));
        }
        if self.net.http_addr.is_empty() {
            return Err(BindingError::ConfigInvalid("net.http_addr is empty".into()));
        }
        if self.net.rpc_addr.is_empty() {
            return Err(BindingError::ConfigInvalid("net.rpc_addr is empty".into()));
        }
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_document_carries_defaults() {
        let doc = ServerConfig::default().to_document().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&doc).unwrap();
        assert_eq!(parsed["storage"]["path"], "/tmp/veldb");
        assert_eq!(parsed["net"]["http_addr"], "0.0.0.0:9088");
        assert_eq!(parsed["net"]["rpc_addr"], "0.0.0.0:6534");
        assert_eq!(parsed["logger"]["log_level"], "info");
        assert_eq!(parsed["metrics"]["enable_prometheus"], false);
    }

    #[test]
    fn builder_overrides() {
        let config = ServerConfig::new()
            .with_storage_path("/var/lib/veldb")
            .with_http_addr("127.0.0.1:8088")
            .with_log_level("trace");
        assert_eq!(config.storage.path, "/var/lib/veldb");
        assert_eq!(config.net.http_addr, "127.0.0.1:8088");
        assert_eq!(config.logger.log_level, "trace");
        // Untouched sections keep their defaults.
        assert_eq!(config.net.rpc_addr, "0.0.0.0:6534");
    }

    #[test]
    fn empty_storage_path_is_rejected_before_start() {
        let err = ServerConfig::new()
            .with_storage_path("")
            .to_document()
            .unwrap_err();
        assert!(matches!(err, crate::BindingError::ConfigInvalid(_)));
    }

    #[test]
    fn empty_bind_address_is_rejected_before_start() {
        let err = ServerConfig::new()
            .with_rpc_addr("")
            .to_document()
            .unwrap_err();
        assert!(matches!(err, crate::BindingError::ConfigInvalid(_)));
    }

    proptest! {
        // The startup document round-trips to the override's semantic
        // content for any valid override.
        #[test]
        fn document_round_trips(
            path in "/[a-z][a-z0-9/_-]{0,30}",
            http_port in 1024u16..=u16::MAX,
            rpc_port in 1024u16..=u16::MAX,
            level in prop::sample::select(vec!["none", "error", "warning", "info", "trace"]),
        ) {
            let config = ServerConfig::new()
                .with_storage_path(path)
                .with_http_addr(format!("0.0.0.0:{http_port}"))
                .with_rpc_addr(format!("0.0.0.0:{rpc_port}"))
                .with_log_level(level);

            let doc = config.to_document().unwrap();
            let back: ServerConfig = serde_json::from_str(&doc).unwrap();
            prop_assert_eq!(back, config);
        }
    }
}
