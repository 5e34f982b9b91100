//! The delegate binding surface.

use crate::error::BindingResult;
use std::sync::Arc;
use veldb_native::{EngineLogger, IndexDef, NamespaceOpts};

/// The data-plane surface of a binding.
///
/// [`Builtin`](crate::Builtin) implements it against an acquired
/// engine instance; [`EmbeddedServer`](crate::EmbeddedServer)
/// implements it by pure delegation to its builtin binding, with no
/// transformation of arguments or results.
pub trait RawBinding: Send + Sync {
    /// Opens (and creates, if missing) a namespace.
    fn open_namespace(&self, namespace: &str, opts: NamespaceOpts) -> BindingResult<()>;

    /// Closes a namespace, releasing its in-memory state.
    fn close_namespace(&self, namespace: &str) -> BindingResult<()>;

    /// Drops a namespace and its storage.
    fn drop_namespace(&self, namespace: &str) -> BindingResult<()>;

    /// Enables on-disk storage for a namespace.
    fn enable_storage(&self, namespace: &str) -> BindingResult<()>;

    /// Adds an index to a namespace.
    fn add_index(&self, namespace: &str, index: &IndexDef) -> BindingResult<()>;

    /// Drops an index from a namespace.
    fn drop_index(&self, namespace: &str, index: &str) -> BindingResult<()>;

    /// Reconfigures an existing index from a JSON settings document.
    fn configure_index(&self, namespace: &str, index: &str, config: &str) -> BindingResult<()>;

    /// Inserts, updates, upserts or deletes a serialized item.
    fn modify_item(&self, ns_hash: i32, data: &[u8], mode: i32) -> BindingResult<Vec<u8>>;

    /// Executes a string query.
    fn select(
        &self,
        query: &str,
        with_items: bool,
        pt_versions: &[i32],
        fetch_count: i32,
    ) -> BindingResult<Vec<u8>>;

    /// Executes a pre-serialized query.
    fn select_query(
        &self,
        raw_query: &[u8],
        with_items: bool,
        pt_versions: &[i32],
        fetch_count: i32,
    ) -> BindingResult<Vec<u8>>;

    /// Executes a pre-serialized delete query.
    fn delete_query(&self, ns_hash: i32, raw_query: &[u8]) -> BindingResult<Vec<u8>>;

    /// Stores a metadata value under a key in a namespace.
    fn put_meta(&self, namespace: &str, key: &str, data: &str) -> BindingResult<()>;

    /// Fetches a metadata value by key from a namespace.
    fn get_meta(&self, namespace: &str, key: &str) -> BindingResult<Vec<u8>>;

    /// Commits pending changes in a namespace.
    fn commit(&self, namespace: &str) -> BindingResult<()>;

    /// Registers a logger and enables engine log forwarding.
    fn enable_logger(&self, logger: Arc<dyn EngineLogger>) -> BindingResult<()>;

    /// Disables engine log forwarding and drops the registered logger.
    fn disable_logger(&self) -> BindingResult<()>;

    /// Liveness check against the engine instance.
    fn ping(&self) -> BindingResult<()>;
}
