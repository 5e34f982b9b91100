//! The builtin delegate binding.

use crate::error::BindingResult;
use crate::raw::RawBinding;
use std::sync::Arc;
use url::Url;
use veldb_native::{EngineLogger, EngineRuntime, IndexDef, InstanceHandle, NamespaceOpts};

/// Binding over an acquired engine instance.
///
/// Owns the [`InstanceHandle`] for its lifetime: the handle is
/// installed at construction, before any data-plane call can be made,
/// and is never handed back out. One `Builtin` is constructed per
/// successful bootstrap.
pub struct Builtin {
    runtime: Arc<dyn EngineRuntime>,
    handle: InstanceHandle,
    target: Url,
}

impl Builtin {
    /// Creates a binding over an acquired instance, initialized with
    /// the connection target it serves.
    pub(crate) fn new(runtime: Arc<dyn EngineRuntime>, handle: InstanceHandle, target: Url) -> Self {
        Self {
            runtime,
            handle,
            target,
        }
    }

    /// The connection target this binding was initialized with.
    pub fn target(&self) -> &Url {
        &self.target
    }
}

impl RawBinding for Builtin {
    fn open_namespace(&self, namespace: &str, opts: NamespaceOpts) -> BindingResult<()> {
        Ok(self.runtime.open_namespace(self.handle, namespace, opts)?)
    }

    fn close_namespace(&self, namespace: &str) -> BindingResult<()> {
        Ok(self.runtime.close_namespace(self.handle, namespace)?)
    }

    fn drop_namespace(&self, namespace: &str) -> BindingResult<()> {
        Ok(self.runtime.drop_namespace(self.handle, namespace)?)
    }

    fn enable_storage(&self, namespace: &str) -> BindingResult<()> {
        Ok(self.runtime.enable_storage(self.handle, namespace)?)
    }

    fn add_index(&self, namespace: &str, index: &IndexDef) -> BindingResult<()> {
        Ok(self.runtime.add_index(self.handle, namespace, index)?)
    }

    fn drop_index(&self, namespace: &str, index: &str) -> BindingResult<()> {
        Ok(self.runtime.drop_index(self.handle, namespace, index)?)
    }

    fn configure_index(&self, namespace: &str, index: &str, config: &str) -> BindingResult<()> {
        Ok(self
            .runtime
            .configure_index(self.handle, namespace, index, config)?)
    }

    fn modify_item(&self, ns_hash: i32, data: &[u8], mode: i32) -> BindingResult<Vec<u8>> {
        Ok(self.runtime.modify_item(self.handle, ns_hash, data, mode)?)
    }

    fn select(
        &self,
        query: &str,
        with_items: bool,
        pt_versions: &[i32],
        fetch_count: i32,
    ) -> BindingResult<Vec<u8>> {
        Ok(self
            .runtime
            .select(self.handle, query, with_items, pt_versions, fetch_count)?)
    }

    fn select_query(
        &self,
        raw_query: &[u8],
        with_items: bool,
        pt_versions: &[i32],
        fetch_count: i32,
    ) -> BindingResult<Vec<u8>> {
        Ok(self.runtime.select_query(
            self.handle,
            raw_query,
            with_items,
            pt_versions,
            fetch_count,
        )?)
    }

    fn delete_query(&self, ns_hash: i32, raw_query: &[u8]) -> BindingResult<Vec<u8>> {
        Ok(self.runtime.delete_query(self.handle, ns_hash, raw_query)?)
    }

    fn put_meta(&self, namespace: &str, key: &str, data: &str) -> BindingResult<()> {
        Ok(self.runtime.put_meta(self.handle, namespace, key, data)?)
    }

    fn get_meta(&self, namespace: &str, key: &str) -> BindingResult<Vec<u8>> {
        Ok(self.runtime.get_meta(self.handle, namespace, key)?)
    }

    fn commit(&self, namespace: &str) -> BindingResult<()> {
        Ok(self.runtime.commit(self.handle, namespace)?)
    }

    fn enable_logger(&self, logger: Arc<dyn EngineLogger>) -> BindingResult<()> {
        Ok(self.runtime.set_logger(self.handle, Some(logger))?)
    }

    fn disable_logger(&self) -> BindingResult<()> {
        Ok(self.runtime.set_logger(self.handle, None)?)
    }

    fn ping(&self) -> BindingResult<()> {
        Ok(self.runtime.ping(self.handle)?)
    }
}
