//! The engine runtime abstraction and a mock implementation.

use crate::error::{NativeError, NativeResult};
use crate::types::{IndexDef, InstanceHandle, NamespaceOpts};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Receiver for engine log output routed back into the host
/// application.
pub trait EngineLogger: Send + Sync {
    /// Called once per engine log record.
    fn log(&self, level: i32, message: &str);
}

/// The engine's exported surface, seen from Rust.
///
/// This trait abstracts the shared library's `veldb_*` exports so the
/// bootstrap layer and the delegate binding can be exercised against a
/// mock engine in tests. [`SharedLibEngine`](crate::SharedLibEngine)
/// is the production implementation.
///
/// The first four methods are the startup surface; everything else is
/// the data plane, addressed by the [`InstanceHandle`] acquired during
/// startup.
pub trait EngineRuntime: Send + Sync {
    /// Starts the engine's run loop with the given startup document.
    ///
    /// This call blocks for the lifetime of the run loop: it returns
    /// only if the loop fails to start or terminates abnormally.
    /// Callers are expected to invoke it from a dedicated thread.
    fn start_server(&self, config: &str) -> NativeResult<()>;

    /// Probes whether the engine is ready to accept instance
    /// acquisition. Monotonic: once true it stays true.
    fn is_ready(&self) -> bool;

    /// Exchanges credentials for an opaque instance handle.
    ///
    /// The engine is the sole authority on the credentials; no local
    /// validation happens here.
    fn acquire_instance(
        &self,
        host: &str,
        username: &str,
        password: &str,
    ) -> NativeResult<InstanceHandle>;

    /// Opens (and creates, if missing) a namespace.
    fn open_namespace(
        &self,
        handle: InstanceHandle,
        namespace: &str,
        opts: NamespaceOpts,
    ) -> NativeResult<()>;

    /// Closes a namespace, releasing its in-memory state.
    fn close_namespace(&self, handle: InstanceHandle, namespace: &str) -> NativeResult<()>;

    /// Drops a namespace and its storage.
    fn drop_namespace(&self, handle: InstanceHandle, namespace: &str) -> NativeResult<()>;

    /// Enables on-disk storage for a namespace.
    fn enable_storage(&self, handle: InstanceHandle, namespace: &str) -> NativeResult<()>;

    /// Adds an index to a namespace.
    fn add_index(
        &self,
        handle: InstanceHandle,
        namespace: &str,
        index: &IndexDef,
    ) -> NativeResult<()>;

    /// Drops an index from a namespace.
    fn drop_index(&self, handle: InstanceHandle, namespace: &str, index: &str) -> NativeResult<()>;

    /// Reconfigures an existing index from a JSON settings document.
    fn configure_index(
        &self,
        handle: InstanceHandle,
        namespace: &str,
        index: &str,
        config: &str,
    ) -> NativeResult<()>;

    /// Inserts, updates, upserts or deletes a serialized item.
    fn modify_item(
        &self,
        handle: InstanceHandle,
        ns_hash: i32,
        data: &[u8],
        mode: i32,
    ) -> NativeResult<Vec<u8>>;

    /// Executes a string query, returning the serialized result set.
    fn select(
        &self,
        handle: InstanceHandle,
        query: &str,
        with_items: bool,
        pt_versions: &[i32],
        fetch_count: i32,
    ) -> NativeResult<Vec<u8>>;

    /// Executes a pre-serialized query, returning the serialized
    /// result set.
    fn select_query(
        &self,
        handle: InstanceHandle,
        raw_query: &[u8],
        with_items: bool,
        pt_versions: &[i32],
        fetch_count: i32,
    ) -> NativeResult<Vec<u8>>;

    /// Executes a pre-serialized delete query.
    fn delete_query(
        &self,
        handle: InstanceHandle,
        ns_hash: i32,
        raw_query: &[u8],
    ) -> NativeResult<Vec<u8>>;

    /// Stores a metadata value under a key in a namespace.
    fn put_meta(
        &self,
        handle: InstanceHandle,
        namespace: &str,
        key: &str,
        data: &str,
    ) -> NativeResult<()>;

    /// Fetches a metadata value by key from a namespace.
    fn get_meta(&self, handle: InstanceHandle, namespace: &str, key: &str)
        -> NativeResult<Vec<u8>>;

    /// Commits pending changes in a namespace.
    fn commit(&self, handle: InstanceHandle, namespace: &str) -> NativeResult<()>;

    /// Registers (or, with `None`, deregisters) a receiver for engine
    /// log output.
    fn set_logger(
        &self,
        handle: InstanceHandle,
        logger: Option<Arc<dyn EngineLogger>>,
    ) -> NativeResult<()>;

    /// Liveness check against the instance.
    fn ping(&self, handle: InstanceHandle) -> NativeResult<()>;
}

/// A mock engine for testing the bootstrap and delegation layers.
///
/// Readiness, the acquired handle, and failure injection are all
/// configurable; every boundary crossing is recorded so tests can
/// assert ordering and argument fidelity.
#[derive(Default)]
pub struct MockEngine {
    ready: AtomicBool,
    ready_at: Mutex<Option<Instant>>,
    start_count: AtomicUsize,
    started_config: Mutex<Option<String>>,
    fail_start: Mutex<Option<(String, i32)>>,
    acquire_count: AtomicUsize,
    acquire_args: Mutex<Option<(String, String, String)>>,
    handle: Mutex<InstanceHandle>,
    calls: Mutex<Vec<String>>,
    meta: Mutex<HashMap<String, Vec<u8>>>,
    select_payload: Mutex<Vec<u8>>,
    logger: Mutex<Option<Arc<dyn EngineLogger>>>,
}

impl MockEngine {
    /// Creates a mock engine that is not yet ready and hands out a
    /// fixed valid handle.
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(InstanceHandle::from_token(0x5EED)),
            ..Self::default()
        }
    }

    /// Marks the engine ready (or not) immediately.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Arms the readiness probe to flip true once `delay` has elapsed
    /// from now.
    pub fn set_ready_after(&self, delay: std::time::Duration) {
        *self.ready_at.lock() = Some(Instant::now() + delay);
    }

    /// Makes `start_server` fail with the given message and code.
    pub fn fail_start_with(&self, message: impl Into<String>, code: i32) {
        *self.fail_start.lock() = Some((message.into(), code));
    }

    /// Sets the handle returned by instance acquisition.
    pub fn set_handle(&self, handle: InstanceHandle) {
        *self.handle.lock() = handle;
    }

    /// Sets the payload returned by `select` and `select_query`.
    pub fn set_select_payload(&self, payload: Vec<u8>) {
        *self.select_payload.lock() = payload;
    }

    /// Number of times `start_server` was invoked.
    pub fn start_count(&self) -> usize {
        self.start_count.load(Ordering::SeqCst)
    }

    /// The startup document the engine was last started with.
    pub fn started_config(&self) -> Option<String> {
        self.started_config.lock().clone()
    }

    /// Number of times an instance was acquired.
    pub fn acquire_count(&self) -> usize {
        self.acquire_count.load(Ordering::SeqCst)
    }

    /// The `(host, username, password)` triple of the last
    /// acquisition.
    pub fn acquire_args(&self) -> Option<(String, String, String)> {
        self.acquire_args.lock().clone()
    }

    /// All recorded data-plane calls, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Whether log forwarding is currently enabled.
    pub fn logging_enabled(&self) -> bool {
        self.logger.lock().is_some()
    }

    /// Emits a log record as the engine would, reaching whatever
    /// logger is registered.
    pub fn emit_log(&self, level: i32, message: &str) {
        if let Some(logger) = self.logger.lock().clone() {
            logger.log(level, message);
        }
    }

    fn record(&self, handle: InstanceHandle, call: String) {
        self.calls.lock().push(format!("{:#x}:{call}", handle.token()));
    }
}

impl EngineRuntime for MockEngine {
    fn start_server(&self, config: &str) -> NativeResult<()> {
        self.start_count.fetch_add(1, Ordering::SeqCst);
        *self.started_config.lock() = Some(config.to_owned());
        if let Some((message, code)) = self.fail_start.lock().clone() {
            return Err(NativeError::engine(message, code));
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        if self.ready.load(Ordering::SeqCst) {
            return true;
        }
        let armed = self.ready_at.lock().is_some_and(|at| Instant::now() >= at);
        if armed {
            // Readiness is monotonic.
            self.ready.store(true, Ordering::SeqCst);
        }
        armed
    }

    fn acquire_instance(
        &self,
        host: &str,
        username: &str,
        password: &str,
    ) -> NativeResult<InstanceHandle> {
        self.acquire_count.fetch_add(1, Ordering::SeqCst);
        *self.acquire_args.lock() =
            Some((host.to_owned(), username.to_owned(), password.to_owned()));
        Ok(*self.handle.lock())
    }

    fn open_namespace(
        &self,
        handle: InstanceHandle,
        namespace: &str,
        opts: NamespaceOpts,
    ) -> NativeResult<()> {
        self.record(
            handle,
            format!("open_namespace:{namespace}:storage={}", opts.enable_storage),
        );
        Ok(())
    }

    fn close_namespace(&self, handle: InstanceHandle, namespace: &str) -> NativeResult<()> {
        self.record(handle, format!("close_namespace:{namespace}"));
        Ok(())
    }

    fn drop_namespace(&self, handle: InstanceHandle, namespace: &str) -> NativeResult<()> {
        self.record(handle, format!("drop_namespace:{namespace}"));
        Ok(())
    }

    fn enable_storage(&self, handle: InstanceHandle, namespace: &str) -> NativeResult<()> {
        self.record(handle, format!("enable_storage:{namespace}"));
        Ok(())
    }

    fn add_index(
        &self,
        handle: InstanceHandle,
        namespace: &str,
        index: &IndexDef,
    ) -> NativeResult<()> {
        self.record(handle, format!("add_index:{namespace}:{}", index.name));
        Ok(())
    }

    fn drop_index(&self, handle: InstanceHandle, namespace: &str, index: &str) -> NativeResult<()> {
        self.record(handle, format!("drop_index:{namespace}:{index}"));
        Ok(())
    }

    fn configure_index(
        &self,
        handle: InstanceHandle,
        namespace: &str,
        index: &str,
        _config: &str,
    ) -> NativeResult<()> {
        self.record(handle, format!("configure_index:{namespace}:{index}"));
        Ok(())
    }

    fn modify_item(
        &self,
        handle: InstanceHandle,
        ns_hash: i32,
        data: &[u8],
        mode: i32,
    ) -> NativeResult<Vec<u8>> {
        self.record(
            handle,
            format!("modify_item:{ns_hash}:mode={mode}:len={}", data.len()),
        );
        Ok(data.to_vec())
    }

    fn select(
        &self,
        handle: InstanceHandle,
        query: &str,
        _with_items: bool,
        _pt_versions: &[i32],
        fetch_count: i32,
    ) -> NativeResult<Vec<u8>> {
        self.record(handle, format!("select:{query}:fetch={fetch_count}"));
        Ok(self.select_payload.lock().clone())
    }

    fn select_query(
        &self,
        handle: InstanceHandle,
        raw_query: &[u8],
        _with_items: bool,
        _pt_versions: &[i32],
        _fetch_count: i32,
    ) -> NativeResult<Vec<u8>> {
        self.record(handle, format!("select_query:len={}", raw_query.len()));
        Ok(self.select_payload.lock().clone())
    }

    fn delete_query(
        &self,
        handle: InstanceHandle,
        ns_hash: i32,
        raw_query: &[u8],
    ) -> NativeResult<Vec<u8>> {
        self.record(
            handle,
            format!("delete_query:{ns_hash}:len={}", raw_query.len()),
        );
        Ok(Vec::new())
    }

    fn put_meta(
        &self,
        handle: InstanceHandle,
        namespace: &str,
        key: &str,
        data: &str,
    ) -> NativeResult<()> {
        self.record(handle, format!("put_meta:{namespace}:{key}"));
        self.meta
            .lock()
            .insert(format!("{namespace}/{key}"), data.as_bytes().to_vec());
        Ok(())
    }

    fn get_meta(
        &self,
        handle: InstanceHandle,
        namespace: &str,
        key: &str,
    ) -> NativeResult<Vec<u8>> {
        self.record(handle, format!("get_meta:{namespace}:{key}"));
        Ok(self
            .meta
            .lock()
            .get(&format!("{namespace}/{key}"))
            .cloned()
            .unwrap_or_default())
    }

    fn commit(&self, handle: InstanceHandle, namespace: &str) -> NativeResult<()> {
        self.record(handle, format!("commit:{namespace}"));
        Ok(())
    }

    fn set_logger(
        &self,
        handle: InstanceHandle,
        logger: Option<Arc<dyn EngineLogger>>,
    ) -> NativeResult<()> {
        self.record(handle, format!("set_logger:{}", logger.is_some()));
        *self.logger.lock() = logger;
        Ok(())
    }

    fn ping(&self, handle: InstanceHandle) -> NativeResult<()> {
        self.record(handle, "ping".to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn readiness_is_monotonic() {
        let engine = MockEngine::new();
        assert!(!engine.is_ready());

        engine.set_ready_after(Duration::ZERO);
        assert!(engine.is_ready());
        assert!(engine.is_ready());
    }

    #[test]
    fn acquisition_records_credentials() {
        let engine = MockEngine::new();
        let handle = engine
            .acquire_instance("127.0.0.1:6534", "root", "secret")
            .unwrap();
        assert!(handle.is_valid());
        assert_eq!(engine.acquire_count(), 1);
        assert_eq!(
            engine.acquire_args(),
            Some(("127.0.0.1:6534".into(), "root".into(), "secret".into()))
        );
    }

    #[test]
    fn start_failure_injection() {
        let engine = MockEngine::new();
        engine.fail_start_with("bad storage path", 3);
        let err = engine.start_server("{}").unwrap_err();
        assert_eq!(err.code(), Some(3));
        assert_eq!(engine.start_count(), 1);
    }

    #[test]
    fn meta_round_trips() {
        let engine = MockEngine::new();
        let handle = InstanceHandle::from_token(1);
        engine.put_meta(handle, "items", "version", "7").unwrap();
        assert_eq!(engine.get_meta(handle, "items", "version").unwrap(), b"7");
        assert_eq!(engine.get_meta(handle, "items", "missing").unwrap(), b"");
    }
}
