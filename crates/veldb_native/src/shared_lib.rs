//! Production engine runtime backed by the VelDB shared library.

use crate::error::{status_to_result, NativeResult};
use crate::runtime::{EngineLogger, EngineRuntime};
use crate::types::{IndexDef, InstanceHandle, NamespaceOpts, VeldbBuffer, VeldbStatus, VeldbString};
use libloading::{Library, Symbol};
use parking_lot::Mutex;
use std::ffi::{c_char, c_void, CStr, OsStr};
use std::sync::{Arc, Once, OnceLock};
use tracing::info;

type InitServerFn = unsafe extern "C" fn();
type StartServerFn = unsafe extern "C" fn(VeldbString) -> VeldbStatus;
type CheckReadyFn = unsafe extern "C" fn() -> i32;
type GetInstanceFn = unsafe extern "C" fn(VeldbString, VeldbString, VeldbString) -> *mut c_void;
type FreeErrorFn = unsafe extern "C" fn(*const c_char);
type FreeBufferFn = unsafe extern "C" fn(VeldbBuffer);
type NsOpFn = unsafe extern "C" fn(*mut c_void, VeldbString) -> VeldbStatus;
type OpenNamespaceFn = unsafe extern "C" fn(*mut c_void, VeldbString, u8, u8, u8) -> VeldbStatus;
type NsIndexOpFn = unsafe extern "C" fn(*mut c_void, VeldbString, VeldbString) -> VeldbStatus;
type ConfigureIndexFn =
    unsafe extern "C" fn(*mut c_void, VeldbString, VeldbString, VeldbString) -> VeldbStatus;
type ModifyItemFn =
    unsafe extern "C" fn(*mut c_void, i32, VeldbBuffer, i32, *mut VeldbBuffer) -> VeldbStatus;
type SelectFn = unsafe extern "C" fn(
    *mut c_void,
    VeldbString,
    u8,
    *const i32,
    i32,
    i32,
    *mut VeldbBuffer,
) -> VeldbStatus;
type SelectQueryFn = unsafe extern "C" fn(
    *mut c_void,
    VeldbBuffer,
    u8,
    *const i32,
    i32,
    i32,
    *mut VeldbBuffer,
) -> VeldbStatus;
type DeleteQueryFn =
    unsafe extern "C" fn(*mut c_void, i32, VeldbBuffer, *mut VeldbBuffer) -> VeldbStatus;
type PutMetaFn =
    unsafe extern "C" fn(*mut c_void, VeldbString, VeldbString, VeldbString) -> VeldbStatus;
type GetMetaFn =
    unsafe extern "C" fn(*mut c_void, VeldbString, VeldbString, *mut VeldbBuffer) -> VeldbStatus;
type LogWriterFn = unsafe extern "C" fn(i32, *const c_char);
type EnableLoggingFn = unsafe extern "C" fn(*mut c_void, LogWriterFn) -> VeldbStatus;
type DisableLoggingFn = unsafe extern "C" fn(*mut c_void) -> VeldbStatus;
type PingFn = unsafe extern "C" fn(*mut c_void) -> VeldbStatus;

/// Exports every build of the engine library must carry. Verified at
/// load time so later lookups cannot fail mid-operation.
const REQUIRED_SYMBOLS: &[&[u8]] = &[
    b"veldb_init_server\0",
    b"veldb_start_server\0",
    b"veldb_check_ready\0",
    b"veldb_get_instance\0",
    b"veldb_free_error\0",
    b"veldb_free_buffer\0",
    b"veldb_open_namespace\0",
    b"veldb_close_namespace\0",
    b"veldb_drop_namespace\0",
    b"veldb_enable_storage\0",
    b"veldb_add_index\0",
    b"veldb_drop_index\0",
    b"veldb_configure_index\0",
    b"veldb_modify_item\0",
    b"veldb_select\0",
    b"veldb_select_query\0",
    b"veldb_delete_query\0",
    b"veldb_put_meta\0",
    b"veldb_get_meta\0",
    b"veldb_commit\0",
    b"veldb_enable_logging\0",
    b"veldb_disable_logging\0",
    b"veldb_ping\0",
];

static GLOBAL: OnceLock<Arc<SharedLibEngine>> = OnceLock::new();
static GLOBAL_LOAD: Mutex<()> = Mutex::new(());
static INIT_SERVER: Once = Once::new();

// The engine exposes one process-wide log writer, so the registered
// receiver lives in a process-wide slot reached by the trampoline.
static LOGGER: Mutex<Option<Arc<dyn EngineLogger>>> = Mutex::new(None);

unsafe extern "C" fn forward_log(level: i32, message: *const c_char) {
    if message.is_null() {
        return;
    }
    let message = CStr::from_ptr(message).to_string_lossy();
    if let Some(logger) = LOGGER.lock().clone() {
        logger.log(level, &message);
    }
}

/// [`EngineRuntime`] implementation over the engine shared library.
///
/// The library is opened once, all required exports are verified, and
/// the engine's process-wide `veldb_init_server` is invoked exactly
/// once per process before any instance can be constructed on top of
/// it.
#[derive(Debug)]
pub struct SharedLibEngine {
    lib: Library,
}

impl SharedLibEngine {
    /// Loads the engine library from `path` and performs the one-time
    /// process-wide engine initialization.
    pub fn load(path: impl AsRef<OsStr>) -> NativeResult<Self> {
        let path = path.as_ref();
        // Safety: the engine library's initializers are limited to
        // setting up its own process-wide state.
        let lib = unsafe { Library::new(path)? };

        for name in REQUIRED_SYMBOLS {
            let _: Symbol<'_, unsafe extern "C" fn()> = unsafe { lib.get(name)? };
        }

        let engine = Self { lib };
        let init: Symbol<'_, InitServerFn> = engine.sym(b"veldb_init_server\0")?;
        INIT_SERVER.call_once(|| unsafe { init() });
        info!(path = %path.to_string_lossy(), "engine library loaded");
        Ok(engine)
    }

    /// Returns the process-wide engine, loading it from `path` on the
    /// first call. Later calls ignore `path` and return the already
    /// loaded engine.
    pub fn global(path: impl AsRef<OsStr>) -> NativeResult<Arc<Self>> {
        if let Some(engine) = GLOBAL.get() {
            return Ok(Arc::clone(engine));
        }
        let _guard = GLOBAL_LOAD.lock();
        if let Some(engine) = GLOBAL.get() {
            return Ok(Arc::clone(engine));
        }
        let engine = Arc::new(Self::load(path)?);
        Ok(Arc::clone(GLOBAL.get_or_init(|| engine)))
    }

    fn sym<T>(&self, name: &[u8]) -> NativeResult<Symbol<'_, T>> {
        // Safety: every name passed here is one of REQUIRED_SYMBOLS,
        // verified against the expected signature at load time.
        unsafe { self.lib.get(name).map_err(Into::into) }
    }

    /// Adapts a status, releasing its message buffer through the
    /// engine's allocator.
    fn adapt(&self, status: VeldbStatus) -> NativeResult<()> {
        let free: Symbol<'_, FreeErrorFn> = self.sym(b"veldb_free_error\0")?;
        // Safety: a non-null `what` is a NUL-terminated message owned
        // by the engine until released below.
        unsafe { status_to_result(status, |what| free(what)) }
    }

    /// Copies an engine-owned result buffer out and releases it.
    fn copy_out(&self, buf: VeldbBuffer) -> NativeResult<Vec<u8>> {
        let free: Symbol<'_, FreeBufferFn> = self.sym(b"veldb_free_buffer\0")?;
        let out = if buf.data.is_null() || buf.len <= 0 {
            Vec::new()
        } else {
            // Safety: the engine guarantees `len` readable bytes at
            // `data` until the buffer is released.
            unsafe { std::slice::from_raw_parts(buf.data, buf.len as usize) }.to_vec()
        };
        unsafe { free(buf) };
        Ok(out)
    }

    fn ns_op(&self, name: &[u8], handle: InstanceHandle, namespace: &str) -> NativeResult<()> {
        let f: Symbol<'_, NsOpFn> = self.sym(name)?;
        let status = unsafe { f(handle.as_raw(), VeldbString::new(namespace)) };
        self.adapt(status)
    }
}

impl EngineRuntime for SharedLibEngine {
    fn start_server(&self, config: &str) -> NativeResult<()> {
        let start: Symbol<'_, StartServerFn> = self.sym(b"veldb_start_server\0")?;
        let status = unsafe { start(VeldbString::new(config)) };
        self.adapt(status)
    }

    fn is_ready(&self) -> bool {
        let Ok(check) = self.sym::<CheckReadyFn>(b"veldb_check_ready\0") else {
            return false;
        };
        unsafe { check() == 1 }
    }

    fn acquire_instance(
        &self,
        host: &str,
        username: &str,
        password: &str,
    ) -> NativeResult<InstanceHandle> {
        let get: Symbol<'_, GetInstanceFn> = self.sym(b"veldb_get_instance\0")?;
        let ptr = unsafe {
            get(
                VeldbString::new(host),
                VeldbString::new(username),
                VeldbString::new(password),
            )
        };
        Ok(InstanceHandle::from_raw(ptr))
    }

    fn open_namespace(
        &self,
        handle: InstanceHandle,
        namespace: &str,
        opts: NamespaceOpts,
    ) -> NativeResult<()> {
        let open: Symbol<'_, OpenNamespaceFn> = self.sym(b"veldb_open_namespace\0")?;
        let status = unsafe {
            open(
                handle.as_raw(),
                VeldbString::new(namespace),
                u8::from(opts.enable_storage),
                u8::from(opts.drop_on_file_format_error),
                opts.cache_mode,
            )
        };
        self.adapt(status)
    }

    fn close_namespace(&self, handle: InstanceHandle, namespace: &str) -> NativeResult<()> {
        self.ns_op(b"veldb_close_namespace\0", handle, namespace)
    }

    fn drop_namespace(&self, handle: InstanceHandle, namespace: &str) -> NativeResult<()> {
        self.ns_op(b"veldb_drop_namespace\0", handle, namespace)
    }

    fn enable_storage(&self, handle: InstanceHandle, namespace: &str) -> NativeResult<()> {
        self.ns_op(b"veldb_enable_storage\0", handle, namespace)
    }

    fn add_index(
        &self,
        handle: InstanceHandle,
        namespace: &str,
        index: &IndexDef,
    ) -> NativeResult<()> {
        let add: Symbol<'_, NsIndexOpFn> = self.sym(b"veldb_add_index\0")?;
        let def = index.to_json();
        let status = unsafe {
            add(
                handle.as_raw(),
                VeldbString::new(namespace),
                VeldbString::new(&def),
            )
        };
        self.adapt(status)
    }

    fn drop_index(&self, handle: InstanceHandle, namespace: &str, index: &str) -> NativeResult<()> {
        let drop: Symbol<'_, NsIndexOpFn> = self.sym(b"veldb_drop_index\0")?;
        let status = unsafe {
            drop(
                handle.as_raw(),
                VeldbString::new(namespace),
                VeldbString::new(index),
            )
        };
        self.adapt(status)
    }

    fn configure_index(
        &self,
        handle: InstanceHandle,
        namespace: &str,
        index: &str,
        config: &str,
    ) -> NativeResult<()> {
        let configure: Symbol<'_, ConfigureIndexFn> = self.sym(b"veldb_configure_index\0")?;
        let status = unsafe {
            configure(
                handle.as_raw(),
                VeldbString::new(namespace),
                VeldbString::new(index),
                VeldbString::new(config),
            )
        };
        self.adapt(status)
    }

    fn modify_item(
        &self,
        handle: InstanceHandle,
        ns_hash: i32,
        data: &[u8],
        mode: i32,
    ) -> NativeResult<Vec<u8>> {
        let modify: Symbol<'_, ModifyItemFn> = self.sym(b"veldb_modify_item\0")?;
        let mut out = VeldbBuffer::EMPTY;
        let input = VeldbBuffer {
            data: data.as_ptr(),
            len: data.len() as i32,
        };
        let status = unsafe { modify(handle.as_raw(), ns_hash, input, mode, &mut out) };
        self.adapt(status)?;
        self.copy_out(out)
    }

    fn select(
        &self,
        handle: InstanceHandle,
        query: &str,
        with_items: bool,
        pt_versions: &[i32],
        fetch_count: i32,
    ) -> NativeResult<Vec<u8>> {
        let select: Symbol<'_, SelectFn> = self.sym(b"veldb_select\0")?;
        let mut out = VeldbBuffer::EMPTY;
        let status = unsafe {
            select(
                handle.as_raw(),
                VeldbString::new(query),
                u8::from(with_items),
                pt_versions.as_ptr(),
                pt_versions.len() as i32,
                fetch_count,
                &mut out,
            )
        };
        self.adapt(status)?;
        self.copy_out(out)
    }

    fn select_query(
        &self,
        handle: InstanceHandle,
        raw_query: &[u8],
        with_items: bool,
        pt_versions: &[i32],
        fetch_count: i32,
    ) -> NativeResult<Vec<u8>> {
        let select: Symbol<'_, SelectQueryFn> = self.sym(b"veldb_select_query\0")?;
        let mut out = VeldbBuffer::EMPTY;
        let input = VeldbBuffer {
            data: raw_query.as_ptr(),
            len: raw_query.len() as i32,
        };
        let status = unsafe {
            select(
                handle.as_raw(),
                input,
                u8::from(with_items),
                pt_versions.as_ptr(),
                pt_versions.len() as i32,
                fetch_count,
                &mut out,
            )
        };
        self.adapt(status)?;
        self.copy_out(out)
    }

    fn delete_query(
        &self,
        handle: InstanceHandle,
        ns_hash: i32,
        raw_query: &[u8],
    ) -> NativeResult<Vec<u8>> {
        let delete: Symbol<'_, DeleteQueryFn> = self.sym(b"veldb_delete_query\0")?;
        let mut out = VeldbBuffer::EMPTY;
        let input = VeldbBuffer {
            data: raw_query.as_ptr(),
            len: raw_query.len() as i32,
        };
        let status = unsafe { delete(handle.as_raw(), ns_hash, input, &mut out) };
        self.adapt(status)?;
        self.copy_out(out)
    }

    fn put_meta(
        &self,
        handle: InstanceHandle,
        namespace: &str,
        key: &str,
        data: &str,
    ) -> NativeResult<()> {
        let put: Symbol<'_, PutMetaFn> = self.sym(b"veldb_put_meta\0")?;
        let status = unsafe {
            put(
                handle.as_raw(),
                VeldbString::new(namespace),
                VeldbString::new(key),
                VeldbString::new(data),
            )
        };
        self.adapt(status)
    }

    fn get_meta(
        &self,
        handle: InstanceHandle,
        namespace: &str,
        key: &str,
    ) -> NativeResult<Vec<u8>> {
        let get: Symbol<'_, GetMetaFn> = self.sym(b"veldb_get_meta\0")?;
        let mut out = VeldbBuffer::EMPTY;
        let status = unsafe {
            get(
                handle.as_raw(),
                VeldbString::new(namespace),
                VeldbString::new(key),
                &mut out,
            )
        };
        self.adapt(status)?;
        self.copy_out(out)
    }

    fn commit(&self, handle: InstanceHandle, namespace: &str) -> NativeResult<()> {
        self.ns_op(b"veldb_commit\0", handle, namespace)
    }

    fn set_logger(
        &self,
        handle: InstanceHandle,
        logger: Option<Arc<dyn EngineLogger>>,
    ) -> NativeResult<()> {
        match logger {
            Some(logger) => {
                *LOGGER.lock() = Some(logger);
                let enable: Symbol<'_, EnableLoggingFn> = self.sym(b"veldb_enable_logging\0")?;
                let status = unsafe { enable(handle.as_raw(), forward_log) };
                self.adapt(status)
            }
            None => {
                // Stop the engine calling the trampoline before the
                // receiver is dropped.
                let disable: Symbol<'_, DisableLoggingFn> = self.sym(b"veldb_disable_logging\0")?;
                let status = unsafe { disable(handle.as_raw()) };
                let result = self.adapt(status);
                *LOGGER.lock() = None;
                result
            }
        }
    }

    fn ping(&self, handle: InstanceHandle) -> NativeResult<()> {
        let ping: Symbol<'_, PingFn> = self.sym(b"veldb_ping\0")?;
        let status = unsafe { ping(handle.as_raw()) };
        self.adapt(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NativeError;

    #[test]
    fn missing_library_is_a_library_error() {
        let err = SharedLibEngine::load("/nonexistent/libveldb_server.so").unwrap_err();
        assert!(matches!(err, NativeError::Library(_)));
    }
}
