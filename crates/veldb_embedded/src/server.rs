//! Bootstrap of the in-process server and the public binding facade.

use crate::builtin::Builtin;
use crate::error::{BindingError, BindingResult};
use crate::options::{InitOption, ResolvedOptions};
use crate::raw::RawBinding;
use std::ffi::OsStr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use url::Url;
use veldb_native::{EngineLogger, EngineRuntime, IndexDef, NamespaceOpts, SharedLibEngine};

/// Interval between readiness probes.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// An embedded VelDB server plus the binding connected to it.
///
/// Construction is the whole bootstrap: resolving configuration,
/// launching the engine's run loop on its own thread, waiting for
/// readiness, acquiring the instance handle and installing it into the
/// builtin delegate. A value of this type therefore always fronts a
/// fully started engine, and every data-plane method is a pure forward
/// to the delegate.
pub struct EmbeddedServer {
    builtin: Builtin,
}

impl std::fmt::Debug for EmbeddedServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedServer").finish_non_exhaustive()
    }
}

impl EmbeddedServer {
    /// Boots the engine behind `runtime` and binds to it.
    ///
    /// `target` carries the connection host, optional credentials in
    /// its userinfo, and optionally a namespace path; the path is
    /// stripped before the delegate is initialized, since it addresses
    /// a namespace rather than the server.
    ///
    /// Blocks until the engine reports ready or the startup timeout
    /// (default 3 minutes, see
    /// [`InitOption::StartupTimeout`]) expires. A failure of the run
    /// loop itself aborts the process: a half-started engine has no
    /// safe state to fall back to.
    pub fn start(
        runtime: Arc<dyn EngineRuntime>,
        target: &Url,
        options: &[InitOption],
    ) -> BindingResult<Self> {
        let resolved = ResolvedOptions::resolve(options);
        // Configuration problems must surface before anything starts.
        let document = resolved.config.to_document()?;

        debug!(timeout = ?resolved.startup_timeout, "starting embedded server");
        let run_loop = Arc::clone(&runtime);
        thread::Builder::new()
            .name("veldb-run-loop".into())
            .spawn(move || {
                if let Err(err) = run_loop.start_server(&document) {
                    error!(error = %err, "engine run loop failed, aborting");
                    std::process::abort();
                }
            })?;

        let launched = Instant::now();
        let deadline = launched + resolved.startup_timeout;
        while !runtime.is_ready() {
            if Instant::now() >= deadline {
                return Err(BindingError::StartupTimeout {
                    waited: launched.elapsed(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
        info!(elapsed = ?launched.elapsed(), "engine ready");

        let host = host_of(target)?;
        let password = target.password().unwrap_or("");
        let handle = runtime.acquire_instance(&host, target.username(), password)?;
        if !handle.is_valid() {
            return Err(BindingError::InvalidHandle);
        }

        // The path addresses a namespace, not the server.
        let mut delegate_target = target.clone();
        delegate_target.set_path("");
        let builtin = Builtin::new(runtime, handle, delegate_target);
        info!(host = %host, "instance handed off to builtin binding");
        Ok(Self { builtin })
    }

    /// Boots the engine from its shared library and binds to it.
    ///
    /// The library is loaded process-wide on first use; later servers
    /// reuse the already loaded engine.
    pub fn start_with_library(
        lib_path: impl AsRef<OsStr>,
        target: &Url,
        options: &[InitOption],
    ) -> BindingResult<Self> {
        let engine = SharedLibEngine::global(lib_path)?;
        Self::start(engine, target, options)
    }

    /// The connection target the delegate was initialized with.
    pub fn target(&self) -> &Url {
        self.builtin.target()
    }

    /// The builtin binding owning the engine instance.
    pub fn builtin(&self) -> &Builtin {
        &self.builtin
    }
}

impl RawBinding for EmbeddedServer {
    fn open_namespace(&self, namespace: &str, opts: NamespaceOpts) -> BindingResult<()> {
        self.builtin.open_namespace(namespace, opts)
    }

    fn close_namespace(&self, namespace: &str) -> BindingResult<()> {
        self.builtin.close_namespace(namespace)
    }

    fn drop_namespace(&self, namespace: &str) -> BindingResult<()> {
        self.builtin.drop_namespace(namespace)
    }

    fn enable_storage(&self, namespace: &str) -> BindingResult<()> {
        self.builtin.enable_storage(namespace)
    }

    fn add_index(&self, namespace: &str, index: &IndexDef) -> BindingResult<()> {
        self.builtin.add_index(namespace, index)
    }

    fn drop_index(&self, namespace: &str, index: &str) -> BindingResult<()> {
        self.builtin.drop_index(namespace, index)
    }

    fn configure_index(&self, namespace: &str, index: &str, config: &str) -> BindingResult<()> {
        self.builtin.configure_index(namespace, index, config)
    }

    fn modify_item(&self, ns_hash: i32, data: &[u8], mode: i32) -> BindingResult<Vec<u8>> {
        self.builtin.modify_item(ns_hash, data, mode)
    }

    fn select(
        &self,
        query: &str,
        with_items: bool,
        pt_versions: &[i32],
        fetch_count: i32,
    ) -> BindingResult<Vec<u8>> {
        self.builtin.select(query, with_items, pt_versions, fetch_count)
    }

    fn select_query(
        &self,
        raw_query: &[u8],
        with_items: bool,
        pt_versions: &[i32],
        fetch_count: i32,
    ) -> BindingResult<Vec<u8>> {
        self.builtin
            .select_query(raw_query, with_items, pt_versions, fetch_count)
    }

    fn delete_query(&self, ns_hash: i32, raw_query: &[u8]) -> BindingResult<Vec<u8>> {
        self.builtin.delete_query(ns_hash, raw_query)
    }

    fn put_meta(&self, namespace: &str, key: &str, data: &str) -> BindingResult<()> {
        self.builtin.put_meta(namespace, key, data)
    }

    fn get_meta(&self, namespace: &str, key: &str) -> BindingResult<Vec<u8>> {
        self.builtin.get_meta(namespace, key)
    }

    fn commit(&self, namespace: &str) -> BindingResult<()> {
        self.builtin.commit(namespace)
    }

    fn enable_logger(&self, logger: Arc<dyn EngineLogger>) -> BindingResult<()> {
        self.builtin.enable_logger(logger)
    }

    fn disable_logger(&self) -> BindingResult<()> {
        self.builtin.disable_logger()
    }

    fn ping(&self) -> BindingResult<()> {
        self.builtin.ping()
    }
}

/// Extracts the `host[:port]` the engine should be addressed by.
fn host_of(target: &Url) -> BindingResult<String> {
    let host = target
        .host_str()
        .ok_or_else(|| BindingError::InvalidTarget(format!("no host in `{target}`")))?;
    Ok(match target.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_includes_port_when_present() {
        let target = Url::parse("veldb://127.0.0.1:6534/db").unwrap();
        assert_eq!(host_of(&target).unwrap(), "127.0.0.1:6534");

        let target = Url::parse("veldb://example.com").unwrap();
        assert_eq!(host_of(&target).unwrap(), "example.com");
    }

    #[test]
    fn hostless_target_is_rejected() {
        let target = Url::parse("unix:/tmp/veldb.sock").unwrap();
        assert!(matches!(
            host_of(&target),
            Err(BindingError::InvalidTarget(_))
        ));
    }
}
