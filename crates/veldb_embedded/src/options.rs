//! Startup options for the embedded server.

use crate::config::ServerConfig;
use std::time::Duration;
use tracing::warn;

/// Default deadline for the engine to report readiness.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(3 * 60);

/// Caller-supplied startup directives.
///
/// The option set is shared across binding flavors; variants that are
/// meaningful only to another flavor are logged and ignored here, so a
/// caller can pass one option list to whichever binding it ends up
/// constructing.
#[derive(Debug, Clone)]
pub enum InitOption {
    /// Replaces the built-in default server configuration as a whole
    /// document.
    ServerConfig(ServerConfig),
    /// Overrides the readiness deadline. A zero duration keeps the
    /// default.
    StartupTimeout(Duration),
    /// Connection pool size; meaningful only to the network binding.
    ConnPoolSize(usize),
}

/// The outcome of resolving caller options against built-in defaults.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    /// The fully resolved server configuration.
    pub config: ServerConfig,
    /// The readiness deadline to apply.
    pub startup_timeout: Duration,
}

impl ResolvedOptions {
    /// Resolves caller options against the built-in defaults.
    ///
    /// Options this binding does not recognize are reported at `warn`
    /// and skipped rather than failing startup.
    pub fn resolve(options: &[InitOption]) -> Self {
        let mut config = ServerConfig::default();
        let mut startup_timeout = DEFAULT_STARTUP_TIMEOUT;

        for option in options {
            match option {
                InitOption::ServerConfig(overriding) => config = overriding.clone(),
                InitOption::StartupTimeout(timeout) => {
                    if !timeout.is_zero() {
                        startup_timeout = *timeout;
                    }
                }
                other => warn!(option = ?other, "ignoring option not used by the embedded server"),
            }
        }

        Self {
            config,
            startup_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_options() {
        let resolved = ResolvedOptions::resolve(&[]);
        assert_eq!(resolved.startup_timeout, DEFAULT_STARTUP_TIMEOUT);
        assert_eq!(resolved.config, ServerConfig::default());
    }

    #[test]
    fn config_override_replaces_whole_document() {
        let overriding = ServerConfig::new().with_storage_path("/data/veldb");
        let resolved =
            ResolvedOptions::resolve(&[InitOption::ServerConfig(overriding.clone())]);
        assert_eq!(resolved.config, overriding);
    }

    #[test]
    fn last_option_wins() {
        let first = ServerConfig::new().with_storage_path("/first");
        let second = ServerConfig::new().with_storage_path("/second");
        let resolved = ResolvedOptions::resolve(&[
            InitOption::ServerConfig(first),
            InitOption::ServerConfig(second),
        ]);
        assert_eq!(resolved.config.storage.path, "/second");
    }

    #[test]
    fn zero_timeout_keeps_default() {
        let resolved = ResolvedOptions::resolve(&[InitOption::StartupTimeout(Duration::ZERO)]);
        assert_eq!(resolved.startup_timeout, DEFAULT_STARTUP_TIMEOUT);
    }

    #[test]
    fn timeout_override_applies() {
        let resolved =
            ResolvedOptions::resolve(&[InitOption::StartupTimeout(Duration::from_secs(10))]);
        assert_eq!(resolved.startup_timeout, Duration::from_secs(10));
    }

    #[test]
    fn foreign_options_are_ignored() {
        let resolved = ResolvedOptions::resolve(&[InitOption::ConnPoolSize(8)]);
        assert_eq!(resolved.config, ServerConfig::default());
        assert_eq!(resolved.startup_timeout, DEFAULT_STARTUP_TIMEOUT);
    }
}
