//! # VelDB Native
//!
//! The native boundary between Rust callers and the VelDB engine
//! shared library.
//!
//! This crate provides:
//! - C-compatible value types crossing the boundary (`VeldbString`,
//!   `VeldbStatus`, `VeldbBuffer`)
//! - The opaque [`InstanceHandle`] identifying a running engine
//!   instance
//! - The [`EngineRuntime`] trait abstracting the engine's exported
//!   surface, with a [`MockEngine`] for tests
//! - [`SharedLibEngine`], which loads the engine shared library at
//!   runtime and resolves its `veldb_*` exports
//! - The status adapter turning the engine's
//!   message-pointer-or-null convention into `Result`
//!
//! ## Ownership conventions
//!
//! Strings passed into the engine are borrowed for the duration of the
//! call. Error messages and result buffers returned by the engine are
//! owned by the engine's allocator and must be released through the
//! matching `veldb_free_*` export exactly once; the adapter and the
//! buffer helpers in this crate guarantee that.

#![warn(missing_docs)]

mod error;
mod runtime;
mod shared_lib;
mod types;

pub use error::{status_to_result, NativeError, NativeResult};
pub use runtime::{EngineLogger, EngineRuntime, MockEngine};
pub use shared_lib::SharedLibEngine;
pub use types::{IndexDef, IndexOpts, InstanceHandle, NamespaceOpts, VeldbBuffer, VeldbStatus, VeldbString};
