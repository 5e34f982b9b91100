//! Error types and the status adapter for the native boundary.

use crate::types::VeldbStatus;
use std::ffi::{c_char, CStr};
use thiserror::Error;

/// Result type for native boundary operations.
pub type NativeResult<T> = Result<T, NativeError>;

/// Errors produced at the native boundary.
#[derive(Debug, Error)]
pub enum NativeError {
    /// Message-bearing status returned by the engine.
    #[error("veldb: {message} (code {code})")]
    Engine {
        /// Message decoded from the status buffer.
        message: String,
        /// Numeric code carried by the status.
        code: i32,
    },

    /// The engine shared library could not be loaded or resolved.
    #[error("engine library error: {0}")]
    Library(#[from] libloading::Error),
}

impl NativeError {
    /// Creates an engine error from a decoded message and code.
    pub fn engine(message: impl Into<String>, code: i32) -> Self {
        Self::Engine {
            message: message.into(),
            code,
        }
    }

    /// Returns the numeric engine code, if this is an engine error.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Engine { code, .. } => Some(*code),
            Self::Library(_) => None,
        }
    }
}

/// Converts a status returned across the native boundary into a result.
///
/// A null `what` denotes success and releases nothing. A non-null
/// `what` transfers ownership of the message buffer to this call for
/// its duration: the message is decoded, `release` is invoked on the
/// buffer exactly once, and the decoded message and numeric code are
/// carried in the returned error.
///
/// # Safety
///
/// When `status.what` is non-null it must point to a NUL-terminated
/// string that remains valid until `release` is called on it.
pub unsafe fn status_to_result<F>(status: VeldbStatus, release: F) -> NativeResult<()>
where
    F: FnOnce(*const c_char),
{
    if status.what.is_null() {
        return Ok(());
    }
    let message = CStr::from_ptr(status.what).to_string_lossy().into_owned();
    release(status.what);
    Err(NativeError::Engine {
        message,
        code: status.code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::ffi::CString;

    #[test]
    fn null_message_is_success_and_releases_nothing() {
        let released = Cell::new(0u32);
        let result = unsafe { status_to_result(VeldbStatus::OK, |_| released.set(released.get() + 1)) };
        assert!(result.is_ok());
        assert_eq!(released.get(), 0);
    }

    #[test]
    fn message_is_decoded_and_released_exactly_once() {
        let what = CString::new("namespace is locked").unwrap();
        let status = VeldbStatus {
            code: 7,
            what: what.as_ptr(),
        };

        let released = Cell::new(0u32);
        let err = unsafe { status_to_result(status, |ptr| {
            assert_eq!(ptr, what.as_ptr());
            released.set(released.get() + 1);
        }) }
        .unwrap_err();

        assert_eq!(released.get(), 1);
        assert_eq!(err.code(), Some(7));
        assert_eq!(err.to_string(), "veldb: namespace is locked (code 7)");
    }

    #[test]
    fn non_zero_code_with_null_message_is_still_success() {
        // The message pointer, not the code, decides success.
        let status = VeldbStatus {
            code: 42,
            what: std::ptr::null(),
        };
        let result = unsafe { status_to_result(status, |_| panic!("released on success path")) };
        assert!(result.is_ok());
    }
}
