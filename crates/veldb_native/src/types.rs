//! Value types crossing the native boundary.

use std::ffi::{c_char, c_void};

/// Borrowed string view passed into the engine.
///
/// The engine reads `n` bytes of UTF-8 starting at `p`; the bytes are
/// not NUL-terminated and stay owned by the caller for the duration of
/// the call.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VeldbString {
    /// Pointer to the first byte.
    pub p: *const u8,
    /// Byte length.
    pub n: i32,
}

impl VeldbString {
    /// Creates a view over a Rust string slice.
    ///
    /// The view borrows `s`; it must not outlive the call it is passed
    /// to.
    pub fn new(s: &str) -> Self {
        Self {
            p: s.as_ptr(),
            n: s.len() as i32,
        }
    }
}

/// Status returned by status-bearing engine exports.
///
/// A null `what` denotes success. A non-null `what` points to a
/// NUL-terminated message owned by the engine's allocator; ownership
/// transfers to the receiver, which must release it through
/// `veldb_free_error` exactly once.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VeldbStatus {
    /// Numeric error code; meaningful only when `what` is non-null.
    pub code: i32,
    /// Message pointer, or null on success.
    pub what: *const c_char,
}

impl VeldbStatus {
    /// A success status.
    pub const OK: Self = Self {
        code: 0,
        what: std::ptr::null(),
    };
}

/// Byte buffer crossing the boundary in either direction.
///
/// Buffers passed into the engine stay owned by the caller for the
/// duration of the call. Buffers returned by the engine are owned by
/// its allocator and must be released through `veldb_free_buffer`
/// after their contents are copied out.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VeldbBuffer {
    /// Pointer to the first byte, or null when empty.
    pub data: *const u8,
    /// Byte length.
    pub len: i32,
}

impl VeldbBuffer {
    /// An empty buffer, used to initialize out-parameters.
    pub const EMPTY: Self = Self {
        data: std::ptr::null(),
        len: 0,
    };
}

/// Opaque token identifying a running engine instance.
///
/// Produced by instance acquisition and owned by exactly one delegate
/// binding afterward. The engine guarantees the token stays valid until
/// process shutdown; a zero token is the engine's "no instance" value
/// and must never be used for data-plane calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstanceHandle(usize);

impl InstanceHandle {
    /// The invalid "no instance" token.
    pub const NULL: Self = Self(0);

    /// Wraps a raw instance pointer returned by the engine.
    pub fn from_raw(ptr: *mut c_void) -> Self {
        Self(ptr as usize)
    }

    /// Creates a handle from a raw token value.
    ///
    /// Intended for tests and mock runtimes.
    pub fn from_token(token: usize) -> Self {
        Self(token)
    }

    /// Returns the handle as a raw pointer for boundary calls.
    pub fn as_raw(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    /// Returns the raw token value.
    pub fn token(self) -> usize {
        self.0
    }

    /// Returns true unless this is the engine's "no instance" token.
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Options applied when opening a namespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamespaceOpts {
    /// Whether the namespace is backed by on-disk storage.
    pub enable_storage: bool,
    /// Drop and recreate the namespace if its on-disk format is
    /// unreadable.
    pub drop_on_file_format_error: bool,
    /// Item cache mode.
    pub cache_mode: u8,
}

/// Flag set attached to an index definition.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOpts {
    /// Index over array values.
    pub is_array: bool,
    /// Primary key index.
    pub is_pk: bool,
    /// Dense layout.
    pub is_dense: bool,
    /// Sparse index (field may be absent).
    pub is_sparse: bool,
}

/// Definition of an index passed to the engine.
#[derive(Debug, Clone)]
pub struct IndexDef {
    /// Index name.
    pub name: String,
    /// JSON path of the indexed field.
    pub json_path: String,
    /// Index structure, e.g. `hash` or `tree`.
    pub index_type: String,
    /// Indexed field type, e.g. `int` or `string`.
    pub field_type: String,
    /// Index flags.
    pub opts: IndexOpts,
    /// Collation mode for string comparison.
    pub collate_mode: i32,
    /// Custom sort order, empty for default.
    pub sort_order: String,
}

impl IndexDef {
    /// Serializes the definition to the JSON document the engine's
    /// `veldb_add_index` export expects.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "name": self.name,
            "json_path": self.json_path,
            "index_type": self.index_type,
            "field_type": self.field_type,
            "opts": {
                "is_array": self.opts.is_array,
                "is_pk": self.opts.is_pk,
                "is_dense": self.opts.is_dense,
                "is_sparse": self.opts.is_sparse,
            },
            "collate_mode": self.collate_mode,
            "sort_order": self.sort_order,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_view_borrows_bytes() {
        let s = "events";
        let view = VeldbString::new(s);
        assert_eq!(view.p, s.as_ptr());
        assert_eq!(view.n, 6);
    }

    #[test]
    fn null_handle_is_invalid() {
        assert!(!InstanceHandle::NULL.is_valid());
        assert!(InstanceHandle::from_token(0x10).is_valid());
    }

    #[test]
    fn handle_round_trips_through_raw() {
        let handle = InstanceHandle::from_token(0xDEAD);
        assert_eq!(InstanceHandle::from_raw(handle.as_raw()), handle);
    }

    #[test]
    fn ok_status_has_null_message() {
        assert!(VeldbStatus::OK.what.is_null());
        assert_eq!(VeldbStatus::OK.code, 0);
    }

    #[test]
    fn index_def_serializes_flags() {
        let def = IndexDef {
            name: "id".into(),
            json_path: "id".into(),
            index_type: "hash".into(),
            field_type: "int".into(),
            opts: IndexOpts {
                is_pk: true,
                ..IndexOpts::default()
            },
            collate_mode: 0,
            sort_order: String::new(),
        };
        let json: serde_json::Value = serde_json::from_str(&def.to_json()).unwrap();
        assert_eq!(json["name"], "id");
        assert_eq!(json["opts"]["is_pk"], true);
        assert_eq!(json["opts"]["is_array"], false);
    }
}
