//! C ABI contract for the SDK's JSON protocol factory fast path.
//!
//! The networking SDK, when it is linked into the host process, publishes a
//! single entry point ([`FACTORY_INIT_SYMBOL`]) that fills a versioned table
//! of function pointers covering its internal marshaller construction path.
//! This module pins down that contract: the table layout, the raw structs
//! that cross the boundary, the status-code convention, and every name this
//! crate resolves dynamically.
//!
//! The construction path is not a stable interface of the SDK and can change
//! shape between releases. The table carries an explicit revision
//! ([`PROTOCOL_ABI_VERSION`]); the resolver treats any mismatch as "fast
//! path unavailable".

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::ptr;

/// Name of the init entry point resolved in the process image.
pub const FACTORY_INIT_SYMBOL: &[u8] = b"SdkJsonProtocolFactoryInit\0";

/// Function-table revision this crate binds against.
pub const PROTOCOL_ABI_VERSION: u32 = 2;

/// Enum name of the JSON-RPC protocol variant, looked up by string so a
/// rename upstream degrades to absence instead of binding the wrong variant.
pub const JSON_PROTOCOL_NAME: &CStr = c"AWS_JSON";

/// Endpoint supplied to the factory builder. The factory mandates a
/// non-empty endpoint even though no network call is ever made against it;
/// this value is syntactically valid and semantically inert.
pub const PLACEHOLDER_ENDPOINT: &CStr = c"http://empty";

/// Status code returned by table calls on success.
pub const STATUS_OK: c_int = 0;

/// Opaque protocol factory builder.
#[repr(C)]
pub struct RawFactoryBuilder {
    _opaque: [u8; 0],
}

/// Opaque protocol factory.
#[repr(C)]
pub struct RawProtocolFactory {
    _opaque: [u8; 0],
}

/// Opaque protocol marshaller.
#[repr(C)]
pub struct RawProtocolMarshaller {
    _opaque: [u8; 0],
}

/// Operation shape descriptor as it crosses the ABI.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawOperationInfo {
    /// 1 when the operation carries payload members.
    pub has_payload_members: u8,
    /// HTTP method discriminant (see [`crate::HttpMethod`]).
    pub http_method: c_int,
}

/// Wire-level request as written by the SDK's marshal call.
///
/// All pointer fields are owned by the SDK. The caller copies what it needs
/// and then invokes `release` exactly once; `release` frees the pointed-to
/// memory and resets the fields.
#[repr(C)]
pub struct RawWireRequest {
    /// HTTP method discriminant.
    pub method: c_int,
    /// NUL-terminated request URI.
    pub uri: *const c_char,
    /// Serialized payload, or null when the operation carries none.
    pub payload: *const u8,
    /// Length of `payload` in bytes.
    pub payload_len: usize,
    /// Frees `uri` and `payload`. Null when nothing was written.
    pub release: Option<unsafe extern "C" fn(*mut RawWireRequest)>,
}

impl RawWireRequest {
    /// An out-parameter value with nothing to release.
    pub const fn empty() -> Self {
        RawWireRequest {
            method: -1,
            uri: ptr::null(),
            payload: ptr::null(),
            payload_len: 0,
            release: None,
        }
    }
}

/// Signature of [`FACTORY_INIT_SYMBOL`].
///
/// `init(requested_revision, out_table)` stores a pointer to a table with
/// static storage duration and returns [`STATUS_OK`], or leaves the out
/// pointer untouched and returns a non-zero status when the SDK cannot
/// serve the requested revision.
pub type FactoryInitFn = unsafe extern "C" fn(u32, *mut *const ProtocolFactoryVtable) -> c_int;

/// Function table published by the factory init entry point.
///
/// Every entry is optional; a null entry means the SDK build omits that part
/// of the construction path. `builder_build` consumes the builder whether or
/// not it succeeds; a builder abandoned before `builder_build` must be freed
/// with `builder_release`. The factory returned by `builder_build` is
/// immutable and usable from any thread.
#[repr(C)]
pub struct ProtocolFactoryVtable {
    /// Revision of this table; compared against [`PROTOCOL_ABI_VERSION`].
    pub abi_version: u32,
    /// Allocates a fresh factory builder.
    pub builder_new: Option<unsafe extern "C" fn() -> *mut RawFactoryBuilder>,
    /// Frees a builder that will not be built.
    pub builder_release: Option<unsafe extern "C" fn(*mut RawFactoryBuilder)>,
    /// Applies the minimal client configuration; the endpoint must be
    /// non-empty.
    pub builder_client_configuration:
        Option<unsafe extern "C" fn(*mut RawFactoryBuilder, *const c_char) -> c_int>,
    /// Looks up a protocol variant discriminant by enum name; negative when
    /// the name is unknown.
    pub protocol_value_of: Option<unsafe extern "C" fn(*const c_char) -> c_int>,
    /// Selects the protocol variant on the builder.
    pub builder_protocol: Option<unsafe extern "C" fn(*mut RawFactoryBuilder, c_int) -> c_int>,
    /// Finalizes the builder into a factory, consuming the builder.
    pub builder_build:
        Option<unsafe extern "C" fn(*mut RawFactoryBuilder) -> *mut RawProtocolFactory>,
    /// Frees a factory.
    pub factory_release: Option<unsafe extern "C" fn(*mut RawProtocolFactory)>,
    /// Creates a marshaller for the given operation shape.
    pub create_marshaller: Option<
        unsafe extern "C" fn(
            *mut RawProtocolFactory,
            *const RawOperationInfo,
        ) -> *mut RawProtocolMarshaller,
    >,
    /// Marshals a logical request (target name + payload bytes) into `out`.
    pub marshaller_marshal: Option<
        unsafe extern "C" fn(
            *mut RawProtocolMarshaller,
            *const c_char,
            *const u8,
            usize,
            *mut RawWireRequest,
        ) -> c_int,
    >,
    /// Frees a marshaller.
    pub marshaller_release: Option<unsafe extern "C" fn(*mut RawProtocolMarshaller)>,
}
