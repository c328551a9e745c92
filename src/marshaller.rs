//! Wrapper around SDK-produced protocol marshallers.

use crate::descriptor::HttpMethod;
use crate::ffi::{RawProtocolMarshaller, RawWireRequest, STATUS_OK};
use crate::source::SdkApi;
use serde::Serialize;
use std::ffi::{CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;
use std::slice;
use tracing::debug;

/// Wire-level request produced by the SDK's marshaller.
///
/// An owned copy, independent of SDK memory: every field is copied out of
/// the SDK's out-struct before its release callback runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireRequest {
    /// HTTP method of the marshalled request.
    pub method: HttpMethod,
    /// Request URI, rooted at the configured endpoint.
    pub uri: String,
    /// Serialized payload, when the operation shape carries payload members.
    pub payload: Option<Vec<u8>>,
}

impl WireRequest {
    /// Copies the SDK-owned out-struct into an owned value.
    ///
    /// Returns `None` when the SDK wrote something this crate cannot
    /// represent (unknown method code, missing or non-UTF-8 URI).
    unsafe fn from_raw(raw: &RawWireRequest) -> Option<WireRequest> {
        let method = HttpMethod::from_code(raw.method)?;
        if raw.uri.is_null() {
            return None;
        }
        let uri = CStr::from_ptr(raw.uri).to_str().ok()?.to_owned();
        let payload = if raw.payload.is_null() {
            None
        } else {
            Some(slice::from_raw_parts(raw.payload, raw.payload_len).to_vec())
        };
        Some(WireRequest {
            method,
            uri,
            payload,
        })
    }
}

/// A ready-to-use protocol marshaller produced by the resolved factory.
///
/// Turns a logical request description into a [`WireRequest`] using the
/// SDK's own serialization logic. Marshalling is a pure transformation; no
/// network or filesystem access happens here or in the SDK call.
pub struct ProtocolMarshaller {
    api: SdkApi,
    raw: NonNull<RawProtocolMarshaller>,
}

// A marshaller is handed to one request-handling thread and used there;
// ownership moves as a whole.
unsafe impl Send for ProtocolMarshaller {}

impl ProtocolMarshaller {
    pub(crate) fn new(api: SdkApi, raw: NonNull<RawProtocolMarshaller>) -> Self {
        ProtocolMarshaller { api, raw }
    }

    /// Marshals a logical request into a wire-level request.
    ///
    /// Total: a non-OK status, output this crate cannot represent, an
    /// interior NUL in `target`, or a panic inside the call all yield `None`
    /// for this call only. The marshaller stays usable.
    pub fn marshal(&self, target: &str, payload: &[u8]) -> Option<WireRequest> {
        let marshal = self.api.vtable().marshaller_marshal?;
        let target = CString::new(target).ok()?;

        let mut out = RawWireRequest::empty();
        let status = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
            marshal(
                self.raw.as_ptr(),
                target.as_ptr(),
                payload.as_ptr(),
                payload.len(),
                &mut out,
            )
        }));

        let request = match status {
            Ok(status) if status == STATUS_OK => unsafe { WireRequest::from_raw(&out) },
            Ok(status) => {
                debug!(status, "marshal call failed");
                None
            }
            Err(_) => {
                debug!("marshal call panicked");
                None
            }
        };

        unsafe {
            if let Some(release) = out.release {
                release(&mut out);
            }
        }

        request
    }
}

impl Drop for ProtocolMarshaller {
    fn drop(&mut self) {
        if let Some(release) = self.api.vtable().marshaller_release {
            unsafe { release(self.raw.as_ptr()) };
        }
    }
}
