//! Operation shape descriptors fed into marshaller construction.

use crate::ffi::RawOperationInfo;
use serde::Serialize;
use std::os::raw::c_int;

/// HTTP method carried by a marshalled request.
///
/// Discriminants are fixed by the SDK ABI and never renumbered.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
    Head = 4,
    Patch = 5,
}

impl HttpMethod {
    pub(crate) fn code(self) -> c_int {
        self as c_int
    }

    pub(crate) fn from_code(code: c_int) -> Option<Self> {
        match code {
            0 => Some(HttpMethod::Get),
            1 => Some(HttpMethod::Post),
            2 => Some(HttpMethod::Put),
            3 => Some(HttpMethod::Delete),
            4 => Some(HttpMethod::Head),
            5 => Some(HttpMethod::Patch),
            _ => None,
        }
    }
}

/// Immutable description of the operation shape a marshaller is built for.
///
/// Built once at load time through [`OperationInfo::builder`] and shared
/// read-only across every later invocation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OperationInfo {
    has_payload_members: bool,
    http_method: HttpMethod,
}

impl OperationInfo {
    /// Starts describing an operation shape.
    pub fn builder() -> OperationInfoBuilder {
        OperationInfoBuilder::default()
    }

    /// Whether the operation carries payload members.
    pub fn has_payload_members(&self) -> bool {
        self.has_payload_members
    }

    /// HTTP method of the operation.
    pub fn http_method(&self) -> HttpMethod {
        self.http_method
    }

    pub(crate) fn to_raw(self) -> RawOperationInfo {
        RawOperationInfo {
            has_payload_members: self.has_payload_members as u8,
            http_method: self.http_method.code(),
        }
    }
}

/// Builder for [`OperationInfo`].
#[derive(Debug, Clone, Copy)]
pub struct OperationInfoBuilder {
    has_payload_members: bool,
    http_method: HttpMethod,
}

impl Default for OperationInfoBuilder {
    fn default() -> Self {
        OperationInfoBuilder {
            has_payload_members: false,
            http_method: HttpMethod::Get,
        }
    }
}

impl OperationInfoBuilder {
    pub fn has_payload_members(mut self, value: bool) -> Self {
        self.has_payload_members = value;
        self
    }

    pub fn http_method(mut self, method: HttpMethod) -> Self {
        self.http_method = method;
        self
    }

    pub fn build(self) -> OperationInfo {
        OperationInfo {
            has_payload_members: self.has_payload_members,
            http_method: self.http_method,
        }
    }
}
