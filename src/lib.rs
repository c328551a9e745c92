//! Bind-once capability probe for reusing a networking SDK's JSON protocol
//! marshaller inside instrumentation agents.
//!
//! The SDK's marshaller construction path is internal and version-fragile;
//! this crate probes for it instead of linking against it:
//! - One-time discovery via dynamic symbol lookup in the current process
//!   image, walking the SDK's own builder sequence
//! - A cached, zero-argument bound handle: discovery cost is paid once,
//!   never per request
//! - A total accessor: [`create_marshaller`] returns a marshaller or
//!   `None`, and never fails in any other way
//! - Owned, inspectable [`WireRequest`] copies of SDK-marshalled requests
//!
//! Total unavailability of the probed surface is a first-class outcome, not
//! an error: when the SDK is absent or has changed shape, callers fall back
//! to their own default behavior after a single absence check.

pub mod descriptor;
pub mod error;
pub mod ffi;
pub mod marshaller;
pub mod resolver;
pub mod source;

// Re-export commonly used types
pub use descriptor::{HttpMethod, OperationInfo, OperationInfoBuilder};
pub use error::ProbeError;
pub use marshaller::{ProtocolMarshaller, WireRequest};
pub use resolver::{create_marshaller, CapabilityResolver};
pub use source::{CapabilitySource, Disabled, ProcessImage, SdkApi};
