//! Error types for capability discovery.

use std::error::Error as StdError;
use std::fmt;
use std::os::raw::c_int;
use std::result;

/// A specialized Result type for discovery operations.
pub type Result<T> = result::Result<T, ProbeError>;

/// Failures that can occur while binding the SDK's marshaller fast path.
///
/// Every variant collapses into the resolver's "unavailable" terminal state.
/// None of them reach a caller of the public accessor.
#[derive(Debug)]
pub enum ProbeError {
    /// The factory entry point could not be resolved in the process image,
    /// or it published no function table.
    FactoryUnavailable(String),
    /// The SDK publishes a different table revision than this crate binds
    /// against.
    AbiMismatch { expected: u32, found: u32 },
    /// A required function-table entry is missing.
    EntryMissing(&'static str),
    /// The protocol variant name is not known to the SDK.
    UnknownProtocol(&'static str),
    /// A construction call rejected its input or returned nothing.
    ConstructionFailed { call: &'static str, status: c_int },
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::FactoryUnavailable(msg) => {
                write!(f, "Protocol factory unavailable: {}", msg)
            }
            ProbeError::AbiMismatch { expected, found } => {
                write!(
                    f,
                    "Protocol factory ABI mismatch: expected revision {}, found {}",
                    expected, found
                )
            }
            ProbeError::EntryMissing(name) => {
                write!(f, "Protocol factory entry missing: {}", name)
            }
            ProbeError::UnknownProtocol(name) => {
                write!(f, "Unknown protocol variant: {}", name)
            }
            ProbeError::ConstructionFailed { call, status } => {
                write!(f, "Construction call failed: {} returned status {}", call, status)
            }
        }
    }
}

impl StdError for ProbeError {}
