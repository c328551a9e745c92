//! Capability sources: where the SDK's entry point is looked up.
//!
//! A [`CapabilitySource`] answers one question: can the factory init entry
//! point be resolved, and what function table does it publish. There is one
//! real implementation ([`ProcessImage`]) that reaches into the host process
//! with dynamic symbol lookup, and one null implementation ([`Disabled`])
//! that never resolves anything. Tests and embedders can wire up their own
//! table through [`SdkApi::from_static`].

use crate::error::{ProbeError, Result};
use crate::ffi::{
    FactoryInitFn, ProtocolFactoryVtable, FACTORY_INIT_SYMBOL, PROTOCOL_ABI_VERSION, STATUS_OK,
};
use libloading::Library;
use std::ptr::{self, NonNull};
use std::sync::Arc;

/// Where the SDK's protocol factory entry point is resolved from.
pub trait CapabilitySource: Send + Sync {
    /// Resolves the factory entry point and returns the table it publishes.
    fn resolve_factory(&self) -> Result<SdkApi>;
}

/// Handle to a resolved SDK function table.
///
/// Keeps whatever owns the symbols alive for as long as any factory or
/// marshaller produced through the table exists.
#[derive(Clone)]
pub struct SdkApi {
    vtable: NonNull<ProtocolFactoryVtable>,
    _library: Option<Arc<Library>>,
}

// The table is immutable once published and contains only plain function
// pointers; the backing library handle is reference-counted.
unsafe impl Send for SdkApi {}
unsafe impl Sync for SdkApi {}

impl SdkApi {
    /// Wraps a function table with static storage duration.
    pub fn from_static(vtable: &'static ProtocolFactoryVtable) -> Self {
        SdkApi {
            vtable: NonNull::from(vtable),
            _library: None,
        }
    }

    pub(crate) fn vtable(&self) -> &ProtocolFactoryVtable {
        unsafe { self.vtable.as_ref() }
    }
}

/// Resolves the factory entry point from the current process image.
///
/// The SDK, when present, is already linked into (or loaded by) the host
/// process; no new library is loaded. A missing symbol, a failing init call,
/// or an init call that publishes no table all report the fast path as
/// unavailable.
pub struct ProcessImage;

impl ProcessImage {
    #[cfg(unix)]
    fn open_self() -> Result<Library> {
        Ok(libloading::os::unix::Library::this().into())
    }

    #[cfg(windows)]
    fn open_self() -> Result<Library> {
        libloading::os::windows::Library::this()
            .map(Into::into)
            .map_err(|e| ProbeError::FactoryUnavailable(e.to_string()))
    }
}

impl CapabilitySource for ProcessImage {
    fn resolve_factory(&self) -> Result<SdkApi> {
        let library = Self::open_self()?;

        let vtable = {
            let init = unsafe { library.get::<FactoryInitFn>(FACTORY_INIT_SYMBOL) }
                .map_err(|e| ProbeError::FactoryUnavailable(e.to_string()))?;
            let mut out: *const ProtocolFactoryVtable = ptr::null();
            let status = unsafe { init(PROTOCOL_ABI_VERSION, &mut out) };
            if status != STATUS_OK {
                return Err(ProbeError::ConstructionFailed {
                    call: "factory_init",
                    status,
                });
            }
            out
        };

        let vtable = NonNull::new(vtable as *mut ProtocolFactoryVtable).ok_or_else(|| {
            ProbeError::FactoryUnavailable("factory init published no table".to_string())
        })?;

        Ok(SdkApi {
            vtable,
            _library: Some(Arc::new(library)),
        })
    }
}

/// Null source: discovery always reports the fast path as unavailable.
pub struct Disabled;

impl CapabilitySource for Disabled {
    fn resolve_factory(&self) -> Result<SdkApi> {
        Err(ProbeError::FactoryUnavailable("fast path disabled".to_string()))
    }
}
