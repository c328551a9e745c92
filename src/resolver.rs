//! Bind-once resolution of the SDK's marshaller construction path.
//!
//! Discovery runs at most once per resolver: the first call walks the SDK's
//! builder sequence through dynamically-resolved entry points and caches
//! either a [`BoundFactory`] or the fact that resolution failed. The state
//! machine is `Unresolved -> {Bound, Unavailable}`, one transition, both
//! terminal states held for the life of the resolver. A condition that later
//! makes resolution possible never triggers a retry.
//!
//! The public surface is total. Every discovery failure, every per-call
//! invocation failure, and every panic inside the sequence collapses into
//! `None`; callers need exactly one absence check and no failure handling
//! beyond it.

use crate::descriptor::{HttpMethod, OperationInfo};
use crate::error::{ProbeError, Result};
use crate::ffi::{
    ProtocolFactoryVtable, RawFactoryBuilder, RawOperationInfo, RawProtocolFactory,
    JSON_PROTOCOL_NAME, PLACEHOLDER_ENDPOINT, PROTOCOL_ABI_VERSION, STATUS_OK,
};
use crate::marshaller::ProtocolMarshaller;
use crate::source::{CapabilitySource, ProcessImage, SdkApi};
use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;
use tracing::debug;

lazy_static! {
    /// Operation shape every produced marshaller is bound to: a POST
    /// operation with payload members present.
    static ref OPERATION_INFO: OperationInfo = OperationInfo::builder()
        .has_payload_members(true)
        .http_method(HttpMethod::Post)
        .build();

    /// Process-wide resolver backing [`create_marshaller`].
    static ref RESOLVER: CapabilityResolver =
        CapabilityResolver::new(Box::new(ProcessImage));
}

/// Produces a protocol marshaller through the SDK's own factory, if the
/// fast path could be bound.
///
/// Total function: returns `None` when the fast path is unavailable or when
/// the bound handle fails for this particular call. It never panics and
/// never returns an error. Discovery runs once per process, on first call,
/// and is safe under concurrent first use.
pub fn create_marshaller() -> Option<ProtocolMarshaller> {
    RESOLVER.create_marshaller()
}

/// Bind-once resolver for the marshaller construction path.
///
/// The process-wide instance behind [`create_marshaller`] is wired to
/// [`ProcessImage`]; embedders and tests can construct their own resolver
/// over any [`CapabilitySource`].
pub struct CapabilityResolver {
    source: Box<dyn CapabilitySource>,
    binding: OnceCell<Option<BoundFactory>>,
}

impl CapabilityResolver {
    /// Creates a resolver that will consult `source` on first use.
    pub fn new(source: Box<dyn CapabilitySource>) -> Self {
        CapabilityResolver {
            source,
            binding: OnceCell::new(),
        }
    }

    /// See [`create_marshaller`].
    pub fn create_marshaller(&self) -> Option<ProtocolMarshaller> {
        self.binding
            .get_or_init(|| self.bind())
            .as_ref()
            .and_then(BoundFactory::create_marshaller)
    }

    /// Whether the fast path resolved. Forces discovery if it has not run.
    pub fn is_bound(&self) -> bool {
        self.binding.get_or_init(|| self.bind()).is_some()
    }

    fn bind(&self) -> Option<BoundFactory> {
        match panic::catch_unwind(AssertUnwindSafe(|| discover(self.source.as_ref()))) {
            Ok(Ok(factory)) => {
                debug!("marshaller fast path bound");
                Some(factory)
            }
            Ok(Err(e)) => {
                debug!(error = %e, "marshaller fast path unavailable");
                None
            }
            Err(_) => {
                debug!("marshaller fast path discovery panicked");
                None
            }
        }
    }
}

/// Bound capability handle: resolved function table, constructed factory,
/// and the frozen operation shape. Producing a marshaller needs no further
/// arguments.
struct BoundFactory {
    api: SdkApi,
    factory: NonNull<RawProtocolFactory>,
    operation: RawOperationInfo,
}

// The ABI requires the factory to be immutable and usable from any thread
// once built; the table handle is shared read-only.
unsafe impl Send for BoundFactory {}
unsafe impl Sync for BoundFactory {}

impl BoundFactory {
    fn create_marshaller(&self) -> Option<ProtocolMarshaller> {
        let create = self.api.vtable().create_marshaller?;
        let raw = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
            create(self.factory.as_ptr(), &self.operation)
        }));
        match raw {
            Ok(raw) => match NonNull::new(raw) {
                Some(raw) => Some(ProtocolMarshaller::new(self.api.clone(), raw)),
                None => {
                    debug!("factory produced no marshaller");
                    None
                }
            },
            Err(_) => {
                debug!("create_marshaller call panicked");
                None
            }
        }
    }
}

impl Drop for BoundFactory {
    fn drop(&mut self) {
        if let Some(release) = self.api.vtable().factory_release {
            unsafe { release(self.factory.as_ptr()) };
        }
    }
}

/// Releases an abandoned builder unless ownership was handed to
/// `builder_build`.
struct BuilderGuard<'a> {
    vtable: &'a ProtocolFactoryVtable,
    builder: NonNull<RawFactoryBuilder>,
    armed: bool,
}

impl BuilderGuard<'_> {
    fn ptr(&self) -> *mut RawFactoryBuilder {
        self.builder.as_ptr()
    }

    fn disarm(mut self) -> *mut RawFactoryBuilder {
        self.armed = false;
        self.builder.as_ptr()
    }
}

impl Drop for BuilderGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Some(release) = self.vtable.builder_release {
                unsafe { release(self.builder.as_ptr()) };
            }
        }
    }
}

/// Runs the one-time discovery sequence against `source`.
///
/// Mirrors the construction path the SDK itself uses: obtain a builder from
/// the factory entry point, apply the minimal client configuration, select
/// the JSON protocol variant by name, finalize into a factory. Any failure
/// aborts the whole sequence and releases the partially-built builder.
fn discover(source: &dyn CapabilitySource) -> Result<BoundFactory> {
    let api = source.resolve_factory()?;
    let vtable = api.vtable();

    if vtable.abi_version != PROTOCOL_ABI_VERSION {
        return Err(ProbeError::AbiMismatch {
            expected: PROTOCOL_ABI_VERSION,
            found: vtable.abi_version,
        });
    }

    let builder_new = vtable
        .builder_new
        .ok_or(ProbeError::EntryMissing("builder_new"))?;
    let builder_client_configuration = vtable
        .builder_client_configuration
        .ok_or(ProbeError::EntryMissing("builder_client_configuration"))?;
    let protocol_value_of = vtable
        .protocol_value_of
        .ok_or(ProbeError::EntryMissing("protocol_value_of"))?;
    let builder_protocol = vtable
        .builder_protocol
        .ok_or(ProbeError::EntryMissing("builder_protocol"))?;
    let builder_build = vtable
        .builder_build
        .ok_or(ProbeError::EntryMissing("builder_build"))?;
    if vtable.create_marshaller.is_none() {
        return Err(ProbeError::EntryMissing("create_marshaller"));
    }

    let builder = NonNull::new(unsafe { builder_new() }).ok_or(ProbeError::ConstructionFailed {
        call: "builder_new",
        status: -1,
    })?;
    let builder = BuilderGuard {
        vtable,
        builder,
        armed: true,
    };

    let status =
        unsafe { builder_client_configuration(builder.ptr(), PLACEHOLDER_ENDPOINT.as_ptr()) };
    if status != STATUS_OK {
        return Err(ProbeError::ConstructionFailed {
            call: "builder_client_configuration",
            status,
        });
    }

    let protocol = unsafe { protocol_value_of(JSON_PROTOCOL_NAME.as_ptr()) };
    if protocol < 0 {
        return Err(ProbeError::UnknownProtocol("AWS_JSON"));
    }

    let status = unsafe { builder_protocol(builder.ptr(), protocol) };
    if status != STATUS_OK {
        return Err(ProbeError::ConstructionFailed {
            call: "builder_protocol",
            status,
        });
    }

    // builder_build consumes the builder whether or not it succeeds.
    let factory = unsafe { builder_build(builder.disarm()) };
    let factory = NonNull::new(factory).ok_or(ProbeError::ConstructionFailed {
        call: "builder_build",
        status: -1,
    })?;

    Ok(BoundFactory {
        operation: OPERATION_INFO.to_raw(),
        api,
        factory,
    })
}
