//! Common test utilities: an in-process stub SDK implementing the protocol
//! factory ABI, plus capability sources wired to it.
//!
//! The stub mirrors the real construction path closely enough to exercise
//! every discovery step: the builder mandates a non-empty endpoint, the
//! protocol variant is looked up by name, `builder_build` consumes the
//! builder, and every produced object is freed through its release entry.
//! Allocation counters track live SDK objects so lifecycle tests can assert
//! that nothing leaks.

#![allow(dead_code)]

use marshal_probe::error::Result as ProbeResult;
use marshal_probe::ffi::{
    ProtocolFactoryVtable, RawFactoryBuilder, RawOperationInfo, RawProtocolFactory,
    RawProtocolMarshaller, RawWireRequest, PROTOCOL_ABI_VERSION,
};
use marshal_probe::{CapabilitySource, ProbeError, SdkApi};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Live stub builders (created and not yet consumed or released).
pub static LIVE_BUILDERS: AtomicUsize = AtomicUsize::new(0);
/// Live stub factories.
pub static LIVE_FACTORIES: AtomicUsize = AtomicUsize::new(0);
/// Live stub marshallers.
pub static LIVE_MARSHALLERS: AtomicUsize = AtomicUsize::new(0);

const AWS_JSON_DISCRIMINANT: c_int = 7;

#[derive(Default)]
struct StubBuilder {
    endpoint: Option<String>,
    protocol: Option<c_int>,
}

struct StubFactory {
    endpoint: String,
    protocol: c_int,
}

struct StubMarshaller {
    endpoint: String,
    method: c_int,
    has_payload: bool,
}

unsafe extern "C" fn builder_new() -> *mut RawFactoryBuilder {
    LIVE_BUILDERS.fetch_add(1, Ordering::SeqCst);
    Box::into_raw(Box::<StubBuilder>::default()).cast()
}

unsafe extern "C" fn builder_release(builder: *mut RawFactoryBuilder) {
    if !builder.is_null() {
        LIVE_BUILDERS.fetch_sub(1, Ordering::SeqCst);
        drop(Box::from_raw(builder.cast::<StubBuilder>()));
    }
}

unsafe extern "C" fn builder_client_configuration(
    builder: *mut RawFactoryBuilder,
    endpoint: *const c_char,
) -> c_int {
    if builder.is_null() || endpoint.is_null() {
        return 1;
    }
    let endpoint = match CStr::from_ptr(endpoint).to_str() {
        Ok(value) if !value.is_empty() => value.to_owned(),
        // the real factory mandates a non-empty endpoint
        _ => return 2,
    };
    (*builder.cast::<StubBuilder>()).endpoint = Some(endpoint);
    0
}

unsafe extern "C" fn reject_configuration(
    _builder: *mut RawFactoryBuilder,
    _endpoint: *const c_char,
) -> c_int {
    9
}

unsafe extern "C" fn protocol_value_of(name: *const c_char) -> c_int {
    if name.is_null() {
        return -1;
    }
    match CStr::from_ptr(name).to_str() {
        Ok("AWS_JSON") => AWS_JSON_DISCRIMINANT,
        _ => -1,
    }
}

/// Simulates the enum value disappearing in a newer SDK release.
unsafe extern "C" fn protocol_value_of_renamed(_name: *const c_char) -> c_int {
    -1
}

unsafe extern "C" fn builder_protocol(builder: *mut RawFactoryBuilder, protocol: c_int) -> c_int {
    if builder.is_null() || protocol < 0 {
        return 1;
    }
    (*builder.cast::<StubBuilder>()).protocol = Some(protocol);
    0
}

unsafe extern "C" fn builder_build(builder: *mut RawFactoryBuilder) -> *mut RawProtocolFactory {
    if builder.is_null() {
        return ptr::null_mut();
    }
    LIVE_BUILDERS.fetch_sub(1, Ordering::SeqCst);
    let builder = Box::from_raw(builder.cast::<StubBuilder>());
    match (builder.endpoint, builder.protocol) {
        (Some(endpoint), Some(protocol)) => {
            LIVE_FACTORIES.fetch_add(1, Ordering::SeqCst);
            Box::into_raw(Box::new(StubFactory { endpoint, protocol })).cast()
        }
        _ => ptr::null_mut(),
    }
}

unsafe extern "C" fn factory_release(factory: *mut RawProtocolFactory) {
    if !factory.is_null() {
        LIVE_FACTORIES.fetch_sub(1, Ordering::SeqCst);
        drop(Box::from_raw(factory.cast::<StubFactory>()));
    }
}

unsafe extern "C" fn create_marshaller(
    factory: *mut RawProtocolFactory,
    operation: *const RawOperationInfo,
) -> *mut RawProtocolMarshaller {
    if factory.is_null() || operation.is_null() {
        return ptr::null_mut();
    }
    let factory = &*factory.cast::<StubFactory>();
    let operation = &*operation;
    LIVE_MARSHALLERS.fetch_add(1, Ordering::SeqCst);
    Box::into_raw(Box::new(StubMarshaller {
        endpoint: factory.endpoint.clone(),
        method: operation.http_method,
        has_payload: operation.has_payload_members != 0,
    }))
    .cast()
}

unsafe extern "C" fn release_wire_request(request: *mut RawWireRequest) {
    let request = &mut *request;
    if !request.uri.is_null() {
        drop(CString::from_raw(request.uri as *mut c_char));
        request.uri = ptr::null();
    }
    if !request.payload.is_null() {
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
            request.payload as *mut u8,
            request.payload_len,
        )));
        request.payload = ptr::null();
        request.payload_len = 0;
    }
    request.release = None;
}

unsafe extern "C" fn marshaller_marshal(
    marshaller: *mut RawProtocolMarshaller,
    target: *const c_char,
    payload: *const u8,
    payload_len: usize,
    out: *mut RawWireRequest,
) -> c_int {
    if marshaller.is_null() || target.is_null() || out.is_null() {
        return 1;
    }
    let marshaller = &*marshaller.cast::<StubMarshaller>();
    let target = match CStr::from_ptr(target).to_str() {
        Ok(value) => value,
        Err(_) => return 2,
    };
    let body = if payload_len == 0 {
        &[][..]
    } else {
        std::slice::from_raw_parts(payload, payload_len)
    };

    let uri = match CString::new(format!("{}/{}", marshaller.endpoint, target)) {
        Ok(value) => value,
        Err(_) => return 3,
    };

    let out = &mut *out;
    out.method = marshaller.method;
    out.uri = uri.into_raw();
    if marshaller.has_payload {
        // JSON envelope the way the wire protocol wraps operation input
        let envelope = serde_json::json!({
            "target": target,
            "body": String::from_utf8_lossy(body),
        });
        let bytes = envelope.to_string().into_bytes().into_boxed_slice();
        out.payload_len = bytes.len();
        out.payload = Box::into_raw(bytes) as *const u8;
    } else {
        out.payload = ptr::null();
        out.payload_len = 0;
    }
    out.release = Some(release_wire_request);
    0
}

unsafe extern "C" fn marshaller_release(marshaller: *mut RawProtocolMarshaller) {
    if !marshaller.is_null() {
        LIVE_MARSHALLERS.fetch_sub(1, Ordering::SeqCst);
        drop(Box::from_raw(marshaller.cast::<StubMarshaller>()));
    }
}

const FULL_VTABLE: ProtocolFactoryVtable = ProtocolFactoryVtable {
    abi_version: PROTOCOL_ABI_VERSION,
    builder_new: Some(builder_new),
    builder_release: Some(builder_release),
    builder_client_configuration: Some(builder_client_configuration),
    protocol_value_of: Some(protocol_value_of),
    builder_protocol: Some(builder_protocol),
    builder_build: Some(builder_build),
    factory_release: Some(factory_release),
    create_marshaller: Some(create_marshaller),
    marshaller_marshal: Some(marshaller_marshal),
    marshaller_release: Some(marshaller_release),
};

/// Complete, working stub SDK.
pub static VTABLE: ProtocolFactoryVtable = FULL_VTABLE;

/// Table published under an older ABI revision.
pub static VTABLE_OLD_ABI: ProtocolFactoryVtable = ProtocolFactoryVtable {
    abi_version: PROTOCOL_ABI_VERSION - 1,
    ..FULL_VTABLE
};

/// Table with the marshaller-creating entry removed.
pub static VTABLE_NO_CREATE: ProtocolFactoryVtable = ProtocolFactoryVtable {
    create_marshaller: None,
    ..FULL_VTABLE
};

/// Table whose protocol lookup no longer knows any variant name.
pub static VTABLE_RENAMED_PROTOCOL: ProtocolFactoryVtable = ProtocolFactoryVtable {
    protocol_value_of: Some(protocol_value_of_renamed),
    ..FULL_VTABLE
};

/// Table whose builder rejects every client configuration.
pub static VTABLE_REJECTS_CONFIG: ProtocolFactoryVtable = ProtocolFactoryVtable {
    builder_client_configuration: Some(reject_configuration),
    ..FULL_VTABLE
};

/// Capability source wired to a stub table.
pub struct StubSource(pub &'static ProtocolFactoryVtable);

impl CapabilitySource for StubSource {
    fn resolve_factory(&self) -> ProbeResult<SdkApi> {
        Ok(SdkApi::from_static(self.0))
    }
}

/// Source that fails resolution, as if the init symbol were renamed.
pub struct MissingFactory;

impl CapabilitySource for MissingFactory {
    fn resolve_factory(&self) -> ProbeResult<SdkApi> {
        Err(ProbeError::FactoryUnavailable(
            "symbol not found: SdkJsonProtocolFactoryInit".to_string(),
        ))
    }
}

/// Source that counts how many times discovery consulted it.
pub struct CountingSource {
    pub vtable: &'static ProtocolFactoryVtable,
    pub resolutions: Arc<AtomicUsize>,
}

impl CapabilitySource for CountingSource {
    fn resolve_factory(&self) -> ProbeResult<SdkApi> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        Ok(SdkApi::from_static(self.vtable))
    }
}

/// Counting source that always fails resolution.
pub struct CountingMissing {
    pub resolutions: Arc<AtomicUsize>,
}

impl CapabilitySource for CountingMissing {
    fn resolve_factory(&self) -> ProbeResult<SdkApi> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        Err(ProbeError::FactoryUnavailable(
            "symbol not found: SdkJsonProtocolFactoryInit".to_string(),
        ))
    }
}

/// Installs a test subscriber so `RUST_LOG` surfaces probe diagnostics.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
