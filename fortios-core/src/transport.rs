//! Transport - Seam between the engine and the device API
//!
//! The engine never talks HTTP itself. A transport moves wire objects to and
//! from the device for one CMDB path; the orchestrator decides what to send.

use std::future::Future;
use std::pin::Pin;

use crate::resource::WireObject;

/// Error raised by a transport
#[derive(Debug)]
pub struct TransportError {
    pub message: String,
    /// HTTP status, when the device answered
    pub status: Option<u16>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            cause: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Device API operations on one CMDB path (e.g., "firewall/policy").
///
/// `vdom` of `None` targets the transport's default virtual domain.
pub trait Transport: Send + Sync {
    /// Create an object. The returned object carries the assigned `mkey`
    /// when the device reports one.
    fn create<'a>(
        &'a self,
        path: &'a str,
        obj: &'a WireObject,
        vdom: Option<&'a str>,
    ) -> BoxFuture<'a, TransportResult<WireObject>>;

    /// Read an object. `Ok(None)` means the device has no such object.
    /// Singletons are read with `mkey` of `None`.
    fn read<'a>(
        &'a self,
        path: &'a str,
        mkey: Option<&'a str>,
        vdom: Option<&'a str>,
    ) -> BoxFuture<'a, TransportResult<Option<WireObject>>>;

    fn update<'a>(
        &'a self,
        path: &'a str,
        mkey: Option<&'a str>,
        obj: &'a WireObject,
        vdom: Option<&'a str>,
    ) -> BoxFuture<'a, TransportResult<WireObject>>;

    fn delete<'a>(
        &'a self,
        path: &'a str,
        mkey: &'a str,
        vdom: Option<&'a str>,
    ) -> BoxFuture<'a, TransportResult<()>>;
}

/// Transport implementation for Box<dyn Transport>
impl Transport for Box<dyn Transport> {
    fn create<'a>(
        &'a self,
        path: &'a str,
        obj: &'a WireObject,
        vdom: Option<&'a str>,
    ) -> BoxFuture<'a, TransportResult<WireObject>> {
        (**self).create(path, obj, vdom)
    }

    fn read<'a>(
        &'a self,
        path: &'a str,
        mkey: Option<&'a str>,
        vdom: Option<&'a str>,
    ) -> BoxFuture<'a, TransportResult<Option<WireObject>>> {
        (**self).read(path, mkey, vdom)
    }

    fn update<'a>(
        &'a self,
        path: &'a str,
        mkey: Option<&'a str>,
        obj: &'a WireObject,
        vdom: Option<&'a str>,
    ) -> BoxFuture<'a, TransportResult<WireObject>> {
        (**self).update(path, mkey, obj, vdom)
    }

    fn delete<'a>(
        &'a self,
        path: &'a str,
        mkey: &'a str,
        vdom: Option<&'a str>,
    ) -> BoxFuture<'a, TransportResult<()>> {
        (**self).delete(path, mkey, vdom)
    }
}
