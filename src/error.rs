use std::fmt::{self, Debug, Display, Formatter};

/// The error type used by the route handlers, the middlewares and the service layer.
///
/// Handlers never return errors through the pipeline; this type describes the
/// problems that can happen around it: a malformed route pattern at registration,
/// a request that could not be turned into a [Context](./struct.Context.html), a
/// failed body binding or a listener failure.
pub type RouteError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Broad category of an [`Error`](./struct.Error.html).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A route pattern was rejected at registration time.
    MalformedPattern,
    /// The inbound request could not be decoded.
    InvalidRequest,
    /// Request data could not be bound to the target type.
    Bind,
    /// Filesystem or socket failure.
    Io,
    /// The server could not be started.
    Server,
}

/// A concrete error with a message and an [`ErrorKind`](./enum.ErrorKind.html).
pub struct Error {
    kind: ErrorKind,
    msg: String,
}

impl Error {
    /// Creates a new error instance with the specified kind and message.
    pub fn new<M: Into<String>>(kind: ErrorKind, msg: M) -> Self {
        Error { kind, msg: msg.into() }
    }

    pub(crate) fn malformed_pattern<M: Into<String>>(msg: M) -> Self {
        Error::new(ErrorKind::MalformedPattern, msg)
    }

    pub(crate) fn bind<M: Into<String>>(msg: M) -> Self {
        Error::new(ErrorKind::Bind, msg)
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        self.msg.as_str()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "gee: {}", self.msg)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "gee: {:?}: {}", self.kind, self.msg)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, err.to_string())
    }
}
