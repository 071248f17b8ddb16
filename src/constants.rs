use std::time::Duration;

// Any cursor value at or beyond this index stops the handler loop.
pub(crate) const ABORT_INDEX: usize = usize::MAX >> 1;

pub(crate) const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) const CATCH_ALL_PARAM: &str = "filepath";

pub(crate) const MIME_TEXT: &str = "text/plain;charset=utf-8";
pub(crate) const MIME_JSON: &str = "application/json;charset=utf-8";
pub(crate) const MIME_HTML: &str = "text/html;charset=utf-8";
pub(crate) const MIME_FORM: &str = "application/x-www-form-urlencoded";

pub(crate) const HEADER_X_FORWARDED_FOR: &str = "x-forwarded-for";
