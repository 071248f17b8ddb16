use crate::error::{Error, ErrorKind};
use percent_encoding::percent_decode_str;

pub(crate) fn percent_decode_request_path(val: &str) -> crate::Result<String> {
    percent_decode_str(val)
        .decode_utf8()
        .map_err(|e| Error::new(ErrorKind::InvalidRequest, format!("Couldn't percent decode request path: {}", e)).into())
        .map(|val| val.to_string())
}

/// Key under which the handler list of a `method` + `pattern` registration is stored.
pub(crate) fn route_key(method: &http::Method, pattern: &str) -> String {
    format!("{}-{}", method, pattern)
}

pub(crate) fn join_paths(base: &str, rest: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), rest.trim_start_matches('/'))
}
