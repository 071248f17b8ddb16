use crate::context::Context;
use crate::handler::{handler, HandlerFunc};
use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_METHOD,
    ORIGIN, VARY,
};
use http::{HeaderValue, Method, StatusCode};

const ALLOWED_METHODS: [Method; 5] = [Method::POST, Method::GET, Method::PUT, Method::DELETE, Method::OPTIONS];
const ALLOW_METHODS: &str = "POST, GET, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Content-Length, Token";
const EXPOSE_HEADERS: &str = "Access-Control-Allow-Headers, Token";
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Answers cross-origin requests.
///
/// Requests without an `Origin` header pass through untouched. Cross-origin requests get
/// `Vary: Origin` and the allow headers echoing their origin. A preflight (`OPTIONS` with an `Origin`)
/// never reaches the route: it is answered with `204 No Content`, or with `403 Forbidden` and no
/// allow headers when `Access-Control-Request-Method` names a method outside the allowed set.
pub fn cors() -> HandlerFunc {
    handler(|c| {
        Box::pin(async move {
            let origin = c
                .request_header(ORIGIN.as_str())
                .filter(|origin| !origin.is_empty())
                .map(str::to_owned);
            let Some(origin) = origin else {
                return c.next().await;
            };

            c.append_header(VARY, HeaderValue::from_static("Origin"));

            if c.method() == Method::OPTIONS {
                let requested = c.request_header(ACCESS_CONTROL_REQUEST_METHOD.as_str()).unwrap_or_default();
                if !method_allowed(requested) {
                    c.abort_with_status(StatusCode::FORBIDDEN);
                    return;
                }

                c.header(ACCESS_CONTROL_MAX_AGE.as_str(), PREFLIGHT_MAX_AGE);
                allow_headers(c, &origin);
                c.abort_with_status(StatusCode::NO_CONTENT);
                return;
            }

            allow_headers(c, &origin);
            c.next().await;
        })
    })
}

// An absent request method is not a rejection.
fn method_allowed(requested: &str) -> bool {
    requested.is_empty() || ALLOWED_METHODS.iter().any(|m| m.as_str().eq_ignore_ascii_case(requested))
}

fn allow_headers(c: &mut Context, origin: &str) {
    c.header(ACCESS_CONTROL_ALLOW_ORIGIN.as_str(), origin);
    c.header(ACCESS_CONTROL_ALLOW_METHODS.as_str(), ALLOW_METHODS);
    c.header(ACCESS_CONTROL_ALLOW_HEADERS.as_str(), ALLOW_HEADERS);
    c.header(ACCESS_CONTROL_EXPOSE_HEADERS.as_str(), EXPOSE_HEADERS);
    c.header(ACCESS_CONTROL_ALLOW_CREDENTIALS.as_str(), "true");
}
