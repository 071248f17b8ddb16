use crate::handler::{handler, HandlerFunc};
use futures::FutureExt;
use http::StatusCode;
use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;

/// Turns a panic in any later handler into a `500 Internal Server Error` for that request.
///
/// Whatever the failed chain wrote so far is discarded and the client receives
/// `{"message":"Internal Server Error"}`. The panic message and a backtrace are logged at error level.
pub fn recovery() -> HandlerFunc {
    handler(|c| {
        Box::pin(async move {
            let result = AssertUnwindSafe(c.next()).catch_unwind().await;

            if let Err(payload) = result {
                let backtrace = Backtrace::force_capture();
                tracing::error!(
                    method = %c.method(),
                    path = c.path(),
                    "handler panicked: {}\n\nTraceback:\n{}",
                    panic_message(payload.as_ref()),
                    backtrace
                );

                c.reset_response();
                c.abort_with_json(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
            }
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}
