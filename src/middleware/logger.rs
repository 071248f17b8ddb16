use crate::handler::{handler, HandlerFunc};
use std::time::Instant;

/// Logs one line per request once the rest of the chain has finished.
pub fn logger() -> HandlerFunc {
    handler(|c| {
        Box::pin(async move {
            let start = Instant::now();
            c.next().await;
            let latency = start.elapsed();

            tracing::info!(
                method = %c.method(),
                path = c.path(),
                status = c.status_code().as_u16(),
                latency = ?latency,
                query = c.uri().query().unwrap_or_default(),
                ip = %c.client_ip(),
                user_agent = c.user_agent().unwrap_or_default(),
                "request served"
            );
        })
    })
}
