use crate::context::Context;
use futures::future::BoxFuture;
use std::sync::Arc;

/// A route handler or a middleware.
///
/// Both share the same shape: an async function over the request [`Context`](./struct.Context.html).
/// A middleware usually calls [`Context::next`](./struct.Context.html#method.next) to run the rest of
/// the chain, a route handler usually writes the response and returns.
pub type HandlerFunc = Arc<dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static>;

/// Wraps a closure into a [`HandlerFunc`](./type.HandlerFunc.html).
///
/// # Examples
///
/// ```
/// use gee::{handler, Engine};
/// use http::StatusCode;
///
/// let mut app = Engine::new();
/// app.get(
///     "/hello/:name",
///     [handler(|c| {
///         Box::pin(async move {
///             let name = c.param("name").unwrap_or_default().to_owned();
///             c.string(StatusCode::OK, format!("hello {}", name));
///         })
///     })],
/// );
/// ```
pub fn handler<F>(f: F) -> HandlerFunc
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    Arc::new(f)
}
