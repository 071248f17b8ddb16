//! `gee` is a small HTTP framework for [hyper](https://hyper.rs/) built around a per-method segment tree and a
//! cursor-driven middleware chain.
//!
//! `gee`'s core features:
//!
//! - 🌀 Route patterns with named (`:name`) and catch-all (`*name`) segments
//!
//! - 🧅 Middleware that runs code before and after the rest of the chain, or stops it with [`Context::abort`](./struct.Context.html#method.abort)
//!
//! - 🗂 [Route groups](./struct.RouteGroup.html) sharing a path prefix and their own middleware
//!
//! - 🛟 Panic [recovery](./middleware/fn.recovery.html), [request logging](./middleware/fn.logger.html) and [CORS](./middleware/fn.cors.html) out of the box
//!
//! - 🔥 Handlers and middleware may [share state](./struct.Context.html#method.data) and per-request [keys](./struct.Keys.html)
//!
//! ## Basic Example
//!
//! ```no_run
//! use gee::{handler, middleware, Engine};
//! use http::StatusCode;
//!
//! // Define an app state to share it across the route handlers and middlewares.
//! struct State(u64);
//!
//! #[tokio::main]
//! async fn main() -> gee::Result<()> {
//!     let mut app = Engine::builder().data(State(100)).build();
//!
//!     app.get(
//!         "/",
//!         [handler(|c| {
//!             Box::pin(async move {
//!                 let state = c.data::<State>().map(|s| s.0).unwrap_or_default();
//!                 c.string(StatusCode::OK, format!("State value: {}", state));
//!             })
//!         })],
//!     );
//!
//!     let mut v1 = app.group("/v1");
//!     v1.middleware([middleware::logger()]);
//!     v1.get(
//!         "/users/:id",
//!         [handler(|c| {
//!             Box::pin(async move {
//!                 let id = c.param("id").unwrap_or_default().to_owned();
//!                 c.string(StatusCode::OK, format!("Hello {}", id));
//!             })
//!         })],
//!     );
//!
//!     app.run("127.0.0.1:3001").await
//! }
//! ```
//!
//! ## Routing
//!
//! A pattern is a list of `/`-separated segments. A segment starting with `:` matches exactly one path segment and
//! binds it by name; a segment starting with `*` must be the last one and binds the rest of the path, slashes
//! included. `*` on its own matches the rest without binding it.
//!
//! ```
//! use gee::{handler, Engine};
//! use http::StatusCode;
//!
//! let mut app = Engine::new();
//! app.get(
//!     "/assets/*filepath",
//!     [handler(|c| {
//!         Box::pin(async move {
//!             // "/assets/css/a.css" binds "css/a.css"
//!             let file = c.param("filepath").unwrap_or_default().to_owned();
//!             c.string(StatusCode::OK, file);
//!         })
//!     })],
//! );
//! ```
//!
//! Registering the same method and pattern twice appends the second handler list to the first.
//!
//! Lookup walks the tree depth-first and takes the first child that fits, in insertion order. Once a wildcard
//! child exists at some position, a literal registered later at the same position is stored on that wildcard
//! node: after `/p/:id` and then `/p/admin`, both `/p/admin` and `/p/42` reach the `/p/admin` handlers.
//!
//! Requests that match nothing get `404 page not found`.
//!
//! ## Middleware
//!
//! Middleware and route handlers are the same [`HandlerFunc`](./type.HandlerFunc.html). For a request the chain
//! is the global middleware, the middleware of every group whose prefix starts the request path, then the route
//! handlers. [`Context::next`](./struct.Context.html#method.next) runs the rest of the chain and returns when it
//! is done, so code after it sees the final response:
//!
//! ```
//! use gee::{handler, Engine};
//! use std::time::Instant;
//!
//! let mut app = Engine::new();
//! app.middleware([handler(|c| {
//!     Box::pin(async move {
//!         let start = Instant::now();
//!         c.next().await;
//!         println!("{} {} in {:?}", c.status_code(), c.path(), start.elapsed());
//!     })
//! })]);
//! ```
//!
//! A handler that returns without calling `next` does not stop the chain, the following handler runs once it
//! returns. Use [`Context::abort`](./struct.Context.html#method.abort) to stop it.
//!
//! ## Error Handling
//!
//! Route registration never fails on the spot. A malformed pattern is logged and skipped, and the first such
//! error is returned when the engine starts serving, from [`Engine::run`](./struct.Engine.html#method.run) or
//! [`EngineService::new`](./struct.EngineService.html#method.new). Failures are boxed into
//! [`RouteError`](./type.RouteError.html); errors raised by `gee` itself downcast to [`Error`](./struct.Error.html).

pub use self::binding::{Binder, Field, FieldKind, FormSchema, FormValues};
pub use self::context::Context;
pub use self::data_map::Keys;
pub use self::engine::{Engine, EngineBuilder};
pub use self::error::{Error, ErrorKind, RouteError};
pub use self::group::RouteGroup;
pub use self::handler::{handler, HandlerFunc};
pub use self::router::Router;
#[doc(hidden)]
pub use self::service::RequestService;
pub use self::service::RequestServiceBuilder;
pub use self::service::EngineService;
pub use self::tree::Node;
pub use self::types::RouteParams;
pub use futures::future::BoxFuture;

mod binding;
mod constants;
mod context;
mod data_map;
mod engine;
mod error;
mod group;
mod handler;
mod helpers;
pub mod middleware;
mod router;
mod service;
mod static_files;
mod tree;
mod types;

/// A Result type often returned from methods that can have gee errors.
pub type Result<T> = std::result::Result<T, RouteError>;
