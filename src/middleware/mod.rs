//! Ready-made middleware.
//!
//! Every middleware here is an ordinary [`HandlerFunc`](../type.HandlerFunc.html) and is installed
//! with [`Engine::middleware`](../struct.Engine.html#method.middleware) or
//! [`RouteGroup::middleware`](../struct.RouteGroup.html#method.middleware). Order matters: a
//! middleware only observes what runs after it, so [`recovery`] placed last catches panics of the
//! route handlers but not of a middleware registered before it.
//!
//! # Examples
//!
//! ```
//! use gee::{middleware, Engine};
//!
//! let mut app = Engine::new();
//! app.middleware([middleware::cors(), middleware::logger(), middleware::recovery()]);
//! ```

pub use self::cors::cors;
pub use self::logger::logger;
pub use self::recovery::recovery;

mod cors;
mod logger;
mod recovery;
