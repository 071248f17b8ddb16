use crate::constants::CATCH_ALL_PARAM;
use crate::engine::Engine;
use crate::handler::HandlerFunc;
use crate::helpers::join_paths;
use crate::static_files;
use crate::tree::validate_pattern;
use http::Method;
use std::fmt::{self, Debug, Formatter};
use std::path::PathBuf;

#[derive(Default)]
pub(crate) struct GroupData {
    pub(crate) prefix: String,
    pub(crate) middlewares: Vec<HandlerFunc>,
}

impl GroupData {
    pub(crate) fn new(prefix: String) -> GroupData {
        GroupData {
            prefix,
            middlewares: Vec::new(),
        }
    }
}

impl Debug for GroupData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{{ prefix: {:?}, middlewares: {} }}", self.prefix, self.middlewares.len())
    }
}

/// A prefix-scoped set of routes sharing middleware.
///
/// Groups are created with [`Engine::group`](./struct.Engine.html#method.group) or nested with
/// [`RouteGroup::group`](#method.group); the prefix of a nested group is its parent's prefix followed
/// by its own. The middleware of every group whose prefix is a textual prefix of the request path
/// runs before the route handlers, in group creation order.
///
/// # Examples
///
/// ```
/// use gee::{handler, Engine};
/// use http::StatusCode;
///
/// let mut app = Engine::new();
/// let mut v1 = app.group("/v1");
/// v1.middleware([handler(|c| Box::pin(async move { c.header("X-Api", "v1") }))]);
/// v1.get(
///     "/users/:id",
///     [handler(|c| Box::pin(async move { c.string(StatusCode::OK, "user") }))],
/// );
/// ```
pub struct RouteGroup<'a> {
    engine: &'a mut Engine,
    index: usize,
}

impl<'a> RouteGroup<'a> {
    pub(crate) fn new(engine: &'a mut Engine, index: usize) -> RouteGroup<'a> {
        RouteGroup { engine, index }
    }

    fn data(&self) -> &GroupData {
        &self.engine.groups[self.index]
    }

    pub fn prefix(&self) -> &str {
        self.data().prefix.as_str()
    }

    /// Creates a child group whose prefix is this group's prefix followed by `prefix`.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        let prefix = format!("{}{}", self.prefix(), prefix);
        self.engine.new_group(prefix)
    }

    /// Appends middleware to this group.
    pub fn middleware<I>(&mut self, middlewares: I) -> &mut Self
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        self.engine.groups[self.index].middlewares.extend(middlewares);
        self
    }

    /// Registers `handlers` for `method` at this group's prefix followed by `pattern`.
    pub fn add_route<I>(&mut self, method: Method, pattern: &str, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        let pattern = format!("{}{}", self.prefix(), pattern);

        if let Err(err) = validate_pattern(&pattern) {
            tracing::error!("rejected route {} {}: {}", method, pattern, err);
            self.engine.record_error(err);
            return self;
        }

        if !self.engine.config.release_mode {
            tracing::debug!("route {:>7} {}", method.as_str(), pattern);
        }

        self.engine.router.add_route(method, &pattern, handlers);
        self
    }

    pub fn get<I: IntoIterator<Item = HandlerFunc>>(&mut self, pattern: &str, handlers: I) -> &mut Self {
        self.add_route(Method::GET, pattern, handlers)
    }

    pub fn post<I: IntoIterator<Item = HandlerFunc>>(&mut self, pattern: &str, handlers: I) -> &mut Self {
        self.add_route(Method::POST, pattern, handlers)
    }

    pub fn put<I: IntoIterator<Item = HandlerFunc>>(&mut self, pattern: &str, handlers: I) -> &mut Self {
        self.add_route(Method::PUT, pattern, handlers)
    }

    pub fn delete<I: IntoIterator<Item = HandlerFunc>>(&mut self, pattern: &str, handlers: I) -> &mut Self {
        self.add_route(Method::DELETE, pattern, handlers)
    }

    pub fn patch<I: IntoIterator<Item = HandlerFunc>>(&mut self, pattern: &str, handlers: I) -> &mut Self {
        self.add_route(Method::PATCH, pattern, handlers)
    }

    pub fn head<I: IntoIterator<Item = HandlerFunc>>(&mut self, pattern: &str, handlers: I) -> &mut Self {
        self.add_route(Method::HEAD, pattern, handlers)
    }

    pub fn options<I: IntoIterator<Item = HandlerFunc>>(&mut self, pattern: &str, handlers: I) -> &mut Self {
        self.add_route(Method::OPTIONS, pattern, handlers)
    }

    /// Serves the files under `root` at `relative_path` within this group.
    ///
    /// Registers `GET <relative_path>/*filepath`. Missing files answer `404 Not Found`.
    pub fn static_files<P: Into<PathBuf>>(&mut self, relative_path: &str, root: P) -> &mut Self {
        let pattern = join_paths(relative_path, &format!("*{}", CATCH_ALL_PARAM));
        let handler = static_files::serve_dir(root.into());
        self.get(&pattern, [handler])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_register_static_route_under_catch_all_param() {
        let mut app = Engine::new();
        app.group("/v1").static_files("/assets/", "./public");

        let (node, params) = app.router().find_route(&Method::GET, "/v1/assets/css/a.css").unwrap();
        assert_eq!(node.pattern(), format!("/v1/assets/*{}", CATCH_ALL_PARAM));
        assert_eq!(params.get(CATCH_ALL_PARAM).map(String::as_str), Some("css/a.css"));
    }

    #[test]
    fn should_concatenate_nested_prefixes() {
        let mut app = Engine::new();
        let mut v1 = app.group("/v1");
        let mut admin = v1.group("/admin");
        assert_eq!(admin.prefix(), "/v1/admin");
        admin.get("/stats", []);

        assert!(app.router().find_route(&Method::GET, "/v1/admin/stats").is_some());
    }
}
