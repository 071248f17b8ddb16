//! Route registration and lookup.
//!
//! Patterns are stored in one segment tree per method, handlers in a flat map keyed by
//! `method-pattern`. A lookup returns the tree node that ended the match; its pattern is the
//! key of the handler list to run and the template the request path is bound against.

use crate::context::Context;
use crate::handler::{handler, HandlerFunc};
use crate::helpers::route_key;
use crate::tree::{parse_pattern, Node};
use crate::types::RouteParams;
use http::{Method, StatusCode};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};

/// Maps `(method, path)` pairs to the handler lists registered for them.
///
/// The router keeps one segment tree per HTTP method and, next to it, the handlers of every
/// `method` + `pattern` registration. It is filled once before serving starts and only read
/// afterwards, so a single instance can serve any number of concurrent requests.
#[derive(Default)]
pub struct Router {
    roots: HashMap<Method, Node>,
    handlers: HashMap<String, Vec<HandlerFunc>>,
}

impl Router {
    pub fn new() -> Router {
        Router::default()
    }

    /// Registers `handlers` for `method` and `pattern`.
    ///
    /// Registering the same method and pattern again appends to the existing handler list.
    pub fn add_route<I>(&mut self, method: Method, pattern: &str, handlers: I)
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        let segments = parse_pattern(pattern);
        let key = route_key(&method, pattern);

        self.roots
            .entry(method)
            .or_insert_with(Node::root)
            .insert(pattern, &segments, 0);
        self.handlers.entry(key).or_default().extend(handlers);
    }

    /// Looks up the route matching `path` and binds its parameters.
    pub fn find_route(&self, method: &Method, path: &str) -> Option<(&Node, RouteParams)> {
        let root = self.roots.get(method)?;
        let actual = parse_pattern(path);
        let node = root.search(&actual, 0)?;

        let registered = parse_pattern(node.pattern());
        let mut params = RouteParams::with_capacity(registered.len());
        for (idx, segment) in registered.iter().enumerate() {
            if let Some(name) = segment.strip_prefix(':') {
                if let Some(val) = actual.get(idx) {
                    params.set(name, *val);
                }
            }

            if let Some(name) = segment.strip_prefix('*') {
                if !name.is_empty() {
                    params.set(name, actual.get(idx..).map(|rest| rest.join("/")).unwrap_or_default());
                }
                break;
            }
        }

        Some((node, params))
    }

    /// The handlers registered under `method` and `pattern`, in registration order.
    pub fn handlers(&self, method: &Method, pattern: &str) -> &[HandlerFunc] {
        self.handlers
            .get(&route_key(method, pattern))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Appends the matched route's handlers, or a not-found handler, to the context and runs
    /// the chain from its start.
    pub async fn handle(&self, c: &mut Context) {
        match self.find_route(c.method(), c.path()) {
            Some((node, params)) => {
                let handlers = self.handlers(c.method(), node.pattern()).to_vec();
                c.set_params(params);
                c.push_handlers(handlers);
            }
            None => c.push_handlers([not_found()]),
        }

        c.next().await;
    }
}

impl Debug for Router {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut routes = self.handlers.keys().collect::<Vec<_>>();
        routes.sort();
        write!(f, "{{ methods: {:?}, routes: {:?} }}", self.roots.keys(), routes)
    }
}

fn not_found() -> HandlerFunc {
    handler(|c| {
        Box::pin(async move {
            c.string(StatusCode::NOT_FOUND, "404 page not found\n");
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn noop() -> HandlerFunc {
        handler(|_| Box::pin(async {}))
    }

    fn say(text: &'static str) -> HandlerFunc {
        handler(move |c| {
            Box::pin(async move {
                c.write(text.as_bytes());
            })
        })
    }

    fn router() -> Router {
        let mut r = Router::new();
        r.add_route(Method::GET, "/", [noop()]);
        r.add_route(Method::GET, "/hello/:name", [noop()]);
        r.add_route(Method::GET, "/hello/b/c", [noop()]);
        r.add_route(Method::GET, "/hi/:name", [noop()]);
        r.add_route(Method::GET, "/assets/*filepath", [noop()]);
        r.add_route(Method::GET, "/docs/:lang/*", [noop()]);
        r.add_route(Method::POST, "/users/:id/books/:book", [noop()]);
        r
    }

    fn params(pairs: &[(&str, &str)]) -> RouteParams {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn should_bind_named_parameters() {
        let r = router();

        let (node, p) = r.find_route(&Method::GET, "/hello/geektutu").unwrap();
        assert_eq!(node.pattern(), "/hello/:name");
        assert_eq!(p, params(&[("name", "geektutu")]));

        let (node, p) = r.find_route(&Method::POST, "/users/7/books/rust").unwrap();
        assert_eq!(node.pattern(), "/users/:id/books/:book");
        assert_eq!(p, params(&[("id", "7"), ("book", "rust")]));
    }

    #[test]
    fn should_bind_catch_all_remainder() {
        let r = router();

        let (node, p) = r.find_route(&Method::GET, "/assets/css/a.css").unwrap();
        assert_eq!(node.pattern(), "/assets/*filepath");
        assert_eq!(p, params(&[("filepath", "css/a.css")]));

        let (_, p) = r.find_route(&Method::GET, "/assets/").unwrap();
        assert_eq!(p, params(&[("filepath", "")]));

        // An anonymous catch-all matches but binds nothing for itself.
        let (node, p) = r.find_route(&Method::GET, "/docs/en/intro/setup").unwrap();
        assert_eq!(node.pattern(), "/docs/:lang/*");
        assert_eq!(p, params(&[("lang", "en")]));
    }

    #[test]
    fn should_match_root_without_params() {
        let r = router();
        let (node, p) = r.find_route(&Method::GET, "/").unwrap();
        assert_eq!(node.pattern(), "/");
        assert!(p.is_empty());
    }

    #[test]
    fn should_not_match_unknown_method_or_path() {
        let r = router();
        assert!(r.find_route(&Method::DELETE, "/x").is_none());
        assert!(r.find_route(&Method::POST, "/hello/geektutu").is_none());
        assert!(r.find_route(&Method::GET, "/hi").is_none());
    }

    #[test]
    fn should_route_shadowed_literal_through_wildcard_node() {
        let mut r = Router::new();
        r.add_route(Method::GET, "/p/:id", [say("id")]);
        r.add_route(Method::GET, "/p/admin", [say("admin")]);

        let (node, p) = r.find_route(&Method::GET, "/p/admin").unwrap();
        assert_eq!(node.pattern(), "/p/admin");
        assert_eq!(node.segment(), ":id");
        assert!(p.is_empty());

        let (node, p) = r.find_route(&Method::GET, "/p/42").unwrap();
        assert_eq!(node.pattern(), "/p/admin");
        assert!(p.is_empty());
    }

    #[test]
    fn should_accumulate_handlers_for_repeated_registration() {
        let mut r = Router::new();
        r.add_route(Method::GET, "/a", [say("1"), say("2")]);
        r.add_route(Method::GET, "/a", [say("3")]);

        assert_eq!(r.handlers(&Method::GET, "/a").len(), 3);
        assert!(r.handlers(&Method::POST, "/a").is_empty());
    }

    #[tokio::test]
    async fn should_run_accumulated_handlers_in_order() {
        let mut r = Router::new();
        r.add_route(Method::GET, "/a", [say("1"), say("2")]);
        r.add_route(Method::GET, "/a", [say("3")]);

        let mut c = Context::new(Method::GET, "/a").unwrap();
        r.handle(&mut c).await;

        assert_eq!(c.written(), b"123");
    }

    #[tokio::test]
    async fn should_bind_params_into_context() {
        let seen = Arc::new(Mutex::new(None));
        let mut r = Router::new();
        {
            let seen = seen.clone();
            r.add_route(
                Method::GET,
                "/hello/:name",
                [handler(move |c| {
                    let seen = seen.clone();
                    Box::pin(async move {
                        *seen.lock() = c.param("name").map(str::to_owned);
                        c.string(StatusCode::OK, format!("hello {}", c.param("name").unwrap_or_default()));
                    })
                })],
            );
        }

        let mut c = Context::new(Method::GET, "/hello/geektutu").unwrap();
        r.handle(&mut c).await;

        assert_eq!(seen.lock().as_deref(), Some("geektutu"));
        assert_eq!(c.written(), b"hello geektutu");
    }

    #[tokio::test]
    async fn should_respond_not_found() {
        let r = router();
        let mut c = Context::new(Method::DELETE, "/x").unwrap();
        r.handle(&mut c).await;

        assert_eq!(c.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(c.written(), b"404 page not found\n");
    }
}
