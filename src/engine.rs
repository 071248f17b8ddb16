//! The engine: registration front end and HTTP server.
//!
//! An [`Engine`] owns the router, the route groups and the shared state. It is configured with
//! [`EngineBuilder`], filled through `&mut` registration calls, and then frozen into an
//! [`EngineService`](crate::EngineService) by [`Engine::run`] or [`Engine::serve`].

use crate::binding::Binder;
use crate::constants::DEFAULT_SHUTDOWN_TIMEOUT;
use crate::context::Context;
use crate::data_map::DataMap;
use crate::error::{Error, ErrorKind};
use crate::group::{GroupData, RouteGroup};
use crate::handler::HandlerFunc;
use crate::middleware;
use crate::router::Router;
use crate::service::EngineService;
use crate::RouteError;
use http::Method;
use hyper::service::Service;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::server::graceful::GracefulShutdown;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::JoinSet;

#[derive(Debug, Clone)]
pub(crate) struct EngineConfig {
    pub(crate) release_mode: bool,
    pub(crate) graceful_shutdown: bool,
    pub(crate) shutdown_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            release_mode: false,
            graceful_shutdown: false,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// The serving engine: the router, the route groups and the application state.
///
/// The engine itself acts as the root group with an empty prefix, so routes and middleware can be
/// registered on it directly. Registration happens through `&mut Engine`; once the engine is turned
/// into a service it is shared read-only by every request.
///
/// # Examples
///
/// ```
/// use gee::{handler, middleware, Engine};
/// use http::StatusCode;
///
/// let mut app = Engine::new();
/// app.middleware([middleware::recovery()]);
/// app.get(
///     "/",
///     [handler(|c| Box::pin(async move { c.html(StatusCode::OK, "<h1>Hello Gee</h1>") }))],
/// );
///
/// let mut v2 = app.group("/v2");
/// v2.get(
///     "/hello/:name",
///     [handler(|c| {
///         Box::pin(async move {
///             let msg = format!("hello {}, you're at {}\n", c.param("name").unwrap_or_default(), c.path());
///             c.string(StatusCode::OK, msg);
///         })
///     })],
/// );
/// ```
pub struct Engine {
    pub(crate) router: Router,
    pub(crate) groups: Vec<GroupData>,
    pub(crate) config: EngineConfig,
    data: Arc<DataMap>,
    binder: Arc<Binder>,
    error: Option<RouteError>,
}

impl Engine {
    /// Creates an engine without any middleware.
    pub fn new() -> Engine {
        Engine::with_config(EngineConfig::default())
    }

    fn with_config(config: EngineConfig) -> Engine {
        Engine {
            router: Router::new(),
            groups: vec![GroupData::new(String::new())],
            config,
            data: Arc::new(DataMap::new()),
            binder: Arc::new(Binder::new()),
            error: None,
        }
    }

    /// Return a [EngineBuilder](./struct.EngineBuilder.html) instance to configure an engine.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// The root group.
    pub fn root(&mut self) -> RouteGroup<'_> {
        RouteGroup::new(self, 0)
    }

    /// Creates a group whose routes live under `prefix`.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        self.new_group(prefix.to_owned())
    }

    pub(crate) fn new_group(&mut self, prefix: String) -> RouteGroup<'_> {
        self.groups.push(GroupData::new(prefix));
        let index = self.groups.len() - 1;
        RouteGroup::new(self, index)
    }

    /// Appends middleware that runs for every request.
    pub fn middleware<I: IntoIterator<Item = HandlerFunc>>(&mut self, middlewares: I) -> &mut Self {
        self.root().middleware(middlewares);
        self
    }

    pub fn add_route<I: IntoIterator<Item = HandlerFunc>>(&mut self, method: Method, pattern: &str, handlers: I) -> &mut Self {
        self.root().add_route(method, pattern, handlers);
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

    /// Serves the files under `root` at `relative_path`. See
    /// [`RouteGroup::static_files`](./struct.RouteGroup.html#method.static_files).
    pub fn static_files<P: Into<PathBuf>>(&mut self, relative_path: &str, root: P) -> &mut Self {
        self.root().static_files(relative_path, root);
        self
    }

    /// Stores application state available to every handler through
    /// [`Context::data`](./struct.Context.html#method.data). One value is kept per type.
    pub fn data<T: Send + Sync + 'static>(&mut self, data: T) -> &mut Self {
        Arc::make_mut(&mut self.data).insert(data);
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub(crate) fn record_error(&mut self, err: RouteError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Fails with the first registration error, if any.
    pub(crate) fn check(&mut self) -> crate::Result<()> {
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Prepares `c` for this engine and runs the request through the pipeline.
    ///
    /// The middleware of every group whose prefix starts the request path is queued first,
    /// in group creation order, followed by the matched route's handlers.
    pub async fn handle(&self, c: &mut Context) {
        c.attach(self.data.clone(), self.binder.clone());

        let middlewares = self
            .groups
            .iter()
            .filter(|g| c.path().starts_with(g.prefix.as_str()))
            .flat_map(|g| g.middlewares.iter().cloned())
            .collect::<Vec<_>>();
        c.push_handlers(middlewares);

        self.router.handle(c).await;
    }

    /// Serves the engine on `addr`.
    ///
    /// Without graceful shutdown this only returns on a startup error. With it, the process receiving
    /// Ctrl-C or SIGTERM stops accepting and shuts down as described in [`serve`](#method.serve).
    pub async fn run<A: ToSocketAddrs>(self, addr: A) -> crate::Result<()> {
        let enabled = self.config.graceful_shutdown;
        self.run_with_shutdown(addr, shutdown_signal(enabled)).await
    }

    /// Serves the engine on `addr` until `signal` completes.
    pub async fn run_with_shutdown<A, F>(self, addr: A, signal: F) -> crate::Result<()>
    where
        A: ToSocketAddrs,
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::new(ErrorKind::Server, format!("could not bind listener: {}", e)))?;
        self.serve(listener, signal).await
    }

    /// Serves the engine on an already bound listener until `signal` completes.
    ///
    /// Once `signal` fires no new connection is accepted and every open connection is asked to shut
    /// down: idle keep-alive connections close right away, in-flight requests are answered first.
    /// Connections still open after the shutdown timeout are dropped.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> crate::Result<()>
    where
        F: Future<Output = ()>,
    {
        let shutdown_timeout = self.config.shutdown_timeout;
        let service = EngineService::new(self)?;
        tracing::info!("listening on {}", listener.local_addr()?);

        let builder = Builder::new(TokioExecutor::new());
        let graceful = GracefulShutdown::new();
        tokio::pin!(signal);

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let request_service = match service.call(&stream).await {
                            Ok(svc) => svc,
                            Err(err) => match err {},
                        };
                        let conn = builder.serve_connection(TokioIo::new(stream), request_service).into_owned();
                        let conn = graceful.watch(conn);
                        connections.spawn(async move {
                            if let Err(err) = conn.await {
                                tracing::debug!("error serving connection: {:?}", err);
                            }
                        });
                    }
                    Err(err) => tracing::warn!("error accepting connection: {}", err),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = &mut signal => {
                    tracing::info!("shutting down, closing {} connection(s)", connections.len());
                    break;
                }
            }
        }
        drop(listener);

        if tokio::time::timeout(shutdown_timeout, graceful.shutdown()).await.is_err() {
            tracing::warn!("shutdown timed out, dropping remaining connections");
            connections.abort_all();
        }

        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Debug for Engine {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ router: {:?}, groups: {:?}, config: {:?} }}",
            self.router, self.groups, self.config
        )
    }
}

async fn shutdown_signal(enabled: bool) {
    if !enabled {
        return std::future::pending().await;
    }

    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("could not install Ctrl-C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("could not install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Builder for an [`Engine`](./struct.Engine.html).
///
/// When no global middleware is configured the engine starts with [`cors`](./middleware/fn.cors.html),
/// [`logger`](./middleware/fn.logger.html) and [`recovery`](./middleware/fn.recovery.html), in that order.
///
/// # Examples
///
/// ```
/// use gee::{middleware, Engine};
/// use std::time::Duration;
///
/// let app = Engine::builder()
///     .release_mode(true)
///     .graceful_shutdown(true)
///     .shutdown_timeout(Duration::from_secs(10))
///     .middleware([middleware::logger(), middleware::recovery()])
///     .build();
/// ```
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    middlewares: Option<Vec<HandlerFunc>>,
    data: DataMap,
}

impl EngineBuilder {
    pub fn new() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Turns off route registration logging.
    pub fn release_mode(mut self, release: bool) -> Self {
        self.config.release_mode = release;
        self
    }

    /// Makes [`Engine::run`](./struct.Engine.html#method.run) stop on Ctrl-C or SIGTERM and drain
    /// in-flight connections.
    pub fn graceful_shutdown(mut self, enabled: bool) -> Self {
        self.config.graceful_shutdown = enabled;
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Global middleware, replacing the default stack.
    pub fn middleware<I: IntoIterator<Item = HandlerFunc>>(mut self, middlewares: I) -> Self {
        self.middlewares.get_or_insert_with(Vec::new).extend(middlewares);
        self
    }

    pub fn data<T: Send + Sync + 'static>(mut self, data: T) -> Self {
        self.data.insert(data);
        self
    }

    pub fn build(self) -> Engine {
        let mut engine = Engine::with_config(self.config);
        engine.data = Arc::new(self.data);

        let middlewares = self
            .middlewares
            .unwrap_or_else(|| vec![middleware::cors(), middleware::logger(), middleware::recovery()]);
        engine.middleware(middlewares);

        engine
    }
}

impl Debug for EngineBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ config: {:?}, middlewares: {:?}, data: {:?} }}",
            self.config,
            self.middlewares.as_ref().map(Vec::len),
            self.data
        )
    }
}
