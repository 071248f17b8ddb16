use crate::engine::Engine;
use crate::service::request_service::{RequestService, RequestServiceBuilder};
use hyper::service::Service;
use std::convert::Infallible;
use std::future::{ready, Ready};
use tokio::net::TcpStream;

/// A [`Service`](https://docs.rs/hyper/1/hyper/service/trait.Service.html) handing out one
/// [`RequestService`](./struct.RequestService.html) per accepted connection.
///
/// [`Engine::run`](./struct.Engine.html#method.run) covers the common case; this type is for callers
/// that drive their own accept loop.
///
/// # Examples
///
/// ```no_run
/// use gee::{handler, Engine, EngineService};
/// use http::StatusCode;
/// use hyper::service::Service;
/// use hyper_util::rt::{TokioExecutor, TokioIo};
/// use hyper_util::server::conn::auto::Builder;
/// use std::net::SocketAddr;
/// use std::sync::Arc;
/// use tokio::net::TcpListener;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///     let mut app = Engine::new();
///     app.get("/", [handler(|c| Box::pin(async move { c.string(StatusCode::OK, "Home page") }))]);
///
///     let service = Arc::new(EngineService::new(app)?);
///
///     let addr = SocketAddr::from(([127, 0, 0, 1], 3001));
///     let listener = TcpListener::bind(addr).await?;
///
///     loop {
///         let (stream, _) = listener.accept().await?;
///         let service = service.clone();
///
///         tokio::spawn(async move {
///             let request_service = service.call(&stream).await.unwrap();
///             let io = TokioIo::new(stream);
///             let builder = Builder::new(TokioExecutor::new());
///             if let Err(err) = builder.serve_connection(io, request_service).await {
///                 eprintln!("Error serving connection: {:?}", err);
///             }
///         });
///     }
/// }
/// ```
#[derive(Debug)]
pub struct EngineService {
    builder: RequestServiceBuilder,
}

impl EngineService {
    /// Freezes the engine and prepares it for serving. Fails if a route registration was rejected.
    pub fn new(engine: Engine) -> crate::Result<EngineService> {
        let builder = RequestServiceBuilder::new(engine)?;
        Ok(EngineService { builder })
    }
}

impl Service<&TcpStream> for EngineService {
    type Response = RequestService;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn call(&self, conn: &TcpStream) -> Self::Future {
        let addr = match conn.peer_addr() {
            Ok(addr) => addr,
            Err(_) => std::net::SocketAddr::from(([0, 0, 0, 0], 0)),
        };
        let req_service = self.builder.build(addr);

        ready(Ok(req_service))
    }
}
