#![allow(dead_code)]

use gee::{Engine, EngineService};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::service::Service;
use hyper::{Request, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot::{self, Sender};

pub struct Serve {
    addr: SocketAddr,
    tx: Sender<()>,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl Serve {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn new_request(&self, method: &str, route: &str) -> http::request::Builder {
        http::request::Request::builder()
            .method(method.to_ascii_uppercase().as_str())
            .uri(format!("http://{}{}", self.addr(), route))
    }

    pub async fn send(&self, req: Request<Full<Bytes>>) -> Response<hyper::body::Incoming> {
        self.client.request(req).await.unwrap()
    }

    /// Sends a body-less request and returns the status and body text.
    pub async fn call(&self, method: &str, route: &str) -> (http::StatusCode, String) {
        let req = self.new_request(method, route).body(Full::new(Bytes::new())).unwrap();
        let resp = self.send(req).await;
        let status = resp.status();
        (status, into_text(resp.into_body()).await)
    }

    pub fn shutdown(self) {
        self.tx.send(()).unwrap();
    }
}

pub async fn serve(engine: Engine) -> Serve {
    // Bind a TCP listener to an available port.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let engine_service = Arc::new(EngineService::new(engine).unwrap());
    let (tx, mut rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        loop {
            let stream = tokio::select! {
                accepted = listener.accept() => accepted.unwrap().0,
                _ = &mut rx => break,
            };
            let engine_service = engine_service.clone();
            tokio::spawn(async move {
                let request_service = engine_service.call(&stream).await.unwrap();
                let io = TokioIo::new(stream);
                let builder = Builder::new(TokioExecutor::new());
                let _ = builder.serve_connection(io, request_service).await;
            });
        }
    });

    Serve {
        addr,
        tx,
        client: client(),
    }
}

/// A pooling client: connections stay open and idle between requests.
pub fn client() -> Client<HttpConnector, Full<Bytes>> {
    Client::builder(TokioExecutor::new()).build_http()
}

pub async fn into_text<B>(body: B) -> String
where
    B: hyper::body::Body<Data = Bytes> + Send,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    String::from_utf8_lossy(&body.collect().await.unwrap().to_bytes()).to_string()
}
