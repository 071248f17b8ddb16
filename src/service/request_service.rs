use crate::constants::MIME_TEXT;
use crate::context::Context;
use crate::engine::Engine;
use crate::error::{Error, ErrorKind};
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::{service::Service, Request, Response};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

/// Serves the requests of one connection.
pub struct RequestService {
    pub(crate) engine: Arc<Engine>,
    pub(crate) remote_addr: SocketAddr,
}

impl<B> Service<Request<B>> for RequestService
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = Response<Full<Bytes>>;
    type Error = crate::RouteError;
    #[allow(clippy::type_complexity)]
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let engine = self.engine.clone();
        let remote_addr = self.remote_addr;

        let fut = async move {
            let (parts, body) = req.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| {
                    let err: crate::RouteError = e.into();
                    Error::new(ErrorKind::InvalidRequest, format!("Couldn't read request body: {}", err))
                })?
                .to_bytes();

            let mut context = match Context::from_request(Request::from_parts(parts, body)) {
                Ok(context) => context,
                Err(err) => {
                    tracing::debug!(remote_addr = %remote_addr, "rejecting request: {}", err);
                    return Ok(bad_request());
                }
            };
            context.set_remote_addr(remote_addr);

            engine.handle(&mut context).await;

            Ok::<_, crate::RouteError>(context.into_response())
        };

        Box::pin(fut)
    }
}

fn bad_request() -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::from_static(b"400 bad request\n")));
    *res.status_mut() = StatusCode::BAD_REQUEST;
    res.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(MIME_TEXT));
    res
}

#[derive(Debug)]
pub struct RequestServiceBuilder {
    engine: Arc<Engine>,
}

impl RequestServiceBuilder {
    pub fn new(mut engine: Engine) -> crate::Result<Self> {
        engine.check()?;
        Ok(Self {
            engine: Arc::from(engine),
        })
    }

    pub fn build(&self, remote_addr: SocketAddr) -> RequestService {
        RequestService {
            engine: self.engine.clone(),
            remote_addr,
        }
    }
}
