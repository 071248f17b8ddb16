use crate::binding::{self, Binder, FormSchema, FormValues};
use crate::constants::{
    ABORT_INDEX, HEADER_X_FORWARDED_FOR, MIME_FORM, MIME_HTML, MIME_JSON, MIME_TEXT,
};
use crate::data_map::{DataMap, Keys};
use crate::error::{Error, ErrorKind};
use crate::handler::HandlerFunc;
use crate::helpers;
use crate::types::RouteParams;
use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use http::{Method, Request, Response, StatusCode, Uri};
use http_body_util::Full;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{self, Debug, Formatter};
use std::net::SocketAddr;
use std::sync::Arc;

/// The per-request state shared by every handler in the chain.
///
/// A context is created for each inbound request, carries the decoded path, the bound route
/// parameters, the handler chain and its cursor, a key/value side channel, and buffers the
/// response until the chain has finished.
///
/// # Middleware protocol
///
/// Handlers run in order. Inside a handler:
///
/// * `c.next().await` runs the rest of the chain and then returns, so code placed after it
///   sees the downstream result.
/// * Returning without calling `next` does not stop the chain; the driving loop moves on to
///   the following handler.
/// * `c.abort()` stops the chain: no handler after the current one will run, however many
///   `next` calls are pending above it.
pub struct Context {
    req: Request<Bytes>,
    path: String,
    params: RouteParams,
    remote_addr: SocketAddr,

    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,

    handlers: Vec<HandlerFunc>,
    index: usize,

    keys: Keys,
    data: Arc<DataMap>,
    binder: Arc<Binder>,
}

impl Context {
    /// Creates a context for a body-less request with the given method and uri.
    pub fn new(method: Method, uri: &str) -> crate::Result<Context> {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::new())
            .map_err(|e| Error::new(ErrorKind::InvalidRequest, format!("invalid request: {}", e)))?;
        Context::from_request(req)
    }

    /// Creates a context from a request whose body has already been collected.
    pub fn from_request(req: Request<Bytes>) -> crate::Result<Context> {
        let path = helpers::percent_decode_request_path(req.uri().path())?;

        Ok(Context {
            req,
            path,
            params: RouteParams::new(),
            remote_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            status: None,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            handlers: Vec::new(),
            index: 0,
            keys: Keys::new(),
            data: Arc::new(DataMap::new()),
            binder: Arc::new(Binder::new()),
        })
    }

    pub(crate) fn attach(&mut self, data: Arc<DataMap>, binder: Arc<Binder>) {
        self.data = data;
        self.binder = binder;
    }

    pub(crate) fn set_remote_addr(&mut self, remote_addr: SocketAddr) {
        self.remote_addr = remote_addr;
    }

    // Pipeline

    /// Runs the remaining handlers of the chain, returning once they have all finished.
    pub fn next(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            while self.index < self.handlers.len() {
                let handler = Arc::clone(&self.handlers[self.index]);
                self.index += 1;
                handler(self).await;
            }
        })
    }

    /// Stops the chain. Handlers that are already running keep running to completion.
    pub fn abort(&mut self) {
        self.index = ABORT_INDEX;
    }

    pub fn abort_with_status(&mut self, code: StatusCode) {
        self.abort();
        self.status(code);
    }

    /// Aborts and responds with `{"message": msg}`.
    pub fn abort_with_json<M: Into<String>>(&mut self, code: StatusCode, msg: M) {
        self.abort();
        self.json(code, &serde_json::json!({ "message": msg.into() }));
    }

    pub fn is_aborted(&self) -> bool {
        self.index >= ABORT_INDEX
    }

    pub(crate) fn push_handlers<I: IntoIterator<Item = HandlerFunc>>(&mut self, handlers: I) {
        self.handlers.extend(handlers);
    }

    // Request

    pub fn method(&self) -> &Method {
        self.req.method()
    }

    /// The percent-decoded request path.
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    pub fn uri(&self) -> &Uri {
        self.req.uri()
    }

    pub fn request(&self) -> &Request<Bytes> {
        &self.req
    }

    pub fn body(&self) -> &Bytes {
        self.req.body()
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn request_header(&self, key: &str) -> Option<&str> {
        self.req.headers().get(key).and_then(|v| v.to_str().ok())
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.req.headers().get(USER_AGENT).and_then(|v| v.to_str().ok())
    }

    /// The `X-Forwarded-For` header when present, the peer address otherwise.
    pub fn client_ip(&self) -> String {
        match self.request_header(HEADER_X_FORWARDED_FOR) {
            Some(addr) if !addr.is_empty() => addr.to_owned(),
            _ => self.remote_addr.to_string(),
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    pub(crate) fn set_params(&mut self, params: RouteParams) {
        self.params = params;
    }

    /// The first value of the query string parameter `key`.
    pub fn query(&self, key: &str) -> Option<String> {
        let query = self.req.uri().query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// The first value of `key` in an `application/x-www-form-urlencoded` body.
    pub fn post_form(&self, key: &str) -> Option<String> {
        if !self.is_form_body() {
            return None;
        }

        url::form_urlencoded::parse(self.req.body())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    fn is_form_body(&self) -> bool {
        self.request_header(CONTENT_TYPE.as_str())
            .map(|ct| ct.starts_with(MIME_FORM))
            .unwrap_or(false)
    }

    // Side channel and shared state

    pub fn set<K: Into<String>, V: Send + Sync + 'static>(&self, key: K, val: V) {
        self.keys.set(key, val);
    }

    pub fn get<V: Clone + Send + Sync + 'static>(&self, key: &str) -> Option<V> {
        self.keys.get(key)
    }

    /// A handle on the key/value store that can be moved into spawned tasks.
    pub fn keys(&self) -> Keys {
        self.keys.clone()
    }

    /// Application state registered with [`Engine::data`](./struct.Engine.html#method.data).
    pub fn data<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.data.get::<T>()
    }

    // Binding

    pub fn bind_json<T: DeserializeOwned>(&self) -> crate::Result<T> {
        self.binder.bind_json(self.req.body())
    }

    /// Binds the query string and, for urlencoded requests, the body to `T`.
    pub fn bind_form<T: FormSchema>(&self) -> crate::Result<T> {
        let mut values = FormValues::new();
        if let Some(query) = self.req.uri().query() {
            binding::parse_form_values(query.as_bytes(), &mut values);
        }
        if self.is_form_body() {
            binding::parse_form_values(self.req.body(), &mut values);
        }

        self.binder.bind_form(&values)
    }

    // Response

    /// Sets the response status code.
    pub fn status(&mut self, code: StatusCode) {
        if let Some(prev) = self.status {
            if prev != code {
                tracing::warn!(
                    "status code was already set, overriding {} with {}",
                    prev.as_u16(),
                    code.as_u16()
                );
            }
        }
        self.status = Some(code);
    }

    /// The status code the response will carry, `200 OK` if none was set.
    pub fn status_code(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Sets a response header; an empty value removes it.
    pub fn header(&mut self, key: &str, val: &str) {
        let name = match HeaderName::from_bytes(key.as_bytes()) {
            Ok(name) => name,
            Err(_) => {
                tracing::warn!(header = key, "ignoring invalid header name");
                return;
            }
        };

        if val.is_empty() {
            self.headers.remove(&name);
            return;
        }

        match HeaderValue::from_str(val) {
            Ok(val) => {
                self.headers.insert(name, val);
            }
            Err(_) => tracing::warn!(header = key, "ignoring invalid header value"),
        }
    }

    /// Appends a response header value without replacing existing ones.
    pub fn append_header(&mut self, key: HeaderName, val: HeaderValue) {
        self.headers.append(key, val);
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Appends raw bytes to the response body.
    pub fn write(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    pub fn written(&self) -> &[u8] {
        &self.body
    }

    pub fn string<S: AsRef<str>>(&mut self, code: StatusCode, text: S) {
        self.header(CONTENT_TYPE.as_str(), MIME_TEXT);
        self.status(code);
        self.write(text.as_ref().as_bytes());
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, code: StatusCode, obj: &T) {
        match serde_json::to_vec(obj) {
            Ok(body) => {
                self.header(CONTENT_TYPE.as_str(), MIME_JSON);
                self.status(code);
                self.write(&body);
            }
            Err(err) => {
                tracing::error!("could not serialize json response: {}", err);
                self.abort_with_status(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }

    pub fn html<S: AsRef<str>>(&mut self, code: StatusCode, markup: S) {
        self.header(CONTENT_TYPE.as_str(), MIME_HTML);
        self.status(code);
        self.write(markup.as_ref().as_bytes());
    }

    pub fn data_bytes<B: AsRef<[u8]>>(&mut self, code: StatusCode, data: B) {
        self.status(code);
        self.write(data.as_ref());
    }

    /// Throws away the status, headers and body written so far.
    pub fn reset_response(&mut self) {
        self.status = None;
        self.headers.clear();
        self.body.clear();
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut res = Response::new(Full::new(self.body.freeze()));
        *res.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *res.headers_mut() = self.headers;
        res
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ method: {:?}, path: {:?}, params: {:?}, status: {:?}, index: {}, handlers: {} }}",
            self.req.method(),
            self.path,
            self.params,
            self.status,
            self.index,
            self.handlers.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler;
    use parking_lot::Mutex;

    type Trace = Arc<Mutex<Vec<String>>>;

    fn record(trace: &Trace, name: &'static str) -> HandlerFunc {
        let trace = trace.clone();
        handler(move |_| {
            let trace = trace.clone();
            Box::pin(async move { trace.lock().push(name.to_owned()) })
        })
    }

    fn wrap(trace: &Trace, name: &'static str) -> HandlerFunc {
        let trace = trace.clone();
        handler(move |c| {
            let trace = trace.clone();
            Box::pin(async move {
                trace.lock().push(format!("{} before", name));
                c.next().await;
                trace.lock().push(format!("{} after", name));
            })
        })
    }

    fn ctx() -> Context {
        Context::new(Method::GET, "/hello?lang=rust&lang=go").unwrap()
    }

    #[tokio::test]
    async fn should_wrap_downstream_handlers() {
        let trace = Trace::default();
        let mut c = ctx();
        c.push_handlers([wrap(&trace, "outer"), wrap(&trace, "inner"), record(&trace, "handler")]);

        c.next().await;

        assert_eq!(
            *trace.lock(),
            vec!["outer before", "inner before", "handler", "inner after", "outer after"]
        );
    }

    #[tokio::test]
    async fn should_continue_after_handler_that_skips_next() {
        let trace = Trace::default();
        let mut c = ctx();
        c.push_handlers([record(&trace, "a"), record(&trace, "b"), record(&trace, "c")]);

        c.next().await;

        assert_eq!(*trace.lock(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn should_run_each_handler_once_when_next_is_called_twice() {
        let trace = Trace::default();
        let twice = handler(|c| {
            Box::pin(async move {
                c.next().await;
                c.next().await;
            })
        });
        let mut c = ctx();
        c.push_handlers([twice, record(&trace, "a"), record(&trace, "b")]);

        c.next().await;

        assert_eq!(*trace.lock(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn should_stop_chain_on_abort() {
        let trace = Trace::default();
        let abort = {
            let trace = trace.clone();
            handler(move |c| {
                let trace = trace.clone();
                Box::pin(async move {
                    c.abort_with_status(StatusCode::UNAUTHORIZED);
                    trace.lock().push("abort".to_owned());
                })
            })
        };
        let mut c = ctx();
        c.push_handlers([
            wrap(&trace, "outer"),
            wrap(&trace, "inner"),
            abort,
            record(&trace, "unreachable"),
            wrap(&trace, "unreachable too"),
        ]);

        c.next().await;

        assert!(c.is_aborted());
        assert_eq!(c.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            *trace.lock(),
            vec!["outer before", "inner before", "abort", "inner after", "outer after"]
        );
    }

    #[tokio::test]
    async fn should_share_keys_with_spawned_tasks() {
        let c = ctx();
        c.set("user", String::from("alice"));

        let keys = c.keys();
        tokio::spawn(async move {
            let user: String = keys.get("user").unwrap();
            keys.set("greeting", format!("hi {}", user));
        })
        .await
        .unwrap();

        assert_eq!(c.get::<String>("greeting").as_deref(), Some("hi alice"));
    }

    #[test]
    fn should_read_query_and_form_values() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/login?next=%2Fhome")
            .header(CONTENT_TYPE, MIME_FORM)
            .body(Bytes::from_static(b"user=alice&pass=s%20cret"))
            .unwrap();
        let c = Context::from_request(req).unwrap();

        assert_eq!(c.query("next").as_deref(), Some("/home"));
        assert_eq!(c.query("missing"), None);
        assert_eq!(c.post_form("pass").as_deref(), Some("s cret"));
        assert_eq!(ctx().query("lang").as_deref(), Some("rust"));
    }

    #[test]
    fn should_prefer_forwarded_for_as_client_ip() {
        let req = Request::builder()
            .uri("/")
            .header("X-Forwarded-For", "10.0.0.7")
            .body(Bytes::new())
            .unwrap();
        let c = Context::from_request(req).unwrap();
        assert_eq!(c.client_ip(), "10.0.0.7");

        assert_eq!(ctx().client_ip(), "0.0.0.0:0");
    }

    #[test]
    fn should_decode_request_path() {
        let c = Context::new(Method::GET, "/files/a%20b.txt").unwrap();
        assert_eq!(c.path(), "/files/a b.txt");
    }

    #[test]
    fn should_build_response() {
        let mut c = ctx();
        c.header("X-Trace", "abc");
        c.header("X-Drop", "1");
        c.header("X-Drop", "");
        c.string(StatusCode::CREATED, "hello");
        c.write(b" world");

        assert_eq!(c.status_code(), StatusCode::CREATED);
        assert_eq!(c.written(), b"hello world");

        let res = c.into_response();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()["x-trace"], "abc");
        assert_eq!(res.headers()[CONTENT_TYPE], MIME_TEXT);
        assert!(res.headers().get("x-drop").is_none());
    }

    #[test]
    fn should_default_to_ok() {
        let mut c = ctx();
        c.write(b"plain");
        assert_eq!(c.into_response().status(), StatusCode::OK);
    }

    #[test]
    fn should_write_json_message_on_abort() {
        let mut c = ctx();
        c.abort_with_json(StatusCode::FORBIDDEN, "denied");

        assert!(c.is_aborted());
        assert_eq!(c.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(c.written(), br#"{"message":"denied"}"#);
    }
}
