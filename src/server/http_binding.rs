use http::{Method, StatusCode};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::binding::EndpointBinding;
use crate::description::EndpointDescriptor;
use crate::dispatcher::ServiceDispatcher;
use crate::fault::ConfigurationError;
use crate::message::{FlushedResponse, RequestContext, ResponseContext};
use crate::worker_pool::{self, AdaptiveWorkerPool};

/// How long the accept loop blocks before re-checking its stop flag.
const ACCEPT_POLL: Duration = Duration::from_millis(250);

struct Route {
    base_uri: Arc<str>,
    dispatcher: Arc<ServiceDispatcher>,
}

struct Listener {
    server: Arc<tiny_http::Server>,
    routes: Arc<RwLock<Vec<Route>>>,
    stop: Arc<AtomicBool>,
    accept: Option<JoinHandle<()>>,
}

impl Listener {
    fn shutdown(mut self) {
        self.stop.store(true, Ordering::Release);
        self.server.unblock();
        if let Some(handle) = self.accept.take() {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                warn!("Accept thread terminated abnormally");
            }
        }
    }
}

/// Plain-HTTP binding on `tiny_http`.
///
/// Endpoints that share a listening address share one socket and one accept
/// thread; each request goes to the first attached endpoint whose base URI
/// claims it. Accepted requests run on the worker pool.
pub struct HttpBinding {
    pool: Arc<AdaptiveWorkerPool>,
    listeners: Mutex<HashMap<String, Listener>>,
}

impl HttpBinding {
    /// A binding that runs requests on the process-wide pool.
    pub fn new() -> Self {
        Self::with_pool(worker_pool::global())
    }

    pub fn with_pool(pool: Arc<AdaptiveWorkerPool>) -> Self {
        Self {
            pool,
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Socket address actually bound for `endpoint`, once attached.
    pub fn local_addr(&self, endpoint: &EndpointDescriptor) -> Option<SocketAddr> {
        let addr = endpoint.parsed_base_uri().ok()?.listen_addr();
        let listeners = self.listeners.lock();
        listeners.get(&addr)?.server.server_addr().to_ip()
    }

    /// Number of open listening sockets.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn spawn_accept(
        &self,
        addr: &str,
        server: Arc<tiny_http::Server>,
        routes: Arc<RwLock<Vec<Route>>>,
        stop: Arc<AtomicBool>,
    ) -> std::io::Result<JoinHandle<()>> {
        let pool = Arc::clone(&self.pool);
        let listen = addr.to_string();
        thread::Builder::new()
            .name(format!("resthost-accept-{addr}"))
            .spawn(move || accept_loop(&listen, &server, &routes, &stop, &pool))
    }
}

impl Default for HttpBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointBinding for HttpBinding {
    fn attach_endpoint(
        &self,
        dispatcher: Arc<ServiceDispatcher>,
        endpoint: &EndpointDescriptor,
    ) -> Result<(), ConfigurationError> {
        let base = endpoint.parsed_base_uri()?;
        let binding_error = |reason: String| ConfigurationError::Binding {
            base_uri: endpoint.base_uri().to_string(),
            reason,
        };
        if base.scheme != "http" {
            return Err(binding_error(format!(
                "scheme '{}' is not served by the plain HTTP binding",
                base.scheme
            )));
        }

        let addr = base.listen_addr();
        let route = Route {
            base_uri: Arc::clone(endpoint.base_uri()),
            dispatcher,
        };

        let mut listeners = self.listeners.lock();
        if let Some(listener) = listeners.get(&addr) {
            let mut routes = listener.routes.write();
            if routes.iter().any(|r| r.base_uri == route.base_uri) {
                return Err(binding_error("endpoint is already attached".to_string()));
            }
            routes.push(route);
            info!(base_uri = %endpoint.base_uri(), addr = %addr, "Endpoint attached to existing listener");
            return Ok(());
        }

        let server = tiny_http::Server::http(addr.as_str())
            .map(Arc::new)
            .map_err(|e| binding_error(e.to_string()))?;
        let routes = Arc::new(RwLock::new(vec![route]));
        let stop = Arc::new(AtomicBool::new(false));
        let accept = self
            .spawn_accept(&addr, Arc::clone(&server), Arc::clone(&routes), Arc::clone(&stop))
            .map_err(|e| binding_error(e.to_string()))?;

        info!(
            base_uri = %endpoint.base_uri(),
            addr = %addr,
            local_addr = ?server.server_addr().to_ip(),
            "HTTP listener started"
        );
        listeners.insert(
            addr,
            Listener {
                server,
                routes,
                stop,
                accept: Some(accept),
            },
        );
        Ok(())
    }

    fn detach_endpoint(&self, endpoint: &EndpointDescriptor) {
        let Ok(base) = endpoint.parsed_base_uri() else {
            return;
        };
        let addr = base.listen_addr();

        let closed = {
            let mut listeners = self.listeners.lock();
            let Some(listener) = listeners.get(&addr) else {
                return;
            };
            let now_empty = {
                let mut routes = listener.routes.write();
                routes.retain(|r| r.base_uri != *endpoint.base_uri());
                routes.is_empty()
            };
            if now_empty {
                listeners.remove(&addr)
            } else {
                None
            }
        };

        info!(base_uri = %endpoint.base_uri(), addr = %addr, "Endpoint detached");
        if let Some(listener) = closed {
            listener.shutdown();
            info!(addr = %addr, "HTTP listener stopped");
        }
    }
}

impl Drop for HttpBinding {
    fn drop(&mut self) {
        let listeners: Vec<Listener> = self.listeners.lock().drain().map(|(_, l)| l).collect();
        for listener in listeners {
            listener.shutdown();
        }
    }
}

impl fmt::Debug for HttpBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.lock();
        f.debug_struct("HttpBinding")
            .field("listeners", &listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn accept_loop(
    addr: &str,
    server: &tiny_http::Server,
    routes: &Arc<RwLock<Vec<Route>>>,
    stop: &AtomicBool,
    pool: &AdaptiveWorkerPool,
) {
    while !stop.load(Ordering::Acquire) {
        match server.recv_timeout(ACCEPT_POLL) {
            Ok(Some(request)) => {
                let routes = Arc::clone(routes);
                // A rejected item drops the request; tiny_http answers it with 500.
                if let Err(e) = pool.submit(move || serve(request, &routes)) {
                    warn!(addr = %addr, error = %e, "Worker pool rejected request");
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(addr = %addr, error = %e, "Accept failed - listener closing");
                break;
            }
        }
    }
    debug!(addr = %addr, "Accept loop exited");
}

fn serve(mut request: tiny_http::Request, routes: &RwLock<Vec<Route>>) {
    let flushed = match to_context(&mut request) {
        Ok(context) => {
            let dispatcher = routes
                .read()
                .iter()
                .find(|r| r.dispatcher.can_dispatch(&context))
                .map(|r| Arc::clone(&r.dispatcher));
            match dispatcher {
                Some(dispatcher) => dispatcher.process(context),
                None => bare_status(StatusCode::NOT_FOUND, &context),
            }
        }
        Err(e) => {
            debug!(error = %e, "Unreadable request");
            let mut response = ResponseContext::new();
            response.set_status(StatusCode::BAD_REQUEST);
            response.into_flushed(false)
        }
    };

    if let Err(e) = request.respond(to_tiny_response(flushed)) {
        debug!(error = %e, "Client disconnected before the response was written");
    }
}

fn to_context(request: &mut tiny_http::Request) -> Result<RequestContext, anyhow::Error> {
    let method = Method::from_bytes(request.method().as_str().as_bytes())?;
    let host = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Host"))
        .map(|h| h.value.as_str().to_string())
        .unwrap_or_else(|| "localhost".to_string());
    let url = format!("http://{host}{}", request.url());

    let mut context = RequestContext::new(method, url);
    for header in request.headers() {
        context = context.with_header(header.field.as_str().as_str(), header.value.as_str());
    }
    if let Some(addr) = request.remote_addr() {
        context = context.with_remote_addr(*addr);
    }

    let mut body = Vec::new();
    request.as_reader().read_to_end(&mut body)?;
    Ok(context.with_body(body))
}

fn bare_status(status: StatusCode, request: &RequestContext) -> FlushedResponse {
    let mut response = ResponseContext::new();
    response.set_status(status);
    response.into_flushed(*request.method() == Method::HEAD)
}

fn to_tiny_response(flushed: FlushedResponse) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let FlushedResponse {
        status,
        headers,
        body,
    } = flushed;
    let mut response =
        tiny_http::Response::from_data(body).with_status_code(tiny_http::StatusCode(status.as_u16()));
    for (name, value) in headers {
        match tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => response.add_header(header),
            Err(()) => debug!(header = %name, "Dropping header that is not valid ASCII"),
        }
    }
    response
}
