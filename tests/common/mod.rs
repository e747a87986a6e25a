#![allow(dead_code)]

pub mod dispatch {
    use http::Method;
    use resthost::description::{ContractDescriptor, EndpointDescriptor};
    use resthost::dispatcher::ServiceDispatcher;
    use resthost::message::{FlushedResponse, RequestContext};
    use resthost::sample::{sample_contract, SampleService, SampleStore};
    use resthost::server::RestService;
    use std::sync::Arc;

    /// Base URI the sample contract is registered at in dispatch tests.
    pub const BASE: &str = "http://localhost:9200/calc";

    pub fn url(path: &str) -> String {
        format!("{BASE}{path}")
    }

    /// Start `service` with a single endpoint for `contract` at [`BASE`].
    pub fn start_with(mut service: RestService, contract: ContractDescriptor) -> (RestService, Arc<ServiceDispatcher>) {
        service
            .add_service_endpoint(EndpointDescriptor::new(BASE, contract))
            .unwrap();
        let dispatcher = service.start().unwrap();
        (service, dispatcher)
    }

    /// The sample service as a started singleton.
    pub fn sample_singleton() -> (RestService, Arc<ServiceDispatcher>) {
        start_with(RestService::singleton("sample", SampleService::new()), sample_contract())
    }

    /// The sample service in per-call mode over `store`.
    pub fn sample_per_call(store: Arc<SampleStore>) -> (RestService, Arc<ServiceDispatcher>) {
        let service = RestService::per_call("sample", move || SampleService::with_store(Arc::clone(&store)));
        start_with(service, sample_contract())
    }

    pub fn request(method: Method, path: &str) -> RequestContext {
        RequestContext::new(method, url(path))
    }

    pub fn send(dispatcher: &ServiceDispatcher, request: RequestContext) -> FlushedResponse {
        dispatcher.process(request)
    }

    pub fn get(dispatcher: &ServiceDispatcher, path: &str) -> FlushedResponse {
        send(dispatcher, request(Method::GET, path))
    }

    pub fn get_json(dispatcher: &ServiceDispatcher, path: &str) -> FlushedResponse {
        send(dispatcher, request(Method::GET, path).with_header("Accept", "application/json"))
    }

    pub fn json_body(response: &FlushedResponse) -> serde_json::Value {
        serde_json::from_slice(&response.body).unwrap()
    }
}

pub mod net {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::time::Duration;

    /// A port that was free a moment ago.
    pub fn free_port() -> u16 {
        TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
    }

    /// Minimal HTTP/1.1 exchange over a fresh connection.
    pub struct RawResponse {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl RawResponse {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        pub fn body_str(&self) -> String {
            String::from_utf8_lossy(&self.body).into_owned()
        }
    }

    pub fn send_raw(port: u16, method: &str, path: &str, headers: &[(&str, &str)], body: &[u8]) -> RawResponse {
        let mut stream = connect(port);
        stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();

        let mut head = format!("{method} {path} HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\nConnection: close\r\n");
        for (name, value) in headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        if !body.is_empty() {
            head.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        head.push_str("\r\n");
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(body).unwrap();

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).unwrap();
        parse(&raw, method == "HEAD")
    }

    fn connect(port: u16) -> TcpStream {
        for _ in 0..100 {
            if let Ok(stream) = TcpStream::connect(("127.0.0.1", port)) {
                return stream;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        panic!("server on port {port} never accepted a connection");
    }

    fn parse(raw: &[u8], head_only: bool) -> RawResponse {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has a header terminator");
        let head = String::from_utf8_lossy(&raw[..split]).into_owned();
        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap();
        let status = status_line.split_whitespace().nth(1).unwrap().parse().unwrap();
        let headers: Vec<(String, String)> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();

        let rest = &raw[split + 4..];
        let chunked = headers
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case("transfer-encoding") && v.contains("chunked"));
        let body = if head_only {
            Vec::new()
        } else if chunked {
            dechunk(rest)
        } else {
            rest.to_vec()
        };
        RawResponse { status, headers, body }
    }

    fn dechunk(mut data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let Some(eol) = data.windows(2).position(|w| w == b"\r\n") else {
                break;
            };
            let size_line = String::from_utf8_lossy(&data[..eol]).into_owned();
            let size = usize::from_str_radix(size_line.split(';').next().unwrap().trim(), 16).unwrap_or(0);
            data = &data[eol + 2..];
            if size == 0 || data.len() < size {
                break;
            }
            out.extend_from_slice(&data[..size]);
            data = &data[(size + 2).min(data.len())..];
        }
        out
    }
}
