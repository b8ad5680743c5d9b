//! Integration tests for the HTTP layer
//!
//! These tests drive a real listener over loopback TCP and check what a
//! client sees on the wire.

use httpwire::config::ServerConfig;
use httpwire::http::session::FdSessionOps;
use httpwire::http::{
    parse_response_head, Cookie, ConnectionState, DefaultHandler, Handler, HttpRequest,
    HttpResponse, HttpServer, Method, ResponseHead, SameSite, Status,
};
use httpwire::net::Listener;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn bind(reject_malformed: bool) -> (Listener, SocketAddr) {
    let config = ServerConfig::builder()
        .listen_address("127.0.0.1:0")
        .read_timeout_millis(1000)
        .reject_malformed(reject_malformed)
        .build()
        .unwrap();
    let listener = Listener::bind(&config).unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Send `chunks` one write at a time and collect everything until EOF
fn exchange(addr: SocketAddr, chunks: Vec<Vec<u8>>) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_nodelay(true).unwrap();
    for chunk in chunks {
        stream.write_all(&chunk).unwrap();
        stream.flush().unwrap();
    }
    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();
    response
}

/// Serve a single connection with `handler` while `client` talks to it
fn serve_one<H, C>(reject_malformed: bool, handler: H, client: C) -> (ConnectionState, Vec<u8>)
where
    H: Handler + Send + Sync + 'static,
    C: FnOnce(SocketAddr) -> Vec<u8> + Send + 'static,
{
    let (listener, addr) = bind(reject_malformed);
    let client = thread::spawn(move || client(addr));

    let state = listener.accept(&Arc::new(handler)).unwrap().join().unwrap();
    (state, client.join().unwrap())
}

fn split_response(response: &[u8]) -> (ResponseHead, Vec<u8>) {
    let (head, offset) = parse_response_head(response).unwrap();
    (head, response[offset..].to_vec())
}

#[test]
fn test_get_request_response_cycle() {
    let (state, response) = serve_one(false, DefaultHandler, |addr| {
        exchange(addr, vec![b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n".to_vec()])
    });

    assert_eq!(state, ConnectionState::Closed);
    assert!(response.starts_with(b"HTTP/1.1 200 OK\r\n"));

    let (head, body) = split_response(&response);
    assert_eq!(head.status, Status::OK);
    assert_eq!(head.headers.get("Content-Length"), Some("0"));
    assert!(httpdate::parse_http_date(head.headers.get("Date").unwrap()).is_ok());
    assert!(body.is_empty());
}

#[test]
fn test_non_get_is_not_implemented() {
    let (state, response) = serve_one(false, DefaultHandler, |addr| {
        exchange(
            addr,
            vec![b"DELETE /thing HTTP/1.1\r\nHost: example.com\r\n\r\n".to_vec()],
        )
    });

    assert_eq!(state, ConnectionState::Closed);
    assert!(response.starts_with(b"HTTP/1.1 501 Not Implemented\r\n"));
}

#[test]
fn test_post_with_body() {
    let handler = |request: &HttpRequest| {
        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.uri().map(|u| u.path()), Some("/data"));
        assert_eq!(request.body_str(), Some("test data"));
        assert_eq!(
            request.query_pairs(),
            vec![("kind".to_string(), "plain text".to_string())]
        );

        HttpResponse::builder()
            .status(Status::OK)
            .header("Content-Type", "text/plain")
            .header("Content-Length", "8")
            .body(b"received".to_vec())
            .build()
    };

    let (state, response) = serve_one(false, handler, |addr| {
        let request = HttpRequest::builder()
            .method(Method::Post)
            .target("/data?kind=plain+text")
            .header("Host", "localhost")
            .header("Content-Length", "9")
            .body(b"test data".to_vec())
            .build()
            .unwrap();
        exchange(addr, vec![request.to_wire()])
    });

    assert_eq!(state, ConnectionState::Closed);
    let (head, body) = split_response(&response);
    assert_eq!(head.headers.get("content-type"), Some("text/plain"));
    assert_eq!(body, b"received");
}

#[test]
fn test_one_byte_writes() {
    let request = b"GET /slow HTTP/1.1\r\nHost: example.com\r\nCookie: a=1; b=2\r\n\r\n";
    let chunks: Vec<Vec<u8>> = request.iter().map(|b| vec![*b]).collect();

    let handler = |request: &HttpRequest| {
        let cookies = request.cookies().unwrap();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies.get("b").map(|c| c.value.as_str()), Some("2"));
        HttpResponse::for_request(request)
    };

    let (state, response) = serve_one(false, handler, move |addr| exchange(addr, chunks));

    assert_eq!(state, ConnectionState::Closed);
    assert!(response.starts_with(b"HTTP/1.1 200 OK\r\n"));
}

#[test]
fn test_malformed_request_closes_without_response() {
    let (state, response) = serve_one(false, DefaultHandler, |addr| {
        exchange(addr, vec![b"BREW /pot HTTP/1.1\r\n\r\n".to_vec()])
    });

    assert_eq!(state, ConnectionState::Failed);
    assert!(response.is_empty());
}

#[test]
fn test_reject_malformed_answers_bad_request() {
    let (state, response) = serve_one(true, DefaultHandler, |addr| {
        exchange(addr, vec![b"GET /a /b HTTP/1.1\r\n\r\n".to_vec()])
    });

    assert_eq!(state, ConnectionState::Failed);
    assert!(response.starts_with(b"HTTP/1.1 400 Bad Request\r\n"));
}

#[test]
fn test_client_disconnect_mid_body() {
    let (state, response) = serve_one(false, DefaultHandler, |addr| {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .write_all(b"POST / HTTP/1.1\r\nContent-Length: 100\r\n\r\npartial")
            .unwrap();
        stream.shutdown(std::net::Shutdown::Write).unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).unwrap();
        response
    });

    assert_eq!(state, ConnectionState::Failed);
    assert!(response.is_empty());
}

#[test]
fn test_multiple_set_cookie_headers() {
    let handler = |request: &HttpRequest| {
        let mut response = HttpResponse::for_request(request);

        let mut session = Cookie::new("session", "abc");
        session.path = Some("/".to_string());
        session.http_only = true;
        response.add_cookie(&session).unwrap();

        let mut theme = Cookie::new("theme", "dark");
        theme.same_site = SameSite::Lax;
        response.add_cookie(&theme).unwrap();

        response
    };

    let (_, response) = serve_one(false, handler, |addr| {
        exchange(addr, vec![b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n".to_vec()])
    });

    let (head, _) = split_response(&response);
    let set_cookies = head.headers.get_all("Set-Cookie");
    assert_eq!(set_cookies.len(), 2);

    let session = Cookie::parse_set_cookie(&set_cookies[0]).unwrap();
    assert_eq!(session.name, "session");
    assert_eq!(session.path.as_deref(), Some("/"));
    assert!(session.http_only);

    let theme = Cookie::parse_set_cookie(&set_cookies[1]).unwrap();
    assert_eq!(theme.same_site, SameSite::Lax);
}

#[test]
fn test_concurrent_connections() {
    let (listener, addr) = bind(false);
    let clients: Vec<_> = (0..4)
        .map(|i| {
            thread::spawn(move || {
                let request = format!("GET /{} HTTP/1.1\r\nHost: example.com\r\n\r\n", i);
                exchange(addr, vec![request.into_bytes()])
            })
        })
        .collect();

    let handler = Arc::new(DefaultHandler);
    let servers: Vec<_> = (0..4).map(|_| listener.accept(&handler).unwrap()).collect();

    for server in servers {
        assert_eq!(server.join().unwrap(), ConnectionState::Closed);
    }
    for client in clients {
        assert!(client.join().unwrap().starts_with(b"HTTP/1.1 200 OK\r\n"));
    }
}

#[test]
fn test_server_over_plain_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server_handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut server = HttpServer::new(FdSessionOps::new(stream));
        server.set_timeout(Some(Duration::from_secs(1)));

        let request = server.receive_request().unwrap();
        assert_eq!(request.method(), Method::Put);
        assert_eq!(request.headers().get("X-Custom"), Some("value"));
        assert_eq!(request.body(), b"{}");

        server.send_error(Status::NOT_FOUND).unwrap();
        server.close().unwrap();
    });

    let response = exchange(
        addr,
        vec![b"PUT /x HTTP/1.1\r\nx-custom: value\r\ncontent-length: 2\r\n\r\n{}".to_vec()],
    );
    server_handle.join().unwrap();

    let (head, _) = split_response(&response);
    assert_eq!(head.status, Status::NOT_FOUND);
    assert_eq!(head.reason, "Not Found");
}
