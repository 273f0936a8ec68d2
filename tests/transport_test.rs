//! End-to-end requests through `HyperTransport` against a local HTTP server.

use netcall::config::CachePolicy;
use netcall::http::{HttpBody, HttpRequest, RequestTask};
use netcall::session::{RedirectHandler, ResponseHead, TransportRequest};
use netcall::{NetError, NetworkSession};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

struct TestServer {
    base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    fn url(&self, path: &str) -> Url {
        Url::parse(&format!("{}{}", self.base, path)).unwrap()
    }

    fn request_lines(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.lines().next().unwrap_or_default().to_string())
            .collect()
    }
}

/// Serve each connection with `handler`; `None` leaves the client hanging.
async fn serve<F>(handler: F) -> TestServer
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let handler = Arc::clone(&handler);
            let recorded = Arc::clone(&recorded);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut len = 0;
                loop {
                    let n = socket.read(&mut buf[len..]).await.unwrap_or(0);
                    if n == 0 {
                        return;
                    }
                    len += n;
                    if buf[..len].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let request = String::from_utf8_lossy(&buf[..len]).to_string();
                recorded.lock().unwrap().push(request.clone());

                match handler(&request) {
                    Some(response) => {
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    }
                    None => tokio::time::sleep(Duration::from_secs(30)).await,
                }
            });
        }
    });

    TestServer {
        base: format!("http://{addr}"),
        requests,
    }
}

fn path(request: &str) -> &str {
    request.split_whitespace().nth(1).unwrap_or_default()
}

fn request_header<'a>(request: &'a str, name: &str) -> Option<&'a str> {
    request.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

fn ok(body: &str, extra_headers: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n{extra_headers}\r\n{body}",
        body.len()
    )
}

fn redirect(status: &str, location: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    )
}

#[tokio::test]
async fn test_chunked_body_is_accumulated() {
    let server = serve(|_| {
        Some(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n"
                .to_string(),
        )
    })
    .await;
    let session = NetworkSession::new().unwrap();

    let response = session
        .execute(HttpRequest::get(server.url("/greeting")))
        .await
        .unwrap();
    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.text().unwrap(), "hello world");
    assert_eq!(session.active_tasks(), 0);
}

#[tokio::test]
async fn test_request_line_and_headers() {
    let server = serve(|_| Some(ok("{}", "Content-Type: application/json\r\n"))).await;
    let session = NetworkSession::new().unwrap();

    let body = HttpBody::json(&serde_json::json!({"name": "a"})).unwrap();
    let request = HttpRequest::new(server.url("/items"), RequestTask::Post(body))
        .with_header("X-Trace", "t-1");
    let response = session.execute(request).await.unwrap();
    assert!(matches!(response.body, HttpBody::Json(..)));

    let recorded = server.requests.lock().unwrap()[0].clone();
    assert!(recorded.starts_with("POST /items HTTP/1.1"));
    assert_eq!(request_header(&recorded, "x-trace"), Some("t-1"));
    assert!(request_header(&recorded, "content-type")
        .unwrap()
        .starts_with("application/json"));
    assert!(request_header(&recorded, "user-agent")
        .unwrap()
        .starts_with("netcall/"));
}

#[tokio::test]
async fn test_redirect_is_followed() {
    let server = serve(|request| match path(request) {
        "/start" => Some(redirect("302 Found", "/end")),
        _ => Some(ok("done", "")),
    })
    .await;
    let session = NetworkSession::new().unwrap();

    let response = session
        .execute(HttpRequest::get(server.url("/start")))
        .await
        .unwrap();
    assert_eq!(response.bytes(), "done");
    assert_eq!(
        server.request_lines(),
        vec!["GET /start HTTP/1.1", "GET /end HTTP/1.1"]
    );
}

#[tokio::test]
async fn test_see_other_turns_post_into_get() {
    let server = serve(|request| match path(request) {
        "/submit" => Some(redirect("303 See Other", "/result")),
        _ => Some(ok("stored", "")),
    })
    .await;
    let session = NetworkSession::new().unwrap();

    let request = HttpRequest::new(
        server.url("/submit"),
        RequestTask::Post(HttpBody::plain("payload")),
    );
    session.execute(request).await.unwrap();

    let lines = server.request_lines();
    assert_eq!(lines[1], "GET /result HTTP/1.1");
}

#[tokio::test]
async fn test_redirect_handler_can_stop() {
    let server = serve(|_| Some(redirect("301 Moved Permanently", "/elsewhere"))).await;
    let handler: RedirectHandler =
        Arc::new(|_: &ResponseHead, _: TransportRequest| -> Option<TransportRequest> { None });
    let session = NetworkSession::builder()
        .redirect_handler(handler)
        .build()
        .unwrap();

    let response = session
        .execute(HttpRequest::get(server.url("/old")))
        .await
        .unwrap();
    assert_eq!(response.status.as_u16(), 301);
    assert_eq!(response.header("location"), Some("/elsewhere"));
    assert_eq!(server.request_lines().len(), 1);
}

#[tokio::test]
async fn test_redirect_loop_fails() {
    let server = serve(|_| Some(redirect("302 Found", "/loop"))).await;
    let session = NetworkSession::new().unwrap();

    let result = session.execute(HttpRequest::get(server.url("/loop"))).await;
    assert!(matches!(result, Err(NetError::Unknown { .. })));
}

#[tokio::test]
async fn test_cookies_are_replayed() {
    let server = serve(|request| match path(request) {
        "/login" => Some(ok("", "Set-Cookie: sid=abc; Path=/\r\n")),
        _ => Some(ok(request_header(request, "cookie").unwrap_or("none"), "")),
    })
    .await;
    let session = NetworkSession::new().unwrap();

    session
        .execute(HttpRequest::get(server.url("/login")))
        .await
        .unwrap();
    let me = session
        .execute(HttpRequest::get(server.url("/me")))
        .await
        .unwrap();
    assert_eq!(me.bytes(), "sid=abc");

    let mut anonymous = HttpRequest::get(server.url("/me"));
    anonymous.allow_cookies = false;
    let response = session.execute(anonymous).await.unwrap();
    assert_eq!(response.bytes(), "none");
}

#[tokio::test]
async fn test_fresh_response_is_served_from_cache() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let server = serve(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Some(ok("cached", "Cache-Control: max-age=60\r\n"))
    })
    .await;
    let session = NetworkSession::new().unwrap();

    for _ in 0..2 {
        let mut request = HttpRequest::get(server.url("/resource.txt"));
        request.cache_policy = CachePolicy::UseProtocolPolicy;
        let response = session.execute(request).await.unwrap();
        assert_eq!(response.bytes(), "cached");
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // Ignoring the cache always goes to the network.
    session
        .execute(HttpRequest::get(server.url("/resource.txt")))
        .await
        .unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cache_only_without_entry_fails() {
    let server = serve(|_| Some(ok("x", ""))).await;
    let session = NetworkSession::new().unwrap();

    let mut request = HttpRequest::get(server.url("/never-loaded"));
    request.cache_policy = CachePolicy::ReturnCacheDontLoad;
    let result = session.execute(request).await;
    assert!(matches!(result, Err(NetError::Unknown { .. })));
    assert!(server.request_lines().is_empty());
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let session = NetworkSession::new().unwrap();

    let url = Url::parse(&format!("http://{addr}/")).unwrap();
    let result = session.execute(HttpRequest::get(url)).await;
    assert!(matches!(result, Err(NetError::NoConnection)));
}

#[tokio::test]
async fn test_idle_timeout() {
    let server = serve(|_| None).await;
    let session = NetworkSession::new().unwrap();

    let request =
        HttpRequest::get(server.url("/slow")).with_timeout(Duration::from_millis(200));
    let result = session.execute(request).await;
    assert!(matches!(result, Err(NetError::RequestTimeout)));
}

#[tokio::test]
async fn test_cancel_in_flight_request() {
    let server = serve(|_| None).await;
    let session = NetworkSession::new().unwrap();

    let future = session.execute(HttpRequest::get(server.url("/hang")));
    for _ in 0..100 {
        if !server.request_lines().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(future.cancel());
    assert!(matches!(future.await, Err(NetError::Cancelled)));

    for _ in 0..100 {
        if session.active_tasks() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(session.active_tasks(), 0);
}

#[tokio::test]
async fn test_unsupported_scheme_fails_immediately() {
    let session = NetworkSession::new().unwrap();
    let future = session.execute(HttpRequest::get(Url::parse("ftp://files.test/a").unwrap()));
    assert!(future.is_completed());
    assert!(matches!(future.await, Err(NetError::InvalidUrl(_))));
}
