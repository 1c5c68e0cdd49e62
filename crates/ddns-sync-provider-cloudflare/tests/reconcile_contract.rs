//! Contract Test: Record Reconciliation
//!
//! This test runs `CloudflareProvider::update` against an in-process mock of
//! the Cloudflare API and checks the exact sequence of API calls.
//!
//! Constraints verified:
//! - Records are reconciled per family to exactly the desired addresses
//! - Families absent from the desired list are not even read
//! - The zone is the longest suffix of the name known to the API
//! - Dry-run mode only reads
//! - The API token never leaks into errors

use ddns_sync_core::Error;
use ddns_sync_core::traits::DnsProvider;
use ddns_sync_provider_cloudflare::CloudflareProvider;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

const TOKEN: &str = "secret-token-0123456789";

/// One request received by the mock
#[derive(Debug, Clone)]
struct Request {
    method: String,
    target: String,
    authorization: Option<String>,
    body: Option<Value>,
}

impl Request {
    fn line(&self) -> String {
        format!("{} {}", self.method, self.target)
    }
}

type Route = Arc<dyn Fn(&Request) -> (u16, Value) + Send + Sync>;

/// Start a mock API answering through `route`, return its base URL
async fn mock_api(route: Route) -> (String, mpsc::UnboundedReceiver<Request>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let route = route.clone();
            let tx = tx.clone();
            tokio::spawn(async move { handle(socket, route, tx).await });
        }
    });

    (format!("http://{}", addr), rx)
}

async fn handle(mut socket: TcpStream, route: Route, tx: mpsc::UnboundedSender<Request>) {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        data.extend_from_slice(&buf[..n]);
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let mut content_length = 0;
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            if name == "content-length" {
                content_length = value.trim().parse().unwrap_or(0);
            } else if name == "authorization" {
                authorization = Some(value.trim().to_string());
            }
        }
    }

    while data.len() < header_end + content_length {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
    }
    let body = &data[header_end..];
    let body = (!body.is_empty()).then(|| serde_json::from_slice(body).unwrap());

    let request = Request {
        method,
        target,
        authorization,
        body,
    };
    let (status, payload) = route(&request);
    let _ = tx.send(request);

    let payload = payload.to_string();
    let response = format!(
        "HTTP/1.1 {} Mock\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        payload.len(),
        payload
    );
    socket.write_all(response.as_bytes()).await.unwrap();
    let _ = socket.shutdown().await;
}

fn ok(result: Value) -> (u16, Value) {
    (200, json!({ "success": true, "errors": [], "result": result }))
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Request>) -> Vec<Request> {
    let mut requests = Vec::new();
    while let Ok(request) = rx.try_recv() {
        requests.push(request);
    }
    requests
}

fn addresses(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Route serving fixed record listings and accepting every write
fn records_route(a: Value, aaaa: Value) -> Route {
    Arc::new(move |request: &Request| match request.method.as_str() {
        "GET" if request.target.ends_with("type=A") => ok(a.clone()),
        "GET" if request.target.ends_with("type=AAAA") => ok(aaaa.clone()),
        "DELETE" => ok(json!({ "id": "deleted" })),
        _ => ok(json!({ "id": "written" })),
    })
}

#[tokio::test]
async fn reconciles_each_family_to_the_desired_addresses() {
    let (base, mut rx) = mock_api(records_route(
        json!([
            { "id": "r1", "content": "10.0.0.1", "ttl": 300, "proxied": false },
            { "id": "r2", "content": "192.0.2.9", "ttl": 300, "proxied": true },
            { "id": "r3", "content": "192.0.2.10", "ttl": 1, "proxied": false },
        ]),
        json!([]),
    ))
    .await;

    let provider = CloudflareProvider::new(TOKEN, Some("z1".to_string()), false)
        .unwrap()
        .with_api_base(base);

    assert_ok!(
        provider
            .update(
                "www.example.com",
                &addresses(&["10.0.0.1", "10.0.0.2", "2001:db8::1"]),
            )
            .await
    );

    let requests = drain(&mut rx);
    let lines: Vec<String> = requests.iter().map(Request::line).collect();
    assert_eq!(
        lines,
        vec![
            "GET /zones/z1/dns_records?name=www.example.com&type=A",
            "PUT /zones/z1/dns_records/r2",
            "DELETE /zones/z1/dns_records/r3",
            "GET /zones/z1/dns_records?name=www.example.com&type=AAAA",
            "POST /zones/z1/dns_records",
        ]
    );

    // Re-pointed record keeps its settings
    let put = requests[1].body.as_ref().unwrap();
    assert_eq!(put["content"], "10.0.0.2");
    assert_eq!(put["type"], "A");
    assert_eq!(put["ttl"], 300);
    assert_eq!(put["proxied"], true);

    let post = requests[4].body.as_ref().unwrap();
    assert_eq!(post["content"], "2001:db8::1");
    assert_eq!(post["type"], "AAAA");
    assert_eq!(post["name"], "www.example.com");

    let expected_auth = format!("Bearer {}", TOKEN);
    assert!(
        requests
            .iter()
            .all(|r| r.authorization.as_deref() == Some(expected_auth.as_str()))
    );
}

#[tokio::test]
async fn absent_family_is_left_untouched() {
    let (base, mut rx) = mock_api(records_route(
        json!([{ "id": "r1", "content": "10.0.0.1" }]),
        json!([{ "id": "r6", "content": "2001:db8::1" }]),
    ))
    .await;

    let provider = CloudflareProvider::new(TOKEN, Some("z1".to_string()), false)
        .unwrap()
        .with_api_base(base);

    assert_ok!(
        provider
            .update("www.example.com", &addresses(&["10.0.0.1"]))
            .await
    );

    let lines: Vec<String> = drain(&mut rx).iter().map(Request::line).collect();
    assert_eq!(
        lines,
        vec!["GET /zones/z1/dns_records?name=www.example.com&type=A"]
    );
}

#[tokio::test]
async fn zone_is_the_longest_known_suffix() {
    let route: Route = Arc::new(|request: &Request| {
        match request.target.as_str() {
            "/zones?name=a.b.example.com" => ok(json!([])),
            "/zones?name=b.example.com" => ok(json!([{ "id": "zone-b" }])),
            "/zones?name=example.com" => ok(json!([{ "id": "zone-root" }])),
            _ => ok(json!([{ "id": "r1", "content": "10.0.0.1" }])),
        }
    });
    let (base, mut rx) = mock_api(route).await;

    let provider = CloudflareProvider::new(TOKEN, None, false)
        .unwrap()
        .with_api_base(base);

    assert_ok!(
        provider
            .update("a.b.example.com", &addresses(&["10.0.0.1"]))
            .await
    );

    let lines: Vec<String> = drain(&mut rx).iter().map(Request::line).collect();
    assert_eq!(
        lines,
        vec![
            "GET /zones?name=a.b.example.com",
            "GET /zones?name=b.example.com",
            "GET /zones/zone-b/dns_records?name=a.b.example.com&type=A",
        ]
    );
}

#[tokio::test]
async fn unknown_zone_is_not_found() {
    let (base, _rx) = mock_api(Arc::new(|_: &Request| ok(json!([])))).await;

    let provider = CloudflareProvider::new(TOKEN, None, false)
        .unwrap()
        .with_api_base(base);

    let result = provider
        .update("www.example.com", &addresses(&["10.0.0.1"]))
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn dry_run_only_reads() {
    let (base, mut rx) = mock_api(records_route(
        json!([{ "id": "r1", "content": "192.0.2.9" }]),
        json!([{ "id": "r6", "content": "2001:db8::9" }]),
    ))
    .await;

    let provider = CloudflareProvider::new(TOKEN, Some("z1".to_string()), true)
        .unwrap()
        .with_api_base(base);

    assert_ok!(
        provider
            .update(
                "www.example.com",
                &addresses(&["10.0.0.1", "10.0.0.2", "2001:db8::1"]),
            )
            .await
    );

    let requests = drain(&mut rx);
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.method == "GET"));
}

#[tokio::test]
async fn api_errors_fail_the_update_without_leaking_the_token() {
    let route: Route = Arc::new(|_: &Request| {
        (
            403,
            json!({ "success": false, "errors": [{ "code": 10000, "message": "Authentication error" }] }),
        )
    });
    let (base, _rx) = mock_api(route).await;

    let provider = CloudflareProvider::new(TOKEN, Some("z1".to_string()), false)
        .unwrap()
        .with_api_base(base);

    let err = assert_err!(
        provider
            .update("www.example.com", &addresses(&["10.0.0.1"]))
            .await
    );
    let message = err.to_string();
    assert!(message.contains("authentication failed"), "{}", message);
    assert!(!message.contains(TOKEN));
}

#[tokio::test]
async fn unsuccessful_envelope_is_an_error() {
    let route: Route = Arc::new(|_: &Request| {
        (
            200,
            json!({ "success": false, "errors": [{ "code": 1004, "message": "DNS Validation Error" }], "result": null }),
        )
    });
    let (base, _rx) = mock_api(route).await;

    let provider = CloudflareProvider::new(TOKEN, Some("z1".to_string()), false)
        .unwrap()
        .with_api_base(base);

    let err = assert_err!(
        provider
            .update("www.example.com", &addresses(&["10.0.0.1"]))
            .await
    );
    assert!(err.to_string().contains("DNS Validation Error (1004)"));
}

#[tokio::test]
async fn invalid_addresses_are_rejected_before_any_call() {
    let (base, mut rx) = mock_api(records_route(json!([]), json!([]))).await;

    let provider = CloudflareProvider::new(TOKEN, Some("z1".to_string()), false)
        .unwrap()
        .with_api_base(base);

    let result = provider
        .update("www.example.com", &addresses(&["10.0.0.1", "not-an-ip"]))
        .await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert!(drain(&mut rx).is_empty());
}
