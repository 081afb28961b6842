//! Session lifecycle over a real HTTP boundary
//!
//! Drives the client against a minimal in-process HTTP stub so the
//! bearer-attachment, refresh-on-401, and bootstrap paths are exercised
//! end-to-end through reqwest, cookies included.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use munlink_client::types::LoginRequest;
use munlink_client::{ClientConfig, MunlinkClient, SessionEvent};

/// What the stub backend should do, plus what it observed.
struct StubState {
    refresh_calls: AtomicUsize,
    probe_calls: AtomicUsize,
    protected_calls: AtomicUsize,
    /// 200 with a fresh token when true, 403 otherwise.
    refresh_succeeds: bool,
    /// Answer for the refresh-status probe.
    has_refresh: bool,
    /// Set-Cookie value attached to probe responses.
    probe_cookie: Option<&'static str>,
    /// Reject every protected request regardless of token.
    reject_all: bool,
    /// Bearer tokens `/api/documents/my-requests` accepts.
    accepted_tokens: Mutex<Vec<String>>,
    /// X-CSRF-TOKEN header seen on the last refresh call.
    seen_csrf: Mutex<Option<String>>,
}

impl StubState {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            refresh_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
            protected_calls: AtomicUsize::new(0),
            refresh_succeeds: true,
            has_refresh: false,
            probe_cookie: None,
            reject_all: false,
            accepted_tokens: Mutex::new(Vec::new()),
            seen_csrf: Mutex::new(None),
        })
    }

    fn accept(&self, token: &str) {
        self.accepted_tokens.lock().unwrap().push(token.to_string());
    }
}

struct ParsedRequest {
    method: String,
    path: String,
    headers: HashMap<String, String>,
}

async fn read_request(stream: &mut TcpStream) -> Option<ParsedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head_end = buf.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }

    // Drain any body so the client finishes writing before we respond.
    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body_read = buf.len() - head_end;
    while body_read < content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body_read += n;
    }

    Some(ParsedRequest {
        method,
        path,
        headers,
    })
}

async fn respond(stream: &mut TcpStream, status: &str, extra_headers: &[String], body: &str) {
    let mut response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        body.len()
    );
    for header in extra_headers {
        response.push_str(header);
        response.push_str("\r\n");
    }
    response.push_str("\r\n");
    response.push_str(body);
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Spawn the stub backend; returns its base URL.
async fn spawn_stub(state: Arc<StubState>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                let Some(request) = read_request(&mut stream).await else {
                    return;
                };
                route(&state, &request, &mut stream).await;
            });
        }
    });

    format!("http://{}", addr)
}

async fn route(state: &StubState, request: &ParsedRequest, stream: &mut TcpStream) {
    match (request.method.as_str(), request.path.as_str()) {
        ("POST", "/api/auth/refresh") => {
            let n = state.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
            // Hold the response briefly so concurrent 401 handlers observably
            // share one in-flight refresh.
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            *state.seen_csrf.lock().unwrap() = request.headers.get("x-csrf-token").cloned();
            if state.refresh_succeeds {
                let token = format!("fresh-{}", n);
                state.accept(&token);
                let body = format!(r#"{{"access_token":"{}"}}"#, token);
                respond(stream, "200 OK", &[], &body).await;
            } else {
                respond(stream, "403 Forbidden", &[], r#"{"error":"Token refresh failed"}"#).await;
            }
        }
        ("GET", "/api/auth/refresh-status") => {
            state.probe_calls.fetch_add(1, Ordering::SeqCst);
            let extra = state
                .probe_cookie
                .map(|cookie| vec![format!("Set-Cookie: {}", cookie)])
                .unwrap_or_default();
            let body = format!(r#"{{"has_refresh":{}}}"#, state.has_refresh);
            respond(stream, "200 OK", &extra, &body).await;
        }
        ("POST", "/api/auth/login") => {
            let token = "login-token";
            state.accept(token);
            let body = format!(
                r#"{{"message":"Login successful","access_token":"{}","refresh_token":"r","user":{{"id":7,"username":"ana","role":"resident"}}}}"#,
                token
            );
            respond(stream, "200 OK", &[], &body).await;
        }
        ("GET", "/api/documents/my-requests") => {
            state.protected_calls.fetch_add(1, Ordering::SeqCst);
            let authorized = !state.reject_all
                && request
                    .headers
                    .get("authorization")
                    .map(|value| {
                        state
                            .accepted_tokens
                            .lock()
                            .unwrap()
                            .iter()
                            .any(|token| value == &format!("Bearer {}", token))
                    })
                    .unwrap_or(false);
            if authorized {
                respond(stream, "200 OK", &[], r#"{"count":0,"requests":[]}"#).await;
            } else {
                respond(stream, "401 Unauthorized", &[], r#"{"error":"Token has expired"}"#).await;
            }
        }
        _ => {
            respond(stream, "404 Not Found", &[], r#"{"error":"Not found"}"#).await;
        }
    }
}

async fn client_for(state: Arc<StubState>) -> MunlinkClient {
    let base_url = spawn_stub(state).await;
    MunlinkClient::new(ClientConfig::new(base_url)).expect("client")
}

#[tokio::test]
async fn login_installs_token_used_by_later_requests() {
    let state = StubState::new();
    let client = client_for(Arc::clone(&state)).await;

    let login = client
        .auth()
        .login(&LoginRequest {
            username: "ana".into(),
            password: "secret".into(),
        })
        .await
        .expect("login");
    assert_eq!(login.user.username, "ana");
    assert_eq!(
        client.session().access_token().as_deref(),
        Some("login-token")
    );

    let requests = client.documents().my_requests().await.expect("requests");
    assert!(requests.is_empty());
    // No 401 round trip happened; the bearer was attached up front.
    assert_eq!(state.protected_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reactive_401_refreshes_and_retries_transparently() {
    let state = StubState::new();
    let client = client_for(Arc::clone(&state)).await;
    // Stale token the backend no longer accepts.
    client.session().set_access_token(Some("stale"));

    let requests = client.documents().my_requests().await.expect("requests");
    assert!(requests.is_empty());

    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.protected_calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        client.session().access_token().as_deref(),
        Some("fresh-1"),
        "refresh result installed"
    );
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    let state = StubState::new();
    let client = client_for(Arc::clone(&state)).await;
    client.session().set_access_token(Some("stale"));

    let docs_a = client.documents();
    let docs_b = client.documents();
    let (a, b) = tokio::join!(
        docs_a.my_requests(),
        docs_b.my_requests()
    );
    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retried_401_propagates_without_second_cycle() {
    // Refresh mints tokens but the protected endpoint rejects everything:
    // the retried request fails too and must not loop.
    let mut state = StubState::new();
    Arc::get_mut(&mut state).unwrap().reject_all = true;
    let client = client_for(Arc::clone(&state)).await;
    client.session().set_access_token(Some("stale"));

    let error = client
        .documents()
        .my_requests()
        .await
        .expect_err("second 401 must propagate");

    assert_eq!(error.status(), Some(401));
    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.protected_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unrecoverable_401_expires_the_session() {
    let mut state = StubState::new();
    Arc::get_mut(&mut state).unwrap().refresh_succeeds = false;
    let client = client_for(Arc::clone(&state)).await;
    let mut events = client.subscribe();
    client.session().set_access_token(Some("stale"));

    let error = client
        .documents()
        .my_requests()
        .await
        .expect_err("session is unrecoverable");

    assert_eq!(error.status(), Some(401));
    assert_eq!(client.session().access_token(), None);
    assert!(matches!(events.try_recv(), Ok(SessionEvent::Expired)));
    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cold_bootstrap_without_credential_issues_no_refresh() {
    let state = StubState::new();
    let client = client_for(Arc::clone(&state)).await;

    assert!(!client.bootstrap().await);
    assert_eq!(state.probe_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 0);
    assert_eq!(client.session().access_token(), None);
}

#[tokio::test]
async fn cold_bootstrap_with_credential_mints_a_token() {
    let mut state = StubState::new();
    {
        let s = Arc::get_mut(&mut state).unwrap();
        s.has_refresh = true;
        s.probe_cookie = Some("csrf_refresh_token=csrf-abc; Path=/");
    }
    let client = client_for(Arc::clone(&state)).await;

    assert!(client.bootstrap().await);
    assert_eq!(
        client.session().access_token().as_deref(),
        Some("fresh-1")
    );
    // The CSRF cookie set by the probe rode back on the refresh call.
    assert_eq!(
        state.seen_csrf.lock().unwrap().as_deref(),
        Some("csrf-abc")
    );

    let requests = client.documents().my_requests().await.expect("requests");
    assert!(requests.is_empty());
}
