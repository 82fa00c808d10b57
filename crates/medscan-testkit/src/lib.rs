//! In-process HTTP stub for exercising the real service clients.
//!
//! Every request is recorded and answered with the response mounted for its
//! path. Unknown paths get 404.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;

/// A response served for one path.
#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Canned {
    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn pdf(body: &[u8]) -> Self {
        Self {
            status: 200,
            content_type: "application/pdf",
            body: body.to_vec(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// One request as the stub saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is not JSON")
    }
}

#[derive(Clone, Default)]
struct Shared {
    routes: Arc<Mutex<HashMap<String, Canned>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

pub struct StubServer {
    pub base_url: String,
    shared: Shared,
}

impl StubServer {
    /// Bind an ephemeral port and serve `routes` from a background task.
    pub async fn start(routes: Vec<(&str, Canned)>) -> Self {
        let shared = Shared::default();
        shared.routes.lock().unwrap().extend(
            routes
                .into_iter()
                .map(|(path, canned)| (path.to_string(), canned)),
        );

        let app = Router::new().fallback(respond).with_state(shared.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            shared,
        }
    }

    /// Serve `canned` for `path` from now on.
    pub fn mount(&self, path: &str, canned: Canned) {
        self.shared
            .routes
            .lock()
            .unwrap()
            .insert(path.to_string(), canned);
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.shared.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Requests seen for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }

    pub fn total_hits(&self) -> usize {
        self.shared.requests.lock().unwrap().len()
    }
}

async fn respond(
    State(shared): State<Shared>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let canned = shared
        .routes
        .lock()
        .unwrap()
        .get(&path)
        .cloned()
        .unwrap_or_else(|| Canned::status(404));
    shared
        .requests
        .lock()
        .unwrap()
        .push(Recorded {
            path,
            headers,
            body,
        });

    let status = StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, canned.content_type)], canned.body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn status_of(url: &str) -> u16 {
        reqwest::get(url).await.unwrap().status().as_u16()
    }

    #[tokio::test]
    async fn test_records_requests_and_serves_mounted_paths() {
        let stub = StubServer::start(vec![("/a", Canned::json(r#"{"ok":true}"#))]).await;
        stub.mount("/b", Canned::status(204));

        assert_eq!(status_of(&stub.url("/a")).await, 200);
        assert_eq!(status_of(&stub.url("/b")).await, 204);
        assert_eq!(status_of(&stub.url("/c")).await, 404);

        assert_eq!(stub.hits("/a"), 1);
        assert_eq!(stub.total_hits(), 3);
    }

    #[tokio::test]
    async fn test_records_headers_and_body() {
        let stub = StubServer::start(vec![("/echo", Canned::json("{}").with_status(201))]).await;

        let response = reqwest::Client::new()
            .post(stub.url("/echo"))
            .header("x-api-key", "k")
            .json(&serde_json::json!({ "q": "dosis" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);

        let seen = stub.requests_to("/echo");
        assert_eq!(seen[0].header("x-api-key"), Some("k"));
        assert_eq!(seen[0].json()["q"], "dosis");
    }
}
