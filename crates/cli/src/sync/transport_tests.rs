// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the transport module.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::transport::{
    HttpRequest, HttpResponse, Method, Transport, TransportError, TransportResult,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use shelf_core::{Collection, Failure};
use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Base URL the mock answers to.
pub const API_BASE: &str = "https://api.test";
const DOCS_BASE: &str = "https://api.test/gists";
const RAW_BASE: &str = "https://raw.test";

#[derive(Debug, Clone)]
pub struct MockFile {
    pub content: String,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct MockDocument {
    pub description: String,
    pub public: bool,
    pub files: BTreeMap<String, MockFile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct MockState {
    documents: BTreeMap<String, MockDocument>,
    next_id: u64,
    offline: bool,
    /// Responses served before routing. `None` simulates a dropped connection.
    scripted: VecDeque<Option<HttpResponse>>,
    requests: Vec<HttpRequest>,
    delay: Option<Duration>,
}

/// In-memory document server for testing without real sockets.
///
/// Serves the gist-shaped API: `GET/PATCH {API_BASE}/gists/{id}`,
/// `POST {API_BASE}/gists`, and raw file URLs for truncated files.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Adds a document with the given files.
    pub fn insert_document(&self, id: &str, public: bool, files: &[(&str, &str)]) {
        let now = Utc::now();
        let files = files
            .iter()
            .map(|(name, content)| {
                (name.to_string(), MockFile { content: content.to_string(), truncated: false })
            })
            .collect();
        self.lock().documents.insert(
            id.to_string(),
            MockDocument {
                description: "Audiobook collection".to_string(),
                public,
                files,
                created_at: now,
                updated_at: now,
            },
        );
    }

    /// Adds a public document holding `collection` in the canonical file.
    pub fn insert_collection(&self, id: &str, collection: &Collection) {
        let content = collection.to_pretty_json().unwrap();
        self.insert_document(id, true, &[("audiobooks.json", &content)]);
    }

    /// Marks a file as truncated so it must be fetched from its raw URL.
    pub fn truncate_file(&self, id: &str, name: &str) {
        let mut state = self.lock();
        let doc = state.documents.get_mut(id).unwrap();
        doc.files.get_mut(name).unwrap().truncated = true;
    }

    /// The collection currently stored in the canonical file.
    pub fn collection(&self, id: &str) -> Option<Collection> {
        let state = self.lock();
        let file = state.documents.get(id)?.files.get("audiobooks.json")?;
        Collection::from_json(&file.content).ok()
    }

    pub fn document(&self, id: &str) -> Option<MockDocument> {
        self.lock().documents.get(id).cloned()
    }

    pub fn document_ids(&self) -> Vec<String> {
        self.lock().documents.keys().cloned().collect()
    }

    /// Makes every request fail with a connection error.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Serves `response` for the next unanswered request.
    pub fn push_response(&self, response: HttpResponse) {
        self.lock().scripted.push_back(Some(response));
    }

    /// Drops the connection for the next unanswered request.
    pub fn push_disconnect(&self) {
        self.lock().scripted.push_back(None);
    }

    /// Answers the next `count` requests with `status`.
    pub fn fail_next(&self, count: usize, status: u16, message: &str) {
        for _ in 0..count {
            let body = json!({ "message": message }).to_string();
            self.push_response(HttpResponse::new(status, body));
        }
    }

    /// Delays every response.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn count(&self, method: Method) -> usize {
        self.lock().requests.iter().filter(|r| r.method == method).count()
    }

    fn route(&self, request: &HttpRequest) -> HttpResponse {
        let mut state = self.lock();

        if let Some(rest) = request.url.strip_prefix(RAW_BASE) {
            let mut parts = rest.trim_start_matches('/').splitn(2, '/');
            let (id, name) = (parts.next().unwrap_or(""), parts.next().unwrap_or(""));
            return match state.documents.get(id).and_then(|d| d.files.get(name)) {
                Some(file) => HttpResponse::new(200, file.content.clone()),
                None => not_found(),
            };
        }

        let Some(rest) = request.url.strip_prefix(DOCS_BASE) else {
            return not_found();
        };
        let id = rest.trim_start_matches('/').to_string();

        match (request.method, id.is_empty()) {
            (Method::Get, false) => match state.documents.get(&id) {
                Some(doc) => HttpResponse::new(200, render(&id, doc).to_string()),
                None => not_found(),
            },
            (Method::Post, true) => {
                state.next_id += 1;
                let id = format!("doc-{}", state.next_id);
                let body = request.body.clone().unwrap_or(Value::Null);
                let now = Utc::now();
                let mut doc = MockDocument {
                    description: body["description"].as_str().unwrap_or("").to_string(),
                    public: body["public"].as_bool().unwrap_or(false),
                    files: BTreeMap::new(),
                    created_at: now,
                    updated_at: now,
                };
                apply_files(&mut doc, &body);
                let rendered = render(&id, &doc);
                state.documents.insert(id, doc);
                HttpResponse::new(201, rendered.to_string())
            }
            (Method::Patch, false) => match state.documents.get_mut(&id) {
                Some(doc) => {
                    let body = request.body.clone().unwrap_or(Value::Null);
                    if let Some(description) = body["description"].as_str() {
                        doc.description = description.to_string();
                    }
                    apply_files(doc, &body);
                    doc.updated_at = Utc::now();
                    HttpResponse::new(200, render(&id, doc).to_string())
                }
                None => not_found(),
            },
            _ => HttpResponse::new(422, json!({ "message": "Validation Failed" }).to_string()),
        }
    }
}

fn not_found() -> HttpResponse {
    HttpResponse::new(404, json!({ "message": "Not Found" }).to_string())
}

fn apply_files(doc: &mut MockDocument, body: &Value) {
    if let Some(files) = body["files"].as_object() {
        for (name, file) in files {
            match file["content"].as_str() {
                Some(content) => {
                    doc.files.insert(
                        name.clone(),
                        MockFile { content: content.to_string(), truncated: false },
                    );
                }
                None => {
                    doc.files.remove(name);
                }
            }
        }
    }
}

fn render(id: &str, doc: &MockDocument) -> Value {
    let files: serde_json::Map<String, Value> = doc
        .files
        .iter()
        .map(|(name, file)| {
            let content = if file.truncated {
                file.content.chars().take(16).collect::<String>()
            } else {
                file.content.clone()
            };
            (
                name.clone(),
                json!({
                    "filename": name,
                    "content": content,
                    "truncated": file.truncated,
                    "raw_url": format!("{RAW_BASE}/{id}/{name}"),
                }),
            )
        })
        .collect();

    json!({
        "id": id,
        "description": doc.description,
        "public": doc.public,
        "created_at": doc.created_at,
        "updated_at": doc.updated_at,
        "files": files,
    })
}

impl Transport for MockTransport {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = TransportResult<HttpResponse>> + Send + '_>> {
        Box::pin(async move {
            let delay = {
                let mut state = self.lock();
                state.requests.push(request.clone());
                state.delay
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let scripted = {
                let mut state = self.lock();
                if state.offline {
                    return Err(TransportError::ConnectionFailed("mock offline".into()));
                }
                state.scripted.pop_front()
            };

            match scripted {
                Some(Some(response)) => Ok(response),
                Some(None) => Err(TransportError::ConnectionFailed("mock disconnect".into())),
                None => Ok(self.route(&request)),
            }
        })
    }
}

#[tokio::test]
async fn mock_serves_created_documents() {
    let transport = MockTransport::new();
    let body = json!({
        "description": "d",
        "public": true,
        "files": { "audiobooks.json": { "content": "{}" } }
    });
    let created = transport.execute(HttpRequest::post(DOCS_BASE, body)).await.unwrap();
    assert_eq!(created.status, 201);
    let id = serde_json::from_str::<Value>(&created.body).unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let fetched = transport.execute(HttpRequest::get(format!("{DOCS_BASE}/{id}"))).await.unwrap();
    assert_eq!(fetched.status, 200);
    assert!(fetched.body.contains("audiobooks.json"));
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn mock_scripted_and_offline_responses() {
    let transport = MockTransport::new();
    transport.fail_next(1, 503, "busy");
    transport.push_disconnect();

    let first = transport.execute(HttpRequest::get(format!("{DOCS_BASE}/x"))).await.unwrap();
    assert_eq!(first.status, 503);

    let second = transport.execute(HttpRequest::get(format!("{DOCS_BASE}/x"))).await;
    assert!(matches!(second, Err(TransportError::ConnectionFailed(_))));

    let third = transport.execute(HttpRequest::get(format!("{DOCS_BASE}/x"))).await.unwrap();
    assert_eq!(third.status, 404);

    transport.set_offline(true);
    let fourth = transport.execute(HttpRequest::get(format!("{DOCS_BASE}/x"))).await;
    assert!(matches!(fourth, Err(TransportError::ConnectionFailed(_))));
}

#[test]
fn transport_errors_map_to_failures() {
    assert!(matches!(
        Failure::from(TransportError::ConnectionFailed("x".into())),
        Failure::Connect(_)
    ));
    assert!(matches!(Failure::from(TransportError::TimedOut("x".into())), Failure::Timeout(_)));
    assert!(matches!(
        Failure::from(TransportError::ReceiveFailed("x".into())),
        Failure::Message(_)
    ));
}

#[test]
fn response_success_range() {
    assert!(HttpResponse::new(200, "").is_success());
    assert!(HttpResponse::new(201, "").is_success());
    assert!(!HttpResponse::new(304, "").is_success());
    assert!(!HttpResponse::new(404, "").is_success());
}

#[test]
fn http_transport_builds_without_token() {
    assert!(super::transport::HttpTransport::new(None).is_ok());
    assert!(super::transport::HttpTransport::new(Some(String::new())).is_ok());
}
