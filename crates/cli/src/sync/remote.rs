// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client for the remote catalog document.
//!
//! The catalog lives in a single document on a gist-shaped document API:
//!
//! - `GET   {api_url}/{resource}/{id}` reads the document and its files
//! - `POST  {api_url}/{resource}` creates a document
//! - `PATCH {api_url}/{resource}/{id}` replaces file contents
//!
//! Every call runs under the shared [`RetryPolicy`] with at most
//! [`REMOTE_MAX_RETRIES`] attempts, and every attempt under a deadline.
//! Failures leave this module as [`ClassifiedError`]s.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use shelf_core::{ClassifiedError, Collection, ErrorCategory, Failure};

use super::retry::{RetryPolicy, REMOTE_MAX_RETRIES};
use super::transport::{HttpRequest, HttpResponse, HttpTransport, Transport};

/// File the catalog is written to and looked up under first.
pub const CANONICAL_FILE: &str = "audiobooks.json";
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_RESOURCE: &str = "gists";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_DESCRIPTION: &str = "Audiobook collection";

/// Longest error body kept in a message when the server sends no JSON.
const MAX_ERROR_BODY: usize = 200;

/// Configuration for the remote store.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the document API.
    pub api_url: String,
    /// Path segment of the document collection.
    pub resource: String,
    /// Preferred file name for the catalog payload.
    pub canonical_file: String,
    /// Description used when creating documents.
    pub description: String,
    /// Whether created documents are public.
    pub public: bool,
    /// Deadline for a single attempt.
    pub request_timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            api_url: DEFAULT_API_URL.to_string(),
            resource: DEFAULT_RESOURCE.to_string(),
            canonical_file: CANONICAL_FILE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            public: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// Summary of a remote document without its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub id: String,
    pub description: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub file_names: Vec<String>,
    /// True when a JSON file that could hold the catalog is present.
    pub has_payload: bool,
}

#[derive(Debug, Deserialize)]
struct DocumentResponse {
    id: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    public: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    files: BTreeMap<String, FileResponse>,
}

#[derive(Debug, Deserialize)]
struct FileResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

impl DocumentResponse {
    /// Candidate payload files: the canonical name first, then other JSON
    /// files in name order.
    fn candidates<'a>(&'a self, canonical: &'a str) -> Vec<(&'a str, &'a FileResponse)> {
        let mut found = Vec::new();
        if let Some(file) = self.files.get(canonical) {
            found.push((canonical, file));
        }
        for (name, file) in &self.files {
            if name != canonical && name.to_lowercase().ends_with(".json") {
                found.push((name.as_str(), file));
            }
        }
        found
    }
}

/// Client for one remote catalog document.
pub struct RemoteStore<T: Transport = HttpTransport> {
    config: RemoteConfig,
    transport: T,
    retry: RetryPolicy,
}

impl<T: Transport> RemoteStore<T> {
    /// Creates a store. `retry` supplies the timings and tracker; its attempt
    /// ceiling is capped at [`REMOTE_MAX_RETRIES`].
    pub fn new(config: RemoteConfig, transport: T, retry: &RetryPolicy) -> Self {
        let attempts = retry.max_retries.clamp(1, REMOTE_MAX_RETRIES);
        RemoteStore { config, transport, retry: retry.with_max_retries(attempts) }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), self.config.resource)
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url(), id)
    }

    /// `files` object writing `content` to the canonical file.
    fn files_body(&self, content: String) -> Value {
        let mut files = Map::new();
        files.insert(self.config.canonical_file.clone(), json!({ "content": content }));
        Value::Object(files)
    }

    /// Reads the catalog stored in document `id`.
    pub async fn read(&self, id: &str) -> Result<Collection, ClassifiedError> {
        require_id(id)?;
        self.retry.execute("read", || self.read_once(id)).await
    }

    /// Creates a new document holding `collection` and returns its id.
    pub async fn create(
        &self,
        collection: &Collection,
        description: Option<&str>,
    ) -> Result<String, ClassifiedError> {
        let content = encode_payload(collection)?;
        let body = json!({
            "description": description.unwrap_or(&self.config.description),
            "public": self.config.public,
            "files": self.files_body(content),
        });
        let body = &body;

        let id = self
            .retry
            .execute("create", || async move {
                let request = HttpRequest::post(self.collection_url(), body.clone());
                let response = self.send(request).await?;
                Ok(parse_document(&response)?.id)
            })
            .await?;

        tracing::info!("created remote document {}", id);
        Ok(id)
    }

    /// Replaces the catalog stored in document `id`.
    pub async fn update(&self, id: &str, collection: &Collection) -> Result<(), ClassifiedError> {
        require_id(id)?;
        let content = encode_payload(collection)?;
        let body = json!({ "files": self.files_body(content) });
        let body = &body;

        self.retry
            .execute("update", || async move {
                self.send(HttpRequest::patch(self.document_url(id), body.clone())).await?;
                Ok(())
            })
            .await?;

        tracing::debug!("updated remote document {} ({} entries)", id, collection.len());
        Ok(())
    }

    /// Whether document `id` exists and is readable.
    ///
    /// Missing and private documents both report `false`.
    pub async fn exists(&self, id: &str) -> Result<bool, ClassifiedError> {
        require_id(id)?;
        match self.retry.execute("exists", || self.fetch(id)).await {
            Ok(doc) => Ok(doc.public),
            Err(e)
                if matches!(e.category, ErrorCategory::NotFound | ErrorCategory::Permission) =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Describes document `id` without parsing its payload.
    pub async fn get_metadata(&self, id: &str) -> Result<DocumentMetadata, ClassifiedError> {
        require_id(id)?;
        let doc = self.retry.execute("metadata", || self.fetch(id)).await?;
        let has_payload = !doc.candidates(&self.config.canonical_file).is_empty();

        Ok(DocumentMetadata {
            description: doc.description.clone().unwrap_or_default(),
            visibility: if doc.public { Visibility::Public } else { Visibility::Private },
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            file_names: doc.files.keys().cloned().collect(),
            has_payload,
            id: doc.id,
        })
    }

    async fn read_once(&self, id: &str) -> Result<Collection, ClassifiedError> {
        let doc = self.fetch(id).await?;
        if !doc.public {
            return Err(ClassifiedError::permission_denied(format!("document {id} is private")));
        }

        let candidates = doc.candidates(&self.config.canonical_file);
        if candidates.is_empty() {
            return Err(ClassifiedError::not_found("no audiobook data file found"));
        }

        let mut first_parse_error = None;
        for (name, file) in candidates {
            let content = self.file_content(file).await?;
            match Collection::from_json(&content) {
                Ok(collection) => {
                    tracing::debug!("read {} entries from {}/{}", collection.len(), id, name);
                    return Ok(collection);
                }
                Err(e) => {
                    tracing::warn!("skipping unparseable file {} in document {}: {}", name, id, e);
                    first_parse_error.get_or_insert_with(|| format!("{name}: {e}"));
                }
            }
        }

        let detail = first_parse_error.unwrap_or_default();
        Err(ClassifiedError::validation(format!("Invalid JSON format in {detail}")))
    }

    /// File contents, following `raw_url` for files the API truncated.
    async fn file_content(&self, file: &FileResponse) -> Result<String, ClassifiedError> {
        match (&file.raw_url, file.truncated) {
            (Some(raw_url), true) => Ok(self.send(HttpRequest::get(raw_url.clone())).await?.body),
            _ => Ok(file.content.clone().unwrap_or_default()),
        }
    }

    async fn fetch(&self, id: &str) -> Result<DocumentResponse, ClassifiedError> {
        let response = self.send(HttpRequest::get(self.document_url(id))).await?;
        parse_document(&response)
    }

    /// One attempt: transport under the deadline, then status mapping.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClassifiedError> {
        let deadline = self.config.request_timeout;
        let response = match tokio::time::timeout(deadline, self.transport.execute(request)).await {
            Err(_) => {
                return Err(ClassifiedError::from_failure(Failure::Timeout(format!(
                    "request timed out after {deadline:?}"
                ))))
            }
            Ok(Err(e)) => return Err(ClassifiedError::from_failure(e.into())),
            Ok(Ok(response)) => response,
        };

        if response.is_success() {
            Ok(response)
        } else {
            Err(ClassifiedError::from_failure(Failure::Http {
                status: response.status,
                message: status_message(&response),
            }))
        }
    }
}

fn require_id(id: &str) -> Result<(), ClassifiedError> {
    if id.trim().is_empty() {
        return Err(ClassifiedError::invalid_argument("document id cannot be empty"));
    }
    Ok(())
}

/// Validates and serializes a collection before anything is sent.
fn encode_payload(collection: &Collection) -> Result<String, ClassifiedError> {
    collection.validate().map_err(|e| ClassifiedError::invalid_argument(e.to_string()))?;
    collection.to_pretty_json().map_err(|e| ClassifiedError::invalid_argument(e.to_string()))
}

fn parse_document(response: &HttpResponse) -> Result<DocumentResponse, ClassifiedError> {
    serde_json::from_str(&response.body).map_err(|e| {
        ClassifiedError::from_failure(Failure::Message(format!("malformed document response: {e}")))
    })
}

/// The API's `message` field, or a trimmed body.
fn status_message(response: &HttpResponse) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(&response.body) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }
    let body = response.body.trim();
    if body.is_empty() {
        return "request failed".to_string();
    }
    body.chars().take(MAX_ERROR_BODY).collect()
}
