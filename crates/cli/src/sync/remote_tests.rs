// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the remote store.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::remote::{RemoteConfig, RemoteStore, Visibility, CANONICAL_FILE};
use super::test_helpers::{fast_retry, make_collection, make_remote, remote_config};
use super::transport::Method;
use super::transport_tests::MockTransport;
use shelf_core::ErrorCategory;
use std::time::Duration;
use yare::parameterized;

#[tokio::test]
async fn read_returns_canonical_collection() {
    let transport = MockTransport::new();
    let collection = make_collection(&["a", "b"], 10);
    transport.insert_collection("doc", &collection);

    let read = make_remote(&transport).read("doc").await.unwrap();
    assert_eq!(read, collection);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn read_falls_back_to_other_json_files() {
    let transport = MockTransport::new();
    let collection = make_collection(&["a"], 10);
    let json = collection.to_pretty_json().unwrap();
    transport.insert_document("doc", true, &[("notes.txt", "hello"), ("backup.json", &json)]);

    let read = make_remote(&transport).read("doc").await.unwrap();
    assert_eq!(read.len(), 1);
}

#[tokio::test]
async fn read_prefers_canonical_over_other_json() {
    let transport = MockTransport::new();
    let canonical = make_collection(&["a", "b"], 10).to_pretty_json().unwrap();
    let other = make_collection(&["z"], 10).to_pretty_json().unwrap();
    transport.insert_document("doc", true, &[("aaa.json", &other), (CANONICAL_FILE, &canonical)]);

    let read = make_remote(&transport).read("doc").await.unwrap();
    assert!(read.contains("a"));
    assert!(!read.contains("z"));
}

#[tokio::test]
async fn read_skips_unparseable_candidate_when_another_parses() {
    let transport = MockTransport::new();
    let good = make_collection(&["a"], 10).to_pretty_json().unwrap();
    let files = [(CANONICAL_FILE, "{ not json"), ("other.json", good.as_str())];
    transport.insert_document("doc", true, &files);

    let read = make_remote(&transport).read("doc").await.unwrap();
    assert!(read.contains("a"));
}

#[tokio::test]
async fn read_of_unparseable_payload_is_a_validation_error() {
    let transport = MockTransport::new();
    transport.insert_document("doc", true, &[(CANONICAL_FILE, "{ \"audiobooks\": [ oops")]);

    let err = make_remote(&transport).read("doc").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::Validation);
    assert!(err.message.contains("Invalid JSON format"), "{}", err.message);
    assert!(err.message.contains(CANONICAL_FILE));
    assert!(!err.retryable);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn read_without_json_files_is_not_found() {
    let transport = MockTransport::new();
    transport.insert_document("doc", true, &[("readme.md", "# books")]);

    let err = make_remote(&transport).read("doc").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::NotFound);
    assert!(err.message.contains("no audiobook data file found"));
}

#[tokio::test]
async fn read_follows_raw_url_for_truncated_files() {
    let transport = MockTransport::new();
    let collection = make_collection(&["a", "b", "c"], 10);
    transport.insert_collection("doc", &collection);
    transport.truncate_file("doc", CANONICAL_FILE);

    let read = make_remote(&transport).read("doc").await.unwrap();
    assert_eq!(read, collection);
    assert_eq!(transport.request_count(), 2);
    assert!(transport.requests()[1].url.starts_with("https://raw.test/"));
}

#[tokio::test]
async fn private_document_read_is_permission_denied() {
    let transport = MockTransport::new();
    let json = make_collection(&["a"], 10).to_pretty_json().unwrap();
    transport.insert_document("doc", false, &[(CANONICAL_FILE, &json)]);
    let remote = make_remote(&transport);

    let err = remote.read("doc").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::Permission);
    assert!(!remote.exists("doc").await.unwrap());
}

#[tokio::test]
async fn exists_reports_public_and_missing_documents() {
    let transport = MockTransport::new();
    transport.insert_collection("doc", &make_collection(&[], 10));
    let remote = make_remote(&transport);

    assert!(remote.exists("doc").await.unwrap());
    assert!(!remote.exists("missing").await.unwrap());
}

#[parameterized(
    read = { "read" },
    update = { "update" },
    exists = { "exists" },
    metadata = { "metadata" },
)]
fn empty_id_fails_without_network(operation: &str) {
    let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
    rt.block_on(async {
        let transport = MockTransport::new();
        let remote = make_remote(&transport);
        let collection = make_collection(&[], 0);

        let err = match operation {
            "read" => remote.read("").await.map(|_| ()),
            "update" => remote.update("  ", &collection).await,
            "exists" => remote.exists("").await.map(|_| ()),
            _ => remote.get_metadata("").await.map(|_| ()),
        }
        .unwrap_err();

        assert_eq!(err.category, ErrorCategory::Validation);
        assert!(err.message.starts_with("invalid argument"));
        assert_eq!(transport.request_count(), 0);
    });
}

#[tokio::test]
async fn invalid_collection_is_rejected_before_sending() {
    let transport = MockTransport::new();
    let mut collection = make_collection(&["a"], 10);
    collection.audiobooks.push(collection.audiobooks[0].clone());

    let err = make_remote(&transport).create(&collection, None).await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::Validation);
    assert_eq!(transport.request_count(), 0);

    collection.audiobooks.pop();
    collection.version = String::new();
    let err = make_remote(&transport).update("doc", &collection).await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::Validation);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn create_then_read_back() {
    let transport = MockTransport::new();
    let remote = make_remote(&transport);
    let collection = make_collection(&["a", "b"], 10);

    let id = remote.create(&collection, Some("my books")).await.unwrap();
    assert_eq!(transport.collection(&id).unwrap(), collection);
    assert_eq!(transport.document(&id).unwrap().description, "my books");
    assert_eq!(remote.read(&id).await.unwrap(), collection);
}

#[tokio::test]
async fn update_replaces_payload() {
    let transport = MockTransport::new();
    transport.insert_collection("doc", &make_collection(&["a"], 10));
    let remote = make_remote(&transport);

    let next = make_collection(&["a", "b", "c"], 20);
    remote.update("doc", &next).await.unwrap();
    assert_eq!(transport.collection("doc").unwrap(), next);
    assert_eq!(transport.count(Method::Patch), 1);
}

#[tokio::test]
async fn update_of_missing_document_is_not_found() {
    let transport = MockTransport::new();
    let err =
        make_remote(&transport).update("missing", &make_collection(&[], 0)).await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::NotFound);
    assert_eq!(err.http_status, Some(404));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn server_errors_are_retried() {
    let transport = MockTransport::new();
    transport.insert_collection("doc", &make_collection(&["a"], 10));
    transport.fail_next(2, 502, "Bad Gateway");

    let read = make_remote(&transport).read("doc").await.unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn remote_calls_stop_after_three_attempts() {
    let transport = MockTransport::new();
    transport.insert_collection("doc", &make_collection(&["a"], 10));
    transport.fail_next(5, 503, "Service Unavailable");

    let err = make_remote(&transport).read("doc").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::ServerError);
    assert_eq!(err.http_status, Some(503));
    assert_eq!(err.retry_attempts, 3);
    assert_eq!(err.operation_type.as_deref(), Some("read"));
    assert_eq!(transport.request_count(), 3);
}

#[parameterized(
    unauthorized = { 401, "Bad credentials", ErrorCategory::Authentication, 1 },
    forbidden = { 403, "Resource not accessible", ErrorCategory::Permission, 1 },
    rate_limited = { 403, "API rate limit exceeded", ErrorCategory::RateLimit, 3 },
    unprocessable = { 422, "Validation Failed", ErrorCategory::Validation, 1 },
)]
fn status_codes_are_classified(status: u16, message: &str, category: ErrorCategory, calls: usize) {
    let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
    rt.block_on(async {
        let transport = MockTransport::new();
        transport.insert_collection("doc", &make_collection(&[], 10));
        transport.fail_next(3, status, message);

        let err = make_remote(&transport).read("doc").await.unwrap_err();
        assert_eq!(err.category, category);
        assert_eq!(err.http_status, Some(status));
        assert!(err.message.contains(message));
        assert_eq!(transport.request_count(), calls);
    });
}

#[tokio::test]
async fn dropped_connections_are_network_errors() {
    let transport = MockTransport::new();
    transport.set_offline(true);

    let err = make_remote(&transport).exists("doc").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::Network);
    assert!(err.retryable);
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn slow_responses_hit_the_deadline() {
    let transport = MockTransport::new();
    transport.insert_collection("doc", &make_collection(&[], 10));
    transport.set_delay(Duration::from_millis(500));

    let config = RemoteConfig { request_timeout: Duration::from_millis(20), ..remote_config() };
    let remote = RemoteStore::new(config, transport.clone(), &fast_retry());

    let err = remote.read("doc").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::Timeout);
    assert!(err.retryable);
    assert_eq!(err.retry_attempts, 3);
}

#[tokio::test]
async fn metadata_describes_document() {
    let transport = MockTransport::new();
    let json = make_collection(&["a"], 10).to_pretty_json().unwrap();
    transport.insert_document("doc", false, &[(CANONICAL_FILE, &json), ("cover.png", "")]);

    let meta = make_remote(&transport).get_metadata("doc").await.unwrap();
    assert_eq!(meta.id, "doc");
    assert_eq!(meta.visibility, Visibility::Private);
    assert_eq!(meta.file_names, vec![CANONICAL_FILE.to_string(), "cover.png".to_string()]);
    assert!(meta.has_payload);
}

#[tokio::test]
async fn metadata_without_payload() {
    let transport = MockTransport::new();
    transport.insert_document("doc", true, &[("notes.txt", "x")]);

    let meta = make_remote(&transport).get_metadata("doc").await.unwrap();
    assert_eq!(meta.visibility, Visibility::Public);
    assert!(!meta.has_payload);
}
