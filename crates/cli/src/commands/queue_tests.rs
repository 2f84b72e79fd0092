// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use crate::sync::test_helpers::ts;
use serde_json::Value;
use shelf_core::OpKind;

#[test]
fn test_format_fresh_operation() {
    let op = QueueOperation::new(OpKind::Delete, "ab-1", Value::Null, ts(0));
    assert_eq!(format_operation(&op), "delete  ab-1  queued 2026-01-01 00:00:00 UTC");
}

#[test]
fn test_format_retried_operation() {
    let mut op = QueueOperation::new(OpKind::Update, "ab-1", Value::Null, ts(0));
    op.retry_count = 2;
    op.last_error = Some("timeout".to_string());

    assert!(format_operation(&op).ends_with("(2 retries: timeout)"));

    op.retry_count = 1;
    op.last_error = None;
    assert!(format_operation(&op).ends_with("(1 retry)"));
}
