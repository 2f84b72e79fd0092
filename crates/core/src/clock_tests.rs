// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::TimeZone;
use std::sync::Arc;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

#[test]
fn manual_clock_is_frozen_until_moved() {
    let clock = ManualClock::new(at(1_000));
    assert_eq!(clock.now(), at(1_000));
    assert_eq!(clock.now(), at(1_000));

    clock.advance(Duration::seconds(5));
    assert_eq!(clock.now(), at(1_005));

    clock.set(at(10));
    assert_eq!(clock.now(), at(10));
}

#[test]
fn arc_clock_delegates() {
    let clock = Arc::new(ManualClock::new(at(42)));
    let shared: Arc<dyn ClockSource> = clock.clone();
    clock.advance(Duration::seconds(1));
    assert_eq!(shared.now(), at(43));
}

#[test]
fn system_clock_moves_forward() {
    let a = SystemClock.now();
    let b = SystemClock.now();
    assert!(b >= a);
}
