// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Concurrent activity logging for one user must not lose goal updates.

use axum::http::StatusCode;

mod common;
use common::{activity_body, create_test_app, create_test_user, send, speed_runner_answers};

const NUM_CONCURRENT_ACTIVITIES: usize = 6;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_slow_runs_accumulate_penalties() {
    let (app, state) = create_test_app();
    let (_, token) = create_test_user(&state, "racer").await;

    let (_, pair) = send(
        &app,
        "POST",
        "/api/questionnaire",
        Some(&token),
        Some(speed_runner_answers()),
    )
    .await;
    let start_pace = pair["curr_goal"]["pace_sec_per_km"].as_i64().unwrap();
    let distance = pair["curr_goal"]["distance_km"].as_f64().unwrap();

    let mut handles = vec![];
    for i in 0..NUM_CONCURRENT_ACTIVITIES {
        let app = app.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            let start = format!("2026-03-{:02}T07:00:00Z", i + 1);
            send(
                &app,
                "POST",
                "/api/activities",
                Some(&token),
                Some(activity_body(&start, distance, 599)),
            )
            .await
        }));
    }

    for handle in handles {
        let (status, _) = handle.await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
    }

    // Every run is slow, so the k-th run processed sees a streak of k and
    // adds 10 * (k - 1) s/km, whatever order the requests were served in.
    let expected_penalty: i64 = (1..=NUM_CONCURRENT_ACTIVITIES as i64).map(|k| 10 * (k - 1)).sum();
    let (_, goal) = send(&app, "GET", "/api/goal", Some(&token), None).await;
    assert_eq!(goal["goal_pace"], (start_pace + expected_penalty).min(599));

    let (_, listed) = send(&app, "GET", "/api/activities", Some(&token), None).await;
    assert_eq!(
        listed["activities"].as_array().unwrap().len(),
        NUM_CONCURRENT_ACTIVITIES
    );
}
