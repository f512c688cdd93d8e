use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use pacekeeper::config::GoalEngineConfig;
use pacekeeper::models::{NewActivity, QuestionnaireAnswers};
use pacekeeper::services::{ratchet, resolve, PerformanceWindow};
use std::hint::black_box;
use uuid::Uuid;

fn answers() -> QuestionnaireAnswers {
    QuestionnaireAnswers {
        g1: Some("Faster speed".to_string()),
        g2: Some("Yes (Additional: distance=10.0, speed=5)".to_string()),
        h1: Some("Within a week".to_string()),
        h2: Some("3~10km".to_string()),
        h3: Some("5~7".to_string()),
        h4: Some("kg (Additional: weight=65)".to_string()),
        m1: Some("No".to_string()),
        m2: Some("Yes".to_string()),
    }
}

fn benchmark_goal_engine(c: &mut Criterion) {
    let config = GoalEngineConfig::default();
    let user_id = Uuid::new_v4();
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 7, 0, 0).unwrap();

    let goal_pair = resolve(&answers(), &config)
        .expect("Failed to resolve answers")
        .into_goal_pair(user_id, start);

    // Alternating fast and slow runs exercise every rule.
    let history: Vec<_> = (0..10)
        .map(|i| {
            NewActivity {
                start_time: start + Duration::days(i),
                duration_seconds: 1800,
                distance_km: if i % 3 == 0 { 4.0 } else { 6.0 },
                average_pace_seconds_per_km: if i % 2 == 0 { 380 } else { 450 },
                split_paces: vec![],
                start_latitude: None,
                start_longitude: None,
                end_latitude: None,
                end_longitude: None,
            }
            .into_activity(user_id, None, start)
        })
        .collect();
    let window = PerformanceWindow::new(history.clone(), config.window_size);

    let mut group = c.benchmark_group("goal_engine");

    group.bench_function("resolve_questionnaire", |b| {
        b.iter(|| resolve(black_box(&answers()), &config))
    });

    group.bench_function("ratchet_full_window", |b| {
        b.iter(|| ratchet(black_box(&goal_pair), black_box(&window), &config))
    });

    group.bench_function("build_window_with_pending", |b| {
        let pending = &history[0];
        b.iter(|| PerformanceWindow::with_pending(pending, black_box(history.clone()), 10))
    });

    group.finish();
}

criterion_group!(benches, benchmark_goal_engine);
criterion_main!(benches);
