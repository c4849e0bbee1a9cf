// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tour execution lifecycle tests against the in-memory store.

use chrono::Utc;
use tour_tracker::db::ExecutionStore;
use tour_tracker::error::AppError;
use tour_tracker::models::{Coordinates, ExecutionStatus, TourStatus};

mod common;
use common::{create_test_app, unique_user};

const KP1: (f64, f64) = (45.0, 19.0);
const KP2: (f64, f64) = (45.001, 19.0);
const KP3: (f64, f64) = (45.002, 19.0);

fn at((lat, lon): (f64, f64)) -> Coordinates {
    Coordinates::new(lat, lon)
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let app = create_test_app();
    let user = unique_user();
    let tour = app
        .catalog
        .add_tour("Old Town", TourStatus::Published, &[KP1, KP2]);
    app.locations.set(&user, 44.99, 19.0);

    let first = app.state.executions.start(&user, tour).await.unwrap();
    let second = app.state.executions.start(&user, tour).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(app.store.history_for_user(&user).len(), 1);
    assert_eq!(first.total_key_points, 2);
    assert_eq!(first.current_position, Coordinates::new(44.99, 19.0));
}

#[tokio::test]
async fn test_concurrent_starts_share_one_execution() {
    let app = create_test_app();
    let user = unique_user();
    let tour = app
        .catalog
        .add_tour("Old Town", TourStatus::Published, &[KP1, KP2]);
    app.locations.set(&user, 44.99, 19.0);

    let svc = &app.state.executions;
    let (a, b, c) = tokio::join!(
        svc.start(&user, tour),
        svc.start(&user, tour),
        svc.start(&user, tour)
    );

    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
    assert_eq!(a.id, b.id);
    assert_eq!(b.id, c.id);
    assert_eq!(app.store.history_for_user(&user).len(), 1);
}

#[tokio::test]
async fn test_snapshot_survives_catalog_reorder() {
    let app = create_test_app();
    let user = unique_user();
    let tour = app
        .catalog
        .add_tour("Old Town", TourStatus::Published, &[KP1, KP2, KP3]);
    app.locations.set(&user, 44.99, 19.0);

    let execution = app.state.executions.start(&user, tour).await.unwrap();
    app.catalog.reverse_key_points(tour);

    let stored = app.state.executions.get(execution.id).await.unwrap().unwrap();
    let titles: Vec<_> = stored
        .key_points_remaining
        .iter()
        .map(|k| (k.order, k.title.as_str()))
        .collect();
    assert_eq!(titles, vec![(1, "KP1"), (2, "KP2"), (3, "KP3")]);

    // First check still targets the original first key point
    let result = app
        .state
        .executions
        .check_proximity(&user, at(KP1), None)
        .await
        .unwrap();
    assert!(result.reached);
    assert_eq!(result.just_completed_point.unwrap().title, "KP1");
}

#[tokio::test]
async fn test_later_key_point_does_not_count() {
    let app = create_test_app();
    let user = unique_user();
    let tour = app
        .catalog
        .add_tour("Old Town", TourStatus::Published, &[KP1, KP2, KP3]);
    app.locations.set(&user, 44.99, 19.0);
    let execution = app.state.executions.start(&user, tour).await.unwrap();

    // Standing on KP2 while KP1 is unvisited
    let result = app
        .state
        .executions
        .check_proximity(&user, at(KP2), None)
        .await
        .unwrap();

    assert!(!result.reached);
    assert!(result.distance_meters > 100.0);
    assert_eq!(result.next_key_point.unwrap().title, "KP1");
    assert_eq!(result.remaining_count, 3);
    assert!(!result.completed_session);

    let stored = app.state.executions.get(execution.id).await.unwrap().unwrap();
    assert_eq!(stored.key_points_remaining.len(), 3);
    assert!(stored.key_points_visited.is_empty());
    assert_eq!(stored.current_position, at(KP2));
}

#[tokio::test]
async fn test_walk_to_completion() {
    let app = create_test_app();
    let user = unique_user();
    let tour = app
        .catalog
        .add_tour("Old Town", TourStatus::Published, &[KP1, KP2]);
    app.locations.set(&user, 44.99, 19.0);
    let execution = app.state.executions.start(&user, tour).await.unwrap();
    let svc = &app.state.executions;

    let first = svc.check_proximity(&user, at(KP1), None).await.unwrap();
    assert!(first.reached);
    assert_eq!(first.remaining_count, 1);
    assert!(!first.completed_session);

    let last = svc.check_proximity(&user, at(KP2), None).await.unwrap();
    assert!(last.reached);
    assert_eq!(last.remaining_count, 0);
    assert!(last.completed_session);
    assert_eq!(last.just_completed_point.unwrap().order, 2);

    let stored = svc.get(execution.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ExecutionStatus::Completed);
    assert!(stored.ended_at.is_some());
    assert!(stored.key_points_remaining.is_empty());
    let orders: Vec<u32> = stored
        .key_points_visited
        .iter()
        .map(|v| v.key_point.order)
        .collect();
    assert_eq!(orders, vec![1, 2]);

    assert!(svc.get_active(&user).await.unwrap().is_none());
    let err = svc.check_proximity(&user, at(KP2), None).await.unwrap_err();
    assert!(matches!(err, AppError::State(_)));
}

#[tokio::test]
async fn test_abandon_is_terminal() {
    let app = create_test_app();
    let user = unique_user();
    let tour = app
        .catalog
        .add_tour("Old Town", TourStatus::Published, &[KP1, KP2]);
    app.locations.set(&user, 44.99, 19.0);
    let svc = &app.state.executions;

    let first = svc.start(&user, tour).await.unwrap();
    let abandoned = svc.abandon(&user, None).await.unwrap();
    assert_eq!(abandoned.status, ExecutionStatus::Abandoned);
    assert!(abandoned.ended_at.is_some());

    let err = svc.check_proximity(&user, at(KP1), None).await.unwrap_err();
    assert!(matches!(err, AppError::State(_)));

    let err = svc.abandon_execution(first.id).await.unwrap_err();
    assert!(matches!(err, AppError::State(_)));

    let second = svc.start(&user, tour).await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(app.store.history_for_user(&user).len(), 2);
}

#[tokio::test]
async fn test_start_rejections() {
    let app = create_test_app();
    let user = unique_user();
    let svc = &app.state.executions;

    let err = svc.start(&user, uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let draft = app.catalog.add_tour("Draft", TourStatus::Draft, &[KP1]);
    let err = svc.start(&user, draft).await.unwrap_err();
    assert!(matches!(err, AppError::State(_)));

    let empty = app.catalog.add_tour("Empty", TourStatus::Published, &[]);
    let err = svc.start(&user, empty).await.unwrap_err();
    assert!(matches!(err, AppError::State(_)));

    // No location recorded yet
    let archived = app.catalog.add_tour("Archived", TourStatus::Archived, &[KP1]);
    let err = svc.start(&user, archived).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    app.locations.set(&user, 44.99, 19.0);
    assert!(svc.start(&user, archived).await.is_ok());

    assert_eq!(app.store.history_for_user(&user).len(), 1);
}

#[tokio::test]
async fn test_catalog_failure_is_upstream() {
    let app = create_test_app();
    let user = unique_user();
    let tour = app.catalog.add_tour("Old Town", TourStatus::Published, &[KP1]);
    app.locations.set(&user, 44.99, 19.0);
    app.catalog.set_failing(true);

    let err = app.state.executions.start(&user, tour).await.unwrap_err();
    assert!(matches!(err, AppError::Upstream(_)));
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_multiple_active_requires_tour_id() {
    let app = create_test_app();
    let user = unique_user();
    let tour_a = app.catalog.add_tour("A", TourStatus::Published, &[KP1]);
    let tour_b = app.catalog.add_tour("B", TourStatus::Published, &[KP3]);
    app.locations.set(&user, 44.99, 19.0);
    let svc = &app.state.executions;

    svc.start(&user, tour_a).await.unwrap();
    let b = svc.start(&user, tour_b).await.unwrap();

    let err = svc.check_proximity(&user, at(KP3), None).await.unwrap_err();
    assert!(matches!(err, AppError::State(_)));

    let result = svc
        .check_proximity(&user, at(KP3), Some(tour_b))
        .await
        .unwrap();
    assert!(result.reached);
    assert!(result.completed_session);

    let done = svc.get(b.id).await.unwrap().unwrap();
    assert_eq!(done.status, ExecutionStatus::Completed);

    // Only A is left, so no tourId is needed
    let remaining = svc.get_active(&user).await.unwrap().unwrap();
    assert_eq!(remaining.tour_id, tour_a);
    svc.abandon(&user, None).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_checks_visit_once() {
    let app = create_test_app();
    let user = unique_user();
    let tour = app
        .catalog
        .add_tour("Old Town", TourStatus::Published, &[KP1, KP2, KP3]);
    app.locations.set(&user, 44.99, 19.0);
    let svc = &app.state.executions;
    let execution = svc.start(&user, tour).await.unwrap();

    let (a, b) = tokio::join!(
        svc.check_proximity(&user, at(KP1), None),
        svc.check_proximity(&user, at(KP1), None)
    );
    let reached = [a.unwrap(), b.unwrap()]
        .iter()
        .filter(|r| r.reached)
        .count();
    assert_eq!(reached, 1);

    let stored = svc.get(execution.id).await.unwrap().unwrap();
    assert_eq!(stored.key_points_visited.len(), 1);
    assert_eq!(stored.key_points_remaining.len(), 2);
    assert_eq!(stored.version, 2);
}

#[tokio::test]
async fn test_stale_replace_rejected() {
    let app = create_test_app();
    let user = unique_user();
    let tour = app
        .catalog
        .add_tour("Old Town", TourStatus::Published, &[KP1, KP2]);
    app.locations.set(&user, 44.99, 19.0);
    let svc = &app.state.executions;
    let stale = svc.start(&user, tour).await.unwrap();

    svc.check_proximity(&user, at(KP1), None).await.unwrap();

    // A writer holding the pre-check copy must not undo the visit
    let mut overwrite = stale.clone();
    overwrite.abandon(Utc::now()).unwrap();
    let err = app.store.replace(&overwrite).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let stored = svc.get(stale.id).await.unwrap().unwrap();
    assert!(stored.is_active());
    assert_eq!(stored.key_points_visited.len(), 1);
}
