mod common;

use std::time::Duration;

use chrono::{Duration as Span, Utc};
use ridelog::{
    Destination, Session, SessionStatus, SessionStore, SqliteSessionStore, TrackingError,
};
use tempfile::TempDir;
use tokio::time::timeout;

use common::{completed_session, fix_at, init_test_logging};

async fn open_store(dir: &TempDir) -> SqliteSessionStore {
    init_test_logging();
    SqliteSessionStore::open(dir.path().join("ridelog.db"))
        .await
        .unwrap()
}

fn assert_same_session(actual: &Session, expected: &Session) {
    assert_eq!(actual.id, expected.id);
    assert_eq!(actual.destination, expected.destination);
    assert_eq!(actual.start_latitude, expected.start_latitude);
    assert_eq!(actual.start_longitude, expected.start_longitude);
    assert_eq!(actual.started_at, expected.started_at);
    assert_eq!(actual.last_resumed_at, expected.last_resumed_at);
    assert_eq!(actual.ended_at, expected.ended_at);
    assert_eq!(actual.elapsed_ms, expected.elapsed_ms);
    assert_eq!(actual.traveled_km, expected.traveled_km);
    assert_eq!(actual.average_speed_kmh, expected.average_speed_kmh);
    assert_eq!(actual.top_speed_kmh, expected.top_speed_kmh);
    assert_eq!(actual.status, expected.status);
    assert_eq!(actual.pending_segment_break, expected.pending_segment_break);

    assert_eq!(actual.track_points.len(), expected.track_points.len());
    for (a, e) in actual.track_points.iter().zip(&expected.track_points) {
        assert_eq!(a.id, e.id);
        assert_eq!(a.latitude, e.latitude);
        assert_eq!(a.longitude, e.longitude);
        assert_eq!(a.recorded_at, e.recorded_at);
        assert_eq!(a.speed_kmh, e.speed_kmh);
        assert_eq!(a.altitude_m, e.altitude_m);
        assert_eq!(a.accuracy_m, e.accuracy_m);
        assert_eq!(a.is_segment_start, e.is_segment_start);
    }
}

#[tokio::test]
async fn test_session_roundtrips_with_points() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let t0 = Utc::now();
    let destination = Destination {
        name: "Tempelhofer Feld".into(),
        latitude: 52.4736,
        longitude: 13.4018,
    };
    let mut session = Session::begin(
        "ride-1".to_string(),
        Some(destination),
        &fix_at(52.50, 13.40, t0),
        t0,
    );
    let mut climb = fix_at(52.51, 13.41, t0 + Span::seconds(60));
    climb.altitude_m = Some(120.5);
    session.record_point(&climb, 1.5);
    session.apply_restart_recovery(t0 + Span::seconds(90));

    store.persist(&session).await.unwrap();
    let loaded = store.get("ride-1").await.unwrap();

    assert!(loaded.pending_segment_break);
    assert_same_session(&loaded, &session);
}

#[tokio::test]
async fn test_persist_appends_only_new_points() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let t0 = Utc::now();
    let mut session = Session::begin("ride-1".to_string(), None, &fix_at(52.50, 13.40, t0), t0);
    store.persist(&session).await.unwrap();
    store.persist(&session).await.unwrap();
    assert_eq!(store.get("ride-1").await.unwrap().track_points.len(), 1);

    session.record_point(&fix_at(52.51, 13.41, t0 + Span::seconds(60)), 1.5);
    session.record_point(&fix_at(52.52, 13.42, t0 + Span::seconds(120)), 1.5);
    store.persist(&session).await.unwrap();

    let loaded = store.get("ride-1").await.unwrap();
    assert_eq!(loaded.track_points.len(), 3);
    assert_same_session(&loaded, &session);
}

#[tokio::test]
async fn test_only_one_session_may_be_active() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let t0 = Utc::now();
    let mut first = Session::begin("ride-a".to_string(), None, &fix_at(52.5, 13.4, t0), t0);
    store.persist(&first).await.unwrap();

    let second = Session::begin(
        "ride-b".to_string(),
        None,
        &fix_at(48.1, 11.6, t0 + Span::seconds(10)),
        t0 + Span::seconds(10),
    );
    let err = store.persist(&second).await.unwrap_err();
    assert!(matches!(err, TrackingError::Persistence(_)));
    assert!(matches!(
        store.get("ride-b").await.unwrap_err(),
        TrackingError::SessionNotFound(_)
    ));

    // A paused session still holds the slot.
    first.apply_pause(t0 + Span::seconds(30));
    store.persist(&first).await.unwrap();
    assert!(store.persist(&second).await.is_err());

    first.apply_stop(t0 + Span::seconds(60));
    store.persist(&first).await.unwrap();
    store.persist(&second).await.unwrap();

    let active = store.active_session().await.unwrap().unwrap();
    assert_eq!(active.id, "ride-b");
}

#[tokio::test]
async fn test_active_session_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let t0 = Utc::now();

    {
        let store = open_store(&dir).await;
        let mut session =
            Session::begin("ride-1".to_string(), None, &fix_at(52.50, 13.40, t0), t0);
        session.record_point(&fix_at(52.51, 13.41, t0 + Span::seconds(60)), 1.5);
        store.persist(&session).await.unwrap();
    }

    let reopened = open_store(&dir).await;
    let active = reopened.active_session().await.unwrap().unwrap();
    assert_eq!(active.id, "ride-1");
    assert_eq!(active.status, SessionStatus::Running);
    assert_eq!(active.track_points.len(), 2);

    // The watch is seeded from disk, so observers see the ride immediately.
    let rx = reopened.observe_active();
    let watched_id = rx.borrow().as_ref().map(|s| s.id.clone());
    assert_eq!(watched_id, Some("ride-1".to_string()));
}

#[tokio::test]
async fn test_completed_history_pages_newest_first() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let t0 = Utc::now();
    for (id, hours_ago) in [("oldest", 3), ("middle", 2), ("newest", 1)] {
        store
            .persist(&completed_session(id, t0 - Span::hours(hours_ago), 60_000))
            .await
            .unwrap();
    }
    let live = Session::begin("ride-live".to_string(), None, &fix_at(52.5, 13.4, t0), t0);
    store.persist(&live).await.unwrap();

    let first_page = store.list_completed(2, 0).await.unwrap();
    assert_eq!(
        first_page.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
        vec!["newest", "middle"]
    );

    let second_page = store.list_completed(2, 2).await.unwrap();
    assert_eq!(
        second_page.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
        vec!["oldest"]
    );
}

#[tokio::test]
async fn test_get_missing_session_reports_not_found() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let err = store.get("nope").await.unwrap_err();
    assert!(matches!(err, TrackingError::SessionNotFound(id) if id == "nope"));
}

#[tokio::test]
async fn test_completing_clears_the_active_watch() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let t0 = Utc::now();
    let mut session = Session::begin("ride-1".to_string(), None, &fix_at(52.5, 13.4, t0), t0);
    store.persist(&session).await.unwrap();

    let mut rx = store.observe_active();
    assert!(rx.borrow().is_some());

    session.apply_stop(t0 + Span::seconds(60));
    store.persist(&session).await.unwrap();

    timeout(Duration::from_secs(1), rx.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(rx.borrow().is_none());
}

async fn schema_version(store: &SqliteSessionStore) -> i64 {
    store
        .database()
        .execute(|conn| {
            let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
            Ok(version)
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_schema_version_is_current_after_reopen() {
    let dir = TempDir::new().unwrap();

    let store = open_store(&dir).await;
    let initial = schema_version(&store).await;
    assert!(initial >= 2);
    drop(store);

    let reopened = open_store(&dir).await;
    assert_eq!(schema_version(&reopened).await, initial);
}
