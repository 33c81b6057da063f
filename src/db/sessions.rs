use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, parse_status, to_i64, to_u64},
};
use crate::models::{Destination, Session, SessionSummary, TrackPoint};

fn destination_from_columns(
    name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Option<Destination> {
    match (name, latitude, longitude) {
        (Some(name), Some(latitude), Some(longitude)) => Some(Destination {
            name,
            latitude,
            longitude,
        }),
        _ => None,
    }
}

fn row_to_session(row: &Row) -> Result<Session> {
    let started_at: String = row.get("started_at")?;
    let last_resumed_at: String = row.get("last_resumed_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let status: String = row.get("status")?;
    let elapsed_ms: i64 = row.get("elapsed_ms")?;

    Ok(Session {
        id: row.get("id")?,
        destination: destination_from_columns(
            row.get("destination_name")?,
            row.get("destination_latitude")?,
            row.get("destination_longitude")?,
        ),
        start_latitude: row.get("start_latitude")?,
        start_longitude: row.get("start_longitude")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        last_resumed_at: parse_datetime(&last_resumed_at, "last_resumed_at")?,
        ended_at: parse_optional_datetime(ended_at, "ended_at")?,
        elapsed_ms: to_u64(elapsed_ms, "elapsed_ms")?,
        traveled_km: row.get("traveled_km")?,
        average_speed_kmh: row.get("average_speed_kmh")?,
        top_speed_kmh: row.get("top_speed_kmh")?,
        status: parse_status(&status)?,
        pending_segment_break: row.get("pending_segment_break")?,
        track_points: Vec::new(),
    })
}

fn row_to_summary(row: &Row) -> Result<SessionSummary> {
    let started_at: String = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let status: String = row.get("status")?;
    let elapsed_ms: i64 = row.get("elapsed_ms")?;

    Ok(SessionSummary {
        id: row.get("id")?,
        destination: destination_from_columns(
            row.get("destination_name")?,
            row.get("destination_latitude")?,
            row.get("destination_longitude")?,
        ),
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_optional_datetime(ended_at, "ended_at")?,
        elapsed_ms: to_u64(elapsed_ms, "elapsed_ms")?,
        traveled_km: row.get("traveled_km")?,
        average_speed_kmh: row.get("average_speed_kmh")?,
        top_speed_kmh: row.get("top_speed_kmh")?,
        status: parse_status(&status)?,
    })
}

fn row_to_track_point(row: &Row) -> Result<TrackPoint> {
    let recorded_at: String = row.get("recorded_at")?;

    Ok(TrackPoint {
        id: row.get("id")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        recorded_at: parse_datetime(&recorded_at, "recorded_at")?,
        speed_kmh: row.get("speed_kmh")?,
        altitude_m: row.get("altitude_m")?,
        accuracy_m: row.get("accuracy_m")?,
        is_segment_start: row.get("is_segment_start")?,
    })
}

fn load_track_points(conn: &rusqlite::Connection, session_id: &str) -> Result<Vec<TrackPoint>> {
    let mut stmt = conn.prepare(
        "SELECT id, latitude, longitude, recorded_at, speed_kmh, altitude_m, accuracy_m, is_segment_start
         FROM track_points
         WHERE session_id = ?1
         ORDER BY seq ASC",
    )?;

    let mut rows = stmt.query(params![session_id])?;
    let mut points = Vec::new();
    while let Some(row) = rows.next()? {
        points.push(row_to_track_point(row)?);
    }
    Ok(points)
}

const SESSION_COLUMNS: &str = "id, destination_name, destination_latitude, destination_longitude, \
     start_latitude, start_longitude, started_at, last_resumed_at, ended_at, \
     elapsed_ms, traveled_km, average_speed_kmh, top_speed_kmh, status, pending_segment_break";

impl Database {
    pub async fn upsert_session(&self, session: &Session) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, destination_name, destination_latitude, destination_longitude,
                                       start_latitude, start_longitude, started_at, last_resumed_at, ended_at,
                                       elapsed_ms, traveled_km, average_speed_kmh, top_speed_kmh, status,
                                       pending_segment_break)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                 ON CONFLICT(id) DO UPDATE SET
                     last_resumed_at = excluded.last_resumed_at,
                     ended_at = excluded.ended_at,
                     elapsed_ms = excluded.elapsed_ms,
                     traveled_km = excluded.traveled_km,
                     average_speed_kmh = excluded.average_speed_kmh,
                     top_speed_kmh = excluded.top_speed_kmh,
                     status = excluded.status,
                     pending_segment_break = excluded.pending_segment_break",
                params![
                    record.id,
                    record.destination.as_ref().map(|d| d.name.clone()),
                    record.destination.as_ref().map(|d| d.latitude),
                    record.destination.as_ref().map(|d| d.longitude),
                    record.start_latitude,
                    record.start_longitude,
                    record.started_at.to_rfc3339(),
                    record.last_resumed_at.to_rfc3339(),
                    record.ended_at.as_ref().map(|dt| dt.to_rfc3339()),
                    to_i64(record.elapsed_ms)?,
                    record.traveled_km,
                    record.average_speed_kmh,
                    record.top_speed_kmh,
                    record.status.as_str(),
                    record.pending_segment_break,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn count_track_points(&self, session_id: &str) -> Result<u64> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM track_points WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )?;
            to_u64(count, "track point count")
        })
        .await
    }

    /// Inserts points starting at `start_seq`, preserving their order.
    pub async fn append_track_points(
        &self,
        session_id: &str,
        start_seq: u64,
        points: Vec<TrackPoint>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO track_points (id, session_id, seq, latitude, longitude, recorded_at,
                                               speed_kmh, altitude_m, accuracy_m, is_segment_start)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                )?;
                for (i, point) in points.iter().enumerate() {
                    stmt.execute(params![
                        point.id,
                        session_id,
                        to_i64(start_seq + i as u64)?,
                        point.latitude,
                        point.longitude,
                        point.recorded_at.to_rfc3339(),
                        point.speed_kmh,
                        point.altitude_m,
                        point.accuracy_m,
                        point.is_segment_start,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn get_session_with_points(&self, session_id: &str) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
            ))?;

            let mut rows = stmt.query(params![session_id.clone()])?;
            let session = match rows.next()? {
                Some(row) => {
                    let mut session = row_to_session(row)?;
                    session.track_points = load_track_points(conn, &session_id)?;
                    Some(session)
                }
                None => None,
            };
            Ok(session)
        })
        .await
    }

    pub async fn get_active_session(&self) -> Result<Option<Session>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE status IN ('Running', 'Paused')
                 ORDER BY started_at DESC
                 LIMIT 1"
            ))?;

            let mut rows = stmt.query([])?;
            let session = match rows.next()? {
                Some(row) => {
                    let mut session = row_to_session(row)?;
                    let id = session.id.clone();
                    session.track_points = load_track_points(conn, &id)?;
                    Some(session)
                }
                None => None,
            };
            Ok(session)
        })
        .await
    }

    pub async fn active_session_id(&self) -> Result<Option<String>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM sessions
                 WHERE status IN ('Running', 'Paused')
                 ORDER BY started_at DESC
                 LIMIT 1",
            )?;

            let mut rows = stmt.query([])?;
            let id = match rows.next()? {
                Some(row) => Some(row.get::<_, String>(0)?),
                None => None,
            };
            Ok(id)
        })
        .await
    }

    pub async fn list_completed_paginated(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SessionSummary>> {
        let limit = limit as i64;
        let offset = offset as i64;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE status = 'Completed'
                 ORDER BY started_at DESC
                 LIMIT ?1 OFFSET ?2"
            ))?;

            let mut rows = stmt.query(params![limit, offset])?;
            let mut summaries = Vec::new();
            while let Some(row) = rows.next()? {
                summaries.push(row_to_summary(row)?);
            }
            Ok(summaries)
        })
        .await
    }
}
