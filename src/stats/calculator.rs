use crate::models::Session;
use crate::stats::{RideStats, StatsConfig};

/// Walks the recorded track once and derives the post-ride statistics.
///
/// Each consecutive pair of points is classified by the speed at the later
/// point; pairs whose later point opens a new segment are skipped, since the
/// gap they bridge was never observed. Moving time is clamped to the
/// session's elapsed time and idle time is the remainder.
pub fn compute_stats(session: &Session, config: &StatsConfig, weight_kg: Option<f64>) -> RideStats {
    let mut moving_ms: u64 = 0;
    let mut altitude_loss_m = 0.0;

    for pair in session.track_points.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        if curr.is_segment_start {
            continue;
        }

        if curr.speed_kmh >= config.moving_speed_threshold_kmh {
            moving_ms += (curr.recorded_at - prev.recorded_at).num_milliseconds().max(0) as u64;
        }

        if let (Some(prev_alt), Some(curr_alt)) = (prev.altitude_m, curr.altitude_m) {
            let drop = prev_alt - curr_alt;
            if drop > config.altitude_noise_threshold_m {
                altitude_loss_m += drop;
            }
        }
    }

    let moving_ms = moving_ms.min(session.elapsed_ms);
    let idle_ms = session.elapsed_ms - moving_ms;

    let estimated_calories_kcal = weight_kg.map(|weight| {
        let met = met_for_speed(session.average_speed_kmh);
        met * weight * (moving_ms as f64 / 3_600_000.0)
    });

    RideStats {
        session_id: session.id.clone(),
        elapsed_ms: session.elapsed_ms,
        traveled_km: session.traveled_km,
        average_speed_kmh: session.average_speed_kmh,
        top_speed_kmh: session.top_speed_kmh,
        moving_ms,
        idle_ms,
        altitude_loss_m,
        estimated_calories_kcal,
    }
}

/// MET value for cycling at the given average speed.
fn met_for_speed(average_kmh: f64) -> f64 {
    if average_kmh < 16.0 {
        4.0
    } else if average_kmh < 19.0 {
        6.8
    } else if average_kmh < 22.0 {
        8.0
    } else if average_kmh < 26.0 {
        10.0
    } else {
        12.0
    }
}
