//! Demonstration of the gaze engine on synthetic landmark frames.
//!
//! This example shows how to:
//! 1. Create an engine and calibrate it on a centered gaze
//! 2. Feed frames with short glances, a long look-away and a face dropout
//! 3. React to attention events and the alarm flash
//! 4. Summarise the session
//!
//! Run with: cargo run --example replay_demo

use chrono::{Duration, Utc};
use gaze_sentinel::{
    AttentionEvent, AttentionState, EngineConfig, EyeLandmarks, GazeEngine, LandmarkFrame,
    SessionTracker, PRIVACY_DECLARATION,
};

/// (horizontal, vertical, seconds) segments at 10 fps. `None` = no face.
const SCRIPT: &[(Option<(f64, f64)>, f64)] = &[
    (Some((0.50, 0.45)), 2.0),
    (Some((0.62, 0.45)), 1.5),
    (Some((0.50, 0.45)), 2.0),
    (Some((0.50, 0.62)), 6.0),
    (None, 1.0),
    (Some((0.50, 0.62)), 12.0),
    (Some((0.50, 0.45)), 2.0),
];

fn main() {
    println!("Gaze Sentinel - Replay Demo");
    println!("===========================");
    println!();
    println!("{PRIVACY_DECLARATION}");

    let mut engine = match GazeEngine::new(EngineConfig::default()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return;
        }
    };

    let layout = EyeLandmarks::FACE_MESH;
    let start = Utc::now();
    let mut tracker = SessionTracker::new(start);
    let mut frame_no: i64 = 0;
    let mut last_flash = false;

    for (gaze, secs) in SCRIPT {
        let frame = gaze.map(|(h, v)| LandmarkFrame::synthetic(&layout, h, v));
        let frames = (secs * 10.0).round() as i64;

        for _ in 0..frames {
            let now = start + Duration::milliseconds(frame_no * 100);
            let elapsed = frame_no as f64 / 10.0;
            frame_no += 1;

            let update = engine.process_frame(frame.as_ref(), now);
            tracker.record_frame(&update);

            if !engine.is_calibrated() && update.sample.is_observed() {
                if let Ok(calibration) = engine.calibrate(now) {
                    println!(
                        "[{elapsed:5.1}s] Calibrated at ({:.2}, {:.2})",
                        calibration.center.horizontal, calibration.center.vertical
                    );
                }
            }

            for event in &update.events {
                match event {
                    AttentionEvent::LookAwayStarted { .. } => {
                        println!("[{elapsed:5.1}s] Looking away")
                    }
                    AttentionEvent::LookAwayEnded { duration_secs, .. } => {
                        println!("[{elapsed:5.1}s] Back after {duration_secs:.1}s")
                    }
                    AttentionEvent::AlarmRaised { .. } => println!("[{elapsed:5.1}s] ALARM"),
                    AttentionEvent::AlarmCleared { .. } => {
                        println!("[{elapsed:5.1}s] Alarm cleared")
                    }
                }
            }

            let flash = engine.alarm_flash_on(now);
            if engine.state() == AttentionState::AlarmActive && flash != last_flash {
                println!("[{elapsed:5.1}s] {}", if flash { "●" } else { "○" });
            }
            last_flash = flash;

            if let Some(reading) = update.reading.filter(|_| frame_no % 20 == 0) {
                println!(
                    "[{elapsed:5.1}s] gaze {} ({})",
                    reading.direction,
                    engine.state()
                );
            }
        }
    }

    let end = start + Duration::milliseconds(frame_no * 100);
    tracker.record_events(&engine.flush(end));

    println!();
    println!("{}", tracker.report(end));
}
