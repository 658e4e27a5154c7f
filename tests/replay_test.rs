//! Replaying recordings from disk through the engine.

use chrono::{Duration, Utc};
use gaze_sentinel::landmarks::read_recording;
use gaze_sentinel::{
    AttentionEvent, EngineConfig, EyeLandmarks, FrameRecord, GazeEngine, LandmarkFrame,
    ReplayError, ReplayMessage, ReplaySource, SessionSummary, SessionTracker,
};
use std::io::Write;
use std::path::Path;

/// 1s centered (calibrating on the first frame), 2s without a face,
/// 5s looking left, 1s back at the screen. 10 fps.
fn write_recording(path: &Path) {
    let layout = EyeLandmarks::FACE_MESH;
    let mut file = std::fs::File::create(path).unwrap();
    for i in 0..90 {
        let t = f64::from(i) * 0.1;
        let points = match i {
            0..=9 | 80..=89 => Some(LandmarkFrame::synthetic(&layout, 0.50, 0.45)),
            10..=29 => None,
            _ => Some(LandmarkFrame::synthetic(&layout, 0.30, 0.45)),
        };
        let record = FrameRecord {
            t,
            points,
            calibrate: i == 0,
        };
        writeln!(file, "{}", serde_json::to_string(&record).unwrap()).unwrap();
    }
}

fn run(records: impl IntoIterator<Item = FrameRecord>) -> (Vec<AttentionEvent>, SessionTracker) {
    let config = EngineConfig {
        smoothing_window: 1,
        ..EngineConfig::default()
    };
    let mut engine = GazeEngine::new(config).unwrap();
    let base = Utc::now();
    let mut tracker = SessionTracker::new(base);
    let mut events = Vec::new();
    let mut last = base;

    for record in records {
        let now = base + Duration::milliseconds((record.t * 1000.0).round() as i64);
        let update = engine.process_frame(record.points.as_ref(), now);
        tracker.record_frame(&update);
        events.extend(update.events);
        if record.calibrate {
            engine.calibrate(now).unwrap();
        }
        last = now;
    }

    let flushed = engine.flush(last);
    tracker.record_events(&flushed);
    events.extend(flushed);
    (events, tracker)
}

#[test]
fn recording_produces_one_look_away() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.jsonl");
    write_recording(&path);

    let records = read_recording(&path).unwrap();
    assert_eq!(records.len(), 90);
    assert_eq!(records.iter().filter(|r| r.points.is_none()).count(), 20);

    let (events, tracker) = run(records);
    let names: Vec<_> = events.iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["look_away_started", "look_away_ended"]);

    match &events[1] {
        AttentionEvent::LookAwayEnded { duration_secs, .. } => {
            assert!((duration_secs - 5.0).abs() < 1e-6);
        }
        other => panic!("unexpected event {other:?}"),
    }

    let summary = tracker.summary(Utc::now());
    assert_eq!(summary.frames_processed, 90);
    assert_eq!(summary.frames_missing, 20);
    assert_eq!(summary.look_away_count, 1);
}

#[test]
fn threaded_replay_matches_file_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.jsonl");
    write_recording(&path);

    let mut source = ReplaySource::new(false);
    source.start_file(&path).unwrap();

    let mut records = Vec::new();
    loop {
        match source
            .receiver()
            .recv_timeout(std::time::Duration::from_secs(5))
        {
            Ok(ReplayMessage::Frame(record)) => records.push(record),
            Ok(ReplayMessage::Finished) => break,
            Ok(ReplayMessage::Skipped { line, message }) => panic!("line {line}: {message}"),
            Err(e) => panic!("replay stalled: {e}"),
        }
    }

    assert_eq!(records, read_recording(&path).unwrap());
}

#[test]
fn unreadable_lines_are_skipped_by_the_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.jsonl");
    std::fs::write(&path, "{\"t\": 0.0, \"points\": null}\nnot json\n{\"t\": 0.1}\n").unwrap();

    assert!(matches!(
        read_recording(&path),
        Err(ReplayError::Parse { line: 2, .. })
    ));

    let mut source = ReplaySource::new(false);
    source.start_file(&path).unwrap();
    let mut frames = 0;
    let mut skipped = Vec::new();
    loop {
        match source
            .receiver()
            .recv_timeout(std::time::Duration::from_secs(5))
        {
            Ok(ReplayMessage::Frame(_)) => frames += 1,
            Ok(ReplayMessage::Skipped { line, .. }) => skipped.push(line),
            Ok(ReplayMessage::Finished) => break,
            Err(e) => panic!("replay stalled: {e}"),
        }
    }
    assert_eq!(frames, 2);
    assert_eq!(skipped, vec![2]);
}

#[test]
fn summary_export_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let recording = dir.path().join("session.jsonl");
    write_recording(&recording);

    let (_, tracker) = run(read_recording(&recording).unwrap());
    let summary = tracker.summary(Utc::now());
    let exported = summary.export(&dir.path().join("sessions")).unwrap();
    assert!(exported.exists());

    let loaded = SessionSummary::load_latest(&dir.path().join("sessions"))
        .unwrap()
        .unwrap();
    assert_eq!(loaded.session_id, summary.session_id);
    assert_eq!(loaded.look_away_count, 1);
    assert!((loaded.total_look_away_secs - 5.0).abs() < 1e-6);
}

#[test]
fn missing_summary_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(SessionSummary::load_latest(&dir.path().join("absent"))
        .unwrap()
        .is_none());
}
