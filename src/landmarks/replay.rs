//! Replay of recorded landmark frames.
//!
//! Frames are read from a JSON Lines recording on a background thread and
//! handed to the caller through a bounded single-consumer channel, so the
//! engine only ever runs on the thread that drains the receiver.

use crate::landmarks::types::FrameRecord;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Channel capacity: a few seconds of frames at camera rate.
const CHANNEL_CAPACITY: usize = 256;

/// Errors that can occur while replaying a recording.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Replay is already running")]
    AlreadyRunning,
}

/// Message delivered by the replay thread.
#[derive(Debug, Clone)]
pub enum ReplayMessage {
    Frame(FrameRecord),
    /// A line could not be parsed; replay continues with the next line
    Skipped { line: usize, message: String },
    /// The recording has been fully read
    Finished,
}

/// Parse a single recording line. Blank lines yield `Ok(None)`.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<FrameRecord>, ReplayError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| ReplayError::Parse {
            line: line_no,
            message: e.to_string(),
        })
}

/// Read a whole recording into memory.
pub fn read_recording(path: &Path) -> Result<Vec<FrameRecord>, ReplayError> {
    let file = std::fs::File::open(path)?;
    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        if let Some(record) = parse_line(idx + 1, &line?)? {
            records.push(record);
        }
    }
    Ok(records)
}

/// Feeds recorded frames into a channel from a background thread.
pub struct ReplaySource {
    sender: Option<Sender<ReplayMessage>>,
    receiver: Receiver<ReplayMessage>,
    running: Arc<AtomicBool>,
    realtime: bool,
}

impl ReplaySource {
    /// Create a source. With `realtime`, frames are paced by their `t` values.
    pub fn new(realtime: bool) -> Self {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        Self {
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            realtime,
        }
    }

    /// Start replaying from any reader (a file, stdin, an in-memory buffer).
    pub fn start<R>(&mut self, reader: R) -> Result<(), ReplayError>
    where
        R: Read + Send + 'static,
    {
        let sender = match self.sender.take() {
            Some(sender) if !self.running.load(Ordering::SeqCst) => sender,
            _ => return Err(ReplayError::AlreadyRunning),
        };
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let realtime = self.realtime;
        // Detached: dropping the receiver makes the next send fail and ends the thread.
        thread::spawn(move || {
            pump(BufReader::new(reader), &sender, &running, realtime);
            running.store(false, Ordering::SeqCst);
        });
        Ok(())
    }

    /// Start replaying a recording file.
    pub fn start_file(&mut self, path: &Path) -> Result<(), ReplayError> {
        let file = std::fs::File::open(path)?;
        self.start(file)
    }

    /// Ask the replay thread to stop after the frame it is sending.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Get the receiver for replayed frames.
    pub fn receiver(&self) -> &Receiver<ReplayMessage> {
        &self.receiver
    }
}

fn pump<R: BufRead>(
    reader: R,
    sender: &Sender<ReplayMessage>,
    running: &AtomicBool,
    realtime: bool,
) {
    let started = Instant::now();

    for (idx, line) in reader.lines().enumerate() {
        if !running.load(Ordering::SeqCst) {
            tracing::debug!("Replay stopped at line {}", idx + 1);
            return;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Replay read failed: {}", e);
                break;
            }
        };

        let message = match parse_line(idx + 1, &line) {
            Ok(Some(record)) => {
                if realtime && record.t > 0.0 {
                    match Duration::try_from_secs_f64(record.t) {
                        Ok(due) => {
                            if let Some(wait) = due.checked_sub(started.elapsed()) {
                                thread::sleep(wait);
                            }
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Replay line {} has unusable time {}: {}",
                                idx + 1,
                                record.t,
                                e
                            );
                            let message = ReplayMessage::Skipped {
                                line: idx + 1,
                                message: format!("time {} out of range: {}", record.t, e),
                            };
                            if sender.send(message).is_err() {
                                return;
                            }
                            continue;
                        }
                    }
                }
                ReplayMessage::Frame(record)
            }
            Ok(None) => continue,
            Err(ReplayError::Parse { line, message }) => {
                tracing::warn!("Skipping replay line {}: {}", line, message);
                ReplayMessage::Skipped { line, message }
            }
            Err(_) => continue,
        };

        if sender.send(message).is_err() {
            return;
        }
    }

    let _ = sender.send(ReplayMessage::Finished);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blank_line() {
        assert!(parse_line(1, "   ").unwrap().is_none());
    }

    #[test]
    fn test_parse_error_reports_line() {
        match parse_line(7, "{not json") {
            Err(ReplayError::Parse { line, .. }) => assert_eq!(line, 7),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_replay_from_memory() {
        let data = "{\"t\": 0.0, \"points\": null}\n\n{\"t\": 0.1, \"points\": null, \"calibrate\": true}\n";
        let mut source = ReplaySource::new(false);
        source.start(std::io::Cursor::new(data.to_string())).unwrap();

        let mut frames = Vec::new();
        loop {
            match source.receiver().recv_timeout(Duration::from_secs(5)) {
                Ok(ReplayMessage::Frame(record)) => frames.push(record),
                Ok(ReplayMessage::Finished) => break,
                Ok(ReplayMessage::Skipped { .. }) => panic!("unexpected skip"),
                Err(e) => panic!("replay stalled: {e}"),
            }
        }

        assert_eq!(frames.len(), 2);
        assert!(frames[1].calibrate);
    }

    #[test]
    fn test_realtime_skips_out_of_range_time() {
        let data = concat!(
            "{\"t\": 0.0, \"points\": null}\n",
            "{\"t\": 1e30, \"points\": null}\n",
            "{\"t\": 0.05, \"points\": null}\n",
        );
        let mut source = ReplaySource::new(true);
        source.start(std::io::Cursor::new(data.to_string())).unwrap();

        let mut times = Vec::new();
        let mut skipped = Vec::new();
        loop {
            match source.receiver().recv_timeout(Duration::from_secs(5)) {
                Ok(ReplayMessage::Frame(record)) => times.push(record.t),
                Ok(ReplayMessage::Skipped { line, .. }) => skipped.push(line),
                Ok(ReplayMessage::Finished) => break,
                Err(e) => panic!("replay stalled: {e}"),
            }
        }

        assert_eq!(times, vec![0.0, 0.05]);
        assert_eq!(skipped, vec![2]);
    }

    #[test]
    fn test_start_twice_fails() {
        let mut source = ReplaySource::new(false);
        source.start(std::io::Cursor::new(String::new())).unwrap();
        assert!(matches!(
            source.start(std::io::Cursor::new(String::new())),
            Err(ReplayError::AlreadyRunning)
        ));
    }
}
