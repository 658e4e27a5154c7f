//! Gaze Sentinel CLI
//!
//! Replays facial-landmark recordings through the gaze engine and reports
//! look-aways.

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use gaze_sentinel::{
    config::Config,
    logging::{init_tracing, LogConfig},
    tuning, AttentionEvent, AttentionState, FrameRecord, GazeEngine, ReplayMessage, ReplaySource,
    SessionSummary, SessionTracker, PRIVACY_DECLARATION, VERSION,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "gaze-sentinel")]
#[command(version = VERSION)]
#[command(about = "Calibrated, debounced screen-attention detection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine over a landmark recording
    Run(RunArgs),

    /// Show the most recent session summary
    Summary {
        /// Directory holding exported summaries
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Tune look-away sensitivity from a 1-10 self-rating of the last session
    Tune {
        /// How focused you felt during the last session (1-10)
        rating: u8,

        /// Write the recommended value to the config file
        #[arg(long)]
        apply: bool,

        /// Directory holding exported summaries
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Show configuration
    Config,

    /// Display privacy declaration
    Privacy,
}

#[derive(Args)]
struct RunArgs {
    /// JSON Lines recording to replay, or `-` for stdin
    #[arg(long, short)]
    input: String,

    /// Pace frames by their recorded timestamps
    #[arg(long)]
    realtime: bool,

    /// Horizontal deadzone half-width
    #[arg(long)]
    h_threshold: Option<f64>,

    /// Vertical deadzone half-height
    #[arg(long)]
    v_threshold: Option<f64>,

    /// Minimum look-away duration in seconds
    #[arg(long)]
    min_look_away: Option<f64>,

    /// Alarm duration in seconds
    #[arg(long)]
    alarm: Option<f64>,

    /// Smoothing window size in frames
    #[arg(long)]
    window: Option<usize>,

    /// Calibrate automatically after this many frames if not yet calibrated
    #[arg(long)]
    calibrate_after: Option<u64>,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Do not write a session summary
    #[arg(long)]
    no_export: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load configuration, using defaults: {e}");
            Config::default()
        }
    };
    init_tracing(&LogConfig::with_level(config.log_level.clone()));

    match cli.command {
        Commands::Run(args) => cmd_run(config, args),
        Commands::Summary { path } => cmd_summary(&config, path),
        Commands::Tune {
            rating,
            apply,
            path,
        } => cmd_tune(config, rating, apply, path),
        Commands::Config => {
            cmd_config(&config);
            Ok(())
        }
        Commands::Privacy => {
            cmd_privacy();
            Ok(())
        }
    }
}

fn cmd_run(mut config: Config, args: RunArgs) -> anyhow::Result<()> {
    apply_overrides(&mut config, &args)?;

    let mut engine = GazeEngine::new(config.engine.clone()).context("Invalid engine settings")?;

    let mut source = ReplaySource::new(args.realtime);
    if args.input == "-" {
        source.start(std::io::stdin())?;
    } else {
        let path = PathBuf::from(&args.input);
        source
            .start_file(&path)
            .with_context(|| format!("Could not open recording {}", path.display()))?;
    }

    let base = Utc::now();
    let mut tracker = SessionTracker::new(base);
    let mut last_now = base;
    let mut frames_seen: u64 = 0;
    let mut last_flash: Option<bool> = None;

    if !args.json {
        println!("Gaze Sentinel v{VERSION}");
        println!("Session ID: {}", tracker.session_id());
        println!(
            "  Deadzone: ±{:.3} horizontal, ±{:.3} vertical",
            config.engine.h_threshold, config.engine.v_threshold
        );
        println!(
            "  Look-away after {:.1}s, alarm after {:.1}s",
            config.engine.min_look_away_duration.as_secs_f64(),
            config.engine.alarm_duration.as_secs_f64()
        );
        println!();
    }

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        let record = match source.receiver().recv_timeout(Duration::from_millis(100)) {
            Ok(ReplayMessage::Frame(record)) => record,
            Ok(ReplayMessage::Skipped { line, message }) => {
                warn!(line, "Skipping unreadable frame: {}", message);
                continue;
            }
            Ok(ReplayMessage::Finished) => break,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let Some(now) = frame_time(base, &record) else {
            warn!(t = record.t, "Frame timestamp out of range, skipping");
            continue;
        };
        last_now = now;
        frames_seen += 1;

        let update = engine.process_frame(record.points.as_ref(), now);
        tracker.record_frame(&update);
        print_events(&update.events, args.json);

        let auto_calibrate = args
            .calibrate_after
            .is_some_and(|after| frames_seen >= after && !engine.is_calibrated());
        if record.calibrate || auto_calibrate {
            match engine.calibrate(now) {
                Ok(calibration) if !args.json => println!(
                    "[{}] Calibrated center at ({:.3}, {:.3})",
                    format_time(now),
                    calibration.center.horizontal,
                    calibration.center.vertical
                ),
                Ok(_) => {}
                Err(e) => warn!("Calibration failed: {e}"),
            }
        }

        if args.realtime && !args.json {
            let flash = (engine.state() == AttentionState::AlarmActive)
                .then(|| engine.alarm_flash_on(now));
            if flash != last_flash {
                match flash {
                    Some(true) => println!("[{}] ● LOOK BACK AT THE SCREEN ●", format_time(now)),
                    Some(false) => println!("[{}] ○", format_time(now)),
                    None => {}
                }
                last_flash = flash;
            }
        }
    }
    source.stop();

    let ended_at = session_end(last_now, args.realtime, Utc::now());
    let events = engine.flush(ended_at);
    tracker.record_events(&events);
    print_events(&events, args.json);

    let summary = tracker.summary(ended_at);
    info!(
        frames = frames_seen,
        look_aways = summary.look_away_count,
        "Replay finished"
    );

    if !args.json {
        println!();
        println!("{}", tracker.report(ended_at));
    }

    if !args.no_export {
        if let Err(e) = config.ensure_directories() {
            eprintln!("Warning: Could not create directories: {e}");
        }
        match summary.export(&config.export_path) {
            Ok(path) if !args.json => println!("Summary written to {}", path.display()),
            Ok(_) => {}
            Err(e) => eprintln!("Warning: Could not export summary: {e}"),
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, args: &RunArgs) -> anyhow::Result<()> {
    let engine = &mut config.engine;
    if let Some(h) = args.h_threshold {
        engine.h_threshold = h;
    }
    if let Some(v) = args.v_threshold {
        engine.v_threshold = v;
    }
    if let Some(secs) = args.min_look_away {
        engine.min_look_away_duration =
            Duration::try_from_secs_f64(secs).context("Invalid --min-look-away")?;
    }
    if let Some(secs) = args.alarm {
        engine.alarm_duration = Duration::try_from_secs_f64(secs).context("Invalid --alarm")?;
    }
    if let Some(window) = args.window {
        engine.smoothing_window = window;
    }
    Ok(())
}

/// When the session ends on the session clock.
///
/// In realtime mode the recording clock tracks the wall clock, so an
/// interrupted run ends now rather than at the last frame received.
fn session_end(last_frame: DateTime<Utc>, realtime: bool, now: DateTime<Utc>) -> DateTime<Utc> {
    if realtime {
        last_frame.max(now)
    } else {
        last_frame
    }
}

/// Map a recording offset onto the session clock.
fn frame_time(base: DateTime<Utc>, record: &FrameRecord) -> Option<DateTime<Utc>> {
    if !record.t.is_finite() {
        return None;
    }
    let offset = chrono::Duration::microseconds((record.t * 1_000_000.0).round() as i64);
    base.checked_add_signed(offset)
}

fn format_time(t: DateTime<Utc>) -> String {
    t.format("%H:%M:%S%.3f").to_string()
}

fn print_events(events: &[AttentionEvent], json: bool) {
    for event in events {
        if json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("Could not serialize event: {e}"),
            }
            continue;
        }
        let line = match event {
            AttentionEvent::LookAwayStarted {
                off_screen_since, ..
            } => format!(
                "Look-away started (off screen since {})",
                format_time(*off_screen_since)
            ),
            AttentionEvent::LookAwayEnded { duration_secs, .. } => {
                format!("Look-away ended after {duration_secs:.1}s")
            }
            AttentionEvent::AlarmRaised { .. } => "ALARM: away too long".to_string(),
            AttentionEvent::AlarmCleared { .. } => "Alarm cleared".to_string(),
        };
        println!("[{}] {line}", format_time(event.timestamp()));
    }
}

fn latest_summary(config: &Config, path: Option<PathBuf>) -> anyhow::Result<SessionSummary> {
    let dir = path.unwrap_or_else(|| config.export_path.clone());
    match SessionSummary::load_latest(&dir)
        .with_context(|| format!("Could not read summaries in {}", dir.display()))?
    {
        Some(summary) => Ok(summary),
        None => bail!(
            "No session summaries found in {}. Run `gaze-sentinel run` first.",
            dir.display()
        ),
    }
}

fn cmd_summary(config: &Config, path: Option<PathBuf>) -> anyhow::Result<()> {
    let summary = latest_summary(config, path)?;

    println!("Last Session");
    println!("============");
    println!();
    println!("Session ID: {}", summary.session_id);
    println!(
        "Started:    {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("Duration:   {:.1}s", summary.duration_secs);
    println!();
    println!("Look-aways:        {}", summary.look_away_count);
    println!("Total time away:   {:.1}s", summary.total_look_away_secs);
    println!("Mean look-away:    {:.1}s", summary.mean_look_away_secs);
    println!("Longest look-away: {:.1}s", summary.longest_look_away_secs);
    println!("Alarms raised:     {}", summary.alarm_count);
    println!("Focus ratio:       {:.0}%", summary.focus_ratio * 100.0);
    Ok(())
}

fn cmd_tune(
    mut config: Config,
    rating: u8,
    apply: bool,
    path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let summary = latest_summary(&config, path)?;
    let recommendation =
        tuning::recommend(&summary, rating, config.engine.min_look_away_duration)?;

    println!("Sensitivity: {}", recommendation.judgement);
    println!("  {}", recommendation.reason);
    println!(
        "  Minimum look-away: {:.1}s -> {:.1}s",
        recommendation.current_min_look_away_secs, recommendation.recommended_min_look_away_secs
    );

    if apply {
        config.engine.min_look_away_duration = recommendation.recommended_min_look_away();
        config.save().context("Could not save configuration")?;
        println!("Saved to {:?}", Config::config_path());
    } else if recommendation.recommended_min_look_away() != config.engine.min_look_away_duration {
        println!();
        println!("Run again with --apply to save this value.");
    }
    Ok(())
}

fn cmd_privacy() {
    println!("{PRIVACY_DECLARATION}");
}

fn cmd_config(config: &Config) {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}
