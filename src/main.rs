// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ttcaptions::app_config::{self, Config};
use ttcaptions::caption_parser::CaptionParser;
use ttcaptions::cue::CueList;
use ttcaptions::file_utils::FileManager;
use ttcaptions::player::{
    CaptionPlayer, CaptionRenderer, CaptionStatus, FrameGeometry, Placement, SimulatedSurface,
};
use ttcaptions::source::{CaptionSource, DefaultCaptionSource};
use ttcaptions::timecode::{self, format_clock, FrameRateProfile};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse caption documents and list their cues
    Cues {
        /// Caption file, directory of caption files, or http(s) URL
        #[arg(value_name = "SOURCE")]
        source: String,

        /// Print cues as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert a single time expression to milliseconds
    Timecode {
        /// Time expression, e.g. "01:02:03:04" or "12.5s"
        #[arg(value_name = "EXPRESSION")]
        expression: String,

        /// Drop mode (dropNTSC, dropPAL, nonDrop)
        #[arg(long)]
        drop_mode: Option<String>,

        /// Nominal frame rate
        #[arg(long)]
        frame_rate: Option<String>,

        /// Frame rate multiplier as "numerator denominator"
        #[arg(long)]
        multiplier: Option<String>,
    },

    /// Play captions against a simulated clock and print region changes
    Play {
        /// Caption file or http(s) URL
        #[arg(value_name = "SOURCE")]
        source: String,

        /// Playback position to start from, in milliseconds
        #[arg(long, default_value_t = 0)]
        start_ms: u64,

        /// Playback speed factor
        #[arg(long, default_value_t = 1.0)]
        speed: f64,

        /// Media time to play, in milliseconds (defaults to the end of the last cue)
        #[arg(long)]
        duration_ms: Option<u64>,
    },

    /// Generate shell completions for ttcaptions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// ttcaptions - SMPTE-TT/TTML caption tool
///
/// Parses timed text caption documents, converts SMPTE time expressions,
/// and replays captions against a simulated playback clock.
#[derive(Parser, Debug)]
#[command(name = "ttcaptions")]
#[command(version)]
#[command(about = "SMPTE-TT/TTML caption parsing and playback")]
#[command(long_about = "ttcaptions parses SMPTE-TT/TTML caption documents and schedules their cues against playback.

EXAMPLES:
    ttcaptions cues movie.ttml                         # List cues
    ttcaptions cues --json captions/                   # Dump every document in a directory as JSON
    ttcaptions timecode 01:00:00:00 --drop-mode dropNTSC
    ttcaptions play https://example.com/movie.xml      # Replay captions in real time
    ttcaptions play movie.ttml --start-ms 60000 --speed 4
    ttcaptions completions bash > ttcaptions.bash

CONFIGURATION:
    Configuration is stored in captions.json by default. If the file doesn't
    exist, a default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "captions.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

// @struct: Renderer printing region changes to the log
struct ConsoleRenderer {
    region_count: usize,
}

impl CaptionRenderer for ConsoleRenderer {
    fn region_count(&self) -> usize {
        self.region_count
    }

    fn show(&mut self, region: usize, text: &str, placement: Placement) {
        info!(
            "[region {}] at ({}, {}): {}",
            region,
            placement.x,
            placement.y,
            text.replace('\n', " / ")
        );
    }

    fn hide(&mut self, region: usize) {
        info!("[region {}] hidden", region);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace level is the ceiling; the effective level is set below
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "ttcaptions", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level.into();
    }
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    match cli.command {
        Commands::Cues { source, json } => run_cues(&config, &source, json).await,
        Commands::Timecode { expression, drop_mode, frame_rate, multiplier } => {
            let profile = FrameRateProfile::select(
                drop_mode.as_deref(),
                frame_rate.as_deref(),
                multiplier.as_deref(),
            );
            let ms = timecode::convert(&expression, profile)?;
            println!("{} ms ({}) at {}", ms, format_clock(ms), profile);
            Ok(())
        }
        Commands::Play { source, start_ms, speed, duration_ms } => {
            run_play(&config, &source, start_ms, speed, duration_ms).await
        }
        Commands::Completions { .. } => Ok(()),
    }
}

fn caption_source(config: &Config) -> DefaultCaptionSource {
    DefaultCaptionSource::new(config.source.connect_timeout(), config.source.read_timeout())
}

async fn run_cues(config: &Config, source: &str, json: bool) -> Result<()> {
    let parser = CaptionParser::with_policy(config.time_error_policy);

    let documents: Vec<(String, CueList)> = if Path::new(source).is_dir() {
        let files = FileManager::find_caption_files(source)?;
        if files.is_empty() {
            warn!("No caption files found in {}", source);
        }
        let mut documents = Vec::with_capacity(files.len());
        for file in files {
            let bytes = FileManager::read_bytes(&file)?;
            match parser.parse_bytes(&bytes) {
                Ok(cues) => documents.push((file.display().to_string(), cues)),
                Err(e) => warn!("Skipping {}: {}", file.display(), e),
            }
        }
        documents
    } else {
        let bytes = caption_source(config).open(source).await?;
        let cues = parser
            .parse_bytes(&bytes)
            .with_context(|| format!("Failed to parse captions from {}", source))?;
        vec![(source.to_string(), cues)]
    };

    if json {
        let listing: Vec<serde_json::Value> = documents
            .iter()
            .map(|(name, cues)| serde_json::json!({ "source": name, "cues": cues.as_slice() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for (name, cues) in &documents {
        println!("# {} ({} cues)", name, cues.len());
        for cue in cues {
            println!("{}", cue);
        }
    }
    Ok(())
}

// @returns: Real time needed to play `media_ms` at `speed`, plus one poll
fn playback_wall_time(media_ms: u64, speed: f64, poll_interval: Duration) -> Result<Duration> {
    let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
    let playback = Duration::try_from_secs_f64(media_ms as f64 / 1000.0 / speed)
        .with_context(|| format!("Playing {} ms at speed {} takes too long", media_ms, speed))?;
    Ok(playback.saturating_add(poll_interval))
}

async fn run_play(
    config: &Config,
    source: &str,
    start_ms: u64,
    speed: f64,
    duration_ms: Option<u64>,
) -> Result<()> {
    let player = CaptionPlayer::new(config.player_settings(), Arc::new(caption_source(config)));

    match player.load(source).await {
        CaptionStatus::Loaded(count) => info!("Playing {} cue(s) from {}", count, source),
        CaptionStatus::Disabled => {
            warn!("Captions are disabled in the configuration");
            return Ok(());
        }
        CaptionStatus::CreateStreamFailed => return Err(anyhow!("Could not open caption source: {}", source)),
        CaptionStatus::FetchFailed => return Err(anyhow!("Fetching captions failed: {}", source)),
        CaptionStatus::ParseFailed => return Err(anyhow!("Captions could not be parsed: {}", source)),
    }

    let last_end = player
        .cues()
        .and_then(|cues| cues.iter().map(|cue| cue.end_ms).max())
        .unwrap_or(start_ms);
    let media_ms = duration_ms.unwrap_or_else(|| last_end.saturating_sub(start_ms));
    let wall_time = playback_wall_time(media_ms, speed, player.settings().poll_interval)?;

    let geometry = FrameGeometry { left: 0, top: 0, width: 1920, height: 1080 };
    let surface = Arc::new(SimulatedSurface::new(start_ms, speed, geometry));
    let renderer = ConsoleRenderer { region_count: config.player.region_count };
    let handle = player.roll(surface, renderer);

    tokio::select! {
        _ = tokio::time::sleep(wall_time) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    handle.stop().await?;
    Ok(())
}
