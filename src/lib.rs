/*!
 * # ttcaptions - SMPTE-TT/TTML caption playback
 *
 * A Rust library for showing timed captions alongside video playback.
 *
 * ## Features
 *
 * - Exact conversion of SMPTE time expressions for six frame-rate profiles
 *   (23.976, 24, 25, 29.97 drop and non-drop, 30 fps)
 * - Streaming parse of SMPTE-TT/TTML documents into ordered cues
 * - Region grouping of simultaneous cues
 * - Forward-scanning scheduler turning playback positions into
 *   per-region show/hide transitions, with seek-back handling
 * - Local file and HTTP caption sources
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `timecode`: Time expression to millisecond conversion
 * - `cue`: Cue model and immutable cue list
 * - `caption_parser`: Document parsing
 * - `scheduler`: Playback-driven cue scheduling
 * - `source`: Byte sources for caption documents
 * - `player`: Loading and polling loop wiring everything to a renderer
 * - `app_config`: Configuration management
 * - `file_utils`: File system operations
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]

// Public modules
pub mod app_config;
pub mod caption_parser;
pub mod cue;
pub mod errors;
pub mod file_utils;
pub mod player;
pub mod scheduler;
pub mod source;
pub mod timecode;

// Re-export main types for easier usage
pub use app_config::Config;
pub use caption_parser::{CaptionParser, ParserOptions, TimeErrorPolicy};
pub use cue::{Cue, CueList};
pub use errors::{AppError, CaptionError, SourceError, TimeExpressionError};
pub use player::{CaptionPlayer, CaptionRenderer, CaptionStatus, VideoSurface};
pub use scheduler::{CueAction, CueScheduler, RegionEvent};
pub use source::{CaptionSource, DefaultCaptionSource, StaticCaptionSource};
pub use timecode::{convert, FrameRateProfile};
