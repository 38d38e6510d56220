use std::io::BufRead;

use log::{debug, warn};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cue::{Cue, CueList, DEFAULT_ORIGIN};
use crate::errors::{CaptionError, TimeExpressionError};
use crate::timecode::{self, FrameRateProfile};

// @module: Streaming SMPTE-TT/TTML cue parser

const TAG_TT: &[u8] = b"tt";
const TAG_P: &[u8] = b"p";
const TAG_BR: &[u8] = b"br";

const ATTR_DROP_MODE: &[u8] = b"dropMode";
const ATTR_FRAME_RATE: &[u8] = b"frameRate";
const ATTR_FRAME_RATE_MULTIPLIER: &[u8] = b"frameRateMultiplier";
const ATTR_BEGIN: &[u8] = b"begin";
const ATTR_END: &[u8] = b"end";
const ATTR_ORIGIN: &[u8] = b"origin";

// @const: Whitespace run inside text content
static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\n]+").unwrap());

// @const: "X% Y%" origin attribute
static ORIGIN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(-?[0-9]+(?:\.[0-9]+)?)%\s+(-?[0-9]+(?:\.[0-9]+)?)%\s*$").unwrap()
});

/// What to do with a cue whose `begin` or `end` cannot be converted
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeErrorPolicy {
    /// Keep the cue and use 0 ms for the failing boundary
    #[default]
    ZeroBoundary,
    /// Drop the cue from the output
    SkipCue,
}

/// Parser settings
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserOptions {
    pub time_error_policy: TimeErrorPolicy,
}

/// Pull parser turning a caption document into an ordered cue list
#[derive(Debug, Clone, Default)]
pub struct CaptionParser {
    options: ParserOptions,
}

impl CaptionParser {
    pub fn new(options: ParserOptions) -> Self {
        CaptionParser { options }
    }

    pub fn with_policy(time_error_policy: TimeErrorPolicy) -> Self {
        Self::new(ParserOptions { time_error_policy })
    }

    pub fn parse_str(&self, markup: &str) -> Result<CueList, CaptionError> {
        self.parse_reader(markup.as_bytes())
    }

    pub fn parse_bytes(&self, markup: &[u8]) -> Result<CueList, CaptionError> {
        self.parse_reader(markup)
    }

    /// Walk the document once and collect its cues in document order.
    ///
    /// A structurally broken document fails as a whole. A cue with a bad
    /// time expression is handled according to the configured policy.
    pub fn parse_reader<R: BufRead>(&self, input: R) -> Result<CueList, CaptionError> {
        let mut reader = Reader::from_reader(input);
        let mut buf = Vec::new();
        let mut state = ParseState::new(self.options.time_error_policy);
        let mut depth = 0usize;

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                CaptionError::from(e).at_position(reader.buffer_position())
            })?;

            match event {
                Event::Start(ref e) => {
                    state.check_root(e, depth)?;
                    depth += 1;
                    state.on_start(e)?;
                }
                Event::Empty(ref e) => {
                    state.check_root(e, depth)?;
                    state.on_start(e)?;
                    state.on_end(e.local_name().as_ref());
                }
                Event::End(ref e) => {
                    if depth == 0 {
                        return Err(CaptionError::Structural(format!(
                            "Unexpected closing tag at byte {}",
                            reader.buffer_position()
                        )));
                    }
                    depth -= 1;
                    state.on_end(e.local_name().as_ref());
                }
                Event::Text(ref t) => {
                    let text = t.unescape().map_err(CaptionError::from)?;
                    state.on_text(&text);
                }
                Event::CData(ref c) => {
                    let text = String::from_utf8_lossy(c).into_owned();
                    state.on_text(&text);
                }
                Event::Eof => break,
                _ => {}
            }

            buf.clear();
        }

        if !state.saw_root {
            return Err(CaptionError::Structural("Document has no tt root element".to_string()));
        }
        if depth > 0 {
            return Err(CaptionError::Structural(format!(
                "Document ended with {} unclosed element(s)",
                depth
            )));
        }

        debug!(
            "Parsed {} cue(s) at {}",
            state.cues.len(),
            state.profile
        );
        Ok(CueList::new(state.cues))
    }
}

impl CaptionError {
    fn at_position(self, position: usize) -> Self {
        match self {
            CaptionError::Structural(message) => {
                CaptionError::Structural(format!("{} (at byte {})", message, position))
            }
            other => other,
        }
    }
}

// @struct: Attributes and text gathered for the cue being read
#[derive(Debug, Default)]
struct PendingCue {
    begin: Option<String>,
    end: Option<String>,
    origin: Option<String>,
    region: usize,
    text: String,
}

// @struct: Walk state carried between pull events
struct ParseState {
    policy: TimeErrorPolicy,
    profile: FrameRateProfile,
    saw_root: bool,
    previous_begin: Option<String>,
    region: usize,
    cue_index: usize,
    pending: Option<PendingCue>,
    cues: Vec<Cue>,
}

impl ParseState {
    fn new(policy: TimeErrorPolicy) -> Self {
        ParseState {
            policy,
            profile: FrameRateProfile::default(),
            saw_root: false,
            previous_begin: None,
            region: 0,
            cue_index: 0,
            pending: None,
            cues: Vec::new(),
        }
    }

    fn check_root(&mut self, e: &BytesStart, depth: usize) -> Result<(), CaptionError> {
        if depth > 0 {
            return Ok(());
        }
        if e.local_name().as_ref() != TAG_TT || self.saw_root {
            return Err(CaptionError::Structural(format!(
                "Expected a single tt root element, found <{}>",
                String::from_utf8_lossy(e.name().as_ref())
            )));
        }
        self.saw_root = true;
        Ok(())
    }

    fn on_start(&mut self, e: &BytesStart) -> Result<(), CaptionError> {
        match e.local_name().as_ref() {
            TAG_TT => {
                let drop_mode = attribute(e, ATTR_DROP_MODE)?;
                let frame_rate = attribute(e, ATTR_FRAME_RATE)?;
                let multiplier = attribute(e, ATTR_FRAME_RATE_MULTIPLIER)?;
                self.profile = FrameRateProfile::select(
                    drop_mode.as_deref(),
                    frame_rate.as_deref(),
                    multiplier.as_deref(),
                );
                debug!(
                    "dropMode {:?}, frameRate {:?}, frameRateMultiplier {:?} -> {}",
                    drop_mode, frame_rate, multiplier, self.profile
                );
            }
            TAG_P => {
                if self.pending.is_some() {
                    warn!("Nested cue element, discarding the enclosing cue");
                }
                let begin = attribute(e, ATTR_BEGIN)?;
                // simultaneous cues share the raw begin string and stack into successive regions
                if begin.is_some() && begin == self.previous_begin {
                    self.region += 1;
                } else {
                    self.region = 0;
                }
                self.previous_begin = begin.clone();

                self.pending = Some(PendingCue {
                    begin,
                    end: attribute(e, ATTR_END)?,
                    origin: attribute(e, ATTR_ORIGIN)?,
                    region: self.region,
                    text: String::new(),
                });
            }
            TAG_BR => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.text.push('\n');
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn on_text(&mut self, text: &str) {
        if let Some(pending) = self.pending.as_mut() {
            pending.text.push_str(&WHITESPACE_REGEX.replace_all(text, " "));
        }
    }

    fn on_end(&mut self, local_name: &[u8]) {
        if local_name != TAG_P {
            return;
        }
        let Some(pending) = self.pending.take() else {
            return;
        };

        let index = self.cue_index;
        self.cue_index += 1;

        let begin_ms = self.resolve_time(index, pending.begin.as_deref());
        let end_ms = self.resolve_time(index, pending.end.as_deref());
        let (Some(begin_ms), Some(end_ms)) = (begin_ms, end_ms) else {
            debug!("Skipping cue {}", index);
            return;
        };

        let (origin_x_pct, origin_y_pct) = pending
            .origin
            .as_deref()
            .map(parse_origin)
            .unwrap_or(DEFAULT_ORIGIN);

        let cue = Cue {
            begin_ms,
            end_ms,
            region: pending.region,
            origin_x_pct,
            origin_y_pct,
            text: normalize_text(&pending.text),
        };

        if cue.is_inverted() {
            warn!(
                "Cue {} ends before it begins ({} > {}), it will never be shown",
                index, cue.begin_ms, cue.end_ms
            );
        }
        if let Some(previous) = self.cues.last() {
            if previous.begin_ms > cue.begin_ms {
                warn!(
                    "Cue {} begins at {} ms, before the previous cue at {} ms",
                    index, cue.begin_ms, previous.begin_ms
                );
            }
        }

        self.cues.push(cue);
    }

    // @returns: Boundary in ms, or None when the cue must be skipped
    fn resolve_time(&self, index: usize, raw: Option<&str>) -> Option<u64> {
        let result = match raw {
            Some(expression) => timecode::convert(expression, self.profile),
            None => Err(TimeExpressionError::Empty),
        };

        match result {
            Ok(ms) => Some(ms),
            Err(source) => {
                let error = CaptionError::TimeExpression { cue_index: index, source };
                match self.policy {
                    TimeErrorPolicy::ZeroBoundary => {
                        warn!("{}, using 0 ms", error);
                        Some(0)
                    }
                    TimeErrorPolicy::SkipCue => {
                        warn!("{}, dropping cue", error);
                        None
                    }
                }
            }
        }
    }
}

// @returns: Unescaped value of the attribute with the given local name
fn attribute(e: &BytesStart, local_name: &[u8]) -> Result<Option<String>, CaptionError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == local_name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Parse an `"X% Y%"` origin into clamped integer percentages, falling back to the default
pub fn parse_origin(raw: &str) -> (u32, u32) {
    let parsed = ORIGIN_REGEX.captures(raw).and_then(|caps| {
        let x: f64 = caps[1].parse().ok()?;
        let y: f64 = caps[2].parse().ok()?;
        Some((to_percent(x), to_percent(y)))
    });

    parsed.unwrap_or_else(|| {
        warn!("Could not parse origin \"{}\", using {}% {}%", raw, DEFAULT_ORIGIN.0, DEFAULT_ORIGIN.1);
        DEFAULT_ORIGIN
    })
}

fn to_percent(value: f64) -> u32 {
    value.clamp(0.0, 100.0) as u32
}

/// Trim every line of the collected text and the text as a whole
pub fn normalize_text(raw: &str) -> String {
    raw.split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
