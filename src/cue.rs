use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use serde::Serialize;

use crate::timecode::format_clock;

// @module: Timed caption entries

/// Placement used when a cue carries no `origin` attribute (x%, y%)
pub const DEFAULT_ORIGIN: (u32, u32) = (15, 80);

// @struct: Single timed caption entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cue {
    // @field: Start of the visible interval in ms
    pub begin_ms: u64,

    // @field: End of the visible interval in ms (exclusive)
    pub end_ms: u64,

    // @field: Display slot index
    pub region: usize,

    // @field: Horizontal origin as a percentage of the frame width
    pub origin_x_pct: u32,

    // @field: Vertical origin as a percentage of the frame height
    pub origin_y_pct: u32,

    // @field: Caption text, lines separated by '\n'
    pub text: String,
}

impl Cue {
    /// Creates a cue at the default origin
    pub fn new(begin_ms: u64, end_ms: u64, region: usize, text: impl Into<String>) -> Self {
        Cue {
            begin_ms,
            end_ms,
            region,
            origin_x_pct: DEFAULT_ORIGIN.0,
            origin_y_pct: DEFAULT_ORIGIN.1,
            text: text.into(),
        }
    }

    /// Returns the cue moved to another origin
    pub fn with_origin(mut self, origin_x_pct: u32, origin_y_pct: u32) -> Self {
        self.origin_x_pct = origin_x_pct;
        self.origin_y_pct = origin_y_pct;
        self
    }

    /// True when the document declared an end before the beginning.
    /// Such cues are kept but never become visible.
    pub fn is_inverted(&self) -> bool {
        self.begin_ms > self.end_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.begin_ms)
    }

    /// Whether the cue is visible at the given playback position
    pub fn is_active_at(&self, position_ms: u64) -> bool {
        self.begin_ms <= position_ms && position_ms < self.end_ms
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "[{}] {} --> {} @ {}% {}%",
            self.region,
            format_clock(self.begin_ms),
            format_clock(self.end_ms),
            self.origin_x_pct,
            self.origin_y_pct
        )?;
        writeln!(f, "{}", self.text)
    }
}

/// Immutable, ordered cue sequence shared between the loader and the scheduler
#[derive(Debug, Clone, Default)]
pub struct CueList {
    cues: Arc<[Cue]>,
}

impl CueList {
    pub fn new(cues: Vec<Cue>) -> Self {
        CueList { cues: cues.into() }
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Cue> {
        self.cues.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cue> {
        self.cues.iter()
    }

    pub fn as_slice(&self) -> &[Cue] {
        &self.cues
    }

    /// Highest region index used by any cue
    pub fn max_region(&self) -> Option<usize> {
        self.cues.iter().map(|cue| cue.region).max()
    }

    /// Number of display slots needed to show every cue
    pub fn region_count(&self) -> usize {
        self.max_region().map_or(0, |region| region + 1)
    }

    /// Whether begin times never decrease; the scheduler relies on it
    pub fn is_begin_ordered(&self) -> bool {
        self.cues.windows(2).all(|pair| pair[0].begin_ms <= pair[1].begin_ms)
    }
}

impl From<Vec<Cue>> for CueList {
    fn from(cues: Vec<Cue>) -> Self {
        CueList::new(cues)
    }
}

impl Index<usize> for CueList {
    type Output = Cue;

    fn index(&self, index: usize) -> &Cue {
        &self.cues[index]
    }
}

impl<'a> IntoIterator for &'a CueList {
    type Item = &'a Cue;
    type IntoIter = std::slice::Iter<'a, Cue>;

    fn into_iter(self) -> Self::IntoIter {
        self.cues.iter()
    }
}
