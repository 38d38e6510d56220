/*!
 * Forward-scanning cue scheduler.
 *
 * The scheduler is polled with the current playback position and answers
 * with the show/hide transitions each display region has to perform.
 * Cues enter a live set once their begin is reached, through a cursor that
 * only moves forward during normal playback, and leave it at their end. A
 * whole session therefore costs amortized O(1) per poll for a bounded
 * number of overlapping cues. Seeking backwards rewinds the cursor.
 */

use log::debug;

use crate::cue::{Cue, CueList};

/// What a region has to do after a poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CueAction {
    /// Display the text at the given origin
    Show {
        text: String,
        origin_x_pct: u32,
        origin_y_pct: u32,
    },
    /// Clear the region
    Hide,
}

/// A transition for one display region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionEvent {
    pub region: usize,
    pub action: CueAction,
}

impl RegionEvent {
    fn show(cue: &Cue) -> Self {
        RegionEvent {
            region: cue.region,
            action: CueAction::Show {
                text: cue.text.clone(),
                origin_x_pct: cue.origin_x_pct,
                origin_y_pct: cue.origin_y_pct,
            },
        }
    }

    fn hide(region: usize) -> Self {
        RegionEvent {
            region,
            action: CueAction::Hide,
        }
    }
}

/// Stateful scheduler over an immutable cue list
#[derive(Debug, Clone)]
pub struct CueScheduler {
    cues: CueList,
    // index of the first cue whose begin has not been reached yet
    scan_index: usize,
    last_position_ms: u64,
    // begun and not yet expired cue indices, ascending
    live: Vec<usize>,
    // cue index currently displayed by each region
    shown: Vec<Option<usize>>,
}

impl CueScheduler {
    /// Scheduler driving `region_count` display slots. Cues addressed to a
    /// region beyond that are ignored.
    pub fn new(cues: CueList, region_count: usize) -> Self {
        CueScheduler {
            cues,
            scan_index: 0,
            last_position_ms: 0,
            live: Vec::new(),
            shown: vec![None; region_count],
        }
    }

    /// Scheduler with exactly as many slots as the cues need
    pub fn from_cues(cues: CueList) -> Self {
        let region_count = cues.region_count();
        Self::new(cues, region_count)
    }

    pub fn cues(&self) -> &CueList {
        &self.cues
    }

    pub fn region_count(&self) -> usize {
        self.shown.len()
    }

    pub fn scan_index(&self) -> usize {
        self.scan_index
    }

    /// Number of cues currently inside their display interval
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn last_position_ms(&self) -> u64 {
        self.last_position_ms
    }

    /// Regions currently showing a cue, in ascending order
    pub fn shown_regions(&self) -> Vec<usize> {
        self.shown
            .iter()
            .enumerate()
            .filter_map(|(region, cue)| cue.map(|_| region))
            .collect()
    }

    /// Advance to `position_ms` and return the resulting region transitions.
    ///
    /// A poll touches the live cues and the cues that begin since the last
    /// poll, nothing else. When several live cues share a region the one
    /// latest in the document owns it.
    pub fn poll(&mut self, position_ms: u64) -> Vec<RegionEvent> {
        let mut events = Vec::new();

        if position_ms < self.last_position_ms {
            debug!(
                "Seek back from {} ms to {} ms, rescanning",
                self.last_position_ms, position_ms
            );
            self.scan_index = 0;
            self.live.clear();
            self.hide_all(&mut events);
        }

        self.expire(position_ms, &mut events);
        self.admit(position_ms);

        let mut owners: Vec<Option<usize>> = vec![None; self.shown.len()];
        for &index in &self.live {
            owners[self.cues[index].region] = Some(index);
        }

        for &index in &self.live {
            let region = self.cues[index].region;
            if owners[region] == Some(index) && self.shown[region] != Some(index) {
                debug!("showing index {}, text {:?}", index, self.cues[index].text);
                self.shown[region] = Some(index);
                events.push(RegionEvent::show(&self.cues[index]));
            }
        }

        self.last_position_ms = position_ms;
        events
    }

    /// Hide every region and rewind to the initial state
    pub fn reset(&mut self) -> Vec<RegionEvent> {
        let mut events = Vec::new();
        self.hide_all(&mut events);
        self.scan_index = 0;
        self.live.clear();
        self.last_position_ms = 0;
        events
    }

    fn expire(&mut self, position_ms: u64, events: &mut Vec<RegionEvent>) {
        let cues = &self.cues;
        let shown = &mut self.shown;
        self.live.retain(|&index| {
            let cue = &cues[index];
            if cue.end_ms > position_ms {
                return true;
            }
            if shown[cue.region] == Some(index) {
                debug!("hiding index {}, text {:?}", index, cue.text);
                shown[cue.region] = None;
                events.push(RegionEvent::hide(cue.region));
            }
            false
        });
    }

    fn admit(&mut self, position_ms: u64) {
        while let Some(cue) = self.cues.get(self.scan_index) {
            if cue.begin_ms > position_ms {
                // begin order: every later cue starts even later
                break;
            }
            let index = self.scan_index;
            self.scan_index += 1;

            if !cue.is_active_at(position_ms) {
                continue;
            }
            if cue.region >= self.shown.len() {
                debug!(
                    "Cue {} targets region {} but only {} region(s) exist, ignoring",
                    index,
                    cue.region,
                    self.shown.len()
                );
                continue;
            }
            self.live.push(index);
        }
    }

    fn hide_all(&mut self, events: &mut Vec<RegionEvent>) {
        for (region, slot) in self.shown.iter_mut().enumerate() {
            if slot.take().is_some() {
                events.push(RegionEvent::hide(region));
            }
        }
    }
}
