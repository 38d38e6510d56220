use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::caption_parser::{CaptionParser, TimeErrorPolicy};
use crate::cue::CueList;
use crate::errors::SourceError;
use crate::scheduler::{CueAction, CueScheduler, RegionEvent};
use crate::source::CaptionSource;

// @module: Captioned playback, wiring source, parser, scheduler and renderer

/// Outcome of loading a caption document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionStatus {
    /// Document fetched and parsed, with the number of cues
    Loaded(usize),
    /// Captions are turned off in the settings
    Disabled,
    /// The locator could not be opened
    CreateStreamFailed,
    /// The locator opened but reading it failed
    FetchFailed,
    /// The bytes are not a usable caption document
    ParseFailed,
}

/// Position and size of the video frame, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameGeometry {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

/// Layout nudges derived from the viewer's text size preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutOffsets {
    /// Percentage added to both origin axes
    pub text_size_offset: i32,
    /// Pixels added per region index so stacked regions do not overlap
    pub stacked_view_spacing: i32,
}

/// Pixel position of a region's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
}

impl Placement {
    /// Place a region from its cue origin percentages
    pub fn compute(
        geometry: FrameGeometry,
        origin_x_pct: u32,
        origin_y_pct: u32,
        region: usize,
        offsets: LayoutOffsets,
    ) -> Self {
        let along = |extent: u32, pct: u32| -> i64 {
            i64::from(extent) * (i64::from(pct) + i64::from(offsets.text_size_offset)) / 100
        };

        let x = i64::from(geometry.left) + along(geometry.width, origin_x_pct);
        let y = i64::from(geometry.top)
            + along(geometry.height, origin_y_pct)
            + i64::from(offsets.stacked_view_spacing) * region as i64;

        Placement {
            x: x.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
            y: y.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        }
    }
}

/// The video being captioned
pub trait VideoSurface: Send + Sync {
    /// Current playback position in milliseconds
    fn position_ms(&self) -> u64;

    /// Current frame geometry
    fn geometry(&self) -> FrameGeometry;
}

/// Paints caption regions; one slot per region index
pub trait CaptionRenderer: Send {
    fn region_count(&self) -> usize;

    fn show(&mut self, region: usize, text: &str, placement: Placement);

    fn hide(&mut self, region: usize);
}

/// Everything the player needs from the outside, passed explicitly
#[derive(Debug, Clone)]
pub struct PlayerSettings {
    pub captions_enabled: bool,
    pub poll_interval: Duration,
    pub region_count: usize,
    pub offsets: LayoutOffsets,
    pub time_error_policy: TimeErrorPolicy,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            captions_enabled: true,
            poll_interval: Duration::from_millis(300),
            region_count: 3,
            offsets: LayoutOffsets::default(),
            time_error_policy: TimeErrorPolicy::default(),
        }
    }
}

/// Loads a caption document and keeps renderer regions in sync with playback
pub struct CaptionPlayer {
    settings: PlayerSettings,
    source: Arc<dyn CaptionSource>,
    scheduler: Arc<Mutex<Option<CueScheduler>>>,
}

impl CaptionPlayer {
    pub fn new(settings: PlayerSettings, source: Arc<dyn CaptionSource>) -> Self {
        CaptionPlayer {
            settings,
            source,
            scheduler: Arc::new(Mutex::new(None)),
        }
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    pub fn is_loaded(&self) -> bool {
        self.scheduler.lock().is_some()
    }

    /// Cues currently installed, if any
    pub fn cues(&self) -> Option<CueList> {
        self.scheduler.lock().as_ref().map(|scheduler| scheduler.cues().clone())
    }

    /// Fetch and parse the document behind `locator`.
    ///
    /// Parsing runs on the blocking pool so a large document does not stall
    /// the runtime. On success the previous cues, if any, are replaced.
    pub async fn load(&self, locator: &str) -> CaptionStatus {
        if !self.settings.captions_enabled {
            debug!("Captions are currently disabled");
            return CaptionStatus::Disabled;
        }

        let bytes = match self.source.open(locator).await {
            Ok(bytes) => bytes,
            Err(e @ (SourceError::EmptyLocator | SourceError::CreateStreamFailed(_))) => {
                warn!("Could not open captions: {}", e);
                return CaptionStatus::CreateStreamFailed;
            }
            Err(e) => {
                warn!("Fetching captions failed: {}", e);
                return CaptionStatus::FetchFailed;
            }
        };

        let policy = self.settings.time_error_policy;
        let parsed = tokio::task::spawn_blocking(move || {
            CaptionParser::with_policy(policy).parse_bytes(&bytes)
        })
        .await;

        match parsed {
            Ok(Ok(cues)) => {
                let count = cues.len();
                self.install(cues);
                info!("Loaded {} caption cue(s) from {}", count, locator);
                CaptionStatus::Loaded(count)
            }
            Ok(Err(e)) => {
                warn!("Parsing captions failed: {}", e);
                CaptionStatus::ParseFailed
            }
            Err(e) => {
                error!("Caption parser task failed: {}", e);
                CaptionStatus::ParseFailed
            }
        }
    }

    /// Use an already parsed cue list
    pub fn install(&self, cues: CueList) {
        if let Some(max_region) = cues.max_region() {
            if max_region >= self.settings.region_count {
                warn!(
                    "Captions use {} region(s) but only {} are configured, extra cues will be ignored",
                    max_region + 1,
                    self.settings.region_count
                );
            }
        }
        *self.scheduler.lock() = Some(CueScheduler::new(cues, self.settings.region_count));
    }

    /// Poll once and apply the transitions to the renderer; returns how many were applied
    pub fn tick(&self, surface: &dyn VideoSurface, renderer: &mut dyn CaptionRenderer) -> usize {
        poll_once(&self.scheduler, &self.settings, surface, renderer)
    }

    /// Start polling on a tokio interval until the returned handle is stopped
    pub fn roll<V, R>(&self, surface: Arc<V>, renderer: R) -> RollHandle<R>
    where
        V: VideoSurface + 'static,
        R: CaptionRenderer + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let scheduler = Arc::clone(&self.scheduler);
        let settings = self.settings.clone();

        let task = tokio::spawn(async move {
            let mut renderer = renderer;
            if !settings.captions_enabled {
                debug!("Captions are disabled, not rolling");
                return renderer;
            }

            let mut interval = tokio::time::interval(settings.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Caption display started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        poll_once(&scheduler, &settings, surface.as_ref(), &mut renderer);
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            let events = scheduler
                .lock()
                .as_mut()
                .map(CueScheduler::reset)
                .unwrap_or_default();
            apply_events(events, surface.geometry(), settings.offsets, &mut renderer);
            info!("Caption display stopped");
            renderer
        });

        RollHandle { stop_tx, task }
    }
}

/// Running caption loop
pub struct RollHandle<R> {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<R>,
}

impl<R> RollHandle<R> {
    /// Stop polling, hide every region and hand the renderer back
    pub async fn stop(self) -> anyhow::Result<R> {
        // the receiver is gone only if the loop already ended
        let _ = self.stop_tx.send(true);
        Ok(self.task.await?)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

fn poll_once(
    scheduler: &Mutex<Option<CueScheduler>>,
    settings: &PlayerSettings,
    surface: &dyn VideoSurface,
    renderer: &mut dyn CaptionRenderer,
) -> usize {
    let events = match scheduler.lock().as_mut() {
        Some(scheduler) => scheduler.poll(surface.position_ms()),
        None => return 0,
    };
    apply_events(events, surface.geometry(), settings.offsets, renderer)
}

fn apply_events(
    events: Vec<RegionEvent>,
    geometry: FrameGeometry,
    offsets: LayoutOffsets,
    renderer: &mut dyn CaptionRenderer,
) -> usize {
    let mut applied = 0;
    for RegionEvent { region, action } in events {
        if region >= renderer.region_count() {
            debug!("Renderer has no region {}, dropping event", region);
            continue;
        }
        match action {
            CueAction::Show { text, origin_x_pct, origin_y_pct } => {
                let placement = Placement::compute(geometry, origin_x_pct, origin_y_pct, region, offsets);
                renderer.show(region, &text, placement);
            }
            CueAction::Hide => renderer.hide(region),
        }
        applied += 1;
    }
    applied
}

/// Playback clock advancing in real time from a start position, for demos and dry runs
pub struct SimulatedSurface {
    started: Instant,
    start_ms: u64,
    speed: f64,
    geometry: FrameGeometry,
}

impl SimulatedSurface {
    pub fn new(start_ms: u64, speed: f64, geometry: FrameGeometry) -> Self {
        SimulatedSurface {
            started: Instant::now(),
            start_ms,
            speed: if speed.is_finite() && speed > 0.0 { speed } else { 1.0 },
            geometry,
        }
    }
}

impl VideoSurface for SimulatedSurface {
    fn position_ms(&self) -> u64 {
        let elapsed = self.started.elapsed().as_secs_f64() * 1000.0 * self.speed;
        self.start_ms.saturating_add(elapsed as u64)
    }

    fn geometry(&self) -> FrameGeometry {
        self.geometry
    }
}
