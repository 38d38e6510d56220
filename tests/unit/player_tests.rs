/*!
 * Tests for the caption player
 */

use std::sync::Arc;

use ttcaptions::cue::{Cue, CueList};
use ttcaptions::player::{
    CaptionPlayer, CaptionStatus, FrameGeometry, LayoutOffsets, Placement, PlayerSettings,
};
use ttcaptions::source::StaticCaptionSource;
use crate::common::{self, ManualSurface, RecordingRenderer, RenderCall};

const GEOMETRY: FrameGeometry = FrameGeometry { left: 10, top: 20, width: 1000, height: 500 };

fn player_with(settings: PlayerSettings, markup: &str) -> CaptionPlayer {
    let source = StaticCaptionSource::new().with_document("movie.ttml", markup.to_string());
    CaptionPlayer::new(settings, Arc::new(source))
}

#[test]
fn test_placement_withMediumText_shouldStackRegions() {
    let offsets = LayoutOffsets { text_size_offset: 0, stacked_view_spacing: 7 };

    assert_eq!(Placement::compute(GEOMETRY, 15, 80, 0, offsets), Placement { x: 160, y: 420 });
    assert_eq!(Placement::compute(GEOMETRY, 15, 80, 1, offsets), Placement { x: 160, y: 427 });
}

#[test]
fn test_placement_withLargeText_shouldNudgeOrigin() {
    let geometry = FrameGeometry { left: 0, top: 0, width: 1000, height: 500 };
    let offsets = LayoutOffsets { text_size_offset: -5, stacked_view_spacing: 27 };

    assert_eq!(Placement::compute(geometry, 15, 80, 1, offsets), Placement { x: 100, y: 402 });
}

#[tokio::test]
async fn test_load_withValidDocument_shouldInstallCues() {
    let player = player_with(PlayerSettings::default(), common::SAMPLE_TTML);

    assert!(!player.is_loaded());
    assert_eq!(player.load("movie.ttml").await, CaptionStatus::Loaded(3));
    assert!(player.is_loaded());
    assert_eq!(player.cues().map(|cues| cues.len()), Some(3));
}

#[tokio::test]
async fn test_load_withCaptionsDisabled_shouldNotFetch() {
    let settings = PlayerSettings { captions_enabled: false, ..PlayerSettings::default() };
    let player = player_with(settings, common::SAMPLE_TTML);

    assert_eq!(player.load("movie.ttml").await, CaptionStatus::Disabled);
    assert!(!player.is_loaded());
}

#[tokio::test]
async fn test_load_withUnknownLocator_shouldReportCreateStreamFailed() {
    let player = player_with(PlayerSettings::default(), common::SAMPLE_TTML);

    assert_eq!(player.load("elsewhere.ttml").await, CaptionStatus::CreateStreamFailed);
    assert_eq!(player.load("").await, CaptionStatus::CreateStreamFailed);
}

#[tokio::test]
async fn test_load_withMissingFile_shouldReportFetchFailed() {
    let temp_dir = common::create_temp_dir().unwrap();
    let missing = temp_dir.path().join("missing.ttml");
    let player = CaptionPlayer::new(
        PlayerSettings::default(),
        Arc::new(ttcaptions::DefaultCaptionSource::default()),
    );

    assert_eq!(player.load(missing.to_str().unwrap()).await, CaptionStatus::FetchFailed);
}

#[tokio::test]
async fn test_load_withBrokenDocument_shouldReportParseFailedAndKeepCues() {
    let source = StaticCaptionSource::new()
        .with_document("good.ttml", common::SAMPLE_TTML)
        .with_document("bad.ttml", "<tt><body><p>");
    let player = CaptionPlayer::new(PlayerSettings::default(), Arc::new(source));

    assert_eq!(player.load("good.ttml").await, CaptionStatus::Loaded(3));
    assert_eq!(player.load("bad.ttml").await, CaptionStatus::ParseFailed);
    assert_eq!(player.cues().map(|cues| cues.len()), Some(3));
}

#[test]
fn test_tick_withInstalledCues_shouldPlaceRegions() {
    let settings = PlayerSettings {
        offsets: LayoutOffsets { text_size_offset: 0, stacked_view_spacing: 7 },
        ..PlayerSettings::default()
    };
    let player = CaptionPlayer::new(settings, Arc::new(StaticCaptionSource::new()));
    player.install(CueList::new(vec![
        Cue::new(1000, 2000, 0, "top"),
        Cue::new(1000, 2000, 1, "bottom"),
    ]));

    let surface = ManualSurface::new(GEOMETRY);
    let mut renderer = RecordingRenderer::new(3);

    surface.seek(1500);
    assert_eq!(player.tick(&surface, &mut renderer), 2);
    assert_eq!(
        renderer.take_calls(),
        vec![
            RenderCall::Show { region: 0, text: "top".to_string(), placement: Placement { x: 160, y: 420 } },
            RenderCall::Show { region: 1, text: "bottom".to_string(), placement: Placement { x: 160, y: 427 } },
        ]
    );

    surface.seek(2000);
    assert_eq!(player.tick(&surface, &mut renderer), 2);
    assert_eq!(
        renderer.take_calls(),
        vec![RenderCall::Hide { region: 0 }, RenderCall::Hide { region: 1 }]
    );
}

#[test]
fn test_tick_withRendererShorterThanCues_shouldDropExtraRegions() {
    let player = CaptionPlayer::new(PlayerSettings::default(), Arc::new(StaticCaptionSource::new()));
    player.install(CueList::new(vec![
        Cue::new(0, 1000, 0, "a"),
        Cue::new(0, 1000, 1, "b"),
    ]));

    let surface = ManualSurface::new(GEOMETRY);
    let mut renderer = RecordingRenderer::new(1);

    surface.seek(10);
    assert_eq!(player.tick(&surface, &mut renderer), 1);
}

#[test]
fn test_tick_withoutCues_shouldDoNothing() {
    let player = CaptionPlayer::new(PlayerSettings::default(), Arc::new(StaticCaptionSource::new()));
    let surface = ManualSurface::new(GEOMETRY);
    let mut renderer = RecordingRenderer::new(3);

    assert_eq!(player.tick(&surface, &mut renderer), 0);
    assert!(renderer.take_calls().is_empty());
}

#[tokio::test]
async fn test_roll_withCaptionsDisabled_shouldFinishImmediately() {
    let settings = PlayerSettings { captions_enabled: false, ..PlayerSettings::default() };
    let player = CaptionPlayer::new(settings, Arc::new(StaticCaptionSource::new()));
    let surface = Arc::new(ManualSurface::new(GEOMETRY));
    let renderer = RecordingRenderer::new(3);
    let calls = Arc::clone(&renderer.calls);

    let handle = player.roll(surface, renderer);
    handle.stop().await.unwrap();

    assert!(calls.lock().is_empty());
}
