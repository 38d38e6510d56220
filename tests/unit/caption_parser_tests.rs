/*!
 * Tests for caption document parsing
 */

use ttcaptions::caption_parser::{CaptionParser, TimeErrorPolicy};
use ttcaptions::cue::DEFAULT_ORIGIN;
use ttcaptions::errors::CaptionError;
use crate::common;

fn parse(markup: &str) -> ttcaptions::CueList {
    CaptionParser::default().parse_str(markup).unwrap()
}

#[test]
fn test_parse_withSampleDocument_shouldProduceOrderedCues() {
    let cues = parse(common::SAMPLE_TTML);

    assert_eq!(cues.len(), 3);
    assert!(cues.is_begin_ordered());

    assert_eq!(cues[0].begin_ms, 1_000);
    assert_eq!(cues[0].end_ms, 3_000);
    assert_eq!(cues[0].text, "First speaker");
    assert_eq!((cues[0].origin_x_pct, cues[0].origin_y_pct), (10, 70));

    assert_eq!(cues[2].begin_ms, 4_000);
    assert_eq!(cues[2].text, "Line one\nLine two");
}

#[test]
fn test_parse_withSharedBeginStrings_shouldStackRegions() {
    let markup = common::ttml_document(
        r#"ttp:frameRate="30""#,
        r#"<p begin="00:00:01:00" end="00:00:02:00">A</p>
           <p begin="00:00:01:00" end="00:00:02:00">B</p>
           <p begin="00:00:03:00" end="00:00:04:00">C</p>"#,
    );
    let cues = parse(&markup);

    let regions: Vec<usize> = cues.iter().map(|c| c.region).collect();
    assert_eq!(regions, vec![0, 1, 0]);
    assert_eq!(cues.region_count(), 2);
}

#[test]
fn test_parse_withEquivalentButDifferentBeginText_shouldNotGroup() {
    // same instant, different spelling: grouping is textual
    let markup = common::ttml_document(
        "",
        r#"<p begin="1s" end="2s">A</p>
           <p begin="00:00:01" end="2s">B</p>"#,
    );
    let cues = parse(&markup);

    assert_eq!(cues[0].begin_ms, cues[1].begin_ms);
    assert_eq!(cues[1].region, 0);
}

#[test]
fn test_parse_withoutOrigin_shouldUseDefaultOrigin() {
    let markup = common::ttml_document("", r#"<p begin="1s" end="2s">Hi</p>"#);
    let cues = parse(&markup);

    assert_eq!((cues[0].origin_x_pct, cues[0].origin_y_pct), DEFAULT_ORIGIN);
    assert_eq!(DEFAULT_ORIGIN, (15, 80));
}

#[test]
fn test_parse_withIndentedText_shouldCollapseWhitespace() {
    let markup = common::ttml_document(
        "",
        r#"<p begin="1s" end="2s">
              Hello
              <br/>
              World
           </p>
           <p begin="3s" end="4s">Hello <span tts:color="red">big</span>   world</p>"#,
    );
    let cues = parse(&markup);

    assert_eq!(cues[0].text, "Hello\nWorld");
    assert_eq!(cues[1].text, "Hello big world");
}

#[test]
fn test_parse_withEntities_shouldUnescapeText() {
    let markup = common::ttml_document("", r#"<p begin="1s" end="2s">Tom &amp; Jerry &lt;3</p>"#);
    let cues = parse(&markup);

    assert_eq!(cues[0].text, "Tom & Jerry <3");
}

#[test]
fn test_parse_withDropFrameRoot_shouldUseDropConstants() {
    let markup = common::ttml_document(
        r#"ttp:dropMode="dropNTSC" ttp:frameRate="30""#,
        r#"<p begin="00:01:00:00" end="01:00:00:00">x</p>"#,
    );
    let cues = parse(&markup);

    assert_eq!(cues[0].begin_ms, 59_999);
    assert_eq!(cues[0].end_ms, 3_599_996);
}

#[test]
fn test_parse_withMultiplierRoot_shouldUseNonDropNtsc() {
    let markup = common::ttml_document(
        r#"ttp:frameRate="30" ttp:frameRateMultiplier="1000 1001""#,
        r#"<p begin="0:0:10:15" end="0:0:12:00">x</p>"#,
    );
    let cues = parse(&markup);

    assert_eq!(cues[0].begin_ms, 10_510);
}

#[test]
fn test_parse_withUnprefixedAttributes_shouldMatchLocalNames() {
    let markup = r#"<tt frameRate="25"><body><p begin="00:00:00:05" end="1s" origin="50% 50%">x</p></body></tt>"#;
    let cues = parse(markup);

    assert_eq!(cues[0].begin_ms, 200);
    assert_eq!((cues[0].origin_x_pct, cues[0].origin_y_pct), (50, 50));
}

#[test]
fn test_parse_withBadTimeAndZeroPolicy_shouldKeepCueAtZero() {
    let markup = common::ttml_document(
        "",
        r#"<p begin="soon" end="2s">bad begin</p>
           <p end="4s">no begin</p>
           <p begin="5s" end="6s">fine</p>"#,
    );
    let cues = CaptionParser::with_policy(TimeErrorPolicy::ZeroBoundary)
        .parse_str(&markup)
        .unwrap();

    assert_eq!(cues.len(), 3);
    assert_eq!((cues[0].begin_ms, cues[0].end_ms), (0, 2_000));
    assert_eq!((cues[1].begin_ms, cues[1].end_ms), (0, 4_000));
    assert_eq!(cues[2].text, "fine");
}

#[test]
fn test_parse_withBadTimeAndSkipPolicy_shouldDropCue() {
    let markup = common::ttml_document(
        "",
        r#"<p begin="1s" end="later">bad end</p>
           <p begin="5s" end="6s">fine</p>"#,
    );
    let cues = CaptionParser::with_policy(TimeErrorPolicy::SkipCue)
        .parse_str(&markup)
        .unwrap();

    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].text, "fine");
}

#[test]
fn test_parse_withInvertedCue_shouldKeepIt() {
    let markup = common::ttml_document("", r#"<p begin="5s" end="1s">backwards</p>"#);
    let cues = parse(&markup);

    assert_eq!(cues.len(), 1);
    assert!(cues[0].is_inverted());
    assert_eq!(cues[0].duration_ms(), 0);
}

#[test]
fn test_parse_withSelfClosingCue_shouldProduceEmptyText() {
    let markup = common::ttml_document("", r#"<p begin="1s" end="2s"/>"#);
    let cues = parse(&markup);

    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].text, "");
}

#[test]
fn test_parse_withMismatchedTags_shouldFailStructurally() {
    let result = CaptionParser::default()
        .parse_str(r#"<tt><body><p begin="1s" end="2s">x</body></tt>"#);
    assert!(matches!(result, Err(CaptionError::Structural(_))));
}

#[test]
fn test_parse_withUnclosedDocument_shouldFailStructurally() {
    let result = CaptionParser::default().parse_str(r#"<tt><body><p begin="1s" end="2s">x</p>"#);
    assert!(matches!(result, Err(CaptionError::Structural(_))));
}

#[test]
fn test_parse_withEmptyOrForeignDocument_shouldFailStructurally() {
    let parser = CaptionParser::default();

    assert!(matches!(parser.parse_str(""), Err(CaptionError::Structural(_))));
    assert!(matches!(parser.parse_str("just some text"), Err(CaptionError::Structural(_))));
    assert!(matches!(
        parser.parse_str("<html><body/></html>"),
        Err(CaptionError::Structural(_))
    ));
}

#[test]
fn test_parse_withNoCues_shouldReturnEmptyList() {
    let cues = parse(r#"<tt ttp:frameRate="24" xmlns:ttp="http://www.w3.org/ns/ttml#parameter"><body/></tt>"#);
    assert!(cues.is_empty());
}
