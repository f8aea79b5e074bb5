use std::time::Duration;

use lyric_sync::{
    EngineSettings, LinePosition, LrcLineKind, LyricFormat, LyricLine, LyricsStore,
    ParsingOptions, SharedLyricsStore, SpacingStrategy, Timeline, TtmlParsingOptions,
    detect_format, parse_lyrics, parse_ttml, resolve_range,
};

const SAMPLE_TTML: &str = include_str!("test_data/sample.ttml");
const SAMPLE_LRC: &str = include_str!("test_data/sample.lrc");

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn highlighted(store: &LyricsStore, elapsed: Duration) -> Vec<String> {
    store.lines()[store.active_range(elapsed)]
        .iter()
        .map(LyricLine::content)
        .collect()
}

#[test]
fn test_lrc_two_lines_highlight() {
    let mut store = LyricsStore::new();
    assert!(store.load(Some("[00:00.00]Line one\n[00:05.00]Line two"), None));
    assert_eq!(highlighted(&store, ms(2000)), ["Line one"]);
    assert_eq!(highlighted(&store, ms(5500)), ["Line two"]);
}

#[test]
fn test_lrc_with_carriage_return_line_endings() {
    let mut store = LyricsStore::new();
    store.load(Some("[00:00.00]Line one\r[00:05.00]Line two"), None);
    assert_eq!(store.lines().len(), 2);
    assert_eq!(highlighted(&store, ms(2000)), ["Line one"]);
    assert_eq!(highlighted(&store, ms(5500)), ["Line two"]);
}

#[test]
fn test_sample_lrc() {
    assert_eq!(detect_format(SAMPLE_LRC), LyricFormat::Lrc);
    let parsed = parse_lyrics(SAMPLE_LRC, None, &ParsingOptions::default());
    assert_eq!(parsed.tag("ti"), Some("Sample Song"));
    assert_eq!(parsed.lines.len(), 6);

    let translations: Vec<&LyricLine> = parsed
        .lines
        .iter()
        .filter(|l| matches!(l, LyricLine::Lrc(line) if line.kind == LrcLineKind::Translation("zh-Hans".into())))
        .collect();
    assert_eq!(translations.len(), 1);
    assert_eq!(translations[0].content(), "你好世界");

    let mut store = LyricsStore::new();
    store.load(Some(SAMPLE_LRC), None);
    assert_eq!(
        highlighted(&store, ms(2000)),
        ["Hello world", "你好世界", "你好世界"]
    );
    assert_eq!(highlighted(&store, ms(12_000)), ["Rock & Roll"]);
    // 最后一行没有文本，但仍然是一个可以高亮的时间点
    assert_eq!(highlighted(&store, ms(60_000)), [""]);
}

#[test]
fn test_sample_ttml() {
    assert_eq!(detect_format(SAMPLE_TTML), LyricFormat::Ttml);
    let parsed = parse_lyrics(SAMPLE_TTML, None, &ParsingOptions::default());
    assert_eq!(parsed.format, LyricFormat::Ttml);
    assert_eq!(parsed.tag("musicName"), Some("Sample Song"));
    assert_eq!(parsed.tag("lang"), Some("en"));

    let lines: Vec<_> = parsed
        .lines
        .iter()
        .map(|l| match l {
            LyricLine::Ttml(line) => line,
            other => panic!("期望 TTML 行，得到 {other:?}"),
        })
        .collect();
    assert_eq!(lines.len(), 3);

    assert_eq!(parsed.lines[0].content(), "Hello world");
    assert_eq!(lines[0].position, LinePosition::Main);
    assert_eq!(lines[0].song_part.as_deref(), Some("Verse"));
    assert_eq!(lines[0].main.translation("zh-Hans"), Some("你好世界"));

    assert_eq!(parsed.lines[1].content(), "We sing together");
    assert_eq!(lines[1].position, LinePosition::Sub);
    let bg = lines[1].background.as_ref().unwrap();
    assert_eq!(bg.children[0].text, "yeah");
    assert_eq!(bg.translation("zh-Hans"), Some("是的"));
    assert_eq!(lines[1].condensed_end_time(), ms(8600));

    assert_eq!(parsed.lines[2].content(), "Rock & Roll");
    assert_eq!(lines[2].song_part.as_deref(), Some("Chorus"));
    assert_eq!(lines[2].main.translation("ja"), Some("ロックンロール"));
    assert_eq!(
        lines.iter().map(|l| l.index).collect::<Vec<_>>(),
        [0, 1, 2]
    );
}

#[test]
fn test_spacing_strategies_agree_on_sample() {
    let streaming = parse_ttml(SAMPLE_TTML, &TtmlParsingOptions::default()).unwrap();
    let template = parse_ttml(
        SAMPLE_TTML,
        &TtmlParsingOptions {
            spacing: SpacingStrategy::Template,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(streaming, template);
}

#[test]
fn test_ttml_highlight() {
    let mut store = LyricsStore::new();
    store.load(Some(SAMPLE_TTML), Some(LyricFormat::Ttml));

    assert_eq!(store.active_range(ms(0)), 0..1);
    assert_eq!(store.active_range(ms(1500)), 0..1);
    assert_eq!(store.active_range(ms(4200)), 0..1);
    // 背景人声延长了第二行
    assert_eq!(store.active_range(ms(8300)), 1..2);
    assert_eq!(store.active_range(ms(9000)), 1..2);
    assert_eq!(store.active_range(ms(12_000)), 2..3);

    let LyricLine::Ttml(line) = &store.lines()[1] else {
        panic!("期望 TTML 行");
    };
    assert_eq!(line.main.active_word_range(ms(5500)), 1..2);
}

#[test]
fn test_broken_ttml_is_shown_as_plain_text() {
    let cut = SAMPLE_TTML.find("</body>").unwrap();
    let broken = &SAMPLE_TTML[..cut];
    let mut store = LyricsStore::new();
    store.load(Some(broken), Some(LyricFormat::Ttml));
    assert_eq!(store.format(), LyricFormat::Raw);
    assert!(!store.lines().is_empty());
    assert_eq!(store.active_range(ms(1000)), 0..0);
}

#[test]
fn test_timeline_agrees_with_linear_resolution() {
    for content in [SAMPLE_LRC, SAMPLE_TTML] {
        let parsed = parse_lyrics(content, None, &ParsingOptions::default());
        let timeline = Timeline::new(&parsed.lines);
        for t in (0..20_000).step_by(100) {
            assert_eq!(
                timeline.active_range(ms(t)),
                resolve_range(&parsed.lines, ms(t)),
                "t = {t}ms"
            );
        }
    }
}

#[test]
fn test_settings_drive_the_store() {
    let settings = EngineSettings::from_json_str(
        r#"{ "parsing": { "lrc": { "apply_offset": false } }, "highlight": { "time_offset_ms": -1000 } }"#,
    )
    .unwrap();
    let mut store = LyricsStore::with_settings(&settings);
    store.load(Some("[offset:500]\n[00:01.00]A\n[00:03.00]B"), None);

    let LyricLine::Lrc(first) = &store.lines()[0] else {
        panic!("期望 LRC 行");
    };
    assert_eq!(first.begin_time, ms(1000));
    assert_eq!(store.active_range(ms(3500)), 0..1);
    assert_eq!(store.active_range(ms(4000)), 1..2);
}

#[tokio::test]
async fn test_shared_store_in_background() {
    let store = SharedLyricsStore::new();
    let handle = store.reparse_in_background(Some(SAMPLE_TTML.to_string()), None);
    assert!(handle.await.unwrap());

    let snapshot = store.snapshot();
    assert_eq!(snapshot.format(), LyricFormat::Ttml);
    assert_eq!(snapshot.lines().len(), 3);
    assert_eq!(store.active_range(ms(12_000)), 2..3);

    assert!(
        store
            .reparse_in_background(None, None)
            .await
            .unwrap()
    );
    assert!(store.snapshot().lines().is_empty());
}
