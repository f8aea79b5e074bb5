//! # LRC 格式解析器
//!
//! 宽松解析：野生 LRC 文件经常不规范，无法识别的行直接跳过，不返回错误。
//! 行按文件中的顺序输出，不排序也不合并相同时间戳。

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, trace};

use crate::{
    config::LrcParsingOptions,
    time::parse_time,
    types::{LrcLine, LrcLineKind, LyricFormat, LyricLine, ParsedLyrics},
};

/// 匹配行首的一个 `[...]` 标签
static LRC_HEAD_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\[\]]*)]").expect("未能编译 LRC_HEAD_TAG_REGEX"));

const TRANSLATION_MARKER_PREFIX: &str = "tr:";
const OFFSET_TAG_KEY: &str = "offset";

/// 把一行拆成行首标签列表和剩余的正文。
fn split_head_tokens(line: &str) -> (Vec<&str>, &str) {
    let mut tokens = Vec::new();
    let mut rest = line;
    while let Some(caps) = LRC_HEAD_TAG_REGEX.captures(rest) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        tokens.push(inner.as_str());
        rest = &rest[whole.end()..];
    }
    (tokens, rest.trim())
}

/// `key:value` 标签，必须恰好被 `:` 分成两部分。
fn split_tag(token: &str) -> Option<(String, String)> {
    let mut parts = token.split(':');
    let key = parts.next()?.trim();
    let value = parts.next()?.trim();
    if parts.next().is_some() || key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

/// 解析 LRC 文本。
#[must_use]
pub fn parse_lrc(content: &str, options: &LrcParsingOptions) -> ParsedLyrics {
    let mut lines: Vec<LrcLine> = Vec::new();
    let mut tags: Vec<(String, String)> = Vec::new();

    // `lines()` 只认 `\n` 和 `\r\n`，单独的 `\r` 也要断行
    for (line_num, line_str) in content.lines().flat_map(|l| l.split('\r')).enumerate() {
        let line_str = line_str.trim();
        if line_str.is_empty() {
            continue;
        }

        let (head_tokens, text) = split_head_tokens(line_str);

        match head_tokens.as_slice() {
            [] => {
                trace!("[LRC 解析] 行 {}: 没有行首标签，跳过。", line_num + 1);
            }
            [token] => {
                if let Some(time) = parse_time(token) {
                    lines.push(LrcLine {
                        kind: LrcLineKind::Main,
                        begin_time: time,
                        end_time: None,
                        tags: Vec::new(),
                        content: text.to_string(),
                    });
                } else if let Some(tag) = split_tag(token) {
                    tags.push(tag);
                } else {
                    debug!(
                        "[LRC 解析] 行 {}: 无法识别的标签 '[{}]'，跳过。",
                        line_num + 1,
                        token
                    );
                }
            }
            tokens => {
                let Some(time) = tokens.iter().find_map(|t| parse_time(t)) else {
                    debug!(
                        "[LRC 解析] 行 {}: 多个行首标签中没有可用的时间戳，跳过。",
                        line_num + 1
                    );
                    continue;
                };

                let line_tags: Vec<(String, String)> = tokens
                    .iter()
                    .filter(|t| parse_time(t).is_none())
                    .filter_map(|t| split_tag(t))
                    .collect();
                let translation_locale = tokens
                    .iter()
                    .find_map(|t| t.strip_prefix(TRANSLATION_MARKER_PREFIX))
                    .map(|locale| locale.trim().to_string());

                lines.push(LrcLine {
                    kind: LrcLineKind::Main,
                    begin_time: time,
                    end_time: None,
                    tags: line_tags.clone(),
                    content: text.to_string(),
                });
                if let Some(locale) = translation_locale {
                    lines.push(LrcLine {
                        kind: LrcLineKind::Translation(locale),
                        begin_time: time,
                        end_time: None,
                        tags: line_tags,
                        content: text.to_string(),
                    });
                }
            }
        }
    }

    if options.apply_offset
        && let Some(offset_ms) = find_offset_ms(&tags)
    {
        debug!("[LRC 解析] 应用 offset 标签: {offset_ms}ms");
        apply_offset(&mut lines, offset_ms);
    }

    fill_end_times(&mut lines);

    ParsedLyrics {
        format: LyricFormat::Lrc,
        lines: lines.into_iter().map(LyricLine::Lrc).collect(),
        tags,
    }
}

fn find_offset_ms(tags: &[(String, String)]) -> Option<i64> {
    tags.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(OFFSET_TAG_KEY))
        .and_then(|(_, value)| value.trim_start_matches('+').parse::<i64>().ok())
}

/// 正的 offset 让歌词提前出现。
fn apply_offset(lines: &mut [LrcLine], offset_ms: i64) {
    let shift = Duration::from_millis(offset_ms.unsigned_abs());
    for line in lines {
        line.begin_time = if offset_ms >= 0 {
            line.begin_time.saturating_sub(shift)
        } else {
            line.begin_time.saturating_add(shift)
        };
    }
}

/// 每行的结束时间取其后第一个开始时间更晚的行。
///
/// 从后往前扫描，栈里保存后面各行中可能成为答案的开始时间（自底向上严格递减）。
fn fill_end_times(lines: &mut [LrcLine]) {
    let mut later_begins: Vec<Duration> = Vec::new();
    for line in lines.iter_mut().rev() {
        let begin = line.begin_time;
        while later_begins.last().is_some_and(|&next| next <= begin) {
            later_begins.pop();
        }
        line.end_time = later_begins.last().copied();
        later_begins.push(begin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lrc_lines(parsed: &ParsedLyrics) -> Vec<&LrcLine> {
        parsed
            .lines
            .iter()
            .map(|l| match l {
                LyricLine::Lrc(line) => line,
                other => panic!("期望 LRC 行，得到 {other:?}"),
            })
            .collect()
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_single_timestamp_line() {
        let parsed = parse_lrc("[00:01.23]Hello", &LrcParsingOptions::default());
        let lines = lrc_lines(&parsed);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].kind, LrcLineKind::Main);
        assert_eq!(lines[0].begin_time, ms(1230));
        assert_eq!(lines[0].content, "Hello");
        assert_eq!(lines[0].end_time, None);
    }

    #[test]
    fn test_metadata_tags_and_malformed_lines() {
        let content = "[ar: Someone ]\n[al:Album]\n[bogus]text\n[a:b:c]x\nno tags at all\n[00:02.00]Line";
        let parsed = parse_lrc(content, &LrcParsingOptions::default());
        assert_eq!(parsed.lines.len(), 1);
        assert_eq!(
            parsed.tags,
            vec![
                ("ar".to_string(), "Someone".to_string()),
                ("al".to_string(), "Album".to_string())
            ]
        );
        assert_eq!(parsed.tag("AR"), Some("Someone"));
    }

    #[test]
    fn test_bogus_tag_yields_no_lines() {
        let parsed = parse_lrc("[bogus]text", &LrcParsingOptions::default());
        assert!(parsed.lines.is_empty());
        assert!(parsed.tags.is_empty());
    }

    #[test]
    fn test_translation_marker_emits_two_lines() {
        let parsed = parse_lrc(
            "[00:05.00][tr:zh-Hans]你好\n[00:07.50]Next",
            &LrcParsingOptions::default(),
        );
        let lines = lrc_lines(&parsed);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].kind, LrcLineKind::Main);
        assert_eq!(
            lines[1].kind,
            LrcLineKind::Translation("zh-Hans".to_string())
        );
        assert_eq!(lines[0].begin_time, lines[1].begin_time);
        assert_eq!(lines[1].content, "你好");
        assert_eq!(lines[1].tags, vec![("tr".into(), "zh-Hans".into())]);
        assert_eq!(lines[0].end_time, Some(ms(7500)));
        assert_eq!(lines[1].end_time, Some(ms(7500)));
    }

    #[test]
    fn test_multiple_timestamps_use_first_parsable() {
        let parsed = parse_lrc(
            "[xx:yy][00:03.00][00:30.00]Chorus",
            &LrcParsingOptions::default(),
        );
        let lines = lrc_lines(&parsed);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].begin_time, ms(3000));
        assert_eq!(lines[0].content, "Chorus");
    }

    #[test]
    fn test_source_order_is_preserved() {
        let parsed = parse_lrc(
            "[00:10.00]B\n[00:05.00]A\n[00:10.00]C\n[00:20.00]D",
            &LrcParsingOptions::default(),
        );
        let lines = lrc_lines(&parsed);
        let contents: Vec<&str> = lines.iter().map(|l| l.content.as_str()).collect();
        assert_eq!(contents, ["B", "A", "C", "D"]);
        assert_eq!(lines[0].end_time, Some(ms(20_000)));
        assert_eq!(lines[1].end_time, Some(ms(10_000)));
        assert_eq!(lines[3].end_time, None);
    }

    #[test]
    fn test_end_times_with_repeated_and_backward_times() {
        let begins = [5u64, 3, 3, 8, 1, 8, 9, 2, 2];
        let content: String = begins
            .iter()
            .map(|s| format!("[00:{s:02}.00]L{s}\n"))
            .collect();
        let parsed = parse_lrc(&content, &LrcParsingOptions::default());
        let end_secs: Vec<Option<u64>> = lrc_lines(&parsed)
            .iter()
            .map(|l| l.end_time.map(|t| t.as_secs()))
            .collect();
        assert_eq!(
            end_secs,
            [
                Some(8),
                Some(8),
                Some(8),
                Some(9),
                Some(8),
                Some(9),
                None,
                None,
                None
            ]
        );
    }

    #[test]
    fn test_lone_carriage_return_separates_lines() {
        let parsed = parse_lrc(
            "[ti:Mac]\r[00:00.00]Line one\r[00:05.00]Line two\r\n[00:07.00]Line three",
            &LrcParsingOptions::default(),
        );
        let lines = lrc_lines(&parsed);
        let contents: Vec<&str> = lines.iter().map(|l| l.content.as_str()).collect();
        assert_eq!(contents, ["Line one", "Line two", "Line three"]);
        assert_eq!(parsed.tag("ti"), Some("Mac"));
        assert_eq!(lines[0].end_time, Some(ms(5000)));
    }

    #[test]
    fn test_offset_tag() {
        let content = "[offset:+500]\n[00:01.00]A\n[00:00.20]B";
        let parsed = parse_lrc(content, &LrcParsingOptions::default());
        let lines = lrc_lines(&parsed);
        assert_eq!(lines[0].begin_time, ms(500));
        assert_eq!(lines[1].begin_time, Duration::ZERO);

        let parsed = parse_lrc(content, &LrcParsingOptions { apply_offset: false });
        assert_eq!(lrc_lines(&parsed)[0].begin_time, ms(1000));

        let parsed = parse_lrc("[offset:-250]\n[00:01.00]A", &LrcParsingOptions::default());
        assert_eq!(lrc_lines(&parsed)[0].begin_time, ms(1250));
    }

    #[test]
    fn test_empty_content_line_is_kept_as_gap() {
        let parsed = parse_lrc("[00:01.00]A\n[00:04.00]\n", &LrcParsingOptions::default());
        let lines = lrc_lines(&parsed);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].content, "");
    }
}
