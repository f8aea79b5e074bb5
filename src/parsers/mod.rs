//! # 歌词解析器
//!
//! 每种格式一个子模块，外加格式检测和统一入口 [`parse_lyrics`]。

pub mod lrc_parser;
pub mod raw_parser;
pub mod ttml;

use tracing::{debug, warn};

use crate::{
    config::ParsingOptions,
    types::{LyricFormat, ParsedLyrics},
};

/// 猜测文本的格式。
///
/// 去掉首尾空白后以 `[` 开头且含有 `]` 的视为 LRC；第一个元素为 `<tt>` 的视为 TTML；
/// 其余都按纯文本处理。
#[must_use]
pub fn detect_format(content: &str) -> LyricFormat {
    let trimmed = content.trim();
    if trimmed.starts_with('[') && trimmed.contains(']') {
        LyricFormat::Lrc
    } else if trimmed.starts_with('<') && ttml::is_ttml_document(trimmed) {
        LyricFormat::Ttml
    } else {
        LyricFormat::Raw
    }
}

/// 按格式解析歌词。`format` 为 `None` 时自动检测。
///
/// TTML 解析失败时不会返回错误，而是记录警告并把原文当作纯文本。
#[must_use]
pub fn parse_lyrics(
    content: &str,
    format: Option<LyricFormat>,
    options: &ParsingOptions,
) -> ParsedLyrics {
    let format = format.unwrap_or_else(|| detect_format(content));
    debug!("[歌词解析] 以 {format} 格式解析 {} 字节的输入", content.len());

    match format {
        LyricFormat::Raw => parse_as_raw(content),
        LyricFormat::Lrc => lrc_parser::parse_lrc(content, &options.lrc),
        LyricFormat::Ttml => match ttml::parse_ttml(content, &options.ttml) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("[歌词解析] TTML 解析失败，按纯文本显示: {e}");
                parse_as_raw(content)
            }
        },
    }
}

fn parse_as_raw(content: &str) -> ParsedLyrics {
    ParsedLyrics {
        format: LyricFormat::Raw,
        lines: raw_parser::parse_raw(content),
        tags: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LyricLine;

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("  [00:01.00]Hi\n"), LyricFormat::Lrc);
        assert_eq!(detect_format("[ar:Someone]"), LyricFormat::Lrc);
        assert_eq!(detect_format("[no closing bracket"), LyricFormat::Raw);
        assert_eq!(
            detect_format("<?xml version=\"1.0\"?><tt></tt>"),
            LyricFormat::Ttml
        );
        assert_eq!(detect_format("<html></html>"), LyricFormat::Raw);
        assert_eq!(detect_format("just words"), LyricFormat::Raw);
        assert_eq!(detect_format(""), LyricFormat::Raw);
    }

    #[test]
    fn test_parse_lyrics_with_hint() {
        let options = ParsingOptions::default();
        let parsed = parse_lyrics("[00:01.00]Hi", Some(LyricFormat::Raw), &options);
        assert_eq!(parsed.format, LyricFormat::Raw);
        assert_eq!(parsed.lines.len(), 1);
        assert_eq!(parsed.lines[0].content(), "[00:01.00]Hi");

        let parsed = parse_lyrics("[00:01.00]Hi", None, &options);
        assert_eq!(parsed.format, LyricFormat::Lrc);
        assert!(matches!(parsed.lines[0], LyricLine::Lrc(_)));
    }

    #[test]
    fn test_broken_ttml_falls_back_to_raw() {
        let content = "<tt><body>\n<p begin=\"1s\" end=\"2s\">x</p>\n</body>";
        let parsed = parse_lyrics(content, Some(LyricFormat::Ttml), &ParsingOptions::default());
        assert_eq!(parsed.format, LyricFormat::Raw);
        assert_eq!(parsed.lines.len(), 3);
        assert!(parsed.lines.iter().all(|l| !l.is_valid()));
    }

    #[test]
    fn test_out_of_range_times_do_not_panic() {
        let options = ParsingOptions::default();

        // 字的时间无效时只丢弃该时间，整行仍按 TTML 解析
        let content = r#"<tt><body><p begin="1s" end="2s"><span begin="100000000000000000s" end="2s">x</span></p></body></tt>"#;
        let parsed = parse_lyrics(content, Some(LyricFormat::Ttml), &options);
        assert_eq!(parsed.format, LyricFormat::Ttml);

        // 行的时间无效时整个文档回退为纯文本
        let content = r#"<tt><body><p begin="9999999999999999:00:00.000" end="2s"><span begin="1s" end="2s">x</span></p></body></tt>"#;
        let parsed = parse_lyrics(content, Some(LyricFormat::Ttml), &options);
        assert_eq!(parsed.format, LyricFormat::Raw);
        assert_eq!(parsed.lines.len(), 1);
    }
}
