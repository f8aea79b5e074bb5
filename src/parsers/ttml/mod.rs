//! # TTML (Timed Text Markup Language) 解析器
//!
//! 面向 Apple Music 和 AMLL 风格的逐字歌词，不打算支持通用 TTML 字幕。
//!
//! 与 LRC 不同，TTML 解析是严格的：XML 格式错误、标签未闭合、根元素不是 `<tt>`，
//! 以及 `<p>` 上无法解析的时间戳都会返回错误。逐字单元上的坏时间戳只会让该单元被丢弃。

mod body;
mod constants;
mod handlers;
mod metadata;
pub mod spacing;
mod state;
mod utils;

use quick_xml::{Reader, events::Event};
use tracing::error;

use self::{constants::TAG_TT, state::TtmlParserState};
use crate::{
    config::TtmlParsingOptions,
    error::{LyricsError, Result},
    types::{LyricFormat, LyricLine, ParsedLyrics},
};

/// 解析 TTML 文本。
///
/// # Errors
///
/// * `LyricsError::Xml` 等 - 输入不是格式正确的 XML
/// * `LyricsError::MalformedDocument` - 缺少 `<tt>` 根元素或存在未闭合的标签
/// * `LyricsError::InvalidTime` - `<p>` 的 `begin`/`end` 无法解析
pub fn parse_ttml(content: &str, options: &TtmlParsingOptions) -> Result<ParsedLyrics> {
    // 预扫描，辅助判断是否为逐行歌词
    let has_timed_span_tags = content.contains("<span") && content.contains("begin=");

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;

    let mut lines: Vec<LyricLine> = Vec::with_capacity(content.matches("<p").count());
    let mut tags: Vec<(String, String)> = Vec::new();
    let mut state = TtmlParserState::default();

    loop {
        let event_start = usize::try_from(reader.buffer_position())
            .map_err(|_| LyricsError::Internal("读取位置超出 usize 范围".to_string()))?;
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                error!(
                    "[TTML 解析] 位置 {} 出现 XML 错误: {e}",
                    reader.error_position()
                );
                return Err(e.into());
            }
        };

        if event == Event::Eof {
            break;
        }

        check_structure(&event, &mut state)?;

        if state.current_p.is_some() {
            body::handle_p_event(
                &event,
                &mut state,
                &reader,
                event_start,
                content,
                options,
                &mut lines,
            )?;
        } else if state.in_head {
            metadata::handle_head_event(&event, &mut state, &reader, &mut tags)?;
        } else {
            handlers::handle_global_event(
                &event,
                &mut state,
                &reader,
                &mut tags,
                has_timed_span_tags,
            )?;
        }
    }

    if !state.seen_root {
        return Err(LyricsError::MalformedDocument(
            "缺少 <tt> 根元素".to_string(),
        ));
    }
    if state.depth != 0 {
        return Err(LyricsError::MalformedDocument(format!(
            "文档结束时仍有 {} 个标签未闭合",
            state.depth
        )));
    }

    Ok(ParsedLyrics {
        format: LyricFormat::Ttml,
        lines,
        tags,
    })
}

/// 根元素必须唯一且为 `<tt>`，根元素之外只允许空白。
fn check_structure(event: &Event<'_>, state: &mut TtmlParserState) -> Result<()> {
    match event {
        Event::Start(e) => {
            if state.depth == 0 {
                if state.root_closed {
                    return Err(LyricsError::MalformedDocument(
                        "存在多个根元素".to_string(),
                    ));
                }
                if e.local_name().as_ref() != TAG_TT {
                    return Err(LyricsError::MalformedDocument(format!(
                        "根元素应为 <tt>，实际为 <{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
                state.seen_root = true;
            }
            state.depth += 1;
        }
        Event::End(_) => {
            state.depth = state.depth.saturating_sub(1);
            if state.depth == 0 {
                state.root_closed = true;
            }
        }
        Event::Text(e) if state.depth == 0 => {
            if !e.iter().all(u8::is_ascii_whitespace) {
                return Err(LyricsError::MalformedDocument(
                    "根元素之外出现文本".to_string(),
                ));
            }
        }
        Event::CData(_) | Event::GeneralRef(_) if state.depth == 0 => {
            return Err(LyricsError::MalformedDocument(
                "根元素之外出现文本".to_string(),
            ));
        }
        _ => {}
    }
    Ok(())
}

/// 第一个元素是否为 `<tt>`。跳过 XML 声明、注释、处理指令和 DOCTYPE。
#[must_use]
pub fn is_ttml_document(content: &str) -> bool {
    let mut reader = Reader::from_str(content.trim_start());
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => return e.local_name().as_ref() == TAG_TT,
            Ok(Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_)) => {}
            Ok(Event::Text(e)) if e.iter().all(u8::is_ascii_whitespace) => {}
            _ => return false,
        }
    }
}
