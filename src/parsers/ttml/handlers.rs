//! # TTML 解析器 - 全局事件处理
//!
//! 负责 `<p>` 和 `<head>` 之外的事件：根元素、body、div 以及 `<p>` 的开始。

use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use tracing::{debug, info};

use super::{
    constants::{
        ATTR_AGENT, ATTR_AGENT_ALIAS, ATTR_BEGIN, ATTR_END, ATTR_ITUNES_KEY, ATTR_ITUNES_SONG_PART,
        ATTR_ITUNES_SONG_PART_NEW, ATTR_ITUNES_TIMING, ATTR_XML_LANG, TAG_BODY, TAG_DIV, TAG_HEAD,
        TAG_P, TAG_TT,
    },
    state::{CurrentPElementData, TtmlParserState},
    utils::{get_string_attribute, get_time_attribute},
};
use crate::error::{LyricsError, Result};

pub(super) fn handle_global_event(
    event: &Event<'_>,
    state: &mut TtmlParserState,
    reader: &Reader<&[u8]>,
    tags: &mut Vec<(String, String)>,
    has_timed_span_tags: bool,
) -> Result<()> {
    match event {
        Event::Start(e) => match e.local_name().as_ref() {
            TAG_TT => process_tt_start(e, state, reader, tags, has_timed_span_tags)?,
            TAG_HEAD => state.in_head = true,
            TAG_BODY => state.in_body = true,
            TAG_DIV if state.in_body => {
                state.current_div_song_part = get_string_attribute(
                    e,
                    reader,
                    &[ATTR_ITUNES_SONG_PART_NEW, ATTR_ITUNES_SONG_PART],
                )?;
            }
            TAG_P if state.in_body => process_p_start(e, state, reader)?,
            _ => {}
        },
        Event::End(e) => match e.local_name().as_ref() {
            TAG_DIV => state.current_div_song_part = None,
            TAG_BODY => state.in_body = false,
            _ => {}
        },
        _ => {}
    }
    Ok(())
}

/// 处理 `<tt>`：确定计时模式并记录文档语言。
fn process_tt_start(
    e: &BytesStart,
    state: &mut TtmlParserState,
    reader: &Reader<&[u8]>,
    tags: &mut Vec<(String, String)>,
    has_timed_span_tags: bool,
) -> Result<()> {
    if let Some(timing) = get_string_attribute(e, reader, &[ATTR_ITUNES_TIMING])? {
        state.is_line_timing_mode = timing.eq_ignore_ascii_case("line");
    } else if !has_timed_span_tags {
        state.is_line_timing_mode = true;
        info!("[TTML 处理] 未找到带时间戳的 <span> 且未指定 itunes:timing，按逐行歌词处理。");
    }

    if let Some(lang) = get_string_attribute(e, reader, &[ATTR_XML_LANG])?
        && !lang.is_empty()
    {
        tags.push(("lang".to_string(), lang));
    }
    Ok(())
}

/// 处理 `<p>` 的开始。`begin`/`end` 格式错误会使整个文档解析失败。
fn process_p_start(
    e: &BytesStart,
    state: &mut TtmlParserState,
    reader: &Reader<&[u8]>,
) -> Result<()> {
    let begin_time = get_time_attribute(e, reader, &[ATTR_BEGIN])?;
    let end_time = get_time_attribute(e, reader, &[ATTR_END])?;
    let agent = get_string_attribute(e, reader, &[ATTR_AGENT, ATTR_AGENT_ALIAS])?;
    let song_part = get_string_attribute(
        e,
        reader,
        &[ATTR_ITUNES_SONG_PART_NEW, ATTR_ITUNES_SONG_PART],
    )?
    .or_else(|| state.current_div_song_part.clone());
    let itunes_key = get_string_attribute(e, reader, &[ATTR_ITUNES_KEY])?;

    let fragment_start = usize::try_from(reader.buffer_position())
        .map_err(|_| LyricsError::Internal("<p> 的位置超出 usize 范围".to_string()))?;

    debug!("[TTML 处理] 行 {} 开始于 {begin_time:?}", state.line_counter);
    state.current_p = Some(CurrentPElementData {
        begin_time,
        end_time,
        agent,
        song_part,
        itunes_key,
        fragment_start,
        ..Default::default()
    });
    state.span_stack.clear();
    Ok(())
}
