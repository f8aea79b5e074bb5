//! # TTML 解析器 - `<p>` 内部处理
//!
//! 逐字单元、翻译、罗马音、背景人声，以及单元之间空格的记录。

use std::sync::LazyLock;

use quick_xml::{
    Reader,
    escape::unescape,
    events::{BytesStart, Event},
};
use regex::Regex;
use tracing::{debug, trace, warn};

use super::{
    constants::{
        ATTR_BEGIN, ATTR_END, ATTR_ROLE, ATTR_ROLE_ALIAS, ATTR_XML_LANG, MAIN_AGENT_ID,
        ROLE_BACKGROUND, ROLE_ROMANIZATION, ROLE_TRANSLATION, TAG_P, TAG_SPAN,
    },
    spacing::reconstruct_spacing,
    state::{
        AuxTrackType, CurrentPElementData, LineAuxiliary, SpanContext, SpanRole, TrackKind,
        TtmlParserState, WordRef,
    },
    utils::{
        contains_line_break, decode_entity, get_string_attribute, get_time_attribute_lenient,
        normalize_text_whitespace,
    },
};
use crate::{
    config::{SpacingStrategy, TtmlParsingOptions},
    error::Result,
    types::{LinePosition, LyricLine, TtmlLyric, TtmlLyricLine},
};

static XML_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("未能编译 XML_TAG_REGEX"));

/// 位于 `<p>` 内部时的事件处理。
pub(super) fn handle_p_event(
    event: &Event<'_>,
    state: &mut TtmlParserState,
    reader: &Reader<&[u8]>,
    event_start: usize,
    content: &str,
    options: &TtmlParsingOptions,
    lines: &mut Vec<LyricLine>,
) -> Result<()> {
    match event {
        Event::Start(e) if e.local_name().as_ref() == TAG_SPAN => {
            process_span_start(e, state, reader)?;
        }
        Event::Text(e) => handle_text(state, &e.xml_content()?, options),
        Event::GeneralRef(e) => handle_text(state, &decode_entity(e), options),
        Event::CData(e) => handle_text(state, &e.decode()?, options),
        Event::End(e) => match e.local_name().as_ref() {
            TAG_SPAN => process_span_end(state, options),
            TAG_P => finalize_p(state, event_start, content, options, lines),
            _ => {}
        },
        _ => {}
    }
    Ok(())
}

fn process_span_start(
    e: &BytesStart,
    state: &mut TtmlParserState,
    reader: &Reader<&[u8]>,
) -> Result<()> {
    let role = match get_string_attribute(e, reader, &[ATTR_ROLE, ATTR_ROLE_ALIAS])? {
        Some(role) => match role.as_bytes() {
            ROLE_TRANSLATION => SpanRole::Translation,
            ROLE_ROMANIZATION => SpanRole::Romanization,
            ROLE_BACKGROUND => SpanRole::Background,
            _ => SpanRole::Generic,
        },
        None => SpanRole::Generic,
    };

    let context = SpanContext {
        role,
        lang: get_string_attribute(e, reader, &[ATTR_XML_LANG])?,
        begin_time: get_time_attribute_lenient(e, reader, &[ATTR_BEGIN])?,
        end_time: get_time_attribute_lenient(e, reader, &[ATTR_END])?,
        text: String::new(),
    };

    if role == SpanRole::Background
        && let Some(p) = state.current_p.as_mut()
    {
        p.track_mut(TrackKind::Background);
    }
    state.span_stack.push(context);
    Ok(())
}

/// 文本进入当前 span；不在 span 中（或直接位于背景人声容器中）的空白算作上一个单元的尾随空格。
fn handle_text(state: &mut TtmlParserState, text: &str, options: &TtmlParsingOptions) {
    let Some(p) = state.current_p.as_mut() else {
        return;
    };

    match state.span_stack.last_mut() {
        Some(span) if span.role != SpanRole::Background => span.text.push_str(text),
        container => {
            if text.trim().is_empty() {
                if options.spacing == SpacingStrategy::Streaming && p.last_word.is_some() {
                    let last_word = p.last_word;
                    add_trailing_whitespace(p, last_word, text, options);
                } else if container.is_none() {
                    p.free_text.push_str(text);
                }
            } else {
                match container {
                    Some(background) => background.text.push_str(text),
                    None => p.free_text.push_str(text),
                }
                p.last_word = None;
            }
        }
    }
}

fn add_trailing_whitespace(
    p: &mut CurrentPElementData,
    word: Option<WordRef>,
    whitespace: &str,
    options: &TtmlParsingOptions,
) {
    if options.ignore_line_break_whitespace && contains_line_break(whitespace) {
        return;
    }
    if let Some(word) = word
        && let Some(lyric) = p.word_mut(word)
    {
        lyric.trailing_space_count += whitespace.chars().count();
    }
}

fn process_span_end(state: &mut TtmlParserState, options: &TtmlParsingOptions) {
    let Some(span) = state.span_stack.pop() else {
        warn!("[TTML 处理] 遇到多余的 </span>");
        return;
    };
    let track = if state.within_background() {
        TrackKind::Background
    } else {
        TrackKind::Main
    };
    let is_line_timing_mode = state.is_line_timing_mode;
    let Some(p) = state.current_p.as_mut() else {
        return;
    };

    match span.role {
        SpanRole::Generic => handle_word_span_end(p, &span, track, is_line_timing_mode, options),
        SpanRole::Translation => {
            let text = normalize_text_whitespace(&span.text);
            if !text.is_empty() {
                p.track_mut(track).add_translation(span.lang, text);
            }
            p.last_word = None;
        }
        SpanRole::Romanization => {
            let text = normalize_text_whitespace(&span.text);
            if !text.is_empty() {
                let roman = &mut p.track_mut(track).roman;
                *roman = Some(match roman.take() {
                    Some(existing) => format!("{existing} {text}"),
                    None => text,
                });
            }
            p.last_word = None;
        }
        SpanRole::Background => {
            let text = normalize_text_whitespace(&span.text);
            if !text.is_empty() {
                let has_words = p
                    .background
                    .as_ref()
                    .is_some_and(|bg| !bg.children.is_empty());
                if let (Some(begin), Some(end), false) = (span.begin_time, span.end_time, has_words)
                {
                    let lyric = TtmlLyric::new(begin, end, &text);
                    if !lyric.text.trim().is_empty() {
                        p.push_word(TrackKind::Background, lyric);
                    }
                } else {
                    warn!("[TTML 处理] 背景人声容器中的文本 '{text}' 没有可用的时间信息，已忽略。");
                }
            }
            p.last_word = None;
        }
    }
}

fn handle_word_span_end(
    p: &mut CurrentPElementData,
    span: &SpanContext,
    track: TrackKind,
    is_line_timing_mode: bool,
    options: &TtmlParsingOptions,
) {
    let streaming = options.spacing == SpacingStrategy::Streaming;
    let raw = span.text.as_str();

    let (Some(begin), Some(end)) = (span.begin_time, span.end_time) else {
        if raw.trim().is_empty() {
            return;
        }
        if is_line_timing_mode {
            p.free_text.push_str(raw);
        } else {
            warn!("[TTML 处理] 逐字模式下的 <span> 缺少时间信息，文本 '{}' 已忽略。", raw.trim());
        }
        return;
    };

    if raw.trim().is_empty() {
        // 只有空白的计时 span
        if streaming {
            let last_word = p.last_word;
            add_trailing_whitespace(p, last_word, raw, options);
        }
        return;
    }

    let leading = &raw[..raw.len() - raw.trim_start().len()];
    let trailing = &raw[raw.trim_end().len()..];
    if streaming && !leading.is_empty() {
        let last_word = p.last_word;
        add_trailing_whitespace(p, last_word, leading, options);
    }

    let lyric = TtmlLyric::new(begin, end, raw.trim());
    if lyric.text.trim().is_empty() {
        trace!("[TTML 处理] 单元 '{}' 只含括号，已跳过。", raw.trim());
        return;
    }
    let word = p.push_word(track, lyric);

    if streaming && !trailing.is_empty() {
        add_trailing_whitespace(p, Some(word), trailing, options);
    }
}

/// `</p>`：生成一行歌词。
fn finalize_p(
    state: &mut TtmlParserState,
    fragment_end: usize,
    content: &str,
    options: &TtmlParsingOptions,
    lines: &mut Vec<LyricLine>,
) {
    let Some(mut p) = state.current_p.take() else {
        return;
    };
    state.span_stack.clear();

    let free_text = normalize_text_whitespace(&p.free_text);
    if !free_text.is_empty() {
        if p.word_order.is_empty() {
            if let (Some(begin), Some(end)) = (p.begin_time, p.end_time) {
                p.push_word(TrackKind::Main, TtmlLyric::new(begin, end, &free_text));
            } else {
                warn!("[TTML 处理] 行文本 '{free_text}' 没有时间信息，已忽略。");
            }
        } else {
            debug!("[TTML 处理] 忽略逐字单元之外的文本 '{free_text}'");
        }
    }

    if options.spacing == SpacingStrategy::Template {
        apply_template_spacing(&mut p, content, fragment_end, options);
    }

    if let Some(key) = p.itunes_key.clone()
        && let Some(auxiliaries) = state.metadata_state.line_auxiliaries.get(&key)
    {
        apply_line_auxiliaries(&mut p, auxiliaries);
    }

    let background = p.background.take().filter(|bg| !bg.is_empty());
    if p.main.is_empty() && background.is_none() {
        debug!("[TTML 处理] 跳过空行");
        return;
    }

    let words = p
        .main
        .children
        .iter()
        .chain(background.iter().flat_map(|bg| bg.children.iter()));
    let word_begin = words.clone().map(|w| w.begin_time).min();
    let word_end = words.map(|w| w.end_time).max();

    let Some(begin_time) = p.begin_time.or(word_begin) else {
        warn!("[TTML 处理] 行缺少开始时间，已跳过。");
        return;
    };
    let end_time = p.end_time.or(word_end).unwrap_or(begin_time).max(begin_time);

    let position = match p.agent.as_deref() {
        None | Some(MAIN_AGENT_ID) => LinePosition::Main,
        Some(_) => LinePosition::Sub,
    };

    lines.push(LyricLine::Ttml(TtmlLyricLine {
        main: p.main,
        background,
        position,
        index: state.line_counter,
        begin_time,
        end_time,
        agent: p.agent,
        song_part: p.song_part,
    }));
    state.line_counter += 1;
}

/// 用去掉标签后的 `<p>` 原文重建空格。
fn apply_template_spacing(
    p: &mut CurrentPElementData,
    content: &str,
    fragment_end: usize,
    options: &TtmlParsingOptions,
) {
    let Some(fragment) = content.get(p.fragment_start..fragment_end) else {
        warn!(
            "[TTML 处理] 无法截取行片段 {}..{fragment_end}，跳过空格重建。",
            p.fragment_start
        );
        return;
    };
    let stripped = XML_TAG_REGEX.replace_all(fragment, "");
    let template = match unescape(&stripped) {
        Ok(text) => text.into_owned(),
        Err(e) => {
            debug!("[TTML 处理] 行片段反转义失败: {e}，使用原文。");
            stripped.into_owned()
        }
    };

    let order = p.word_order.clone();
    let mut words: Vec<TtmlLyric> = order
        .iter()
        .filter_map(|&w| p.word_mut(w).cloned())
        .collect();
    reconstruct_spacing(&template, &mut words, options.ignore_line_break_whitespace);

    for (word_ref, lyric) in order.into_iter().zip(words) {
        if let Some(target) = p.word_mut(word_ref) {
            target.trailing_space_count = lyric.trailing_space_count;
        }
    }
}

/// 把 `<iTunesMetadata>` 中按 `itunes:key` 给出的翻译和音译合并到行上。
fn apply_line_auxiliaries(p: &mut CurrentPElementData, auxiliaries: &[LineAuxiliary]) {
    for aux in auxiliaries {
        match aux.aux_type {
            AuxTrackType::Translation => {
                if let Some(text) = &aux.main {
                    p.main.add_translation(aux.lang.clone(), text.clone());
                }
                if let (Some(text), Some(bg)) = (&aux.background, p.background.as_mut()) {
                    bg.add_translation(aux.lang.clone(), text.clone());
                }
            }
            AuxTrackType::Romanization => {
                if p.main.roman.is_none() {
                    p.main.roman.clone_from(&aux.main);
                }
                if let Some(bg) = p.background.as_mut()
                    && bg.roman.is_none()
                {
                    bg.roman.clone_from(&aux.background);
                }
            }
        }
    }
}
