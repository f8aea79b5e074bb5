//! # 解析器的状态机和数据结构

use std::{collections::HashMap, time::Duration};

use crate::types::{TtmlLyric, TtmlLyrics};

/// 主解析器状态机。
#[derive(Debug, Default)]
pub(super) struct TtmlParserState {
    /// 当前打开的元素层数，用于检查标签是否闭合。
    pub(super) depth: usize,
    /// 是否已经遇到 `<tt>` 根元素。
    pub(super) seen_root: bool,
    /// 根元素是否已经关闭。
    pub(super) root_closed: bool,
    /// `<tt itunes:timing="Line">`。
    pub(super) is_line_timing_mode: bool,
    pub(super) in_head: bool,
    pub(super) in_body: bool,
    /// 当前 `<div>` 的 `itunes:song-part` 属性，会被子 `<p>` 继承。
    pub(super) current_div_song_part: Option<String>,
    pub(super) metadata_state: MetadataParseState,
    /// 正在处理的 `<p>`。
    pub(super) current_p: Option<CurrentPElementData>,
    /// `<p>` 内的 `<span>` 上下文堆栈。
    pub(super) span_stack: Vec<SpanContext>,
    /// 已输出的行数，作为下一行的 `index`。
    pub(super) line_counter: usize,
}

impl TtmlParserState {
    pub(super) fn within_background(&self) -> bool {
        self.span_stack
            .iter()
            .any(|s| s.role == SpanRole::Background)
    }
}

impl MetadataParseState {
    pub(super) fn within_background(&self) -> bool {
        self.span_backgrounds.iter().any(|&bg| bg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AuxTrackType {
    Translation,
    Romanization,
}

#[derive(Debug, Default)]
pub(super) enum MetadataContext {
    #[default]
    None,
    /// `<translation>` 或 `<transliteration>`
    InAuxiliaryEntry {
        aux_type: AuxTrackType,
        lang: Option<String>,
    },
    /// `<text for="...">`
    InAuxiliaryText {
        aux_type: AuxTrackType,
        lang: Option<String>,
        key: Option<String>,
    },
}

/// `<iTunesMetadata>` 中给某一行（按 `itunes:key`）提供的翻译或音译。
#[derive(Debug, Clone)]
pub(super) struct LineAuxiliary {
    pub(super) aux_type: AuxTrackType,
    pub(super) lang: Option<String>,
    pub(super) main: Option<String>,
    pub(super) background: Option<String>,
}

/// `<head>` 区域的解析状态。
#[derive(Debug, Default)]
pub(super) struct MetadataParseState {
    pub(super) context: MetadataContext,
    pub(super) main_text: String,
    pub(super) background_text: String,
    /// `<text>` 内部的 span 堆栈，记录每层是否为 `x-bg`。
    pub(super) span_backgrounds: Vec<bool>,
    pub(super) line_auxiliaries: HashMap<String, Vec<LineAuxiliary>>,
}

/// 逐字单元属于主歌词还是背景人声。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TrackKind {
    Main,
    Background,
}

/// 指向 `<p>` 中某个逐字单元的位置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct WordRef {
    pub(super) track: TrackKind,
    pub(super) index: usize,
}

/// 正在处理的 `<p>` 元素的临时数据。
#[derive(Debug, Default)]
pub(super) struct CurrentPElementData {
    pub(super) begin_time: Option<Duration>,
    pub(super) end_time: Option<Duration>,
    pub(super) agent: Option<String>,
    pub(super) song_part: Option<String>,
    pub(super) itunes_key: Option<String>,
    pub(super) main: TtmlLyrics,
    pub(super) background: Option<TtmlLyrics>,
    /// 直接位于 `<p>` 内、不属于任何 span 的文本。
    pub(super) free_text: String,
    /// `<p ...>` 之后第一个字节在原文中的位置。
    pub(super) fragment_start: usize,
    /// 最近结束的逐字单元，后续的空白会算作它的尾随空格。
    pub(super) last_word: Option<WordRef>,
    /// 按文档顺序记录的全部逐字单元。
    pub(super) word_order: Vec<WordRef>,
}

impl CurrentPElementData {
    pub(super) fn track_mut(&mut self, track: TrackKind) -> &mut TtmlLyrics {
        match track {
            TrackKind::Main => &mut self.main,
            TrackKind::Background => self.background.get_or_insert_with(TtmlLyrics::default),
        }
    }

    pub(super) fn word_mut(&mut self, word: WordRef) -> Option<&mut TtmlLyric> {
        self.track_mut(word.track).children.get_mut(word.index)
    }

    pub(super) fn push_word(&mut self, track: TrackKind, lyric: TtmlLyric) -> WordRef {
        let children = &mut self.track_mut(track).children;
        children.push(lyric);
        let word = WordRef {
            track,
            index: children.len() - 1,
        };
        self.word_order.push(word);
        self.last_word = Some(word);
        word
    }
}

/// 当前 `<span>` 的上下文信息。
#[derive(Debug, Clone)]
pub(super) struct SpanContext {
    pub(super) role: SpanRole,
    pub(super) lang: Option<String>,
    pub(super) begin_time: Option<Duration>,
    pub(super) end_time: Option<Duration>,
    /// 直接属于这个 span 的文本。
    pub(super) text: String,
}

/// `<span>` 的角色。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SpanRole {
    /// 普通逐字单元
    Generic,
    /// 翻译
    Translation,
    /// 罗马音
    Romanization,
    /// 背景人声容器
    Background,
}
