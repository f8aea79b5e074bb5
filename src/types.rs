//! # 歌词数据模型
//!
//! 三种来源格式（纯文本、LRC、TTML）解析后统一成 [`LyricLine`]。
//! 它是一个封闭的枚举，消费方用穷尽匹配处理各个变体。

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, EnumString};

use crate::error::{LyricsError, Result};

/// 支持的歌词格式。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum LyricFormat {
    /// 不带任何时间信息的纯文本。
    #[default]
    Raw,
    /// 逐行计时的 LRC。
    Lrc,
    /// 逐字计时的 TTML。
    Ttml,
}

impl LyricFormat {
    /// 按名称（不区分大小写）查找格式，例如 `"lrc"`、`"TTML"`。
    pub fn from_name(name: &str) -> Result<Self> {
        name.trim()
            .parse()
            .map_err(|_| LyricsError::InvalidLyricFormat(name.to_string()))
    }

    /// 对应的文件扩展名。
    #[must_use]
    pub const fn to_extension_str(self) -> &'static str {
        match self {
            Self::Raw => "txt",
            Self::Lrc => "lrc",
            Self::Ttml => "ttml",
        }
    }
}

impl fmt::Display for LyricFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "纯文本"),
            Self::Lrc => write!(f, "LRC"),
            Self::Ttml => write!(f, "TTML"),
        }
    }
}

/// 一行纯文本歌词。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLine {
    pub content: String,
}

/// LRC 行的种类。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LrcLineKind {
    /// 主歌词
    Main,
    /// 翻译，附带 `tr:` 标记给出的语言代码
    Translation(String),
}

/// 一行 LRC 歌词。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LrcLine {
    pub kind: LrcLineKind,
    pub begin_time: Duration,
    /// 下一个更晚的时间标签；文件中最后一组行没有结束时间。
    pub end_time: Option<Duration>,
    /// 行首非时间戳的 `key:value` 标签，按出现顺序保存。
    pub tags: Vec<(String, String)>,
    pub content: String,
}

impl LrcLine {
    #[must_use]
    pub const fn is_translation(&self) -> bool {
        matches!(self.kind, LrcLineKind::Translation(_))
    }
}

/// TTML 中的一个逐字单元（单词或音节）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtmlLyric {
    pub begin_time: Duration,
    pub end_time: Duration,
    pub text: String,
    /// 渲染时紧跟在文本后的空格数。
    pub trailing_space_count: usize,
}

impl TtmlLyric {
    /// 构造时去掉括号类标点，并保证 `end >= begin`。
    #[must_use]
    pub fn new(begin_time: Duration, end_time: Duration, text: &str) -> Self {
        Self {
            begin_time,
            end_time: end_time.max(begin_time),
            text: strip_bracket_punctuation(text),
            trailing_space_count: 0,
        }
    }

    /// 文本加上尾随空格。
    #[must_use]
    pub fn content(&self) -> String {
        let mut content = String::with_capacity(self.text.len() + self.trailing_space_count);
        content.push_str(&self.text);
        content.extend(std::iter::repeat_n(' ', self.trailing_space_count));
        content
    }
}

/// 括号类标点被视为标记噪声而不是歌词内容。
const BRACKET_PUNCTUATION: [char; 8] = ['[', ']', '(', ')', '【', '】', '（', '）'];

/// 去掉文本中所有括号类标点。
#[must_use]
pub fn strip_bracket_punctuation(text: &str) -> String {
    text.chars()
        .filter(|c| !BRACKET_PUNCTUATION.contains(c))
        .collect()
}

/// 一条翻译。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TtmlTranslation {
    pub locale: Option<String>,
    pub text: String,
}

/// 一组有序的逐字单元，外加翻译和罗马音。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtmlLyrics {
    pub children: Vec<TtmlLyric>,
    /// 按 `(locale, text)` 去重。
    pub translations: Vec<TtmlTranslation>,
    pub roman: Option<String>,
}

impl TtmlLyrics {
    /// 最早的单元开始时间。
    #[must_use]
    pub fn begin_time(&self) -> Option<Duration> {
        self.children.iter().map(|c| c.begin_time).min()
    }

    /// 最晚的单元结束时间。
    #[must_use]
    pub fn end_time(&self) -> Option<Duration> {
        self.children.iter().map(|c| c.end_time).max()
    }

    /// 添加一条翻译；相同语言、相同文本的翻译只保留一份。
    pub fn add_translation(&mut self, locale: Option<String>, text: String) -> bool {
        let translation = TtmlTranslation { locale, text };
        if self.translations.contains(&translation) {
            return false;
        }
        self.translations.push(translation);
        true
    }

    /// 指定语言的翻译文本。
    #[must_use]
    pub fn translation(&self, locale: &str) -> Option<&str> {
        self.translations
            .iter()
            .find(|t| t.locale.as_deref() == Some(locale))
            .map(|t| t.text.as_str())
    }

    /// 拼接所有单元的文本与空格。
    #[must_use]
    pub fn content(&self) -> String {
        let mut content: String = self.children.iter().map(TtmlLyric::content).collect();
        content.truncate(content.trim_end().len());
        content
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.translations.is_empty() && self.roman.is_none()
    }
}

/// 行在界面上的位置：主唱位或对唱位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinePosition {
    #[default]
    Main,
    Sub,
}

/// 一行 TTML 歌词：主歌词加上可选的背景人声。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtmlLyricLine {
    pub main: TtmlLyrics,
    pub background: Option<TtmlLyrics>,
    pub position: LinePosition,
    pub index: usize,
    pub begin_time: Duration,
    pub end_time: Duration,
    /// `ttm:agent` 属性。
    pub agent: Option<String>,
    /// `itunes:song-part` 属性，可继承自所在的 `<div>`。
    pub song_part: Option<String>,
}

impl TtmlLyricLine {
    fn words(&self) -> impl Iterator<Item = &TtmlLyric> {
        self.main
            .children
            .iter()
            .chain(self.background.iter().flat_map(|bg| bg.children.iter()))
    }

    /// 所有逐字单元（含背景人声）的最早开始时间，无单元时退回行时间。
    #[must_use]
    pub fn condensed_begin_time(&self) -> Duration {
        self.words()
            .map(|w| w.begin_time)
            .min()
            .unwrap_or(self.begin_time)
    }

    /// 所有逐字单元（含背景人声）的最晚结束时间，无单元时退回行时间。
    #[must_use]
    pub fn condensed_end_time(&self) -> Duration {
        self.words()
            .map(|w| w.end_time)
            .max()
            .unwrap_or(self.end_time)
    }
}

/// 统一的歌词行。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LyricLine {
    Raw(RawLine),
    Lrc(LrcLine),
    Ttml(TtmlLyricLine),
}

impl LyricLine {
    /// 可以开始显示的时间。
    #[must_use]
    pub const fn begin_time(&self) -> Option<Duration> {
        match self {
            Self::Raw(_) => None,
            Self::Lrc(line) => Some(line.begin_time),
            Self::Ttml(line) => Some(line.begin_time),
        }
    }

    #[must_use]
    pub const fn end_time(&self) -> Option<Duration> {
        match self {
            Self::Raw(_) => None,
            Self::Lrc(line) => line.end_time,
            Self::Ttml(line) => Some(line.end_time),
        }
    }

    /// 判断是否高亮时使用的开始时间。
    #[must_use]
    pub fn condensed_begin_time(&self) -> Option<Duration> {
        match self {
            Self::Ttml(line) => Some(line.condensed_begin_time()),
            Self::Raw(_) | Self::Lrc(_) => self.begin_time(),
        }
    }

    /// 判断是否高亮时使用的结束时间。
    #[must_use]
    pub fn condensed_end_time(&self) -> Option<Duration> {
        match self {
            Self::Ttml(line) => Some(line.condensed_end_time()),
            Self::Raw(_) | Self::Lrc(_) => self.end_time(),
        }
    }

    /// 扁平化的文本内容。
    #[must_use]
    pub fn content(&self) -> String {
        match self {
            Self::Raw(line) => line.content.clone(),
            Self::Lrc(line) => line.content.clone(),
            Self::Ttml(line) => line.main.content(),
        }
    }

    /// 至少有一个时间边界时为真。
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.begin_time().is_some() || self.end_time().is_some()
    }
}

/// 一次解析的完整结果。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLyrics {
    pub format: LyricFormat,
    pub lines: Vec<LyricLine>,
    /// LRC 的 `[key:value]` 标签表，或 TTML `<head>` 中的 `<meta>`。
    pub tags: Vec<(String, String)>,
}

impl ParsedLyrics {
    /// 按键查找第一个标签值。
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
