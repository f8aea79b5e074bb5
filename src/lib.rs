//! # lyric_sync
//!
//! 把纯文本、LRC、TTML 歌词解析为统一的 [`LyricLine`] 序列，并根据播放进度
//! 计算应当高亮的行。
//!
//! ```
//! use std::time::Duration;
//! use lyric_sync::{LyricsStore, LyricFormat};
//!
//! let mut store = LyricsStore::new();
//! store.load(Some("[00:00.00]Line one\n[00:05.00]Line two"), None);
//! assert_eq!(store.format(), LyricFormat::Lrc);
//!
//! let range = store.active_range(Duration::from_millis(5500));
//! assert_eq!(store.lines()[range.start].content(), "Line two");
//! ```

pub mod config;
pub mod error;
pub mod highlight;
pub mod logger;
pub mod parsers;
pub mod store;
pub mod time;
pub mod types;

pub use config::{
    EngineSettings, HighlightOptions, LogLevel, LogSettings, LrcParsingOptions, ParsingOptions,
    SpacingStrategy, TtmlParsingOptions,
};
pub use error::{LyricsError, Result};
pub use highlight::{Timed, Timeline, resolve_range};
pub use parsers::{
    detect_format, lrc_parser::parse_lrc, parse_lyrics, raw_parser::parse_raw,
    ttml::{parse_ttml, spacing::reconstruct_spacing},
};
pub use store::{LyricsSnapshot, LyricsStore, SharedLyricsStore};
pub use time::{format_time, parse_clock_time, parse_time};
pub use types::{
    LinePosition, LrcLine, LrcLineKind, LyricFormat, LyricLine, ParsedLyrics, RawLine, TtmlLyric,
    TtmlLyricLine, TtmlLyrics, TtmlTranslation,
};
