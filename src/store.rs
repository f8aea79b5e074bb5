//! # 歌词缓存
//!
//! 界面每一帧都会询问“当前歌词是什么、该高亮哪几行”，而歌词文本很少变化。
//! [`LyricsStore`] 记住上一次的输入文本和格式提示，两者都没变时不做任何解析。
//!
//! 输入、提示和解析结果放在同一个 [`LyricsSnapshot`] 中，用一次赋值整体替换，
//! 所以读者看到的永远是一组相互匹配的数据。

use std::{
    ops::Range,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::{
    config::{EngineSettings, HighlightOptions, ParsingOptions},
    highlight::Timeline,
    parsers::parse_lyrics,
    types::{LyricFormat, LyricLine, ParsedLyrics},
};

/// 一次解析的完整结果以及产生它的输入。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricsSnapshot {
    input: Option<String>,
    hint: Option<LyricFormat>,
    lyrics: ParsedLyrics,
    timeline: Timeline,
}

impl LyricsSnapshot {
    fn build(text: Option<&str>, hint: Option<LyricFormat>, options: &ParsingOptions) -> Self {
        let lyrics = text.map_or_else(
            || ParsedLyrics {
                format: LyricFormat::Raw,
                ..Default::default()
            },
            |text| parse_lyrics(text, hint, options),
        );
        let timeline = Timeline::new(&lyrics.lines);
        Self {
            input: text.map(str::to_owned),
            hint,
            lyrics,
            timeline,
        }
    }

    fn matches(&self, text: Option<&str>, hint: Option<LyricFormat>) -> bool {
        self.input.as_deref() == text && self.hint == hint
    }

    /// 产生这份结果的输入文本。
    #[must_use]
    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    #[must_use]
    pub const fn hint(&self) -> Option<LyricFormat> {
        self.hint
    }

    #[must_use]
    pub const fn lyrics(&self) -> &ParsedLyrics {
        &self.lyrics
    }

    #[must_use]
    pub fn lines(&self) -> &[LyricLine] {
        &self.lyrics.lines
    }

    /// 实际使用的格式。TTML 解析失败时为 `Raw`。
    #[must_use]
    pub const fn format(&self) -> LyricFormat {
        self.lyrics.format
    }

    /// 不带时间偏移的高亮范围。
    #[must_use]
    pub fn active_range(&self, elapsed: Duration) -> Range<usize> {
        self.timeline.active_range(elapsed)
    }
}

/// 单线程使用的歌词缓存。
#[derive(Debug, Clone, Default)]
pub struct LyricsStore {
    parsing: ParsingOptions,
    highlight: HighlightOptions,
    snapshot: Arc<LyricsSnapshot>,
}

impl LyricsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_settings(settings: &EngineSettings) -> Self {
        Self {
            parsing: settings.parsing.clone(),
            highlight: settings.highlight,
            snapshot: Arc::default(),
        }
    }

    /// 文本或格式提示与上次不同时重新解析，返回是否发生了解析。
    ///
    /// `text` 为 `None` 表示没有歌词，结果为空的纯文本序列。
    pub fn reparse_if_changed(&mut self, text: Option<&str>, hint: Option<LyricFormat>) -> bool {
        if self.snapshot.matches(text, hint) {
            trace!("[歌词缓存] 输入未变化，跳过解析");
            return false;
        }
        self.snapshot = Arc::new(LyricsSnapshot::build(text, hint, &self.parsing));
        debug!(
            "[歌词缓存] 重新解析完成: {} 格式，{} 行",
            self.snapshot.format(),
            self.snapshot.lines().len()
        );
        true
    }

    /// 同 [`Self::reparse_if_changed`]。
    pub fn load(&mut self, text: Option<&str>, hint: Option<LyricFormat>) -> bool {
        self.reparse_if_changed(text, hint)
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<LyricsSnapshot> {
        Arc::clone(&self.snapshot)
    }

    #[must_use]
    pub fn lines(&self) -> &[LyricLine] {
        self.snapshot.lines()
    }

    #[must_use]
    pub fn format(&self) -> LyricFormat {
        self.snapshot.format()
    }

    /// 应用时间偏移后的高亮范围。
    #[must_use]
    pub fn active_range(&self, elapsed: Duration) -> Range<usize> {
        self.snapshot.active_range(self.highlight.apply(elapsed))
    }
}

struct SharedInner {
    parsing: ParsingOptions,
    highlight: HighlightOptions,
    snapshot: RwLock<Arc<LyricsSnapshot>>,
    /// 每次请求解析都会加一，过期的后台结果据此丢弃。
    generation: AtomicU64,
}

/// 可在线程间共享的歌词缓存，解析可以放到 tokio 的阻塞线程池中进行。
#[derive(Clone)]
pub struct SharedLyricsStore {
    inner: Arc<SharedInner>,
}

impl Default for SharedLyricsStore {
    fn default() -> Self {
        Self::with_settings(&EngineSettings::default())
    }
}

impl SharedLyricsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_settings(settings: &EngineSettings) -> Self {
        Self {
            inner: Arc::new(SharedInner {
                parsing: settings.parsing.clone(),
                highlight: settings.highlight,
                snapshot: RwLock::new(Arc::default()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// 在当前线程中解析，返回是否发生了解析。
    pub fn reparse_if_changed(&self, text: Option<&str>, hint: Option<LyricFormat>) -> bool {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.reparse(text, hint, generation)
    }

    /// 在阻塞线程池中解析。
    ///
    /// 如果解析完成前又有新的请求，这次的结果会被丢弃，任务返回 `false`。
    /// 必须在 tokio 运行时中调用。
    pub fn reparse_in_background(
        &self,
        text: Option<String>,
        hint: Option<LyricFormat>,
    ) -> JoinHandle<bool> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.reparse(text.as_deref(), hint, generation))
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<LyricsSnapshot> {
        Arc::clone(&self.inner.snapshot.read())
    }

    /// 应用时间偏移后的高亮范围。
    #[must_use]
    pub fn active_range(&self, elapsed: Duration) -> Range<usize> {
        self.snapshot()
            .active_range(self.inner.highlight.apply(elapsed))
    }
}

impl SharedInner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn reparse(&self, text: Option<&str>, hint: Option<LyricFormat>, generation: u64) -> bool {
        if self.snapshot.read().matches(text, hint) {
            trace!("[歌词缓存] 输入未变化，跳过解析");
            return false;
        }

        let snapshot = LyricsSnapshot::build(text, hint, &self.parsing);

        let mut guard = self.snapshot.write();
        if !self.is_current(generation) {
            debug!("[歌词缓存] 解析结果 #{generation} 已过期，丢弃");
            return false;
        }
        *guard = Arc::new(snapshot);
        debug!(
            "[歌词缓存] 解析结果 #{generation} 已生效: {} 格式，{} 行",
            guard.format(),
            guard.lines().len()
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LRC: &str = "[00:00.00]Line one\n[00:05.00]Line two";

    #[test]
    fn test_reparse_only_when_changed() {
        let mut store = LyricsStore::new();
        assert!(!store.reparse_if_changed(None, None));
        assert!(store.lines().is_empty());

        assert!(store.reparse_if_changed(Some(LRC), None));
        let first = store.snapshot();
        assert!(!store.load(Some(LRC), None));
        assert!(Arc::ptr_eq(&first, &store.snapshot()));
        assert_eq!(store.format(), LyricFormat::Lrc);

        assert!(store.reparse_if_changed(Some(LRC), Some(LyricFormat::Raw)));
        assert_eq!(store.format(), LyricFormat::Raw);
        assert_eq!(store.lines().len(), 2);

        assert!(store.reparse_if_changed(None, Some(LyricFormat::Raw)));
        assert!(store.lines().is_empty());
        assert_eq!(store.format(), LyricFormat::Raw);
    }

    #[test]
    fn test_snapshot_is_consistent() {
        let mut store = LyricsStore::new();
        store.load(Some(LRC), Some(LyricFormat::Lrc));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.input(), Some(LRC));
        assert_eq!(snapshot.hint(), Some(LyricFormat::Lrc));
        assert_eq!(snapshot.lyrics().lines.len(), 2);

        store.load(Some("plain"), None);
        // 旧快照不受影响
        assert_eq!(snapshot.input(), Some(LRC));
        assert_eq!(snapshot.lines().len(), 2);
    }

    #[test]
    fn test_active_range_applies_offset() {
        let settings = EngineSettings {
            highlight: HighlightOptions {
                time_offset_ms: 1000,
            },
            ..Default::default()
        };
        let mut store = LyricsStore::with_settings(&settings);
        store.load(Some(LRC), None);
        assert_eq!(store.active_range(Duration::from_millis(3500)), 0..1);
        assert_eq!(store.active_range(Duration::from_millis(4500)), 1..2);
        assert_eq!(
            store.snapshot().active_range(Duration::from_millis(4500)),
            0..1
        );
    }

    #[test]
    fn test_shared_store_sync_reparse() {
        let store = SharedLyricsStore::new();
        assert!(store.reparse_if_changed(Some(LRC), None));
        assert!(!store.reparse_if_changed(Some(LRC), None));
        let clone = store.clone();
        assert_eq!(clone.snapshot().lines().len(), 2);
        assert_eq!(clone.active_range(Duration::from_secs(6)), 1..2);
    }

    #[tokio::test]
    async fn test_background_reparse() {
        let store = SharedLyricsStore::new();
        let applied = store
            .reparse_in_background(Some(LRC.to_string()), None)
            .await
            .unwrap();
        assert!(applied);
        assert_eq!(store.snapshot().format(), LyricFormat::Lrc);

        let unchanged = store
            .reparse_in_background(Some(LRC.to_string()), None)
            .await
            .unwrap();
        assert!(!unchanged);
    }

    #[tokio::test]
    async fn test_stale_background_result_is_discarded() {
        let store = SharedLyricsStore::new();

        // 持有读锁，让后台任务在写入之前停住
        let read_guard = store.inner.snapshot.read();
        let stale = store.reparse_in_background(Some(LRC.to_string()), None);
        // 模拟一个更新的请求
        store.inner.generation.fetch_add(1, Ordering::SeqCst);
        drop(read_guard);

        assert!(!stale.await.unwrap());
        assert!(store.snapshot().lines().is_empty());

        assert!(store.reparse_if_changed(Some("newer"), None));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.input(), Some("newer"));
        assert_eq!(snapshot.format(), LyricFormat::Raw);
    }
}
